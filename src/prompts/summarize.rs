//! Summarization prompts for paper abstracts and full texts.

/// System prompt for plain-English paper summaries
pub const SYSTEM_PROMPT: &str = "Summarize the following text in plain English within 8-10 sentences. Focus on the key findings and conclusions.";
