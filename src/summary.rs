//! Per-paper AI summary generation with single-flight tracking.
//!
//! Summaries are generated by an OpenAI-compatible chat-completion service
//! (xAI Grok by default). The tracker guarantees at most one outstanding
//! generation per paper id: repeated requests while a generation is in flight
//! or after one completed are no-ops. A failed generation clears the entry so
//! the paper can be retried; a completed one is cached for the process
//! lifetime.

use crate::error::ProviderError;
use crate::paper::Paper;
use crate::prompts::summarize::SYSTEM_PROMPT;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Default provider endpoint base
pub const DEFAULT_PROVIDER_URL: &str = "https://api.x.ai/v1";

/// Environment variable holding the provider credential
pub const API_KEY_ENV: &str = "XAI_API_KEY";

/// Chat model used for summaries
const DEFAULT_MODEL: &str = "grok-3";

/// Completion token cap per summary
const MAX_TOKENS: u32 = 512;

const TEMPERATURE: f64 = 0.3;

/// Request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Summarization capability, injected into the tracker.
///
/// The input is plain text; callers may pass an abstract or a full extracted
/// document body, the provider does not care.
#[async_trait]
pub trait SummaryProvider: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String, ProviderError>;
}

/// OpenAI-compatible chat-completion response structures
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Chat-completion client for the summarization service.
pub struct GrokClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GrokClient {
    /// Create a client reading the credential from [`API_KEY_ENV`].
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or(ProviderError::MissingCredential)?;
        Self::new(DEFAULT_PROVIDER_URL, api_key, DEFAULT_MODEL)
    }

    /// Create a client against a custom endpoint and model.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ProviderError::MissingCredential);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|err| ProviderError::BadResponse(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
            model: model.into(),
        })
    }
}

#[async_trait]
impl SummaryProvider for GrokClient {
    async fn summarize(&self, text: &str) -> Result<String, ProviderError> {
        let request_body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": text}
            ],
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE
        });

        let api_url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        debug!(model = %self.model, chars = text.len(), "Sending summary request");

        let response = self
            .client
            .post(&api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request_body)
            .send()
            .await
            .map_err(|err| ProviderError::BadResponse(err.to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Provider returned error status");
            return Err(ProviderError::BadResponse(format!(
                "{} - {}",
                status, error_text
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::BadResponse(format!("undecodable body: {err}")))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::BadResponse("no choices in response".to_string()))?;

        Ok(content.trim().to_string())
    }
}

/// Per-id entry state. Absent ids are simply not in the map.
enum EntryState {
    InFlight,
    Ready(String),
}

/// Tracks summary generation per paper id with single-flight semantics.
///
/// Constructed without a provider (missing credential), the tracker degrades
/// gracefully: every request becomes a logged no-op until reconfigured.
pub struct SummaryTracker {
    provider: Option<Arc<dyn SummaryProvider>>,
    entries: Arc<Mutex<HashMap<String, EntryState>>>,
}

impl SummaryTracker {
    pub fn new(provider: Option<Arc<dyn SummaryProvider>>) -> Self {
        Self {
            provider,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Build a tracker from the environment; a missing credential disables
    /// enrichment instead of failing.
    pub fn from_env() -> Self {
        match GrokClient::from_env() {
            Ok(client) => Self::new(Some(Arc::new(client))),
            Err(err) => {
                warn!(error = %err, "Summarization disabled");
                Self::new(None)
            }
        }
    }

    /// Completed summary for a paper id, if any.
    pub fn summary(&self, id: &str) -> Option<String> {
        let entries = self.entries.lock().expect("summary state lock poisoned");
        match entries.get(id) {
            Some(EntryState::Ready(text)) => Some(text.clone()),
            _ => None,
        }
    }

    /// Whether a generation for this id is currently in flight.
    pub fn is_summarizing(&self, id: &str) -> bool {
        let entries = self.entries.lock().expect("summary state lock poisoned");
        matches!(entries.get(id), Some(EntryState::InFlight))
    }

    /// Whether any generation is currently in flight.
    pub fn has_pending(&self) -> bool {
        let entries = self.entries.lock().expect("summary state lock poisoned");
        entries
            .values()
            .any(|entry| matches!(entry, EntryState::InFlight))
    }

    /// Request a summary of the paper's abstract. Fire-and-forget; progress
    /// is observable via [`summary`](Self::summary) and
    /// [`is_summarizing`](Self::is_summarizing).
    pub fn request_summary(&self, paper: &Paper) {
        self.request(&paper.id, paper.summary.clone());
    }

    /// Request a summary of arbitrary text keyed by a paper id (used for
    /// full-document summaries).
    ///
    /// Must be called from within a Tokio runtime; the generation runs on a
    /// spawned task.
    pub fn request(&self, id: &str, text: String) {
        let Some(provider) = &self.provider else {
            warn!(id, "No summarization provider configured; ignoring request");
            return;
        };

        // Absent -> in-flight must be atomic, otherwise two callers could
        // both start a generation for the same id.
        {
            let mut entries = self.entries.lock().expect("summary state lock poisoned");
            if entries.contains_key(id) {
                debug!(id, "Summary already available or in flight");
                return;
            }
            entries.insert(id.to_string(), EntryState::InFlight);
        }

        let provider = Arc::clone(provider);
        let entries = Arc::clone(&self.entries);
        let id = id.to_string();

        tokio::spawn(async move {
            match provider.summarize(&text).await {
                Ok(summary) => {
                    let mut entries = entries.lock().expect("summary state lock poisoned");
                    entries.insert(id, EntryState::Ready(summary));
                }
                Err(err) => {
                    warn!(id = %id, error = %err, "Summary generation failed");
                    // Back to absent so the paper can be retried.
                    let mut entries = entries.lock().expect("summary state lock poisoned");
                    entries.remove(&id);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn paper(id: &str) -> Paper {
        Paper {
            id: id.to_string(),
            title: "A Paper".to_string(),
            summary: "An abstract.".to_string(),
            authors: Vec::new(),
            categories: Vec::new(),
            published: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            link: format!("https://arxiv.org/abs/{id}"),
        }
    }

    /// Counts calls; optionally fails or delays to widen race windows.
    struct CountingProvider {
        calls: AtomicUsize,
        delay_ms: u64,
        fail: bool,
    }

    impl CountingProvider {
        fn new(delay_ms: u64, fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delay_ms,
                fail,
            }
        }
    }

    #[async_trait]
    impl SummaryProvider for CountingProvider {
        async fn summarize(&self, text: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.fail {
                return Err(ProviderError::BadResponse("boom".to_string()));
            }
            Ok(format!("summary of: {text}"))
        }
    }

    async fn wait_until_settled(tracker: &SummaryTracker) {
        for _ in 0..100 {
            if !tracker.has_pending() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("tracker never settled");
    }

    #[tokio::test]
    async fn test_single_flight_per_id() {
        let provider = Arc::new(CountingProvider::new(50, false));
        let tracker = SummaryTracker::new(Some(Arc::clone(&provider) as Arc<dyn SummaryProvider>));

        let p = paper("2403.00001");
        tracker.request_summary(&p);
        tracker.request_summary(&p);
        assert!(tracker.is_summarizing(&p.id));

        wait_until_settled(&tracker).await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            tracker.summary(&p.id).as_deref(),
            Some("summary of: An abstract.")
        );
    }

    #[tokio::test]
    async fn test_completed_summary_is_never_regenerated() {
        let provider = Arc::new(CountingProvider::new(0, false));
        let tracker = SummaryTracker::new(Some(Arc::clone(&provider) as Arc<dyn SummaryProvider>));

        let p = paper("2403.00002");
        tracker.request_summary(&p);
        wait_until_settled(&tracker).await;
        tracker.request_summary(&p);
        wait_until_settled(&tracker).await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_resets_to_retryable() {
        let provider = Arc::new(CountingProvider::new(0, true));
        let tracker = SummaryTracker::new(Some(Arc::clone(&provider) as Arc<dyn SummaryProvider>));

        let p = paper("2403.00003");
        tracker.request_summary(&p);
        wait_until_settled(&tracker).await;

        assert!(tracker.summary(&p.id).is_none());
        assert!(!tracker.is_summarizing(&p.id));

        // The id is absent again, so a retry issues a second provider call.
        tracker.request_summary(&p);
        wait_until_settled(&tracker).await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_missing_provider_degrades_to_noop() {
        let tracker = SummaryTracker::new(None);
        let p = paper("2403.00004");
        tracker.request_summary(&p);
        assert!(!tracker.is_summarizing(&p.id));
        assert!(tracker.summary(&p.id).is_none());
    }
}
