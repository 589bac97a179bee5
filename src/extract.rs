//! PDF retrieval and text extraction.
//!
//! Full-document summaries feed the whole paper body to the provider instead
//! of the abstract. The text comes straight out of the PDF content streams,
//! so formatting is approximate; that is good enough as summarization input.

use crate::error::ExtractError;
use crate::paper::Paper;
use tracing::{debug, info};

/// Download a PDF and extract its text content.
pub async fn extract_text(client: &reqwest::Client, url: &str) -> Result<String, ExtractError> {
    debug!(url, "Downloading PDF");
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ExtractError::DownloadFailed(status.as_u16()));
    }

    let bytes = response.bytes().await?;
    let text = pdf_extract::extract_text_from_mem(&bytes)
        .map_err(|err| ExtractError::PdfParsing(err.to_string()))?;

    info!(url, chars = text.len(), "Extracted PDF text");
    Ok(text)
}

/// Extract the full text of a paper via its canonical PDF URL.
pub async fn extract_text_for(
    client: &reqwest::Client,
    paper: &Paper,
) -> Result<String, ExtractError> {
    extract_text(client, &paper.pdf_url()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_a_pdf_fails_parsing() {
        // pdf_extract is exercised directly; no network involved.
        let result = pdf_extract::extract_text_from_mem(b"this is not a pdf");
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_network_error() {
        let client = reqwest::Client::new();
        let result = extract_text(&client, "http://127.0.0.1:1/nope.pdf").await;
        assert!(matches!(result, Err(ExtractError::Network(_))));
    }
}
