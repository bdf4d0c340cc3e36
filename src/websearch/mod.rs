//! Web search context
//!
//! Providers return title/link/snippet triples; `format_results` turns them
//! into the text block handed to the model.

mod google;

pub use google::GoogleSearchProvider;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Text used when a search yields nothing
pub const NO_WEB_RESULTS: &str = "No relevant information found on the web.";

/// One search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

#[async_trait]
pub trait WebSearchProvider: Send + Sync {
    /// Up to `max_results` hits, best first
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>>;

    fn name(&self) -> &str;
}

/// Numbered, one block per result, with the source link last
pub fn format_results(results: &[WebResult]) -> String {
    if results.is_empty() {
        return NO_WEB_RESULTS.to_string();
    }

    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("[{}] {}\n{}\nSource: {}\n", i + 1, r.title, r.snippet, r.link))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_results() {
        let results = vec![
            WebResult {
                title: "Rust".to_string(),
                link: "https://www.rust-lang.org".to_string(),
                snippet: "A language empowering everyone.".to_string(),
            },
            WebResult {
                title: "Tokio".to_string(),
                link: "https://tokio.rs".to_string(),
                snippet: "An asynchronous runtime.".to_string(),
            },
        ];

        assert_eq!(
            format_results(&results),
            "[1] Rust\nA language empowering everyone.\nSource: https://www.rust-lang.org\n\n\
             [2] Tokio\nAn asynchronous runtime.\nSource: https://tokio.rs\n"
        );
    }

    #[test]
    fn test_format_empty() {
        assert_eq!(format_results(&[]), NO_WEB_RESULTS);
    }
}
