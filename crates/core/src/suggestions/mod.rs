//! Category auto-suggestion
//!
//! Watches the listing title, waits for typing to settle, and asks the backend for the
//! most likely category. A manual pick always wins over a suggestion.

pub mod controller;
pub mod debounce;
pub mod keywords;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::category::Category;

pub use controller::{
    DebounceTicket, SuggestionController, SuggestionOutcome, SuggestionState, SuggestionTicket,
};
pub use debounce::{DebouncedCategorySuggester, SuggestionSnapshot};
pub use keywords::{best_keyword_match, keyword_score, CategoryKeywords};

/// Quiet period before a settled title is sent off.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Titles shorter than this are never sent.
pub const DEFAULT_MIN_TITLE_CHARS: usize = 3;

/// Backend endpoint that guesses a category from free text.
#[async_trait]
pub trait CategorySuggester: Send + Sync {
    async fn suggest_category(&self, title: &str) -> Result<Option<Category>, SuggestionError>;
}

/// Suggestion failures are soft: they are logged and the form carries on.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SuggestionError {
    /// The endpoint does not exist on this backend.
    #[error("category suggestion endpoint is not deployed")]
    NotDeployed,
    #[error("category suggestion request timed out")]
    TimedOut,
    #[error("category suggestion request failed: {0}")]
    Backend(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SuggestionSettings {
    /// Quiet period after the last keystroke.
    pub debounce: Duration,
    /// Minimum trimmed title length, in characters.
    pub min_title_chars: usize,
    /// Upper bound on a single backend call; `None` waits forever.
    pub request_timeout: Option<Duration>,
}

impl Default for SuggestionSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            min_title_chars: DEFAULT_MIN_TITLE_CHARS,
            request_timeout: None,
        }
    }
}
