use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::domain::category::Category;
use crate::domain::tier::RiskTier;
use crate::errors::DomainError;
use crate::pricing::financials::Financials;
use crate::suggestions::controller::{DebounceTicket, SuggestionController, SuggestionState};
use crate::suggestions::{CategorySuggester, SuggestionError, SuggestionSettings};

/// Point-in-time view of the category picker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuggestionSnapshot {
    pub title: String,
    pub selected: Option<Category>,
    pub auto_categorized: bool,
    pub tier_override: Option<RiskTier>,
    pub state: SuggestionState,
    pub financials: Financials,
}

/// Drives a [`SuggestionController`] with real timers and a backend suggester.
///
/// Every title change restarts the quiet period; the task for the previous keystroke is
/// aborted. Responses are matched to the controller's generation, so a slow reply can
/// never overwrite a category the owner picked in the meantime.
pub struct DebouncedCategorySuggester<S> {
    inner: Arc<Inner<S>>,
}

struct Inner<S> {
    suggester: S,
    settings: SuggestionSettings,
    controller: Mutex<SuggestionController>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<S> DebouncedCategorySuggester<S>
where
    S: CategorySuggester + 'static,
{
    pub fn new(suggester: S, settings: SuggestionSettings) -> Self {
        Self::with_controller(
            suggester,
            settings,
            SuggestionController::new(settings.min_title_chars),
        )
    }

    pub fn with_controller(
        suggester: S,
        settings: SuggestionSettings,
        controller: SuggestionController,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                suggester,
                settings,
                controller: Mutex::new(controller),
                pending: Mutex::new(None),
            }),
        }
    }

    pub async fn title_changed(&self, title: impl Into<String>) {
        let mut controller = self.inner.controller.lock().await;
        let Some(ticket) = controller.title_changed(title) else {
            return;
        };

        // The slot is swapped before the controller lock drops, so the task left running
        // always holds the newest ticket.
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move { inner.settle_and_suggest(ticket).await });
        if let Some(previous) = self.inner.pending.lock().await.replace(handle) {
            previous.abort();
        }
        drop(controller);
    }

    /// Waits for the task started by the latest title change, if any, to finish.
    pub async fn settled(&self) {
        let handle = self.inner.pending.lock().await.take();
        if let Some(handle) = handle {
            // Err only when a newer title aborted it.
            let _ = handle.await;
        }
    }

    pub async fn select_category(&self, category: Option<Category>) {
        self.inner.controller.lock().await.select_manually(category);
    }

    pub async fn select_tier(&self, tier: Option<RiskTier>) -> Result<(), DomainError> {
        self.inner.controller.lock().await.select_tier(tier)
    }

    pub async fn snapshot(&self) -> SuggestionSnapshot {
        let controller = self.inner.controller.lock().await;
        SuggestionSnapshot {
            title: controller.title().to_string(),
            selected: controller.selected_category().cloned(),
            auto_categorized: controller.is_auto_categorized(),
            tier_override: controller.tier_override(),
            state: controller.state(),
            financials: controller.financials(),
        }
    }
}

impl<S> Drop for DebouncedCategorySuggester<S> {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.inner.pending.try_lock() {
            if let Some(handle) = pending.take() {
                handle.abort();
            }
        }
    }
}

impl<S> Inner<S>
where
    S: CategorySuggester,
{
    async fn settle_and_suggest(&self, ticket: DebounceTicket) {
        tokio::time::sleep(self.settings.debounce).await;

        let request = self.controller.lock().await.debounce_elapsed(ticket);
        let Some(request) = request else {
            return;
        };

        debug!(event_name = "suggestion.requested", title = %request.title, "requesting category");
        let call = self.suggester.suggest_category(&request.title);
        let result = match self.settings.request_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(SuggestionError::TimedOut)),
            None => call.await,
        };

        self.controller.lock().await.apply_suggestion(&request, result);
    }
}
