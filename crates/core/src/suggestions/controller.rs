//! Synchronous state machine behind the category suggestion box.

use serde::Serialize;
use tracing::{debug, warn};

use crate::domain::category::Category;
use crate::domain::tier::RiskTier;
use crate::errors::DomainError;
use crate::pricing::financials::{compute_financials, validate_tier_override, Financials};
use crate::suggestions::SuggestionError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionState {
    /// No suggestion work pending.
    #[default]
    Idle,
    /// Waiting for the title to settle.
    Debouncing,
    /// Request in flight.
    Suggesting,
    /// The current category came from a suggestion.
    AutoSelected,
    /// The owner picked a category; suggestions are ignored for this title.
    ManualOverride,
}

/// Issued for every title change; only the newest ticket may start a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DebounceTicket {
    generation: u64,
}

/// A request that is allowed to go out. The response must be handed back with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SuggestionTicket {
    generation: u64,
    pub title: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SuggestionOutcome {
    /// A different category was selected.
    Selected(Category),
    /// The suggestion matched the current selection.
    Unchanged,
    /// Nothing suggested, or the endpoint failed.
    NoSuggestion,
    /// The response belongs to a superseded title or a manual pick happened meanwhile.
    Stale,
}

#[derive(Clone, Debug)]
pub struct SuggestionController {
    min_title_chars: usize,
    title: String,
    selected: Option<Category>,
    auto_categorized: bool,
    tier_override: Option<RiskTier>,
    state: SuggestionState,
    generation: u64,
    manual_anchor: Option<String>,
}

impl SuggestionController {
    pub fn new(min_title_chars: usize) -> Self {
        Self {
            min_title_chars,
            title: String::new(),
            selected: None,
            auto_categorized: false,
            tier_override: None,
            state: SuggestionState::Idle,
            generation: 0,
            manual_anchor: None,
        }
    }

    /// Starts from an existing listing, as the edit screen does.
    pub fn with_selection(
        min_title_chars: usize,
        title: impl Into<String>,
        category: Option<Category>,
        tier_override: Option<RiskTier>,
    ) -> Self {
        let title = title.into();
        let manual_anchor = category.as_ref().map(|_| normalize(&title));
        Self {
            state: if category.is_some() {
                SuggestionState::ManualOverride
            } else {
                SuggestionState::Idle
            },
            title,
            selected: category,
            tier_override,
            manual_anchor,
            ..Self::new(min_title_chars)
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn selected_category(&self) -> Option<&Category> {
        self.selected.as_ref()
    }

    pub fn is_auto_categorized(&self) -> bool {
        self.auto_categorized
    }

    pub fn tier_override(&self) -> Option<RiskTier> {
        self.tier_override
    }

    pub fn state(&self) -> SuggestionState {
        self.state
    }

    pub fn financials(&self) -> Financials {
        compute_financials(self.selected.as_ref(), self.tier_override)
    }

    /// Records a keystroke. Returns a ticket unless a manual pick still covers the title.
    pub fn title_changed(&mut self, title: impl Into<String>) -> Option<DebounceTicket> {
        self.title = title.into();
        self.generation += 1;

        if self.state == SuggestionState::ManualOverride {
            let still_anchored = self
                .manual_anchor
                .as_deref()
                .is_some_and(|anchor| normalize(&self.title).starts_with(anchor));
            if still_anchored {
                return None;
            }
            debug!(
                event_name = "suggestion.manual_override_lifted",
                title = %self.title,
                "title moved away from the manually categorized text"
            );
            self.manual_anchor = None;
        }

        self.state = SuggestionState::Debouncing;
        Some(DebounceTicket { generation: self.generation })
    }

    /// Called when the quiet period of `ticket` is over.
    pub fn debounce_elapsed(&mut self, ticket: DebounceTicket) -> Option<SuggestionTicket> {
        if ticket.generation != self.generation || self.state != SuggestionState::Debouncing {
            return None;
        }

        let title = self.title.trim().to_string();
        if title.chars().count() < self.min_title_chars {
            if self.auto_categorized {
                self.clear_selection();
            }
            self.state = SuggestionState::Idle;
            return None;
        }

        self.state = SuggestionState::Suggesting;
        Some(SuggestionTicket { generation: self.generation, title })
    }

    pub fn apply_suggestion(
        &mut self,
        ticket: &SuggestionTicket,
        result: Result<Option<Category>, SuggestionError>,
    ) -> SuggestionOutcome {
        if ticket.generation != self.generation || self.state != SuggestionState::Suggesting {
            debug!(
                event_name = "suggestion.stale_response_dropped",
                title = %ticket.title,
                "dropping suggestion for a superseded title"
            );
            return SuggestionOutcome::Stale;
        }

        let category = match result {
            Ok(Some(category)) => category,
            Ok(None) => {
                self.state = SuggestionState::Idle;
                return SuggestionOutcome::NoSuggestion;
            }
            Err(SuggestionError::NotDeployed) => {
                debug!(
                    event_name = "suggestion.endpoint_missing",
                    "category suggestion endpoint not deployed"
                );
                self.state = SuggestionState::Idle;
                return SuggestionOutcome::NoSuggestion;
            }
            Err(error) => {
                warn!(
                    event_name = "suggestion.request_failed",
                    title = %ticket.title,
                    error = %error,
                    "category suggestion failed"
                );
                self.state = SuggestionState::Idle;
                return SuggestionOutcome::NoSuggestion;
            }
        };

        let unchanged = self.selected.as_ref().is_some_and(|current| current.id == category.id);
        if unchanged {
            self.state = if self.auto_categorized {
                SuggestionState::AutoSelected
            } else {
                SuggestionState::Idle
            };
            return SuggestionOutcome::Unchanged;
        }

        debug!(
            event_name = "suggestion.category_selected",
            category_id = %category.id,
            title = %ticket.title,
            "auto-selected category"
        );
        self.selected = Some(category.clone());
        self.auto_categorized = true;
        self.tier_override = None;
        self.state = SuggestionState::AutoSelected;
        SuggestionOutcome::Selected(category)
    }

    /// The owner picked from the dropdown (or cleared it with `None`).
    pub fn select_manually(&mut self, category: Option<Category>) {
        self.generation += 1;

        let changed = self.selected.as_ref().map(|c| &c.id) != category.as_ref().map(|c| &c.id);
        if changed {
            self.tier_override = None;
        }
        self.auto_categorized = false;

        if category.is_some() {
            self.manual_anchor = Some(normalize(&self.title));
            self.state = SuggestionState::ManualOverride;
        } else {
            self.manual_anchor = None;
            self.state = SuggestionState::Idle;
        }
        self.selected = category;
    }

    /// The owner clicked a tier card. Only upgrades over the category default are accepted.
    pub fn select_tier(&mut self, tier: Option<RiskTier>) -> Result<(), DomainError> {
        let category = self.selected.as_ref().ok_or_else(|| {
            DomainError::InvariantViolation("choose a category before picking a tier".to_string())
        })?;
        validate_tier_override(category, tier)?;
        self.tier_override = tier;
        Ok(())
    }

    fn clear_selection(&mut self) {
        self.selected = None;
        self.auto_categorized = false;
        self.tier_override = None;
    }
}

impl Default for SuggestionController {
    fn default() -> Self {
        Self::new(super::DEFAULT_MIN_TITLE_CHARS)
    }
}

fn normalize(title: &str) -> String {
    title.trim().to_lowercase()
}
