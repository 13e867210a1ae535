use serde::Serialize;
use toolshare_core::domain::category::Category;
use toolshare_core::pricing::Financials;
use toolshare_core::suggestions::{DebouncedCategorySuggester, SuggestionState};
use toolshare_db::repositories::SqlCategoryRepository;

use crate::commands::{open_pool, run_with_config, CommandResult};

#[derive(Clone, Debug)]
pub struct SuggestArgs {
    /// Successive values of the title field, oldest first.
    pub titles: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SuggestReport {
    title: String,
    category: Option<Category>,
    auto_categorized: bool,
    state: SuggestionState,
    financials: Financials,
}

/// Types each title into the category picker in turn, under the configured debounce,
/// minimum length and request timeout, and reports where the picker settled.
pub fn run(args: SuggestArgs) -> CommandResult {
    run_with_config("suggest", |config| async move {
        let pool = open_pool(&config).await?;
        let picker = DebouncedCategorySuggester::new(
            SqlCategoryRepository::new(pool.clone()),
            config.suggestion_settings(),
        );

        for title in args.titles {
            picker.title_changed(title).await;
        }
        picker.settled().await;
        let snapshot = picker.snapshot().await;
        drop(picker);
        pool.close().await;

        let report = SuggestReport {
            title: snapshot.title,
            category: snapshot.selected,
            auto_categorized: snapshot.auto_categorized,
            state: snapshot.state,
            financials: snapshot.financials,
        };
        serde_json::to_string(&report).map_err(|error| ("serialization", error.to_string(), 9u8))
    })
}
