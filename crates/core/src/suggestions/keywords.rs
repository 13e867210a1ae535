//! Keyword scoring used by backends that have no trained classifier.

use crate::domain::category::Category;

/// A category together with the words that point at it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryKeywords {
    pub category: Category,
    pub keywords: Vec<String>,
}

/// Lowercases, turns punctuation into spaces, collapses runs of whitespace and pads
/// both ends with a single space so whole-word lookups are plain substring checks.
fn normalize(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|ch| if ch.is_alphanumeric() { ch.to_ascii_lowercase() } else { ' ' })
        .collect();
    let words: Vec<&str> = cleaned.split_whitespace().collect();
    format!(" {} ", words.join(" "))
}

/// Sum of matched keyword lengths in words. Multi-word keywords count for more, and a
/// trailing plural `s` on the title side still matches.
pub fn keyword_score(title: &str, keywords: &[String]) -> usize {
    let title = normalize(title);
    keywords
        .iter()
        .map(|keyword| normalize(keyword))
        .filter(|keyword| !keyword.trim().is_empty())
        .filter(|keyword| {
            let plural = format!("{}s ", keyword.trim_end());
            title.contains(keyword.as_str()) || title.contains(plural.as_str())
        })
        .map(|keyword| keyword.split_whitespace().count())
        .sum()
}

/// Highest scoring category; ties go to the earlier entry. Zero scores never match.
pub fn best_keyword_match<'a>(
    title: &str,
    entries: &'a [CategoryKeywords],
) -> Option<&'a Category> {
    let mut best: Option<(usize, &Category)> = None;
    for entry in entries {
        let score = keyword_score(title, &entry.keywords);
        if score == 0 {
            continue;
        }
        if best.map_or(true, |(top, _)| score > top) {
            best = Some((score, &entry.category));
        }
    }
    best.map(|(_, category)| category)
}
