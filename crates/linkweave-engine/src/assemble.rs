//! Final ordering of suggestions.

use std::collections::HashMap;

use linkweave_core::Suggestion;

/// Group by source URL in first-encounter order, each group sorted by
/// `final_score` descending. The sort is stable.
pub fn assemble(suggestions: Vec<Suggestion>) -> Vec<Suggestion> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Suggestion>> = HashMap::new();
    for suggestion in suggestions {
        if !groups.contains_key(&suggestion.source_url) {
            order.push(suggestion.source_url.clone());
        }
        groups
            .entry(suggestion.source_url.clone())
            .or_default()
            .push(suggestion);
    }

    let mut assembled = Vec::new();
    for source in order {
        if let Some(mut group) = groups.remove(&source) {
            group.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
            assembled.extend(group);
        }
    }
    assembled
}
