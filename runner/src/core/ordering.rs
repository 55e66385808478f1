//! Deterministic candidate ordering for the selection engine.

use std::collections::BTreeSet;

/// Anything that can be ranked as a fallback candidate.
pub trait Ranked {
    fn name(&self) -> &str;
    fn priority(&self) -> u32;
}

/// Sort by `(priority, name)` ascending and drop later duplicates by name.
///
/// Returns the names that were dropped so callers can report them.
pub fn rank<T: Ranked>(entries: &mut Vec<T>) -> Vec<String> {
    entries.sort_by(|a, b| {
        a.priority()
            .cmp(&b.priority())
            .then_with(|| a.name().cmp(b.name()))
    });

    let mut seen = BTreeSet::new();
    let mut dropped = Vec::new();
    entries.retain(|entry| {
        if seen.insert(entry.name().to_string()) {
            true
        } else {
            dropped.push(entry.name().to_string());
            false
        }
    });
    dropped
}

/// Remove `preferred` from a ranked list, returning it and the remaining
/// fallbacks in their original order.
pub fn split_preferred<T: Ranked>(entries: Vec<T>, preferred: &str) -> (Option<T>, Vec<T>) {
    let mut found = None;
    let mut fallbacks = Vec::with_capacity(entries.len());
    for entry in entries {
        if found.is_none() && entry.name() == preferred {
            found = Some(entry);
        } else if entry.name() != preferred {
            fallbacks.push(entry);
        }
    }
    (found, fallbacks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Entry(&'static str, u32);

    impl Ranked for Entry {
        fn name(&self) -> &str {
            self.0
        }

        fn priority(&self) -> u32 {
            self.1
        }
    }

    fn names(entries: &[Entry]) -> Vec<&'static str> {
        entries.iter().map(|e| e.0).collect()
    }

    #[test]
    fn rank_orders_by_priority_then_name() {
        let mut entries = vec![
            Entry("gemini", 2),
            Entry("copilot", 1),
            Entry("codex", 2),
            Entry("aider", 3),
        ];
        rank(&mut entries);
        assert_eq!(names(&entries), vec!["copilot", "codex", "gemini", "aider"]);
    }

    #[test]
    fn rank_is_independent_of_input_order() {
        let mut forward = vec![Entry("b", 1), Entry("a", 1), Entry("c", 0)];
        let mut reverse: Vec<Entry> = forward.iter().rev().cloned().collect();
        rank(&mut forward);
        rank(&mut reverse);
        assert_eq!(forward, reverse);
    }

    #[test]
    fn rank_keeps_first_duplicate_after_sorting() {
        let mut entries = vec![Entry("codex", 5), Entry("copilot", 2), Entry("codex", 1)];
        let dropped = rank(&mut entries);
        assert_eq!(entries, vec![Entry("codex", 1), Entry("copilot", 2)]);
        assert_eq!(dropped, vec!["codex".to_string()]);
    }

    #[test]
    fn split_preferred_removes_it_from_fallbacks() {
        let entries = vec![Entry("copilot", 1), Entry("codex", 2), Entry("gemini", 3)];
        let (preferred, fallbacks) = split_preferred(entries, "codex");
        assert_eq!(preferred, Some(Entry("codex", 2)));
        assert_eq!(names(&fallbacks), vec!["copilot", "gemini"]);
    }

    #[test]
    fn split_preferred_missing_keeps_everything() {
        let entries = vec![Entry("copilot", 1), Entry("gemini", 3)];
        let (preferred, fallbacks) = split_preferred(entries, "codex");
        assert_eq!(preferred, None);
        assert_eq!(names(&fallbacks), vec!["copilot", "gemini"]);
    }
}
