//! Inline `[[Title]]` reference handling.
//!
//! References are resolved against note titles: exact, case-sensitive, and
//! the first note in iteration order wins when titles collide.

use crate::models::{DuplicateTitle, Note};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

// ============================================================================
// Extraction
// ============================================================================

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Inner text cannot contain ']', so the first closing pair always wins.
    PATTERN.get_or_init(|| Regex::new(r"\[\[([^\]]+)\]\]").expect("static reference pattern"))
}

/// Return every `[[...]]` reference in `content`, trimmed, in order of
/// appearance. Duplicates are kept.
pub fn extract_references(content: &str) -> Vec<String> {
    reference_pattern()
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .collect()
}

// ============================================================================
// Resolution
// ============================================================================

pub fn resolve_title<'a>(title: &str, notes: &'a [Note]) -> Option<&'a Note> {
    notes.iter().find(|n| n.title == title)
}

/// Build a title -> first id lookup for repeated resolution over one snapshot.
pub fn title_index(notes: &[Note]) -> HashMap<&str, &str> {
    let mut index = HashMap::with_capacity(notes.len());
    for note in notes {
        index.entry(note.title.as_str()).or_insert(note.id.as_str());
    }
    index
}

/// Titles used by more than one note, in order of first appearance.
pub fn duplicate_titles(notes: &[Note]) -> Vec<DuplicateTitle> {
    let mut order: Vec<&str> = Vec::new();
    let mut ids: HashMap<&str, Vec<String>> = HashMap::new();

    for note in notes {
        let entry = ids.entry(note.title.as_str()).or_default();
        if entry.is_empty() {
            order.push(note.title.as_str());
        }
        entry.push(note.id.clone());
    }

    order
        .into_iter()
        .filter_map(|title| {
            let ids = ids.remove(title)?;
            if ids.len() > 1 {
                Some(DuplicateTitle {
                    title: title.to_string(),
                    ids,
                })
            } else {
                None
            }
        })
        .collect()
}

/// Extend `linked_ids` with the notes that `content` references by title.
///
/// Existing ids keep their order; resolved ids are appended in extraction
/// order, once each, and `self_id` is never added.
pub fn suggest_links(
    content: &str,
    linked_ids: &[String],
    notes: &[Note],
    self_id: &str,
) -> Vec<String> {
    let mut result = linked_ids.to_vec();
    let mut seen: HashSet<String> = linked_ids.iter().cloned().collect();

    for title in extract_references(content) {
        if let Some(target) = resolve_title(&title, notes) {
            if target.id != self_id && seen.insert(target.id.clone()) {
                result.push(target.id.clone());
            }
        }
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
