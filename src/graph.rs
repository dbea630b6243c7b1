//! Backlink graph building.
//!
//! Combines the two link sources of a note set (explicit `linked_note_ids`
//! and inline `[[Title]]` references) into one undirected edge list with at
//! most one edge per pair of notes, and answers the inverse "what points at
//! this note" query.

use crate::models::{
    GraphEdge, GraphNode, GraphPayload, GraphStats, MostConnected, Note, TagCount,
};
use crate::references::{extract_references, title_index};
use std::collections::{HashMap, HashSet};

pub const EXPLICIT_STRENGTH: f64 = 1.0;
pub const BACKLINK_STRENGTH: f64 = 0.8;

pub const MIN_NODE_SIZE: f64 = 10.0;
pub const MAX_NODE_SIZE: f64 = 30.0;

/// Tag -> color, checked in order. The first tag present decides.
const TAG_COLORS: &[(&str, &str)] = &[
    ("project", "#10b981"),   // green
    ("meeting", "#3b82f6"),   // blue
    ("idea", "#8b5cf6"),      // purple
    ("important", "#ef4444"), // red
    ("daily", "#f59e0b"),     // amber
];
pub const DEFAULT_COLOR: &str = "#06b6d4"; // teal

// ============================================================================
// Node Styling
// ============================================================================

pub fn node_size(content: &str) -> f64 {
    (content.chars().count() as f64 / 50.0).clamp(MIN_NODE_SIZE, MAX_NODE_SIZE)
}

pub fn node_color(tags: &[String]) -> &'static str {
    TAG_COLORS
        .iter()
        .find(|(tag, _)| tags.iter().any(|t| t == tag))
        .map(|(_, color)| *color)
        .unwrap_or(DEFAULT_COLOR)
}

// ============================================================================
// Graph Building
// ============================================================================

/// Unordered pair key, so {a, b} and {b, a} collide.
fn pair_key<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

pub fn build_graph(notes: &[Note]) -> GraphPayload {
    let nodes: Vec<GraphNode> = notes
        .iter()
        .map(|note| GraphNode {
            id: note.id.clone(),
            title: note.title.clone(),
            tags: note.tags.clone(),
            size: node_size(&note.content),
            color: node_color(&note.tags).to_string(),
        })
        .collect();

    let ids: HashSet<&str> = notes.iter().map(|n| n.id.as_str()).collect();
    let titles = title_index(notes);

    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    let mut links = Vec::new();

    for note in notes {
        // Explicit links first: they win the pair over any backlink.
        for linked in &note.linked_note_ids {
            if linked == &note.id {
                continue;
            }
            if !ids.contains(linked.as_str()) {
                log::debug!("dropping dangling link {} -> {}", note.id, linked);
                continue;
            }
            if seen.insert(pair_key(&note.id, linked)) {
                links.push(GraphEdge {
                    source: note.id.clone(),
                    target: linked.clone(),
                    strength: EXPLICIT_STRENGTH,
                });
            }
        }

        for title in extract_references(&note.content) {
            let target = match titles.get(title.as_str()) {
                Some(id) => *id,
                None => {
                    log::debug!("unresolved reference [[{}]] in {}", title, note.id);
                    continue;
                }
            };
            if target == note.id {
                continue;
            }
            if seen.insert(pair_key(&note.id, target)) {
                links.push(GraphEdge {
                    source: note.id.clone(),
                    target: target.to_string(),
                    strength: BACKLINK_STRENGTH,
                });
            }
        }
    }

    GraphPayload { nodes, links }
}

// ============================================================================
// Backlinks
// ============================================================================

/// Every other note that links to `note_id`, explicitly or by a title that
/// resolves to it. Titles resolve exactly as in `build_graph`, so a shared
/// title only backlinks its first owner.
pub fn get_backlinks<'a>(note_id: &str, notes: &'a [Note]) -> Vec<&'a Note> {
    if !notes.iter().any(|n| n.id == note_id) {
        return Vec::new();
    }
    let titles = title_index(notes);

    notes
        .iter()
        .filter(|note| note.id != note_id)
        .filter(|note| {
            note.linked_note_ids.iter().any(|id| id == note_id)
                || extract_references(&note.content)
                    .iter()
                    .any(|title| titles.get(title.as_str()) == Some(&note_id))
        })
        .collect()
}

/// Notes that `note_id` points at: resolved explicit links, then resolved
/// references, each note once.
pub fn outgoing_links<'a>(note_id: &str, notes: &'a [Note]) -> Vec<&'a Note> {
    let source = match notes.iter().find(|n| n.id == note_id) {
        Some(n) => n,
        None => return Vec::new(),
    };
    let by_id: HashMap<&str, &Note> = notes.iter().map(|n| (n.id.as_str(), n)).collect();
    let titles = title_index(notes);

    let referenced = extract_references(&source.content)
        .into_iter()
        .filter_map(|title| titles.get(title.as_str()).map(|id| id.to_string()));

    let mut seen: HashSet<String> = HashSet::new();
    source
        .linked_note_ids
        .iter()
        .cloned()
        .chain(referenced)
        .filter(|id| id != note_id)
        .filter_map(|id| {
            let note = by_id.get(id.as_str()).copied()?;
            if seen.insert(id) {
                Some(note)
            } else {
                None
            }
        })
        .collect()
}

// ============================================================================
// Statistics
// ============================================================================

pub fn degrees(graph: &GraphPayload) -> HashMap<&str, usize> {
    let mut degree: HashMap<&str, usize> =
        graph.nodes.iter().map(|n| (n.id.as_str(), 0)).collect();
    for edge in &graph.links {
        *degree.entry(edge.source.as_str()).or_insert(0) += 1;
        *degree.entry(edge.target.as_str()).or_insert(0) += 1;
    }
    degree
}

/// Distinct tags across `nodes`, in first-appearance order.
pub fn all_tags(nodes: &[GraphNode]) -> Vec<String> {
    let mut seen: HashSet<&String> = HashSet::new();
    let mut tags = Vec::new();
    for tag in nodes.iter().flat_map(|n| n.tags.iter()) {
        if seen.insert(tag) {
            tags.push(tag.clone());
        }
    }
    tags
}

pub fn compute_stats(graph: &GraphPayload) -> GraphStats {
    let total_nodes = graph.nodes.len();
    let total_links = graph.links.len();
    let average_connections = if total_nodes > 0 {
        let avg = (total_links * 2) as f64 / total_nodes as f64;
        (avg * 10.0).round() / 10.0
    } else {
        0.0
    };

    let degree = degrees(graph);
    let node_degree = |n: &GraphNode| degree.get(n.id.as_str()).copied().unwrap_or(0);

    let mut most_connected: Option<MostConnected> = None;
    for node in &graph.nodes {
        let connections = node_degree(node);
        let best = most_connected.as_ref().map(|m| m.connections).unwrap_or(0);
        if connections > best {
            most_connected = Some(MostConnected {
                id: node.id.clone(),
                title: node.title.clone(),
                connections,
            });
        }
    }

    let orphan_count = graph.nodes.iter().filter(|n| node_degree(n) == 0).count();

    let mut tag_counts: Vec<TagCount> = Vec::new();
    for tag in graph.nodes.iter().flat_map(|n| n.tags.iter()) {
        match tag_counts.iter_mut().find(|t| t.tag == *tag) {
            Some(entry) => entry.count += 1,
            None => tag_counts.push(TagCount {
                tag: tag.clone(),
                count: 1,
            }),
        }
    }
    // Stable sort keeps first-appearance order between equal counts.
    tag_counts.sort_by(|a, b| b.count.cmp(&a.count));
    tag_counts.truncate(5);

    GraphStats {
        total_nodes,
        total_links,
        average_connections,
        most_connected,
        top_tags: tag_counts,
        orphan_count,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn note(id: &str, title: &str, content: &str, linked: &[&str]) -> Note {
        Note {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            tags: Vec::new(),
            linked_note_ids: linked.iter().map(|s| s.to_string()).collect(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn tagged(id: &str, tags: &[&str]) -> Note {
        let mut n = note(id, id, "", &[]);
        n.tags = tags.iter().map(|s| s.to_string()).collect();
        n
    }

    fn assert_single_edge_per_pair(graph: &GraphPayload) {
        let mut pairs = HashSet::new();
        for e in &graph.links {
            let key = pair_key(&e.source, &e.target);
            assert!(pairs.insert(key), "duplicate edge for {:?}", key);
        }
    }

    #[test]
    fn test_idea_plan_scenario() {
        let notes = vec![
            note("1", "Idea", "", &["2"]),
            note("2", "Plan", "See [[Idea]]", &[]),
        ];
        let graph = build_graph(&notes);

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(
            graph.links,
            vec![GraphEdge {
                source: "1".into(),
                target: "2".into(),
                strength: EXPLICIT_STRENGTH,
            }]
        );

        let back_1: Vec<&str> = get_backlinks("1", &notes).iter().map(|n| n.id.as_str()).collect();
        let back_2: Vec<&str> = get_backlinks("2", &notes).iter().map(|n| n.id.as_str()).collect();
        assert_eq!(back_1, vec!["2"]);
        assert_eq!(back_2, vec!["1"]);
    }

    #[test]
    fn test_backlink_only_edge_has_lower_strength() {
        let notes = vec![note("a", "Alpha", "", &[]), note("b", "Beta", "[[Alpha]]", &[])];
        let graph = build_graph(&notes);
        assert_eq!(graph.links.len(), 1);
        assert_eq!(graph.links[0].source, "b");
        assert_eq!(graph.links[0].target, "a");
        assert_eq!(graph.links[0].strength, BACKLINK_STRENGTH);
    }

    #[test]
    fn test_mutual_explicit_links_collapse() {
        let notes = vec![note("a", "A", "", &["b"]), note("b", "B", "", &["a"])];
        let graph = build_graph(&notes);
        assert_eq!(graph.links.len(), 1);
        assert_single_edge_per_pair(&graph);
    }

    #[test]
    fn test_repeated_references_collapse() {
        let notes = vec![
            note("a", "A", "[[B]] [[B]] [[B]]", &["b", "b"]),
            note("b", "B", "[[A]]", &["a"]),
        ];
        let graph = build_graph(&notes);
        assert_eq!(graph.links.len(), 1);
        assert_eq!(graph.links[0].strength, EXPLICIT_STRENGTH);
    }

    #[test]
    fn test_no_self_loops() {
        let notes = vec![note("a", "Alpha", "I am [[Alpha]]", &["a"])];
        let graph = build_graph(&notes);
        assert!(graph.links.is_empty());
    }

    #[test]
    fn test_dangling_and_unresolved_links_dropped() {
        let notes = vec![
            note("a", "A", "[[Nowhere]]", &["missing"]),
            note("b", "B", "", &[]),
        ];
        let graph = build_graph(&notes);
        assert_eq!(graph.nodes.len(), 2);
        assert!(graph.links.is_empty());
    }

    #[test]
    fn test_every_edge_endpoint_is_a_node() {
        let notes = vec![
            note("a", "A", "[[B]] [[C]] [[Z]]", &["c", "x"]),
            note("b", "B", "[[A]]", &["y"]),
            note("c", "C", "", &["a", "b"]),
        ];
        let graph = build_graph(&notes);
        let ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        for e in &graph.links {
            assert!(ids.contains(e.source.as_str()));
            assert!(ids.contains(e.target.as_str()));
        }
        assert_single_edge_per_pair(&graph);
        assert_eq!(graph.links.len(), 3);
    }

    #[test]
    fn test_edge_order_follows_input_then_explicit_then_references() {
        let notes = vec![
            note("a", "A", "[[C]]", &["b"]),
            note("b", "B", "", &["c"]),
            note("c", "C", "", &[]),
        ];
        let graph = build_graph(&notes);
        let pairs: Vec<(&str, &str)> = graph
            .links
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str()))
            .collect();
        assert_eq!(pairs, vec![("a", "b"), ("a", "c"), ("b", "c")]);
    }

    #[test]
    fn test_build_is_deterministic() {
        let notes = vec![
            note("a", "A", "[[B]] [[C]]", &["c"]),
            note("b", "B", "[[C]]", &[]),
            note("c", "C", "[[A]]", &["b"]),
        ];
        assert_eq!(build_graph(&notes), build_graph(&notes));
    }

    #[test]
    fn test_duplicate_titles_resolve_to_first() {
        let notes = vec![
            note("a", "Same", "", &[]),
            note("b", "Same", "", &[]),
            note("c", "C", "[[Same]]", &[]),
        ];
        let graph = build_graph(&notes);
        assert_eq!(graph.links.len(), 1);
        assert_eq!(graph.links[0].target, "a");
    }

    #[test]
    fn test_empty_note_set() {
        let graph = build_graph(&[]);
        assert!(graph.nodes.is_empty());
        assert!(graph.links.is_empty());
    }

    #[test]
    fn test_node_size_clamped() {
        assert_eq!(node_size(""), 10.0);
        assert_eq!(node_size(&"x".repeat(1000)), 20.0);
        assert_eq!(node_size(&"x".repeat(5000)), 30.0);
    }

    #[test]
    fn test_node_color_priority() {
        let tags = |t: &[&str]| t.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(node_color(&tags(&["daily", "project"])), "#10b981");
        assert_eq!(node_color(&tags(&["idea", "important"])), "#8b5cf6");
        assert_eq!(node_color(&tags(&["daily"])), "#f59e0b");
        assert_eq!(node_color(&tags(&["misc"])), DEFAULT_COLOR);
        assert_eq!(node_color(&[]), DEFAULT_COLOR);
    }

    #[test]
    fn test_backlinks_for_unknown_note_is_empty() {
        let notes = vec![note("a", "A", "", &["zzz"])];
        assert!(get_backlinks("zzz", &notes).is_empty());
    }

    #[test]
    fn test_backlinks_imply_graph_edges() {
        let notes = vec![
            note("a", "A", "[[B]]", &[]),
            note("b", "B", "", &["c"]),
            note("c", "C", "[[A]] [[B]]", &["a"]),
        ];
        let graph = build_graph(&notes);
        for target in &notes {
            for source in get_backlinks(&target.id, &notes) {
                assert!(
                    graph.links.iter().any(|e| e.connects(&source.id, &target.id)),
                    "missing edge {} - {}",
                    source.id,
                    target.id
                );
            }
        }
    }

    #[test]
    fn test_shared_title_backlinks_only_first_owner() {
        let notes = vec![
            note("a", "Same", "", &[]),
            note("b", "Same", "", &[]),
            note("c", "C", "[[Same]]", &[]),
        ];
        let graph = build_graph(&notes);

        let ids = |id: &str| -> Vec<String> {
            get_backlinks(id, &notes).iter().map(|n| n.id.clone()).collect()
        };
        assert_eq!(ids("a"), vec!["c"]);
        assert!(ids("b").is_empty());

        // Every edge at a node is explained by a backlink or an outgoing link.
        for target in &notes {
            let backlinks = ids(&target.id);
            let outgoing: Vec<String> = outgoing_links(&target.id, &notes)
                .iter()
                .map(|n| n.id.clone())
                .collect();
            for edge in graph.links.iter().filter(|e| e.touches(&target.id)) {
                let other = edge.other(&target.id).map(str::to_string);
                let other = other.expect("edge touches target");
                assert!(
                    backlinks.contains(&other) || outgoing.contains(&other),
                    "edge {} - {} has no link behind it",
                    target.id,
                    other
                );
            }
            for source in &backlinks {
                assert!(graph.links.iter().any(|e| e.connects(source, &target.id)));
            }
        }
    }

    #[test]
    fn test_backlinks_exclude_self_reference() {
        let notes = vec![note("a", "A", "[[A]]", &["a"])];
        assert!(get_backlinks("a", &notes).is_empty());
    }

    #[test]
    fn test_outgoing_links_dedup_in_order() {
        let notes = vec![
            note("a", "A", "[[C]] [[B]] [[A]] [[Ghost]]", &["b", "missing"]),
            note("b", "B", "", &[]),
            note("c", "C", "", &[]),
        ];
        let out: Vec<&str> = outgoing_links("a", &notes).iter().map(|n| n.id.as_str()).collect();
        assert_eq!(out, vec!["b", "c"]);
        assert!(outgoing_links("nope", &notes).is_empty());
    }

    #[test]
    fn test_stats() {
        let mut notes = vec![
            tagged("a", &["idea", "work"]),
            tagged("b", &["work"]),
            tagged("c", &["idea"]),
            tagged("d", &["misc"]),
        ];
        notes[0].linked_note_ids = vec!["b".into(), "c".into()];
        let graph = build_graph(&notes);
        let stats = compute_stats(&graph);

        assert_eq!(stats.total_nodes, 4);
        assert_eq!(stats.total_links, 2);
        assert_eq!(stats.average_connections, 1.0);
        assert_eq!(stats.orphan_count, 1);
        let most = stats.most_connected.expect("a has two links");
        assert_eq!(most.id, "a");
        assert_eq!(most.connections, 2);
        let tags: Vec<(&str, usize)> = stats
            .top_tags
            .iter()
            .map(|t| (t.tag.as_str(), t.count))
            .collect();
        assert_eq!(tags, vec![("idea", 2), ("work", 2), ("misc", 1)]);
    }

    #[test]
    fn test_stats_empty_graph() {
        let stats = compute_stats(&GraphPayload::default());
        assert_eq!(stats.total_nodes, 0);
        assert_eq!(stats.average_connections, 0.0);
        assert!(stats.most_connected.is_none());
        assert!(stats.top_tags.is_empty());
    }

    #[test]
    fn test_all_tags_first_appearance() {
        let graph = build_graph(&[tagged("a", &["x", "y"]), tagged("b", &["y", "z"])]);
        assert_eq!(all_tags(&graph.nodes), vec!["x", "y", "z"]);
    }
}
