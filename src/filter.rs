//! Search/tag projection of a built graph.

use crate::models::{GraphEdge, GraphNode, GraphPayload};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFilter {
    pub search_term: Option<String>,
    pub tag: Option<String>,
}

impl NodeFilter {
    pub fn new(search_term: Option<String>, tag: Option<String>) -> Self {
        Self { search_term, tag }
    }

    pub fn is_empty(&self) -> bool {
        self.search_term.as_deref().unwrap_or("").is_empty()
            && self.tag.as_deref().unwrap_or("").is_empty()
    }

    /// Search matches title or any tag, case-insensitively; tag must match
    /// exactly. Both must hold when both are set.
    pub fn matches(&self, node: &GraphNode) -> bool {
        let matches_search = match self.search_term.as_deref() {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                node.title.to_lowercase().contains(&term)
                    || node.tags.iter().any(|t| t.to_lowercase().contains(&term))
            }
        };

        let matches_tag = match self.tag.as_deref() {
            None | Some("") => true,
            Some(tag) => node.tags.iter().any(|t| t == tag),
        };

        matches_search && matches_tag
    }
}

/// Keep the nodes `filter` accepts and the edges whose endpoints both survive.
pub fn project(nodes: &[GraphNode], edges: &[GraphEdge], filter: &NodeFilter) -> GraphPayload {
    let nodes: Vec<GraphNode> = nodes.iter().filter(|n| filter.matches(n)).cloned().collect();
    let kept: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let links = edges
        .iter()
        .filter(|e| kept.contains(e.source.as_str()) && kept.contains(e.target.as_str()))
        .cloned()
        .collect();

    GraphPayload { nodes, links }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, title: &str, tags: &[&str]) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            title: title.to_string(),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            size: 10.0,
            color: "#06b6d4".to_string(),
        }
    }

    fn edge(a: &str, b: &str) -> GraphEdge {
        GraphEdge {
            source: a.to_string(),
            target: b.to_string(),
            strength: 1.0,
        }
    }

    fn sample() -> (Vec<GraphNode>, Vec<GraphEdge>) {
        (
            vec![
                node("1", "Project Kickoff", &["project", "work"]),
                node("2", "Weekly Sync", &["meeting", "work"]),
                node("3", "Garden ideas", &["Idea"]),
                node("4", "Groceries", &[]),
            ],
            vec![edge("1", "2"), edge("2", "3"), edge("3", "4"), edge("1", "4")],
        )
    }

    fn ids(p: &GraphPayload) -> Vec<&str> {
        p.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let (nodes, edges) = sample();
        let filter = NodeFilter::new(Some(String::new()), Some(String::new()));
        assert!(filter.is_empty());
        let p = project(&nodes, &edges, &filter);
        assert_eq!(p.nodes, nodes);
        assert_eq!(p.links, edges);
    }

    #[test]
    fn test_search_matches_title_case_insensitive() {
        let (nodes, edges) = sample();
        let p = project(&nodes, &edges, &NodeFilter::new(Some("SYNC".into()), None));
        assert_eq!(ids(&p), vec!["2"]);
        assert!(p.links.is_empty());
    }

    #[test]
    fn test_search_matches_tags() {
        let (nodes, edges) = sample();
        let p = project(&nodes, &edges, &NodeFilter::new(Some("idea".into()), None));
        assert_eq!(ids(&p), vec!["3"]);
        let p = project(&nodes, &edges, &NodeFilter::new(Some("wor".into()), None));
        assert_eq!(ids(&p), vec!["1", "2"]);
        assert_eq!(p.links, vec![edge("1", "2")]);
    }

    #[test]
    fn test_tag_is_exact() {
        let (nodes, edges) = sample();
        let p = project(&nodes, &edges, &NodeFilter::new(None, Some("idea".into())));
        assert!(p.nodes.is_empty());
        let p = project(&nodes, &edges, &NodeFilter::new(None, Some("Idea".into())));
        assert_eq!(ids(&p), vec!["3"]);
    }

    #[test]
    fn test_search_and_tag_combine() {
        let (nodes, edges) = sample();
        let p = project(
            &nodes,
            &edges,
            &NodeFilter::new(Some("kick".into()), Some("work".into())),
        );
        assert_eq!(ids(&p), vec!["1"]);
    }

    #[test]
    fn test_no_match_is_empty_projection() {
        let (nodes, edges) = sample();
        let p = project(&nodes, &edges, &NodeFilter::new(Some("zzz".into()), None));
        assert!(p.nodes.is_empty());
        assert!(p.links.is_empty());
    }

    #[test]
    fn test_projection_is_subset_with_closed_edges() {
        let (nodes, edges) = sample();
        let filters = [
            NodeFilter::default(),
            NodeFilter::new(Some("g".into()), None),
            NodeFilter::new(None, Some("work".into())),
            NodeFilter::new(Some("o".into()), Some("work".into())),
        ];
        for filter in &filters {
            let p = project(&nodes, &edges, filter);
            let kept: HashSet<&str> = p.nodes.iter().map(|n| n.id.as_str()).collect();
            assert!(p.nodes.iter().all(|n| nodes.contains(n)));
            assert!(p.links.iter().all(|e| edges.contains(e)));
            assert!(p
                .links
                .iter()
                .all(|e| kept.contains(e.source.as_str()) && kept.contains(e.target.as_str())));
        }
    }
}
