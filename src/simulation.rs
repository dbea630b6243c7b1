//! Force-directed layout session.
//!
//! A `Simulation` owns the transient per-node state (position, velocity,
//! pinned flag) for one mount of the graph view. It is stepped one tick per
//! animation frame by its owner and never shares node state with another
//! session.
//!
//! Each tick applies, in order: alpha decay, link springs, many-body
//! repulsion, centering, velocity decay + integration, then a collision pass
//! that separates overlapping nodes. The session settles once alpha drops
//! below `alpha_min`; it is never stopped by a tick count.

use crate::models::GraphPayload;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    pub width: f64,
    pub height: f64,
    pub alpha_min: f64,
    pub alpha_decay: f64,
    /// Alpha target held while a node is dragged.
    pub drag_alpha_target: f64,
    pub velocity_decay: f64,
    /// Rest length for a strength-1.0 edge; weaker edges rest further apart.
    pub link_distance: f64,
    pub link_stiffness: f64,
    /// Negative repels.
    pub charge_strength: f64,
    pub charge_distance_min: f64,
    pub center_strength: f64,
    pub collide_margin: f64,
    pub collide_strength: f64,
    /// Radius of the seeding disc around the canvas center.
    pub seed_jitter: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let alpha_min = 0.001;
        Self {
            width: crate::CANVAS_WIDTH,
            height: crate::CANVAS_HEIGHT,
            alpha_min,
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            drag_alpha_target: 0.3,
            velocity_decay: 0.4,
            link_distance: 100.0,
            link_stiffness: 0.5,
            charge_strength: -300.0,
            charge_distance_min: 1.0,
            center_strength: 0.1,
            collide_margin: 5.0,
            collide_strength: 1.0,
            seed_jitter: 10.0,
        }
    }
}

impl SimulationConfig {
    pub fn with_canvas(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }
}

// ============================================================================
// Session State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Loaded but not ticked yet.
    Cold,
    Warm,
    Settled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeState {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub radius: f64,
    pub pinned: bool,
}

#[derive(Debug, Clone)]
struct LinkState {
    source: usize,
    target: usize,
    distance: f64,
    stiffness: f64,
    /// Share of the correction taken by the target.
    bias: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodePosition {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub pinned: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutSnapshot {
    pub alpha: f64,
    pub phase: Phase,
    pub nodes: Vec<NodePosition>,
}

#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimulationConfig,
    nodes: Vec<NodeState>,
    index: HashMap<String, usize>,
    links: Vec<LinkState>,
    alpha: f64,
    alpha_target: f64,
    phase: Phase,
    ticks: u64,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            nodes: Vec::new(),
            index: HashMap::new(),
            links: Vec::new(),
            alpha: 1.0,
            alpha_target: 0.0,
            phase: Phase::Cold,
            ticks: 0,
        }
    }

    pub fn with_graph(config: SimulationConfig, graph: &GraphPayload) -> Self {
        let mut sim = Self::new(config);
        sim.set_graph(graph);
        sim
    }

    /// Replace the node/edge set.
    ///
    /// Nodes seen before keep their position and velocity; new nodes are
    /// seeded near the canvas center. Pins do not survive a reload. The
    /// session is reheated unless it has never ticked.
    pub fn set_graph(&mut self, graph: &GraphPayload) {
        let (cx, cy) = self.config.center();
        let mut previous: HashMap<String, NodeState> = self
            .nodes
            .drain(..)
            .map(|n| (n.id.clone(), n))
            .collect();

        self.index.clear();
        for node in &graph.nodes {
            if self.index.contains_key(&node.id) {
                continue;
            }
            let radius = node.size + self.config.collide_margin;
            let state = match previous.remove(&node.id) {
                Some(prior) => NodeState {
                    radius,
                    pinned: false,
                    ..prior
                },
                None => {
                    let (jx, jy) = seed_offset(&node.id, self.config.seed_jitter);
                    NodeState {
                        id: node.id.clone(),
                        x: cx + jx,
                        y: cy + jy,
                        vx: 0.0,
                        vy: 0.0,
                        radius,
                        pinned: false,
                    }
                }
            };
            self.index.insert(node.id.clone(), self.nodes.len());
            self.nodes.push(state);
        }

        let mut links = Vec::with_capacity(graph.links.len());
        for edge in &graph.links {
            let (source, target) =
                match (self.index.get(&edge.source), self.index.get(&edge.target)) {
                    (Some(&s), Some(&t)) if s != t => (s, t),
                    _ => {
                        log::debug!("simulation ignoring edge {} - {}", edge.source, edge.target);
                        continue;
                    }
                };
            let strength = if edge.strength > 0.0 { edge.strength } else { 1.0 };
            links.push(LinkState {
                source,
                target,
                distance: self.config.link_distance / strength,
                stiffness: strength * self.config.link_stiffness,
                bias: 0.0,
            });
        }

        let mut degree = vec![0usize; self.nodes.len()];
        for link in &links {
            degree[link.source] += 1;
            degree[link.target] += 1;
        }
        for link in &mut links {
            let s = degree[link.source] as f64;
            let t = degree[link.target] as f64;
            link.bias = s / (s + t);
        }
        self.links = links;

        self.alpha = 1.0;
        if self.phase != Phase::Cold {
            self.phase = Phase::Warm;
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn alpha_target(&self) -> f64 {
        self.alpha_target
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_settled(&self) -> bool {
        self.phase == Phase::Settled
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn nodes(&self) -> &[NodeState] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&NodeState> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn position(&self, id: &str) -> Option<(f64, f64)> {
        self.node(id).map(|n| (n.x, n.y))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids joined to `id` by an edge, in edge order.
    pub fn neighbors(&self, id: &str) -> Vec<String> {
        let Some(&i) = self.index.get(id) else {
            return Vec::new();
        };
        let mut out: Vec<String> = Vec::new();
        for link in &self.links {
            let other = if link.source == i {
                link.target
            } else if link.target == i {
                link.source
            } else {
                continue;
            };
            let other_id = &self.nodes[other].id;
            if !out.contains(other_id) {
                out.push(other_id.clone());
            }
        }
        out
    }

    /// Topmost node whose disc contains the graph-space point.
    pub fn node_at(&self, x: f64, y: f64) -> Option<&str> {
        self.nodes
            .iter()
            .rev()
            .find(|n| {
                let (dx, dy) = (n.x - x, n.y - y);
                dx * dx + dy * dy <= n.radius * n.radius
            })
            .map(|n| n.id.as_str())
    }

    pub fn kinetic_energy(&self) -> f64 {
        self.nodes
            .iter()
            .map(|n| 0.5 * (n.vx * n.vx + n.vy * n.vy))
            .sum()
    }

    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            alpha: self.alpha,
            phase: self.phase,
            nodes: self
                .nodes
                .iter()
                .map(|n| NodePosition {
                    id: n.id.clone(),
                    x: n.x,
                    y: n.y,
                    pinned: n.pinned,
                })
                .collect(),
        }
    }

    // ------------------------------------------------------------------------
    // Heat control
    // ------------------------------------------------------------------------

    /// Reset alpha to its maximum without touching positions.
    pub fn reheat(&mut self) {
        self.alpha = 1.0;
        self.phase = Phase::Warm;
    }

    pub fn set_alpha_target(&mut self, target: f64) {
        self.alpha_target = target.clamp(0.0, 1.0);
        if self.alpha_target >= self.config.alpha_min && self.phase == Phase::Settled {
            self.phase = Phase::Warm;
        }
    }

    // ------------------------------------------------------------------------
    // Pinning
    // ------------------------------------------------------------------------

    pub fn pin(&mut self, id: &str) -> bool {
        match self.index.get(id) {
            Some(&i) => {
                let node = &mut self.nodes[i];
                node.pinned = true;
                node.vx = 0.0;
                node.vy = 0.0;
                true
            }
            None => false,
        }
    }

    /// Place a pinned node. Unpinned nodes are left to the forces.
    pub fn move_pinned(&mut self, id: &str, x: f64, y: f64) -> bool {
        match self.index.get(id) {
            Some(&i) if self.nodes[i].pinned => {
                let node = &mut self.nodes[i];
                node.x = x;
                node.y = y;
                true
            }
            _ => false,
        }
    }

    pub fn unpin(&mut self, id: &str) -> bool {
        match self.index.get(id) {
            Some(&i) => {
                let was = self.nodes[i].pinned;
                self.nodes[i].pinned = false;
                was
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------------
    // Stepping
    // ------------------------------------------------------------------------

    /// Advance one tick. A settled session does not move.
    pub fn tick(&mut self) -> Phase {
        if self.phase == Phase::Settled {
            return self.phase;
        }
        self.phase = Phase::Warm;
        self.ticks += 1;

        self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;

        self.apply_links();
        self.apply_charge();
        self.apply_centering();
        self.integrate();
        self.resolve_collisions();

        if self.alpha < self.config.alpha_min && self.alpha_target < self.config.alpha_min {
            self.phase = Phase::Settled;
        }
        self.phase
    }

    /// Tick until settled and return the number of ticks taken. Ends only on
    /// the energy threshold, so a held alpha target keeps it running.
    pub fn settle(&mut self) -> u64 {
        let start = self.ticks;
        while self.tick() != Phase::Settled {}
        self.ticks - start
    }

    fn apply_links(&mut self) {
        let alpha = self.alpha;
        for (k, link) in self.links.iter().enumerate() {
            let (s, t) = (&self.nodes[link.source], &self.nodes[link.target]);
            let mut x = t.x + t.vx - s.x - s.vx;
            let mut y = t.y + t.vy - s.y - s.vy;
            if x == 0.0 && y == 0.0 {
                (x, y) = tiny_offset(k);
            }
            let len = (x * x + y * y).sqrt();
            let l = (len - link.distance) / len * alpha * link.stiffness;
            x *= l;
            y *= l;

            let b = link.bias;
            let target = &mut self.nodes[link.target];
            target.vx -= x * b;
            target.vy -= y * b;
            let source = &mut self.nodes[link.source];
            source.vx += x * (1.0 - b);
            source.vy += y * (1.0 - b);
        }
    }

    fn apply_charge(&mut self) {
        let n = self.nodes.len();
        let strength = self.config.charge_strength * self.alpha;
        let min_sq = self.config.charge_distance_min * self.config.charge_distance_min;

        for i in 0..n {
            for j in (i + 1)..n {
                let mut x = self.nodes[j].x - self.nodes[i].x;
                let mut y = self.nodes[j].y - self.nodes[i].y;
                if x == 0.0 && y == 0.0 {
                    (x, y) = tiny_offset(i * n + j);
                }
                let l = (x * x + y * y).max(min_sq);
                let w = strength / l;

                self.nodes[i].vx += x * w;
                self.nodes[i].vy += y * w;
                self.nodes[j].vx -= x * w;
                self.nodes[j].vy -= y * w;
            }
        }
    }

    fn apply_centering(&mut self) {
        if self.nodes.is_empty() {
            return;
        }
        let (cx, cy) = self.config.center();
        let count = self.nodes.len() as f64;
        let (sx, sy) = self
            .nodes
            .iter()
            .fold((0.0, 0.0), |(sx, sy), n| (sx + n.x, sy + n.y));
        let dx = (cx - sx / count) * self.config.center_strength;
        let dy = (cy - sy / count) * self.config.center_strength;

        for node in self.nodes.iter_mut().filter(|n| !n.pinned) {
            node.x += dx;
            node.y += dy;
        }
    }

    fn integrate(&mut self) {
        let keep = 1.0 - self.config.velocity_decay;
        for node in &mut self.nodes {
            if node.pinned {
                node.vx = 0.0;
                node.vy = 0.0;
                continue;
            }
            node.vx *= keep;
            node.vy *= keep;
            node.x += node.vx;
            node.y += node.vy;
        }
    }

    fn resolve_collisions(&mut self) {
        let n = self.nodes.len();
        let strength = self.config.collide_strength;

        for i in 0..n {
            for j in (i + 1)..n {
                let (a, b) = (&self.nodes[i], &self.nodes[j]);
                let min = a.radius + b.radius;
                let mut x = b.x - a.x;
                let mut y = b.y - a.y;
                if x == 0.0 && y == 0.0 {
                    (x, y) = tiny_offset(i * n + j);
                }
                let dist = (x * x + y * y).sqrt();
                if dist >= min {
                    continue;
                }

                let push = (min - dist) * strength / dist;
                let (share_a, share_b) = match (a.pinned, b.pinned) {
                    (true, true) => continue,
                    (true, false) => (0.0, 1.0),
                    (false, true) => (1.0, 0.0),
                    (false, false) => (0.5, 0.5),
                };

                let a = &mut self.nodes[i];
                a.x -= x * push * share_a;
                a.y -= y * push * share_a;
                let b = &mut self.nodes[j];
                b.x += x * push * share_b;
                b.y += y * push * share_b;
            }
        }
    }
}

// ============================================================================
// Seeding
// ============================================================================

/// Deterministic offset within a disc of radius `jitter`, keyed by node id.
fn seed_offset(id: &str, jitter: f64) -> (f64, f64) {
    let digest = Sha256::digest(id.as_bytes());
    let a = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    let r = u32::from_be_bytes([digest[4], digest[5], digest[6], digest[7]]);
    let angle = a as f64 / u32::MAX as f64 * std::f64::consts::TAU;
    let radius = jitter * (0.25 + 0.75 * (r as f64 / u32::MAX as f64));
    (angle.cos() * radius, angle.sin() * radius)
}

/// Direction for coincident points, so they separate reproducibly.
fn tiny_offset(k: usize) -> (f64, f64) {
    let angle = (k as f64 * 2.399_963) % std::f64::consts::TAU;
    (angle.cos() * 1e-6, angle.sin() * 1e-6)
}

#[cfg(test)]
#[path = "simulation_test.rs"]
mod simulation_test;
