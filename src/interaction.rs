//! Gesture handling on top of a layout session.
//!
//! Translates drag, zoom/pan, hover, click and reheat into simulation
//! changes, and queues the events a detail panel or renderer cares about.
//! Zoom and pan only touch the view transform, never graph coordinates.

use crate::models::GraphPayload;
use crate::simulation::{Phase, Simulation, SimulationConfig};

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 4.0;
pub const ZOOM_IN_FACTOR: f64 = 1.5;
pub const ZOOM_OUT_FACTOR: f64 = 0.67;
/// Pointer travel (screen px) before a press becomes a drag.
pub const CLICK_THRESHOLD: f64 = 4.0;

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    NodeSelected {
        id: String,
    },
    /// Hover moved onto `node` (or off every node when `None`). Collaborators
    /// may dim what is not in `neighbors`.
    HighlightIntent {
        node: Option<String>,
        neighbors: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub x: f64,
    pub y: f64,
    pub k: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, k: 1.0 }
    }
}

impl ViewTransform {
    pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
        ((sx - self.x) / self.k, (sy - self.y) / self.k)
    }

    pub fn graph_to_screen(&self, gx: f64, gy: f64) -> (f64, f64) {
        (gx * self.k + self.x, gy * self.k + self.y)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum PointerMode {
    Idle,
    Pressing { node: String, sx: f64, sy: f64 },
    Dragging { node: String },
    Panning { sx: f64, sy: f64, origin: ViewTransform },
}

pub struct InteractionController {
    sim: Simulation,
    transform: ViewTransform,
    mode: PointerMode,
    hovered: Option<String>,
    events: Vec<InteractionEvent>,
}

impl InteractionController {
    pub fn new(config: SimulationConfig) -> Self {
        Self::with_simulation(Simulation::new(config))
    }

    pub fn with_simulation(sim: Simulation) -> Self {
        Self {
            sim,
            transform: ViewTransform::default(),
            mode: PointerMode::Idle,
            hovered: None,
            events: Vec::new(),
        }
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn dragged(&self) -> Option<&str> {
        match &self.mode {
            PointerMode::Dragging { node } => Some(node.as_str()),
            _ => None,
        }
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    /// Load a new (filtered) node set. Any drag in progress is dropped.
    pub fn set_graph(&mut self, graph: &GraphPayload) {
        if let PointerMode::Dragging { .. } = self.mode {
            self.sim.set_alpha_target(0.0);
        }
        self.mode = PointerMode::Idle;
        self.sim.set_graph(graph);
        if let Some(id) = self.hovered.clone() {
            if self.sim.node(&id).is_none() {
                self.hover(None);
            }
        }
    }

    /// One animation frame: tick unless settled.
    pub fn frame(&mut self) -> Phase {
        self.sim.tick()
    }

    pub fn drain_events(&mut self) -> Vec<InteractionEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------------
    // Node gestures
    // ------------------------------------------------------------------------

    /// Pin `id` for dragging. A drag already in progress on another node is
    /// ended first; only one node is ever pinned.
    pub fn drag_start(&mut self, id: &str) -> bool {
        if self.dragged() == Some(id) {
            return true;
        }
        if self.sim.node(id).is_none() {
            return false;
        }
        if self.dragged().is_some() {
            self.drag_end();
        }
        if !self.sim.pin(id) {
            return false;
        }
        let target = self.sim.config().drag_alpha_target;
        self.sim.set_alpha_target(target);
        self.mode = PointerMode::Dragging {
            node: id.to_string(),
        };
        log::debug!("drag start {}", id);
        true
    }

    /// Move the dragged node to a graph-space point.
    pub fn drag_move(&mut self, x: f64, y: f64) -> bool {
        match &self.mode {
            PointerMode::Dragging { node } => {
                let node = node.clone();
                self.sim.move_pinned(&node, x, y)
            }
            _ => false,
        }
    }

    pub fn drag_end(&mut self) -> bool {
        let node = match std::mem::replace(&mut self.mode, PointerMode::Idle) {
            PointerMode::Dragging { node } => node,
            other => {
                self.mode = other;
                return false;
            }
        };
        self.sim.unpin(&node);
        self.sim.set_alpha_target(0.0);
        log::debug!("drag end {}", node);
        true
    }

    pub fn click(&mut self, id: &str) {
        if self.sim.node(id).is_some() {
            self.events.push(InteractionEvent::NodeSelected { id: id.to_string() });
        }
    }

    /// Emits a highlight intent only when the hovered node changes.
    pub fn hover(&mut self, id: Option<&str>) {
        let id = id.filter(|id| self.sim.node(id).is_some());
        if self.hovered.as_deref() == id {
            return;
        }
        self.hovered = id.map(str::to_string);
        let neighbors = id.map(|id| self.sim.neighbors(id)).unwrap_or_default();
        self.events.push(InteractionEvent::HighlightIntent {
            node: self.hovered.clone(),
            neighbors,
        });
    }

    pub fn reheat(&mut self) {
        self.sim.reheat();
    }

    // ------------------------------------------------------------------------
    // View
    // ------------------------------------------------------------------------

    /// Zoom by `factor` keeping the screen point under the cursor fixed.
    pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
        let k = (self.transform.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let ratio = k / self.transform.k;
        self.transform.x = sx - (sx - self.transform.x) * ratio;
        self.transform.y = sy - (sy - self.transform.y) * ratio;
        self.transform.k = k;
    }

    pub fn zoom_in(&mut self) {
        let (cx, cy) = self.sim.config().center();
        self.zoom_at(cx, cy, ZOOM_IN_FACTOR);
    }

    pub fn zoom_out(&mut self) {
        let (cx, cy) = self.sim.config().center();
        self.zoom_at(cx, cy, ZOOM_OUT_FACTOR);
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.transform.x += dx;
        self.transform.y += dy;
    }

    pub fn reset_view(&mut self) {
        self.transform = ViewTransform::default();
    }

    /// Node under a screen point, if any.
    pub fn node_at(&self, sx: f64, sy: f64) -> Option<String> {
        let (gx, gy) = self.transform.screen_to_graph(sx, sy);
        self.sim.node_at(gx, gy).map(str::to_string)
    }

    // ------------------------------------------------------------------------
    // Raw pointer input (screen coordinates)
    // ------------------------------------------------------------------------

    pub fn pointer_down(&mut self, sx: f64, sy: f64) {
        self.pointer_cancel();
        self.mode = match self.node_at(sx, sy) {
            Some(node) => PointerMode::Pressing { node, sx, sy },
            None => PointerMode::Panning {
                sx,
                sy,
                origin: self.transform,
            },
        };
    }

    pub fn pointer_move(&mut self, sx: f64, sy: f64) {
        match self.mode.clone() {
            PointerMode::Idle => {
                let hit = self.node_at(sx, sy);
                self.hover(hit.as_deref());
            }
            PointerMode::Pressing { node, sx: x0, sy: y0 } => {
                let travel = ((sx - x0).powi(2) + (sy - y0).powi(2)).sqrt();
                if travel > CLICK_THRESHOLD && self.drag_start(&node) {
                    let (gx, gy) = self.transform.screen_to_graph(sx, sy);
                    self.drag_move(gx, gy);
                }
            }
            PointerMode::Dragging { .. } => {
                let (gx, gy) = self.transform.screen_to_graph(sx, sy);
                self.drag_move(gx, gy);
            }
            PointerMode::Panning { sx: x0, sy: y0, origin } => {
                self.transform.x = origin.x + (sx - x0);
                self.transform.y = origin.y + (sy - y0);
            }
        }
    }

    pub fn pointer_up(&mut self) {
        match std::mem::replace(&mut self.mode, PointerMode::Idle) {
            PointerMode::Pressing { node, .. } => self.click(&node),
            PointerMode::Dragging { node } => {
                self.mode = PointerMode::Dragging { node };
                self.drag_end();
            }
            PointerMode::Panning { .. } | PointerMode::Idle => {}
        }
    }

    pub fn pointer_leave(&mut self) {
        self.pointer_cancel();
        self.hover(None);
    }

    fn pointer_cancel(&mut self) {
        if self.dragged().is_some() {
            self.drag_end();
        }
        self.mode = PointerMode::Idle;
    }
}
