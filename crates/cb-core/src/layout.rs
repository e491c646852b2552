//! Node positioning strategies.
//!
//! `Manual` positioning does no physics: ticks only keep pinned nodes at
//! their fixed positions. `Simulated` positioning runs a small
//! force-directed layout (link springs, many-body charge, collision) that
//! cools from `alpha = 1` towards `alpha_target`.

use crate::config::{ForceConfig, Positioning};
use crate::store::GraphStore;
use petgraph::graph::NodeIndex;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Simulation {
    positioning: Positioning,
    alpha: f64,
    alpha_target: f64,
}

/// Tiny deterministic offset used when two nodes coincide exactly.
fn jiggle(seed: usize) -> f64 {
    ((seed as f64 * 0.618_033_988_75).fract() - 0.5) * 1e-6
}

impl Simulation {
    pub fn new(positioning: Positioning) -> Self {
        Self {
            positioning,
            alpha: 1.0,
            alpha_target: 0.0,
        }
    }

    pub fn positioning(&self) -> &Positioning {
        &self.positioning
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self.positioning, Positioning::Simulated(_))
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Restart cooling (after nodes or links change).
    pub fn reheat(&mut self) {
        self.alpha = 1.0;
    }

    /// Keep the layout warm while a drag is in progress.
    pub fn set_alpha_target(&mut self, target: f64) {
        self.alpha_target = target;
    }

    pub fn is_settled(&self) -> bool {
        match &self.positioning {
            Positioning::Manual => true,
            Positioning::Simulated(force) => {
                self.alpha < force.alpha_min && self.alpha_target < force.alpha_min
            }
        }
    }

    /// Advance one step. Returns whether any node position changed.
    pub fn tick(&mut self, store: &mut GraphStore) -> bool {
        let force = match &self.positioning {
            Positioning::Manual => return settle_pinned(store),
            Positioning::Simulated(force) => force.clone(),
        };
        if self.is_settled() {
            return settle_pinned(store);
        }
        self.alpha += (self.alpha_target - self.alpha) * force.alpha_decay;
        apply_link_force(store, self.alpha);
        apply_charge(store, &force, self.alpha);
        apply_collision(store, &force);
        integrate(store, &force)
    }
}

/// Snap pinned nodes to their fixed positions.
fn settle_pinned(store: &mut GraphStore) -> bool {
    let mut moved = false;
    for node in store.graph_mut().node_weights_mut() {
        if let Some((fx, fy)) = node.pinned
            && (node.x != fx || node.y != fy)
        {
            node.x = fx;
            node.y = fy;
            moved = true;
        }
    }
    moved
}

fn apply_link_force(store: &mut GraphStore, alpha: f64) {
    let graph = store.graph_mut();
    let mut degree: HashMap<NodeIndex, f64> = HashMap::new();
    for edge in graph.edge_indices() {
        if let Some((s, t)) = graph.edge_endpoints(edge) {
            *degree.entry(s).or_default() += 1.0;
            *degree.entry(t).or_default() += 1.0;
        }
    }
    let edges: Vec<_> = graph.edge_indices().collect();
    for (i, edge) in edges.into_iter().enumerate() {
        let Some((s, t)) = graph.edge_endpoints(edge) else {
            continue;
        };
        let rest = graph[edge].distance;
        let (ds, dt) = (degree[&s], degree[&t]);
        let strength = 1.0 / ds.min(dt);
        let bias = ds / (ds + dt);

        let (src, tgt) = (&graph[s], &graph[t]);
        let mut dx = tgt.x + tgt.vx - src.x - src.vx;
        let mut dy = tgt.y + tgt.vy - src.y - src.vy;
        if dx == 0.0 {
            dx = jiggle(i);
        }
        if dy == 0.0 {
            dy = jiggle(i + 1);
        }
        let len = dx.hypot(dy);
        let l = (len - rest) / len * alpha * strength;
        dx *= l;
        dy *= l;
        graph[t].vx -= dx * bias;
        graph[t].vy -= dy * bias;
        graph[s].vx += dx * (1.0 - bias);
        graph[s].vy += dy * (1.0 - bias);
    }
}

fn positions(store: &mut GraphStore) -> Vec<(NodeIndex, f64, f64)> {
    let graph = store.graph_mut();
    graph
        .node_indices()
        .map(|idx| (idx, graph[idx].x, graph[idx].y))
        .collect()
}

fn apply_charge(store: &mut GraphStore, force: &ForceConfig, alpha: f64) {
    let snapshot = positions(store);
    let graph = store.graph_mut();
    for (i, &(a, ax, ay)) in snapshot.iter().enumerate() {
        let (mut fx, mut fy) = (0.0, 0.0);
        for (j, &(_, bx, by)) in snapshot.iter().enumerate() {
            if i == j {
                continue;
            }
            let mut dx = bx - ax;
            let mut dy = by - ay;
            if dx == 0.0 {
                dx = jiggle(i * 31 + j);
            }
            if dy == 0.0 {
                dy = jiggle(j * 31 + i);
            }
            let mut l2 = dx * dx + dy * dy;
            if l2 < 1.0 {
                l2 = l2.sqrt();
            }
            let w = force.charge * alpha / l2;
            fx += dx * w;
            fy += dy * w;
        }
        graph[a].vx += fx;
        graph[a].vy += fy;
    }
}

fn apply_collision(store: &mut GraphStore, force: &ForceConfig) {
    let graph = store.graph_mut();
    let nodes: Vec<NodeIndex> = graph.node_indices().collect();
    let min_dist = force.collide_radius * 2.0;
    for (i, &a) in nodes.iter().enumerate() {
        for &b in &nodes[i + 1..] {
            let (na, nb) = (&graph[a], &graph[b]);
            let mut dx = (na.x + na.vx) - (nb.x + nb.vx);
            let mut dy = (na.y + na.vy) - (nb.y + nb.vy);
            if dx == 0.0 {
                dx = jiggle(i);
            }
            if dy == 0.0 {
                dy = jiggle(i + 7);
            }
            let len = dx.hypot(dy);
            if len >= min_dist {
                continue;
            }
            let l = (min_dist - len) / len * 0.5;
            graph[a].vx += dx * l;
            graph[a].vy += dy * l;
            graph[b].vx -= dx * l;
            graph[b].vy -= dy * l;
        }
    }
}

fn integrate(store: &mut GraphStore, force: &ForceConfig) -> bool {
    let mut moved = false;
    for node in store.graph_mut().node_weights_mut() {
        if let Some((fx, fy)) = node.pinned {
            moved |= node.x != fx || node.y != fy;
            node.x = fx;
            node.y = fy;
            node.vx = 0.0;
            node.vy = 0.0;
            continue;
        }
        node.vx *= 1.0 - force.velocity_decay;
        node.vy *= 1.0 - force.velocity_decay;
        if node.vx != 0.0 || node.vy != 0.0 {
            node.x += node.vx;
            node.y += node.vy;
            moved = true;
        }
    }
    moved
}
