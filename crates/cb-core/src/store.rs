//! The graph store: the single owner of board state.
//!
//! Shape nodes are graph vertices and links are graph edges, so a link can
//! only ever reference nodes that exist and removing a node removes every
//! link touching it. Text blocks and the selection set live alongside.

use crate::config::BoardConfig;
use crate::error::{BoardError, BoardResult};
use crate::id::ElementId;
use crate::model::*;
use crate::palette::ShapeTemplate;
use crate::transform::ViewTransform;
use kurbo::Point;
use petgraph::Direction;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableDiGraph;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    /// Nodes as vertices, links as directed edges (source → target).
    graph: StableDiGraph<ShapeNode, Link>,
    node_index: HashMap<ElementId, NodeIndex>,
    link_index: HashMap<ElementId, EdgeIndex>,
    /// Creation order, used for deterministic iteration.
    node_order: Vec<ElementId>,
    link_order: Vec<ElementId>,
    texts: Vec<TextBlock>,
    /// Nodes marked for the next link action, in click order.
    selection: Vec<ElementId>,
}

/// What a node removal took with it.
#[derive(Debug, Clone)]
pub struct RemovedNode {
    pub node: ShapeNode,
    pub links: Vec<ElementId>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Creation ────────────────────────────────────────────────────────

    /// Insert a fully built node.
    pub fn add_node(&mut self, node: ShapeNode) -> ElementId {
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.node_index.insert(id, idx);
        self.node_order.push(id);
        id
    }

    /// Create a node from a palette template dropped at a screen position.
    /// The template's points are copied so each node can be edited alone.
    pub fn create_node(
        &mut self,
        template: &ShapeTemplate,
        drop: Point,
        view: &ViewTransform,
        config: &BoardConfig,
    ) -> ElementId {
        let board = view.screen_to_board(drop);
        let mut node = ShapeNode::new(
            ElementId::node(),
            template.shape,
            template.points.clone(),
            config.colors.node,
        );
        node.start_x = drop.x;
        node.start_y = drop.y;
        node.x = board.x.floor();
        node.y = board.y.floor();
        log::debug!("create {} {} at ({}, {})", template.shape.name(), node.id, node.x, node.y);
        self.add_node(node)
    }

    /// Insert a link between two existing nodes.
    pub fn add_link(&mut self, link: Link) -> BoardResult<ElementId> {
        let source = self.index_of(link.source)?;
        let target = self.index_of(link.target)?;
        let id = link.id;
        let edge = self.graph.add_edge(source, target, link);
        self.link_index.insert(id, edge);
        self.link_order.push(id);
        Ok(id)
    }

    /// Build a link with default styling between two existing nodes.
    pub fn connect(
        &mut self,
        source: ElementId,
        target: ElementId,
        config: &BoardConfig,
    ) -> BoardResult<ElementId> {
        let (sx, sy) = self.node(source)?.position();
        let (tx, ty) = self.node(target)?.position();
        let link = Link {
            id: ElementId::link(),
            source,
            target,
            distance: (tx - sx).hypot(ty - sy),
            color: config.colors.link,
            cx: 0.0,
            cy: 0.0,
            style: LinkStyle::Bezier,
            arrows: false,
            arrows_reversed: false,
            arrow_colors: [
                self.node(source)?.color,
                config.colors.link,
                self.node(target)?.color,
            ],
        };
        self.add_link(link)
    }

    pub fn add_text(&mut self, text: TextBlock) -> ElementId {
        let id = text.id;
        self.texts.push(text);
        id
    }

    /// Create a text block with default content at a screen position.
    pub fn create_text(
        &mut self,
        drop: Point,
        view: &ViewTransform,
        config: &BoardConfig,
    ) -> ElementId {
        let board = view.screen_to_board(drop);
        let defaults = &config.text;
        let text = TextBlock {
            id: ElementId::text(),
            text: defaults.content.clone(),
            width: defaults.width,
            height: defaults.height,
            x: board.x.floor(),
            y: board.y.floor(),
            font: defaults.font.clone(),
            color: config.colors.text,
        };
        log::debug!("create text {} at ({}, {})", text.id, text.x, text.y);
        self.add_text(text)
    }

    // ─── Removal ─────────────────────────────────────────────────────────

    /// Remove a node and every link whose source or target it is.
    pub fn remove_node(&mut self, id: ElementId) -> BoardResult<RemovedNode> {
        let idx = self.index_of(id).inspect_err(|e| log::warn!("remove: {e}"))?;
        let links: Vec<ElementId> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .chain(self.graph.edges_directed(idx, Direction::Incoming))
            .map(|e| e.weight().id)
            .collect();
        for link in &links {
            self.link_index.remove(link);
        }
        self.link_order.retain(|l| !links.contains(l));
        self.selection.retain(|s| *s != id);
        self.node_index.remove(&id);
        self.node_order.retain(|n| *n != id);
        let node = self
            .graph
            .remove_node(idx)
            .ok_or(BoardError::NodeNotFound(id))?;
        log::debug!("removed node {id} and {} link(s)", links.len());
        Ok(RemovedNode { node, links })
    }

    pub fn remove_link(&mut self, id: ElementId) -> BoardResult<Link> {
        let edge = self
            .link_index
            .remove(&id)
            .ok_or(BoardError::LinkNotFound(id))
            .inspect_err(|e| log::warn!("remove: {e}"))?;
        self.link_order.retain(|l| *l != id);
        self.graph
            .remove_edge(edge)
            .ok_or(BoardError::LinkNotFound(id))
    }

    pub fn remove_text(&mut self, id: ElementId) -> BoardResult<TextBlock> {
        let pos = self
            .texts
            .iter()
            .position(|t| t.id == id)
            .ok_or(BoardError::TextNotFound(id))
            .inspect_err(|e| log::warn!("remove: {e}"))?;
        Ok(self.texts.remove(pos))
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// Flip a node's membership in the selection set.
    /// Returns whether the node is selected afterwards.
    pub fn toggle_selection(&mut self, id: ElementId) -> BoardResult<bool> {
        self.index_of(id)?;
        if let Some(pos) = self.selection.iter().position(|s| *s == id) {
            self.selection.remove(pos);
            Ok(false)
        } else {
            self.selection.push(id);
            Ok(true)
        }
    }

    pub fn is_selected(&self, id: ElementId) -> bool {
        self.selection.contains(&id)
    }

    pub fn selection(&self) -> &[ElementId] {
        &self.selection
    }

    /// Chain consecutive selected nodes with links, in selection order,
    /// then clear the selection. With fewer than two selected nodes
    /// nothing happens and the selection is kept.
    pub fn consume_selection_into_links(
        &mut self,
        config: &BoardConfig,
    ) -> BoardResult<Vec<ElementId>> {
        if self.selection.len() < 2 {
            return Ok(Vec::new());
        }
        let selected = std::mem::take(&mut self.selection);
        let mut created = Vec::with_capacity(selected.len() - 1);
        for pair in selected.windows(2) {
            created.push(self.connect(pair[0], pair[1], config)?);
        }
        log::debug!("linked {} node(s) with {} link(s)", selected.len(), created.len());
        Ok(created)
    }

    // ─── Lookup & iteration ──────────────────────────────────────────────

    fn index_of(&self, id: ElementId) -> BoardResult<NodeIndex> {
        self.node_index
            .get(&id)
            .copied()
            .ok_or(BoardError::NodeNotFound(id))
    }

    pub fn node(&self, id: ElementId) -> BoardResult<&ShapeNode> {
        let idx = self.index_of(id)?;
        Ok(&self.graph[idx])
    }

    pub fn node_mut(&mut self, id: ElementId) -> BoardResult<&mut ShapeNode> {
        let idx = self.index_of(id)?;
        Ok(&mut self.graph[idx])
    }

    pub fn link(&self, id: ElementId) -> BoardResult<&Link> {
        let edge = self.link_index.get(&id).ok_or(BoardError::LinkNotFound(id))?;
        Ok(&self.graph[*edge])
    }

    pub fn link_mut(&mut self, id: ElementId) -> BoardResult<&mut Link> {
        let edge = *self.link_index.get(&id).ok_or(BoardError::LinkNotFound(id))?;
        Ok(&mut self.graph[edge])
    }

    pub fn text(&self, id: ElementId) -> BoardResult<&TextBlock> {
        self.texts
            .iter()
            .find(|t| t.id == id)
            .ok_or(BoardError::TextNotFound(id))
    }

    pub fn text_mut(&mut self, id: ElementId) -> BoardResult<&mut TextBlock> {
        self.texts
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(BoardError::TextNotFound(id))
    }

    /// Nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &ShapeNode> {
        self.node_order
            .iter()
            .filter_map(|id| self.node_index.get(id).map(|idx| &self.graph[*idx]))
    }

    /// Links in creation order.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.link_order
            .iter()
            .filter_map(|id| self.link_index.get(id).map(|e| &self.graph[*e]))
    }

    pub fn texts(&self) -> &[TextBlock] {
        &self.texts
    }

    pub fn node_count(&self) -> usize {
        self.node_index.len()
    }

    pub fn link_count(&self) -> usize {
        self.link_index.len()
    }

    /// Number of links touching a node, in either direction.
    pub fn degree(&self, id: ElementId) -> usize {
        self.index_of(id)
            .map(|idx| {
                self.graph.edges_directed(idx, Direction::Outgoing).count()
                    + self.graph.edges_directed(idx, Direction::Incoming).count()
            })
            .unwrap_or(0)
    }

    /// Resolved endpoints of a link: (source position, target position).
    pub fn link_endpoints(&self, link: &Link) -> BoardResult<(Point, Point)> {
        let s = self.node(link.source)?.position();
        let t = self.node(link.target)?.position();
        Ok((Point::new(s.0, s.1), Point::new(t.0, t.1)))
    }

    /// Direct graph access for the layout simulation.
    pub(crate) fn graph_mut(&mut self) -> &mut StableDiGraph<ShapeNode, Link> {
        &mut self.graph
    }

    // ─── Node mutations ──────────────────────────────────────────────────

    pub fn set_node_color(&mut self, id: ElementId, color: Color) -> BoardResult<()> {
        self.node_mut(id)?.color = color;
        Ok(())
    }

    /// Fix a node at a board position (drag start / drag motion).
    pub fn pin_node(&mut self, id: ElementId, x: f64, y: f64) -> BoardResult<()> {
        self.node_mut(id)?.pinned = Some((x, y));
        Ok(())
    }

    /// End a drag: the fixed position becomes the resting position. With
    /// `keep_pinned` false the node is handed back to the layout.
    pub fn release_node(&mut self, id: ElementId, keep_pinned: bool) -> BoardResult<()> {
        let node = self.node_mut(id)?;
        if let Some((x, y)) = node.pinned {
            node.x = x;
            node.y = y;
        }
        if !keep_pinned {
            node.pinned = None;
        }
        Ok(())
    }

    pub fn move_control_point(
        &mut self,
        id: ElementId,
        tag: u32,
        x: f64,
        y: f64,
    ) -> BoardResult<()> {
        self.node_mut(id)?.move_point(tag, x, y)
    }

    pub fn rotate_node(&mut self, id: ElementId, delta: f64) -> BoardResult<f64> {
        let node = self.node_mut(id)?;
        node.rotate_by(delta);
        Ok(node.rotation)
    }

    // ─── Link mutations ──────────────────────────────────────────────────

    pub fn toggle_link_style(&mut self, id: ElementId) -> BoardResult<LinkStyle> {
        let link = self.link_mut(id)?;
        link.style = link.style.toggled();
        Ok(link.style)
    }

    pub fn toggle_arrows(&mut self, id: ElementId) -> BoardResult<bool> {
        let link = self.link_mut(id)?;
        link.arrows = !link.arrows;
        Ok(link.arrows)
    }

    pub fn reverse_arrows(&mut self, id: ElementId) -> BoardResult<bool> {
        let link = self.link_mut(id)?;
        link.arrows_reversed = !link.arrows_reversed;
        Ok(link.arrows_reversed)
    }

    /// Re-read arrow glyph colors from the current source, link and target.
    pub fn refresh_arrow_colors(&mut self, id: ElementId) -> BoardResult<()> {
        let link = self.link(id)?;
        let colors = [
            self.node(link.source)?.color,
            link.color,
            self.node(link.target)?.color,
        ];
        self.link_mut(id)?.arrow_colors = colors;
        Ok(())
    }

    pub fn set_link_color(&mut self, id: ElementId, color: Color) -> BoardResult<()> {
        self.link_mut(id)?.color = color;
        Ok(())
    }

    /// Place the curve-control handle at a board position; the stored
    /// offset is relative to the current midpoint.
    pub fn move_link_control(&mut self, id: ElementId, at: Point) -> BoardResult<()> {
        let (s, t) = self.link_endpoints(self.link(id)?)?;
        let mid = s.midpoint(t);
        let link = self.link_mut(id)?;
        link.cx = at.x - mid.x;
        link.cy = at.y - mid.y;
        Ok(())
    }

    // ─── Text mutations ──────────────────────────────────────────────────

    pub fn set_text_content(&mut self, id: ElementId, content: &str) -> BoardResult<()> {
        self.text_mut(id)?.text = content.to_string();
        Ok(())
    }

    pub fn resize_text(&mut self, id: ElementId, width: f64, height: f64) -> BoardResult<()> {
        let text = self.text_mut(id)?;
        text.width = width.max(1.0);
        text.height = height.max(1.0);
        Ok(())
    }

    pub fn move_text(&mut self, id: ElementId, x: f64, y: f64) -> BoardResult<()> {
        let text = self.text_mut(id)?;
        text.x = x;
        text.y = y;
        Ok(())
    }

    pub fn set_text_font_family(&mut self, id: ElementId, family: &str) -> BoardResult<()> {
        self.text_mut(id)?.font.family = family.to_string();
        Ok(())
    }

    pub fn set_text_font_size(&mut self, id: ElementId, size: f64) -> BoardResult<()> {
        self.text_mut(id)?.font.size = size;
        Ok(())
    }

    pub fn set_text_color(&mut self, id: ElementId, color: Color) -> BoardResult<()> {
        self.text_mut(id)?.color = color;
        Ok(())
    }
}
