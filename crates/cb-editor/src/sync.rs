//! Board engine: the single owner of board state.
//!
//! Every change goes through `BoardEngine::apply`, and `commit` reconciles
//! the scene once after a batch of mutations, so a render pass always sees
//! the store as it was after the most recent mutation.

use cb_core::palette::ShapeTemplate;
use cb_core::{
    BoardConfig, BoardResult, Color, ElementId, GraphStore, Simulation, ViewTransform, ZoomLimits,
};
use cb_render::{Overlay, ReconcileReport, Scene, render_svg};
use kurbo::{Point, Size};

/// Alpha target held while a node is dragged in simulated positioning.
const DRAG_ALPHA_TARGET: f64 = 0.3;

/// A single change to the board.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardMutation {
    /// Create a node from a template at a screen position.
    CreateNode { template: ShapeTemplate, at: Point },
    /// Create a default text block at a screen position.
    CreateText { at: Point },
    RemoveNode { id: ElementId },
    RemoveLink { id: ElementId },
    RemoveText { id: ElementId },
    ToggleSelection { id: ElementId },
    /// Link the selected nodes, adding `invoker` first when needed.
    LinkSelection { invoker: ElementId },
    /// Fix a node at a board position.
    PinNode { id: ElementId, x: f64, y: f64 },
    ReleaseNode { id: ElementId },
    MoveControlPoint { node: ElementId, tag: u32, x: f64, y: f64 },
    RotateNode { id: ElementId, delta: f64 },
    SetNodeColor { id: ElementId, color: Color },
    /// Place a link's curve control at a board position.
    MoveLinkControl { id: ElementId, at: Point },
    ToggleLinkStyle { id: ElementId },
    ToggleArrows { id: ElementId },
    ReverseArrows { id: ElementId },
    RefreshArrowColors { id: ElementId },
    SetLinkColor { id: ElementId, color: Color },
    SetTextContent { id: ElementId, text: String },
    ResizeText { id: ElementId, width: f64, height: f64 },
    MoveText { id: ElementId, x: f64, y: f64 },
    SetFontFamily { id: ElementId, family: String },
    SetFontSize { id: ElementId, size: f64 },
    SetTextColor { id: ElementId, color: Color },
    /// Translate the view by a screen-space delta.
    Pan { dx: f64, dy: f64 },
    /// Scale the view about a screen-space anchor.
    Zoom { factor: f64, anchor: Point },
}

impl BoardMutation {
    /// Whether the mutation adds or removes graph elements.
    fn changes_topology(&self) -> bool {
        matches!(
            self,
            BoardMutation::CreateNode { .. }
                | BoardMutation::RemoveNode { .. }
                | BoardMutation::RemoveLink { .. }
                | BoardMutation::LinkSelection { .. }
        )
    }
}

/// Outcome of a batch of mutations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Commit {
    /// Ids of elements created by the batch, in creation order.
    pub created: Vec<ElementId>,
    /// Mutations rejected by the store.
    pub rejected: usize,
    pub report: ReconcileReport,
}

pub struct BoardEngine {
    pub store: GraphStore,
    pub scene: Scene,
    pub config: BoardConfig,
    view: ViewTransform,
    viewport: Size,
    limits: ZoomLimits,
    simulation: Simulation,
}

impl BoardEngine {
    pub fn new(config: BoardConfig, viewport: Size) -> Self {
        let limits = ZoomLimits::from_config(&config);
        let simulation = Simulation::new(config.positioning.clone());
        Self {
            store: GraphStore::new(),
            scene: Scene::new(&config),
            view: ViewTransform::IDENTITY.constrain(viewport, &limits),
            viewport,
            limits,
            simulation,
            config,
        }
    }

    /// Current pan/zoom. Every screen ↔ board conversion uses this.
    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
        self.view = self.view.constrain(viewport, &self.limits);
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn screen_to_board(&self, p: Point) -> Point {
        self.view.screen_to_board(p)
    }

    /// Apply one mutation to the store (or view). Does not reconcile.
    /// Returns the ids of any elements created.
    pub fn apply(&mut self, mutation: BoardMutation) -> BoardResult<Vec<ElementId>> {
        let topology = mutation.changes_topology();
        let mut created = Vec::new();
        match mutation {
            BoardMutation::CreateNode { template, at } => {
                created.push(
                    self.store
                        .create_node(&template, at, &self.view, &self.config),
                );
            }
            BoardMutation::CreateText { at } => {
                created.push(self.store.create_text(at, &self.view, &self.config));
            }
            BoardMutation::RemoveNode { id } => {
                let removed = self.store.remove_node(id)?;
                log::debug!("removed {id} and {} link(s)", removed.links.len());
            }
            BoardMutation::RemoveLink { id } => {
                self.store.remove_link(id)?;
            }
            BoardMutation::RemoveText { id } => {
                self.store.remove_text(id)?;
            }
            BoardMutation::ToggleSelection { id } => {
                self.store.toggle_selection(id)?;
            }
            BoardMutation::LinkSelection { invoker } => {
                self.store.node(invoker)?;
                if !self.store.selection().is_empty() && !self.store.is_selected(invoker) {
                    self.store.toggle_selection(invoker)?;
                }
                created = self.store.consume_selection_into_links(&self.config)?;
            }
            BoardMutation::PinNode { id, x, y } => {
                self.store.pin_node(id, x, y)?;
                if self.simulation.is_simulated() {
                    self.simulation.set_alpha_target(DRAG_ALPHA_TARGET);
                    self.simulation.reheat();
                }
            }
            BoardMutation::ReleaseNode { id } => {
                let simulated = self.simulation.is_simulated();
                self.store.release_node(id, !simulated)?;
                if simulated {
                    self.simulation.set_alpha_target(0.0);
                }
            }
            BoardMutation::MoveControlPoint { node, tag, x, y } => {
                self.store.move_control_point(node, tag, x, y)?;
            }
            BoardMutation::RotateNode { id, delta } => {
                self.store.rotate_node(id, delta)?;
            }
            BoardMutation::SetNodeColor { id, color } => self.store.set_node_color(id, color)?,
            BoardMutation::MoveLinkControl { id, at } => self.store.move_link_control(id, at)?,
            BoardMutation::ToggleLinkStyle { id } => {
                self.store.toggle_link_style(id)?;
            }
            BoardMutation::ToggleArrows { id } => {
                self.store.toggle_arrows(id)?;
            }
            BoardMutation::ReverseArrows { id } => {
                self.store.reverse_arrows(id)?;
            }
            BoardMutation::RefreshArrowColors { id } => self.store.refresh_arrow_colors(id)?,
            BoardMutation::SetLinkColor { id, color } => self.store.set_link_color(id, color)?,
            BoardMutation::SetTextContent { id, text } => self.store.set_text_content(id, &text)?,
            BoardMutation::ResizeText { id, width, height } => {
                self.store.resize_text(id, width, height)?;
                self.scene.mark_text_resized(id);
            }
            BoardMutation::MoveText { id, x, y } => self.store.move_text(id, x, y)?,
            BoardMutation::SetFontFamily { id, family } => {
                self.store.set_text_font_family(id, &family)?;
            }
            BoardMutation::SetFontSize { id, size } => {
                let size = self.config.clamp_font_size(size);
                self.store.set_text_font_size(id, size)?;
            }
            BoardMutation::SetTextColor { id, color } => self.store.set_text_color(id, color)?,
            BoardMutation::Pan { dx, dy } => {
                self.view = self.view.pan_by(dx, dy, self.viewport, &self.limits);
            }
            BoardMutation::Zoom { factor, anchor } => {
                self.view = self
                    .view
                    .zoom_about(factor, anchor, self.viewport, &self.limits);
            }
        }
        if topology && self.simulation.is_simulated() {
            self.simulation.reheat();
        }
        Ok(created)
    }

    /// Apply a batch, then reconcile the scene once. Rejected mutations
    /// are logged and skipped; the rest of the batch still applies.
    pub fn commit(&mut self, mutations: impl IntoIterator<Item = BoardMutation>) -> Commit {
        let mut commit = Commit::default();
        for mutation in mutations {
            match self.apply(mutation) {
                Ok(created) => commit.created.extend(created),
                Err(e) => {
                    log::warn!("mutation rejected: {e}");
                    commit.rejected += 1;
                }
            }
        }
        commit.report = self.scene.reconcile(&self.store);
        commit
    }

    /// Advance the positioning strategy one step. Returns whether any
    /// node moved (and the scene was reconciled).
    pub fn tick_layout(&mut self) -> bool {
        let moved = self.simulation.tick(&mut self.store);
        if moved {
            self.scene.reconcile(&self.store);
        }
        moved
    }

    pub fn render_svg(&self, overlay: &Overlay) -> String {
        render_svg(&self.scene, &self.view, self.viewport, overlay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cb_core::palette::default_templates;
    use cb_core::{BoardError, Positioning, config::ForceConfig};
    use pretty_assertions::assert_eq;

    fn engine() -> BoardEngine {
        BoardEngine::new(BoardConfig::default(), Size::new(800.0, 600.0))
    }

    fn circle_at(engine: &mut BoardEngine, x: f64, y: f64) -> ElementId {
        let commit = engine.commit([BoardMutation::CreateNode {
            template: default_templates()[0].clone(),
            at: engine.view().board_to_screen(Point::new(x, y)),
        }]);
        commit.created[0]
    }

    #[test]
    fn initial_view_is_constrained() {
        let engine = engine();
        assert_eq!(engine.view().k, 1.0);
        let visible = engine.view().visible_rect(engine.viewport());
        assert!(visible.x0 >= -10_000.0 && visible.x1 <= 10_000.0);
    }

    #[test]
    fn commit_reconciles_once_after_the_batch() {
        let mut engine = engine();
        let a = circle_at(&mut engine, 0.0, 0.0);
        let b = circle_at(&mut engine, 100.0, 0.0);
        let commit = engine.commit([
            BoardMutation::ToggleSelection { id: a },
            BoardMutation::ToggleSelection { id: b },
            BoardMutation::LinkSelection { invoker: a },
        ]);
        assert_eq!(commit.created.len(), 1);
        assert_eq!(commit.report.links.added, commit.created);
        assert_eq!(engine.scene.links().len(), 1);
        assert!(engine.store.selection().is_empty());
    }

    #[test]
    fn link_action_adds_an_unselected_invoker() {
        let mut engine = engine();
        let a = circle_at(&mut engine, 0.0, 0.0);
        let b = circle_at(&mut engine, 100.0, 0.0);
        engine.commit([BoardMutation::ToggleSelection { id: a }]);
        let commit = engine.commit([BoardMutation::LinkSelection { invoker: b }]);
        let link = engine.store.link(commit.created[0]).unwrap();
        assert_eq!((link.source, link.target), (a, b));
    }

    #[test]
    fn link_action_alone_selects_nothing() {
        let mut engine = engine();
        let a = circle_at(&mut engine, 0.0, 0.0);
        let commit = engine.commit([BoardMutation::LinkSelection { invoker: a }]);
        assert!(commit.created.is_empty());
        assert!(engine.store.selection().is_empty());
    }

    #[test]
    fn rejected_mutations_do_not_stop_the_batch() {
        let mut engine = engine();
        let a = circle_at(&mut engine, 0.0, 0.0);
        let ghost = ElementId::node();
        let commit = engine.commit([
            BoardMutation::RemoveNode { id: ghost },
            BoardMutation::SetNodeColor {
                id: a,
                color: Color::BLACK,
            },
        ]);
        assert_eq!(commit.rejected, 1);
        assert_eq!(engine.scene.node(a).unwrap().fill, Color::BLACK);
        assert_eq!(
            engine.apply(BoardMutation::RemoveNode { id: ghost }),
            Err(BoardError::NodeNotFound(ghost))
        );
    }

    #[test]
    fn font_size_is_clamped() {
        let mut engine = engine();
        let commit = engine.commit([BoardMutation::CreateText {
            at: Point::new(10.0, 10.0),
        }]);
        let id = commit.created[0];
        engine.commit([BoardMutation::SetFontSize { id, size: 99.0 }]);
        assert_eq!(engine.store.text(id).unwrap().font.size, 32.0);
    }

    #[test]
    fn zoom_and_pan_stay_clamped() {
        let mut engine = engine();
        for _ in 0..50 {
            engine.commit([BoardMutation::Zoom {
                factor: 2.0,
                anchor: Point::new(400.0, 300.0),
            }]);
        }
        assert_eq!(engine.view().k, 10.0);
        engine.commit([BoardMutation::Pan {
            dx: 1e9,
            dy: 0.0,
        }]);
        let visible = engine.view().visible_rect(engine.viewport());
        assert!(visible.x0 >= -10_000.0 - 1e-6);
    }

    #[test]
    fn manual_release_keeps_the_node_fixed() {
        let mut engine = engine();
        let a = circle_at(&mut engine, 0.0, 0.0);
        engine.commit([
            BoardMutation::PinNode { id: a, x: 40.0, y: 5.0 },
            BoardMutation::ReleaseNode { id: a },
        ]);
        let node = engine.store.node(a).unwrap();
        assert_eq!(node.position(), (40.0, 5.0));
        assert_eq!(node.pinned, Some((40.0, 5.0)));
        assert!(!engine.tick_layout());
    }

    #[test]
    fn simulated_release_hands_the_node_back() {
        let config = BoardConfig {
            positioning: Positioning::Simulated(ForceConfig::default()),
            ..BoardConfig::default()
        };
        let mut engine = BoardEngine::new(config, Size::new(800.0, 600.0));
        let a = circle_at(&mut engine, 0.0, 0.0);
        engine.commit([
            BoardMutation::PinNode { id: a, x: 40.0, y: 5.0 },
            BoardMutation::ReleaseNode { id: a },
        ]);
        let node = engine.store.node(a).unwrap();
        assert_eq!(node.pinned, None);
        assert_eq!((node.x, node.y), (40.0, 5.0));
    }
}
