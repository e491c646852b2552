//! Retained scene: a projection of the graph store that survives across
//! render passes.
//!
//! `Scene::reconcile` diffs the store against the current visuals keyed by
//! element id: persisting elements are updated in place (keeping their
//! mount number and transient state such as an open text editor), missing
//! ones are removed, and new ones are constructed.

use cb_core::geometry::{path_data, rotation_handles, shape_outline, shape_path};
use cb_core::{BoardConfig, Color, ElementId, GraphStore, Link, LinkStyle, ShapeNode, TextBlock};
use kurbo::{
    BezPath, Line, ParamCurve, ParamCurveArclen, ParamCurveDeriv, Point, QuadBez, Size, Vec2,
};
use serde::Serialize;
use std::collections::HashMap;

const ARCLEN_ACCURACY: f64 = 1e-3;

/// Fractions of the path length where arrow glyphs sit.
pub const ARROW_OFFSETS: [f64; 3] = [0.25, 0.5, 0.75];

// ─── Visuals ─────────────────────────────────────────────────────────────

/// Drag handle for one control point, in the node's local (rotated) frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Handle {
    pub tag: u32,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeVisual {
    pub id: ElementId,
    /// Sequence number assigned when the visual was constructed.
    pub mount: u64,
    pub x: f64,
    pub y: f64,
    pub rotation: f64,
    /// SVG path data; `None` when the shape geometry is invalid.
    pub path: Option<String>,
    #[serde(skip)]
    pub outline: Option<BezPath>,
    pub fill: Color,
    pub selected: bool,
    pub handles: Vec<Handle>,
    pub rotate_handles: Option<(Point, Point)>,
}

impl NodeVisual {
    fn update(&mut self, node: &ShapeNode, selected: bool) {
        let (x, y) = node.position();
        self.x = x;
        self.y = y;
        self.rotation = node.rotation;
        self.fill = node.color;
        self.selected = selected;
        match shape_path(node.shape, node.points()) {
            Ok(cmds) => {
                self.path = Some(path_data(&cmds));
                self.outline = shape_outline(node.shape, node.points()).ok();
            }
            Err(e) => {
                log::error!("skipping outline of {}: {e}", node.id);
                self.path = None;
                self.outline = None;
            }
        }
        self.handles = node
            .points()
            .iter()
            .map(|p| Handle {
                tag: p.tag,
                x: p.x,
                y: p.y,
            })
            .collect();
        self.rotate_handles = rotation_handles(node.points());
    }
}

/// Where a link's path runs, for glyph placement and hit testing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkGeometry {
    Curve(QuadBez),
    Polyline(Line, Line),
}

impl LinkGeometry {
    pub fn length(&self) -> f64 {
        match self {
            LinkGeometry::Curve(q) => q.arclen(ARCLEN_ACCURACY),
            LinkGeometry::Polyline(a, b) => a.arclen(ARCLEN_ACCURACY) + b.arclen(ARCLEN_ACCURACY),
        }
    }

    /// Point and tangent at a fraction of the path length.
    pub fn at_fraction(&self, fraction: f64) -> (Point, Vec2) {
        let total = self.length();
        let target = total * fraction.clamp(0.0, 1.0);
        match self {
            LinkGeometry::Curve(q) => {
                let t = if total > f64::EPSILON {
                    q.inv_arclen(target, ARCLEN_ACCURACY)
                } else {
                    0.0
                };
                (q.eval(t), q.deriv().eval(t).to_vec2())
            }
            LinkGeometry::Polyline(a, b) => {
                let first = a.arclen(ARCLEN_ACCURACY);
                let (seg, len, along) = if target <= first {
                    (a, first, target)
                } else {
                    (b, total - first, target - first)
                };
                let t = if len > f64::EPSILON { along / len } else { 0.0 };
                (seg.eval(t), seg.p1 - seg.p0)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArrowGlyph {
    pub offset: f64,
    pub at: Point,
    /// Path tangent in degrees, source to target. Direction is carried by
    /// the link's glyph alone.
    pub angle: f64,
    pub color: Color,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkVisual {
    pub id: ElementId,
    pub mount: u64,
    pub source: ElementId,
    pub target: ElementId,
    pub style: LinkStyle,
    pub d: String,
    #[serde(skip)]
    pub geometry: LinkGeometry,
    /// Curve-control circle center.
    pub control: Point,
    pub color: Color,
    pub arrows_visible: bool,
    pub glyph: char,
    pub arrows: [ArrowGlyph; 3],
}

fn link_geometry(link: &Link, s: Point, t: Point) -> (LinkGeometry, Point, String) {
    let offset = Vec2::new(link.cx, link.cy);
    let mid = s.midpoint(t);
    let control = mid + offset;
    match link.style {
        LinkStyle::Bezier => {
            let q = mid + offset * 2.0;
            let d = format!("M{},{} Q{},{} {},{}", s.x, s.y, q.x, q.y, t.x, t.y);
            (LinkGeometry::Curve(QuadBez::new(s, q, t)), control, d)
        }
        LinkStyle::Line => {
            let d = format!(
                "M{},{} L{},{} L{},{}",
                s.x, s.y, control.x, control.y, t.x, t.y
            );
            (
                LinkGeometry::Polyline(Line::new(s, control), Line::new(control, t)),
                control,
                d,
            )
        }
    }
}

impl LinkVisual {
    fn update(&mut self, link: &Link, s: Point, t: Point) {
        let (geometry, control, d) = link_geometry(link, s, t);
        self.source = link.source;
        self.target = link.target;
        self.style = link.style;
        self.geometry = geometry;
        self.control = control;
        self.d = d;
        self.color = link.color;
        self.arrows_visible = link.arrows;
        self.glyph = if link.arrows_reversed { '\u{2190}' } else { '\u{2192}' };
        for (i, glyph) in self.arrows.iter_mut().enumerate() {
            let (at, tangent) = geometry.at_fraction(ARROW_OFFSETS[i]);
            *glyph = ArrowGlyph {
                offset: ARROW_OFFSETS[i],
                at,
                angle: tangent.y.atan2(tangent.x).to_degrees(),
                color: link.arrow_colors[i],
            };
        }
    }
}

/// Static text or an open editor with an uncommitted draft.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum TextMode {
    Static,
    Editing { draft: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct TextVisual {
    pub id: ElementId,
    pub mount: u64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub text: String,
    pub font_css: String,
    pub color: Color,
    pub mode: TextMode,
    /// Set once the edit box has been resized; widens the box margin.
    pub resized: bool,
}

impl TextVisual {
    const MARGIN: f64 = 20.0;
    const RESIZED_MARGIN: f64 = 50.0;

    fn update(&mut self, text: &TextBlock) {
        self.x = text.x;
        self.y = text.y;
        self.width = text.width;
        self.height = text.height;
        self.text = text.text.clone();
        self.font_css = text.font.css();
        self.color = text.color;
    }

    /// Size of the box hosting the text or its editor.
    pub fn box_size(&self) -> Size {
        let margin = if self.resized {
            Self::RESIZED_MARGIN
        } else {
            Self::MARGIN
        };
        Size::new(self.width + margin, self.height + margin)
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, TextMode::Editing { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GridVisual {
    pub size: f64,
    pub color: Color,
    pub hidden: bool,
    pub half_width: f64,
    pub half_height: f64,
}

impl GridVisual {
    /// Board-space rectangle the grid covers.
    pub fn bounds(&self) -> kurbo::Rect {
        kurbo::Rect::new(
            -self.half_width,
            -self.half_height,
            self.half_width,
            self.half_height,
        )
    }
}

// ─── Reconcile ───────────────────────────────────────────────────────────

/// Ids touched by one reconcile pass, per outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KindReport {
    pub added: Vec<ElementId>,
    pub updated: Vec<ElementId>,
    pub removed: Vec<ElementId>,
}

impl KindReport {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    pub nodes: KindReport,
    pub links: KindReport,
    pub texts: KindReport,
}

trait Keyed {
    fn key(&self) -> ElementId;
}

impl Keyed for NodeVisual {
    fn key(&self) -> ElementId {
        self.id
    }
}

impl Keyed for LinkVisual {
    fn key(&self) -> ElementId {
        self.id
    }
}

impl Keyed for TextVisual {
    fn key(&self) -> ElementId {
        self.id
    }
}

/// Keyed diff of `visuals` against `sources`. The resulting order follows
/// `sources`.
fn reconcile_keyed<T: Keyed, S>(
    visuals: &mut Vec<T>,
    sources: impl Iterator<Item = (ElementId, S)>,
    mut create: impl FnMut(S) -> T,
    mut update: impl FnMut(&mut T, S),
) -> KindReport {
    let mut existing: HashMap<ElementId, T> = visuals.drain(..).map(|v| (v.key(), v)).collect();
    let mut report = KindReport::default();
    for (id, source) in sources {
        match existing.remove(&id) {
            Some(mut visual) => {
                update(&mut visual, source);
                report.updated.push(id);
                visuals.push(visual);
            }
            None => {
                visuals.push(create(source));
                report.added.push(id);
            }
        }
    }
    report.removed = existing.into_keys().collect();
    report
        .removed
        .sort_by(|a, b| a.as_str().cmp(b.as_str()));
    report
}

/// The retained scene graph.
#[derive(Debug, Clone)]
pub struct Scene {
    nodes: Vec<NodeVisual>,
    links: Vec<LinkVisual>,
    texts: Vec<TextVisual>,
    pub grid: GridVisual,
    pub handle_radius: f64,
    pub link_control_radius: f64,
    pub link_stroke_width: f64,
    pub arrow_font_size: f64,
    next_mount: u64,
}

impl Scene {
    pub fn new(config: &BoardConfig) -> Self {
        Self {
            nodes: Vec::new(),
            links: Vec::new(),
            texts: Vec::new(),
            grid: GridVisual {
                size: config.grid.size,
                color: config.grid.color,
                hidden: config.grid.hidden,
                half_width: config.extent_width,
                half_height: config.extent_height,
            },
            handle_radius: config.handle_radius,
            link_control_radius: config.link_control_radius,
            link_stroke_width: config.link_stroke_width,
            arrow_font_size: config.arrow_font_size,
            next_mount: 0,
        }
    }

    pub fn nodes(&self) -> &[NodeVisual] {
        &self.nodes
    }

    pub fn links(&self) -> &[LinkVisual] {
        &self.links
    }

    pub fn texts(&self) -> &[TextVisual] {
        &self.texts
    }

    pub fn node(&self, id: ElementId) -> Option<&NodeVisual> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn link(&self, id: ElementId) -> Option<&LinkVisual> {
        self.links.iter().find(|l| l.id == id)
    }

    pub fn text(&self, id: ElementId) -> Option<&TextVisual> {
        self.texts.iter().find(|t| t.id == id)
    }

    fn text_mut(&mut self, id: ElementId) -> Option<&mut TextVisual> {
        self.texts.iter_mut().find(|t| t.id == id)
    }

    /// Flip grid visibility. Returns the new hidden state.
    pub fn toggle_grid(&mut self) -> bool {
        self.grid.hidden = !self.grid.hidden;
        self.grid.hidden
    }

    fn mount(next: &mut u64) -> u64 {
        let m = *next;
        *next += 1;
        m
    }

    /// Bring the scene in line with the store.
    pub fn reconcile(&mut self, store: &GraphStore) -> ReconcileReport {
        let next = &mut self.next_mount;

        let nodes = reconcile_keyed(
            &mut self.nodes,
            store.nodes().map(|n| (n.id, n)),
            |node| {
                let mut visual = NodeVisual {
                    id: node.id,
                    mount: Self::mount(next),
                    x: 0.0,
                    y: 0.0,
                    rotation: 0.0,
                    path: None,
                    outline: None,
                    fill: node.color,
                    selected: false,
                    handles: Vec::new(),
                    rotate_handles: None,
                };
                visual.update(node, store.is_selected(node.id));
                visual
            },
            |visual, node| visual.update(node, store.is_selected(node.id)),
        );

        let endpoints = |link: &Link| match store.link_endpoints(link) {
            Ok(ends) => Some(ends),
            Err(e) => {
                log::error!("link {} has a dangling endpoint: {e}", link.id);
                None
            }
        };
        let links = reconcile_keyed(
            &mut self.links,
            store
                .links()
                .filter_map(|l| endpoints(l).map(|(s, t)| (l.id, (l, s, t)))),
            |(link, s, t)| {
                let (geometry, control, d) = link_geometry(link, s, t);
                let mut visual = LinkVisual {
                    id: link.id,
                    mount: Self::mount(next),
                    source: link.source,
                    target: link.target,
                    style: link.style,
                    d,
                    geometry,
                    control,
                    color: link.color,
                    arrows_visible: false,
                    glyph: '\u{2192}',
                    arrows: [ArrowGlyph {
                        offset: 0.0,
                        at: Point::ZERO,
                        angle: 0.0,
                        color: link.color,
                    }; 3],
                };
                visual.update(link, s, t);
                visual
            },
            |visual, (link, s, t)| visual.update(link, s, t),
        );

        let texts = reconcile_keyed(
            &mut self.texts,
            store.texts().iter().map(|t| (t.id, t)),
            |text| {
                let mut visual = TextVisual {
                    id: text.id,
                    mount: Self::mount(next),
                    x: 0.0,
                    y: 0.0,
                    width: 0.0,
                    height: 0.0,
                    text: String::new(),
                    font_css: String::new(),
                    color: text.color,
                    mode: TextMode::Static,
                    resized: false,
                };
                visual.update(text);
                visual
            },
            |visual, text| visual.update(text),
        );

        let report = ReconcileReport {
            nodes,
            links,
            texts,
        };
        log::trace!(
            "reconcile: nodes +{} -{}, links +{} -{}, texts +{} -{}",
            report.nodes.added.len(),
            report.nodes.removed.len(),
            report.links.added.len(),
            report.links.removed.len(),
            report.texts.added.len(),
            report.texts.removed.len()
        );
        report
    }

    // ─── Text editing (transient visual state) ───────────────────────────

    /// Swap static text for an editor pre-filled with the current content.
    pub fn begin_text_edit(&mut self, id: ElementId) -> bool {
        match self.text_mut(id) {
            Some(visual) => {
                if !visual.is_editing() {
                    visual.mode = TextMode::Editing {
                        draft: visual.text.clone(),
                    };
                }
                true
            }
            None => false,
        }
    }

    pub fn update_text_draft(&mut self, id: ElementId, value: &str) -> bool {
        match self.text_mut(id).map(|v| &mut v.mode) {
            Some(TextMode::Editing { draft }) => {
                *draft = value.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn mark_text_resized(&mut self, id: ElementId) {
        if let Some(visual) = self.text_mut(id) {
            visual.resized = true;
        }
    }

    /// Close the editor and hand back the draft to commit.
    pub fn end_text_edit(&mut self, id: ElementId) -> Option<String> {
        let visual = self.text_mut(id)?;
        match std::mem::replace(&mut visual.mode, TextMode::Static) {
            TextMode::Editing { draft } => Some(draft),
            TextMode::Static => None,
        }
    }

    /// The text block currently being edited, if any.
    pub fn editing_text(&self) -> Option<ElementId> {
        self.texts.iter().find(|t| t.is_editing()).map(|t| t.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cb_core::palette::default_templates;
    use cb_core::{ShapeKind, ViewTransform};
    use pretty_assertions::assert_eq;

    fn board() -> (GraphStore, BoardConfig) {
        (GraphStore::new(), BoardConfig::default())
    }

    fn drop_node(store: &mut GraphStore, config: &BoardConfig, index: usize, x: f64) -> ElementId {
        store.create_node(
            &default_templates()[index],
            Point::new(x, 0.0),
            &ViewTransform::IDENTITY,
            config,
        )
    }

    #[test]
    fn persisting_visuals_keep_their_mount() {
        let (mut store, config) = board();
        let mut scene = Scene::new(&config);
        let a = drop_node(&mut store, &config, 0, 0.0);
        let report = scene.reconcile(&store);
        assert_eq!(report.nodes.added, vec![a]);
        let mount = scene.node(a).unwrap().mount;

        let b = drop_node(&mut store, &config, 1, 100.0);
        store.set_node_color(a, Color::rgb(1, 2, 3)).unwrap();
        let report = scene.reconcile(&store);
        assert_eq!(report.nodes.added, vec![b]);
        assert_eq!(report.nodes.updated, vec![a]);
        let visual = scene.node(a).unwrap();
        assert_eq!(visual.mount, mount);
        assert_eq!(visual.fill, Color::rgb(1, 2, 3));
    }

    #[test]
    fn removed_elements_leave_the_scene() {
        let (mut store, config) = board();
        let mut scene = Scene::new(&config);
        let a = drop_node(&mut store, &config, 0, 0.0);
        let b = drop_node(&mut store, &config, 0, 100.0);
        let link = store.connect(a, b, &config).unwrap();
        scene.reconcile(&store);
        assert_eq!(scene.links().len(), 1);

        store.remove_node(a).unwrap();
        let report = scene.reconcile(&store);
        assert_eq!(report.nodes.removed, vec![a]);
        assert_eq!(report.links.removed, vec![link]);
        assert!(scene.node(a).is_none());
        assert!(scene.links().is_empty());
    }

    #[test]
    fn node_visual_projects_shape_and_handles() {
        let (mut store, config) = board();
        let mut scene = Scene::new(&config);
        let id = drop_node(&mut store, &config, 1, 40.0);
        store.rotate_node(id, 15.0).unwrap();
        scene.reconcile(&store);
        let visual = scene.node(id).unwrap();
        assert_eq!((visual.x, visual.y), (40.0, 0.0));
        assert_eq!(visual.rotation, 15.0);
        assert_eq!(
            visual.path.as_deref(),
            Some("M -30,-20 L 30,-20 L 30,20 L -30,20 Z")
        );
        assert_eq!(visual.handles.len(), 4);
        assert_eq!(
            visual.rotate_handles,
            Some((Point::new(0.0, -20.0), Point::new(0.0, 20.0)))
        );
    }

    #[test]
    fn invalid_geometry_skips_the_outline_only() {
        let (mut store, config) = board();
        let mut scene = Scene::new(&config);
        let broken = store.add_node(ShapeNode::new(
            ElementId::node(),
            ShapeKind::Circle,
            Default::default(),
            Color::LIGHT_BLUE,
        ));
        let fine = drop_node(&mut store, &config, 0, 0.0);
        scene.reconcile(&store);
        assert!(scene.node(broken).unwrap().path.is_none());
        assert!(scene.node(fine).unwrap().path.is_some());
    }

    #[test]
    fn selection_highlight_follows_membership() {
        let (mut store, config) = board();
        let mut scene = Scene::new(&config);
        let id = drop_node(&mut store, &config, 0, 0.0);
        store.toggle_selection(id).unwrap();
        scene.reconcile(&store);
        assert!(scene.node(id).unwrap().selected);
        store.toggle_selection(id).unwrap();
        scene.reconcile(&store);
        assert!(!scene.node(id).unwrap().selected);
    }

    #[test]
    fn curved_and_straight_link_paths() {
        let (mut store, config) = board();
        let mut scene = Scene::new(&config);
        let a = drop_node(&mut store, &config, 0, 0.0);
        let b = drop_node(&mut store, &config, 0, 100.0);
        let link = store.connect(a, b, &config).unwrap();
        store.move_link_control(link, Point::new(50.0, 10.0)).unwrap();

        scene.reconcile(&store);
        let visual = scene.link(link).unwrap();
        assert_eq!(visual.d, "M0,0 Q50,20 100,0");
        assert_eq!(visual.control, Point::new(50.0, 10.0));

        store.toggle_link_style(link).unwrap();
        scene.reconcile(&store);
        let visual = scene.link(link).unwrap();
        assert_eq!(visual.d, "M0,0 L50,10 L100,0");
    }

    #[test]
    fn arrows_sit_along_the_path() {
        let (mut store, config) = board();
        let mut scene = Scene::new(&config);
        let a = drop_node(&mut store, &config, 0, 0.0);
        let b = drop_node(&mut store, &config, 0, 100.0);
        let link = store.connect(a, b, &config).unwrap();
        store.toggle_arrows(link).unwrap();
        scene.reconcile(&store);

        let visual = scene.link(link).unwrap();
        assert!(visual.arrows_visible);
        assert_eq!(visual.glyph, '→');
        let xs: Vec<f64> = visual.arrows.iter().map(|g| g.at.x.round()).collect();
        assert_eq!(xs, vec![25.0, 50.0, 75.0]);
        assert!(visual.arrows.iter().all(|g| g.angle.abs() < 1e-6));

        store.reverse_arrows(link).unwrap();
        scene.reconcile(&store);
        let visual = scene.link(link).unwrap();
        assert_eq!(visual.glyph, '←');
        // Reversal flips the glyph only; the tangent is unchanged.
        assert!(visual.arrows.iter().all(|g| g.angle.abs() < 1e-6));
    }

    #[test]
    fn text_editor_survives_reconcile() {
        let (mut store, config) = board();
        let mut scene = Scene::new(&config);
        let id = store.create_text(Point::new(5.0, 5.0), &ViewTransform::IDENTITY, &config);
        scene.reconcile(&store);
        assert!(scene.begin_text_edit(id));
        assert!(scene.update_text_draft(id, "Hel"));

        // An unrelated change re-renders the board mid-edit.
        drop_node(&mut store, &config, 0, 0.0);
        scene.reconcile(&store);
        assert_eq!(
            scene.text(id).unwrap().mode,
            TextMode::Editing {
                draft: "Hel".into()
            }
        );

        assert_eq!(scene.end_text_edit(id).as_deref(), Some("Hel"));
        assert_eq!(scene.text(id).unwrap().mode, TextMode::Static);
        assert_eq!(scene.end_text_edit(id), None);
    }

    #[test]
    fn text_box_margin_grows_after_resize() {
        let (mut store, config) = board();
        let mut scene = Scene::new(&config);
        let id = store.create_text(Point::ZERO, &ViewTransform::IDENTITY, &config);
        scene.reconcile(&store);
        assert_eq!(scene.text(id).unwrap().box_size(), Size::new(120.0, 70.0));
        scene.mark_text_resized(id);
        assert_eq!(scene.text(id).unwrap().box_size(), Size::new(150.0, 100.0));
    }

    #[test]
    fn grid_spans_the_extent() {
        let config = BoardConfig::default();
        let mut scene = Scene::new(&config);
        assert_eq!(
            scene.grid.bounds(),
            kurbo::Rect::new(-10_000.0, -10_000.0, 10_000.0, 10_000.0)
        );
        assert!(scene.toggle_grid());
        assert!(!scene.toggle_grid());
    }
}
