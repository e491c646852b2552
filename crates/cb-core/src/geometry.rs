//! Shape geometry: the single place a node's outline is defined.
//!
//! Pure functions of a shape kind and its control points. Called on every
//! render and every control-point drag frame, so nothing here holds state.

use crate::error::{BoardError, BoardResult};
use crate::model::{ControlPoint, PathCmd, ShapeKind};
use kurbo::{BezPath, Ellipse, Point, Shape, SvgArc, Vec2};
use std::fmt::Write;

/// Build the outline of a shape from its control points.
///
/// - `Circle`: ellipse centered between points 0 and 1, radii are half the
///   horizontal/vertical span, drawn as two opposing arcs.
/// - Polygon kinds: connect the points in order and close the contour.
pub fn shape_path(kind: ShapeKind, points: &[ControlPoint]) -> BoardResult<Vec<PathCmd>> {
    match kind {
        ShapeKind::Circle => ellipse_path(points),
        ShapeKind::Square | ShapeKind::Triangle | ShapeKind::Diamond | ShapeKind::Path => {
            polygon_path(kind, points)
        }
    }
}

/// Same as [`shape_path`], for a kind given by name (palette templates,
/// bridge input). Unknown names are an error, never a panic.
pub fn shape_path_named(name: &str, points: &[ControlPoint]) -> BoardResult<Vec<PathCmd>> {
    let kind = name.parse::<ShapeKind>().inspect_err(|e| log::error!("{e}"))?;
    shape_path(kind, points)
}

fn ellipse_path(points: &[ControlPoint]) -> BoardResult<Vec<PathCmd>> {
    let (center, radii) = ellipse_frame(points)?;
    let (cx, cy) = (center.x, center.y);
    let (rx, ry) = (radii.x, radii.y);
    let arc = |x| PathCmd::ArcTo {
        rx,
        ry,
        large_arc: true,
        sweep: false,
        x,
        y: cy,
    };
    Ok(vec![
        PathCmd::MoveTo(cx - rx, cy),
        arc(cx + rx),
        arc(cx - rx),
    ])
}

/// Center and radii of the ellipse spanned by control points 0 and 1.
fn ellipse_frame(points: &[ControlPoint]) -> BoardResult<(Point, Vec2)> {
    let [p0, p1, ..] = points else {
        let err = BoardError::TooFewPoints {
            shape: "circle",
            required: 2,
            found: points.len(),
        };
        log::error!("{err}");
        return Err(err);
    };
    let center = Point::new((p0.x + p1.x) / 2.0, (p0.y + p1.y) / 2.0);
    let radii = Vec2::new((p1.x - p0.x).abs() / 2.0, (p1.y - p0.y).abs() / 2.0);
    Ok((center, radii))
}

fn polygon_path(kind: ShapeKind, points: &[ControlPoint]) -> BoardResult<Vec<PathCmd>> {
    let Some((first, rest)) = points.split_first() else {
        let err = BoardError::TooFewPoints {
            shape: kind.name(),
            required: 1,
            found: 0,
        };
        log::error!("{err}");
        return Err(err);
    };
    let mut cmds = Vec::with_capacity(points.len() + 1);
    cmds.push(PathCmd::MoveTo(first.x, first.y));
    cmds.extend(rest.iter().map(|p| PathCmd::LineTo(p.x, p.y)));
    cmds.push(PathCmd::Close);
    Ok(cmds)
}

/// Serialize path commands as an SVG `d` attribute.
pub fn path_data(cmds: &[PathCmd]) -> String {
    let mut d = String::new();
    for cmd in cmds {
        if !d.is_empty() {
            d.push(' ');
        }
        // Writing to a String cannot fail.
        let _ = match *cmd {
            PathCmd::MoveTo(x, y) => write!(d, "M {x},{y}"),
            PathCmd::LineTo(x, y) => write!(d, "L {x},{y}"),
            PathCmd::QuadTo(cx, cy, x, y) => write!(d, "Q {cx},{cy} {x},{y}"),
            PathCmd::ArcTo {
                rx,
                ry,
                large_arc,
                sweep,
                x,
                y,
            } => write!(
                d,
                "A {rx},{ry} 0 {},{} {x},{y}",
                u8::from(large_arc),
                u8::from(sweep)
            ),
            PathCmd::Close => write!(d, "Z"),
        };
    }
    d
}

/// Closed outline of a shape for containment tests.
///
/// Circles are built from a kurbo [`Ellipse`] rather than from the two SVG
/// arcs of [`shape_path`], whose seam on the horizontal diameter leaves the
/// winding number at zero along the left half of that line.
pub fn shape_outline(kind: ShapeKind, points: &[ControlPoint]) -> BoardResult<BezPath> {
    match kind {
        ShapeKind::Circle => {
            let (center, radii) = ellipse_frame(points)?;
            Ok(Ellipse::new(center, radii, 0.0).path_elements(0.1).collect())
        }
        _ => shape_path(kind, points).map(|cmds| to_bezpath(&cmds)),
    }
}

/// Convert path commands to a kurbo path (arcs flattened to cubics).
pub fn to_bezpath(cmds: &[PathCmd]) -> BezPath {
    let mut path = BezPath::new();
    let mut current = Point::ZERO;
    for cmd in cmds {
        match *cmd {
            PathCmd::MoveTo(x, y) => {
                current = Point::new(x, y);
                path.move_to(current);
            }
            PathCmd::LineTo(x, y) => {
                current = Point::new(x, y);
                path.line_to(current);
            }
            PathCmd::QuadTo(cx, cy, x, y) => {
                current = Point::new(x, y);
                path.quad_to(Point::new(cx, cy), current);
            }
            PathCmd::ArcTo {
                rx,
                ry,
                large_arc,
                sweep,
                x,
                y,
            } => {
                let to = Point::new(x, y);
                let svg_arc = SvgArc {
                    from: current,
                    to,
                    radii: Vec2::new(rx, ry),
                    x_rotation: 0.0,
                    large_arc,
                    sweep,
                };
                match kurbo::Arc::from_svg_arc(&svg_arc) {
                    Some(arc) => arc.to_cubic_beziers(0.1, |p1, p2, p3| {
                        path.curve_to(p1, p2, p3);
                    }),
                    None => path.line_to(to),
                }
                current = to;
            }
            PathCmd::Close => path.close_path(),
        }
    }
    path
}

/// Positions of the two rotation handles: the midpoint of the first two
/// control points and the midpoint of the last two.
pub fn rotation_handles(points: &[ControlPoint]) -> Option<(Point, Point)> {
    let [first, second, ..] = points else {
        return None;
    };
    let [.., before_last, last] = points else {
        return None;
    };
    Some((midpoint(first, second), midpoint(before_last, last)))
}

fn midpoint(a: &ControlPoint, b: &ControlPoint) -> Point {
    Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::default_templates;
    use pretty_assertions::assert_eq;

    fn template_points(kind: ShapeKind) -> Vec<ControlPoint> {
        default_templates()
            .into_iter()
            .find(|t| t.shape == kind)
            .map(|t| t.points.to_vec())
            .unwrap()
    }

    fn vertices(cmds: &[PathCmd]) -> Vec<(f64, f64)> {
        cmds.iter()
            .filter_map(|c| match *c {
                PathCmd::MoveTo(x, y) | PathCmd::LineTo(x, y) => Some((x, y)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn polygon_kinds_use_exactly_the_supplied_points() {
        for kind in [ShapeKind::Square, ShapeKind::Triangle, ShapeKind::Diamond] {
            let points = template_points(kind);
            let cmds = shape_path(kind, &points).unwrap();
            let expected: Vec<(f64, f64)> = points.iter().map(|p| (p.x, p.y)).collect();
            assert_eq!(vertices(&cmds), expected, "{kind:?}");
            assert_eq!(cmds.last(), Some(&PathCmd::Close));
        }
    }

    #[test]
    fn triangle_path_data() {
        let cmds = shape_path(ShapeKind::Triangle, &template_points(ShapeKind::Triangle)).unwrap();
        assert_eq!(path_data(&cmds), "M 0,-30 L 30,30 L -30,30 Z");
    }

    #[test]
    fn circle_spans_first_two_points() {
        let cmds = shape_path(ShapeKind::Circle, &template_points(ShapeKind::Circle)).unwrap();
        assert_eq!(
            path_data(&cmds),
            "M -30,0 A 30,30 0 1,0 30,0 A 30,30 0 1,0 -30,0"
        );
    }

    #[test]
    fn circle_becomes_ellipse_when_points_move() {
        let points = [ControlPoint::new(0.0, 0.0, 0), ControlPoint::new(40.0, 20.0, 1)];
        let cmds = shape_path(ShapeKind::Circle, &points).unwrap();
        assert_eq!(
            cmds[0..2],
            [
                PathCmd::MoveTo(0.0, 10.0),
                PathCmd::ArcTo {
                    rx: 20.0,
                    ry: 10.0,
                    large_arc: true,
                    sweep: false,
                    x: 40.0,
                    y: 10.0
                }
            ]
        );
    }

    #[test]
    fn circle_with_one_point_is_an_error() {
        let points = [ControlPoint::new(0.0, 0.0, 0)];
        assert_eq!(
            shape_path(ShapeKind::Circle, &points),
            Err(BoardError::TooFewPoints {
                shape: "circle",
                required: 2,
                found: 1
            })
        );
    }

    #[test]
    fn unknown_shape_name_is_an_error() {
        let points = template_points(ShapeKind::Square);
        assert_eq!(
            shape_path_named("star", &points),
            Err(BoardError::UnsupportedShape("star".into()))
        );
        assert!(shape_path_named("square", &points).is_ok());
    }

    #[test]
    fn generic_path_closes_contour() {
        let points = [
            ControlPoint::new(0.0, 0.0, 0),
            ControlPoint::new(10.0, 0.0, 1),
            ControlPoint::new(5.0, 8.0, 2),
        ];
        let cmds = shape_path(ShapeKind::Path, &points).unwrap();
        assert_eq!(path_data(&cmds), "M 0,0 L 10,0 L 5,8 Z");
    }

    #[test]
    fn same_input_same_output() {
        let points = template_points(ShapeKind::Diamond);
        assert_eq!(
            shape_path(ShapeKind::Diamond, &points),
            shape_path(ShapeKind::Diamond, &points)
        );
    }

    #[test]
    fn rotation_handles_sit_on_first_and_last_edges() {
        let (a, b) = rotation_handles(&template_points(ShapeKind::Square)).unwrap();
        assert_eq!(a, Point::new(0.0, -20.0));
        assert_eq!(b, Point::new(0.0, 20.0));
        assert!(rotation_handles(&[ControlPoint::new(0.0, 0.0, 0)]).is_none());
    }

    #[test]
    fn bezpath_of_circle_contains_center() {
        let outline =
            shape_outline(ShapeKind::Circle, &template_points(ShapeKind::Circle)).unwrap();
        assert!(outline.contains(Point::new(0.0, 0.0)));
        assert!(!outline.contains(Point::new(40.0, 0.0)));
    }

    #[test]
    fn circle_outline_covers_its_horizontal_diameter() {
        let points = [
            ControlPoint::new(-30.0, -30.0, 0),
            ControlPoint::new(30.0, 30.0, 1),
        ];
        let outline = shape_outline(ShapeKind::Circle, &points).unwrap();
        for x in [-25.0, -20.0, -10.0, 0.0, 10.0, 20.0, 25.0] {
            assert!(outline.contains(Point::new(x, 0.0)), "x = {x}");
        }
        assert!(!outline.contains(Point::new(-31.0, 0.0)));
    }

    #[test]
    fn polygon_outline_matches_its_path() {
        let points = template_points(ShapeKind::Square);
        let outline = shape_outline(ShapeKind::Square, &points).unwrap();
        assert!(outline.contains(Point::new(0.0, 0.0)));
        assert!(!outline.contains(Point::new(35.0, 0.0)));
    }

    #[test]
    fn quad_commands_convert_to_bezpath() {
        let path = to_bezpath(&[
            PathCmd::MoveTo(0.0, 0.0),
            PathCmd::QuadTo(10.0, 10.0, 20.0, 0.0),
        ]);
        assert_eq!(path.elements().len(), 2);
    }
}
