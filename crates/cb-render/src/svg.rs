//! SVG projection of the scene.
//!
//! Produces one self-contained `<svg>` document per frame: board content
//! inside a group carrying the view transform, then the palette overlay
//! in screen space.

use crate::scene::{LinkVisual, NodeVisual, Scene, TextMode, TextVisual};
use cb_core::geometry::{path_data, shape_path};
use cb_core::palette::PaletteItem;
use cb_core::{Color, Size, ViewTransform};
use kurbo::Point;
use std::fmt::Write;

const LINK_OPACITY: f64 = 0.6;
const SELECTED_STROKE: &str = "#FFD700";
const GHOST_OPACITY: f64 = 0.7;

/// A palette item placed in screen space.
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteEntry {
    pub item: PaletteItem,
    pub at: Point,
}

/// Screen-space decorations drawn above the board.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    pub palette: Vec<PaletteEntry>,
    pub palette_visible: bool,
    /// Copy of a palette item following the pointer during a drag.
    pub ghost: Option<PaletteEntry>,
    pub palette_fill: Option<Color>,
}

pub fn render_svg(scene: &Scene, view: &ViewTransform, viewport: Size, overlay: &Overlay) -> String {
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
        w = viewport.width,
        h = viewport.height
    );
    write_defs(&mut svg, scene);
    let _ = writeln!(
        svg,
        "<g class=\"board\" transform=\"translate({},{}) scale({})\">",
        view.x, view.y, view.k
    );
    if !scene.grid.hidden {
        let b = scene.grid.bounds();
        let _ = writeln!(
            svg,
            "<rect class=\"grid\" x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"url(#grid)\"/>",
            b.x0,
            b.y0,
            b.width(),
            b.height()
        );
    }
    for link in scene.links() {
        write_link(&mut svg, scene, link);
    }
    for node in scene.nodes() {
        write_node(&mut svg, scene, node);
    }
    for text in scene.texts() {
        write_text(&mut svg, text);
    }
    svg.push_str("</g>\n");
    write_overlay(&mut svg, overlay);
    svg.push_str("</svg>");
    svg
}

fn write_defs(out: &mut String, scene: &Scene) {
    let size = scene.grid.size;
    out.push_str("<defs>\n");
    out.push_str(
        "<filter id=\"glow\"><feGaussianBlur stdDeviation=\"2.5\" result=\"blur\"/>\
         <feMerge><feMergeNode in=\"blur\"/><feMergeNode in=\"SourceGraphic\"/></feMerge></filter>\n",
    );
    let _ = writeln!(
        out,
        "<pattern id=\"grid\" width=\"{size}\" height=\"{size}\" patternUnits=\"userSpaceOnUse\">\
         <path d=\"M {size} 0 L 0 0 0 {size}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1\"/></pattern>",
        scene.grid.color.to_hex()
    );
    out.push_str("</defs>\n");
}

fn write_link(out: &mut String, scene: &Scene, link: &LinkVisual) {
    let path_id = format!("link-{}", link.id);
    let color = link.color.to_hex();
    let _ = writeln!(
        out,
        "<g class=\"link\" data-id=\"{}\"><path id=\"{}\" d=\"{}\" fill=\"none\" stroke=\"{color}\" \
         stroke-width=\"{}\" opacity=\"{LINK_OPACITY}\" pathLength=\"10\"/>",
        escape(link.id.as_str()),
        escape(&path_id),
        link.d,
        scene.link_stroke_width
    );
    if link.arrows_visible {
        for glyph in &link.arrows {
            let _ = writeln!(
                out,
                "<text font-size=\"{}\" dominant-baseline=\"central\"><textPath href=\"#{}\" \
                 startOffset=\"{}%\" text-anchor=\"middle\" fill=\"{}\">{}</textPath></text>",
                scene.arrow_font_size,
                escape(&path_id),
                glyph.offset * 100.0,
                glyph.color.to_hex(),
                link.glyph
            );
        }
    }
    let _ = writeln!(
        out,
        "<circle class=\"link-control\" cx=\"{}\" cy=\"{}\" r=\"{}\" fill=\"{color}\"/></g>",
        link.control.x, link.control.y, scene.link_control_radius
    );
}

fn write_node(out: &mut String, scene: &Scene, node: &NodeVisual) {
    let _ = write!(
        out,
        "<g class=\"node\" data-id=\"{}\" transform=\"translate({},{}) rotate({})\">",
        escape(node.id.as_str()),
        node.x,
        node.y,
        node.rotation
    );
    if let Some(d) = &node.path {
        let highlight = if node.selected {
            format!(" stroke=\"{SELECTED_STROKE}\" stroke-width=\"3\" filter=\"url(#glow)\"")
        } else {
            String::new()
        };
        let _ = write!(
            out,
            "<path d=\"{d}\" fill=\"{}\"{highlight}/>",
            node.fill.to_hex()
        );
    }
    for handle in &node.handles {
        let _ = write!(
            out,
            "<circle class=\"handle\" data-tag=\"{}\" cx=\"{}\" cy=\"{}\" r=\"{}\" fill=\"#333333\"/>",
            handle.tag, handle.x, handle.y, scene.handle_radius
        );
    }
    if let Some((first, last)) = node.rotate_handles {
        for (dir, p) in [("backward", first), ("forward", last)] {
            let _ = write!(
                out,
                "<circle class=\"rotate\" data-dir=\"{dir}\" cx=\"{}\" cy=\"{}\" r=\"{}\" fill=\"#FF8C00\"/>",
                p.x, p.y, scene.handle_radius
            );
        }
    }
    out.push_str("</g>\n");
}

fn write_text(out: &mut String, text: &TextVisual) {
    let size = text.box_size();
    let _ = write!(
        out,
        "<foreignObject class=\"text\" data-id=\"{}\" x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\">",
        escape(text.id.as_str()),
        text.x,
        text.y,
        size.width,
        size.height
    );
    let style = format!(
        "font: {}; color: {}; width: {}px; height: {}px; margin: 0;",
        text.font_css,
        text.color.to_hex(),
        text.width,
        text.height
    );
    match &text.mode {
        TextMode::Static => {
            let _ = write!(
                out,
                "<p xmlns=\"http://www.w3.org/1999/xhtml\" style=\"{}\">{}</p>",
                escape(&style),
                escape(&text.text)
            );
        }
        TextMode::Editing { draft } => {
            let _ = write!(
                out,
                "<textarea xmlns=\"http://www.w3.org/1999/xhtml\" style=\"{}; background: transparent; resize: both;\">{}</textarea>",
                escape(&style),
                escape(draft)
            );
        }
    }
    out.push_str("</foreignObject>\n");
}

fn write_overlay(out: &mut String, overlay: &Overlay) {
    let fill = overlay
        .palette_fill
        .unwrap_or(Color::LIGHT_BLUE)
        .to_hex();
    if overlay.palette_visible {
        out.push_str("<g class=\"palette\">\n");
        for entry in &overlay.palette {
            write_palette_item(out, entry, &fill, 1.0);
        }
        out.push_str("</g>\n");
    }
    if let Some(ghost) = &overlay.ghost {
        out.push_str("<g class=\"ghost\">");
        write_palette_item(out, ghost, &fill, GHOST_OPACITY);
        out.push_str("</g>\n");
    }
}

fn write_palette_item(out: &mut String, entry: &PaletteEntry, fill: &str, opacity: f64) {
    let Point { x, y } = entry.at;
    match &entry.item {
        PaletteItem::Shape(template) => match shape_path(template.shape, &template.points) {
            Ok(cmds) => {
                let _ = writeln!(
                    out,
                    "<path class=\"palette-item\" data-shape=\"{}\" transform=\"translate({x},{y})\" d=\"{}\" fill=\"{fill}\" opacity=\"{opacity}\"/>",
                    template.shape.name(),
                    path_data(&cmds)
                );
            }
            Err(e) => log::error!("palette item not drawable: {e}"),
        },
        PaletteItem::Text => {
            let _ = writeln!(
                out,
                "<text class=\"palette-item\" data-shape=\"text\" x=\"{x}\" y=\"{y}\" font-size=\"24\" \
                 text-anchor=\"middle\" dominant-baseline=\"central\" opacity=\"{opacity}\">Text</text>"
            );
        }
    }
}

/// Escape text for XML content and attribute values.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
