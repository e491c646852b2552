pub mod hit;
pub mod scene;
pub mod svg;

pub use hit::{HitTarget, RotateDirection, hit_test, node_transform};
pub use scene::{ReconcileReport, Scene, TextMode};
pub use svg::{Overlay, PaletteEntry, render_svg};
