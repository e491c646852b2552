pub mod config;
pub mod error;
pub mod geometry;
pub mod id;
pub mod layout;
pub mod model;
pub mod palette;
pub mod store;
pub mod transform;

pub use config::{BoardConfig, Positioning};
pub use error::{BoardError, BoardResult};
pub use geometry::{path_data, rotation_handles, shape_outline, shape_path, shape_path_named};
pub use id::ElementId;
pub use layout::Simulation;
pub use model::*;
pub use store::GraphStore;
pub use transform::{ViewTransform, ZoomLimits};

// Re-export kurbo geometry types so downstream crates share one vocabulary.
pub use kurbo::{Point, Rect, Size, Vec2};
