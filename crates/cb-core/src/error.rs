use crate::id::ElementId;
use thiserror::Error;

/// Errors raised by the board model. None of them are fatal: the caller
/// either skips rendering the affected element or reports "nothing changed".
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoardError {
    #[error("unsupported shape kind: {0}")]
    UnsupportedShape(String),

    #[error("{shape} requires at least {required} control points, got {found}")]
    TooFewPoints {
        shape: &'static str,
        required: usize,
        found: usize,
    },

    #[error("node not found: {0}")]
    NodeNotFound(ElementId),

    #[error("link not found: {0}")]
    LinkNotFound(ElementId),

    #[error("text block not found: {0}")]
    TextNotFound(ElementId),

    #[error("node {node} has no control point tagged {tag}")]
    UnknownControlPoint { node: ElementId, tag: u32 },

    #[error("invalid color: {0}")]
    InvalidColor(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type BoardResult<T> = Result<T, BoardError>;
