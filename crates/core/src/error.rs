//! Keywheel error types.

use std::sync::Arc;

/// Errors surfaced at the routing and administrative request boundary.
///
/// All of these fail a single request; none of them are process-fatal.
/// Structural invariants inside the assignment structures are maintained
/// by construction under their exclusive locks and are not represented
/// here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    /// The assignment structure holds no nodes at lookup time.
    #[error("no nodes available")]
    NoNodesAvailable,

    /// A heartbeat or delete referenced a node that is not registered.
    /// Heartbeats never implicitly register a node.
    #[error("unknown node: {0}")]
    UnknownNode(Arc<str>),

    /// A missing or malformed administrative parameter. Rejected before
    /// any structural mutation is attempted.
    #[error("invalid parameter: {0}")]
    InvalidParameter(Arc<str>),

    /// An administrative request from a non-local source.
    #[error("unauthorized source")]
    UnauthorizedSource,
}

impl RouteError {
    /// Construct an [RouteError::UnknownNode] error.
    pub fn unknown_node(node_id: impl Into<Arc<str>>) -> Self {
        Self::UnknownNode(node_id.into())
    }

    /// Construct an [RouteError::InvalidParameter] error.
    pub fn invalid_parameter(ctx: impl Into<Arc<str>>) -> Self {
        Self::InvalidParameter(ctx.into())
    }
}

/// The keywheel result type.
pub type RouteResult<T> = Result<T, RouteError>;
