//! Error types for halfmesh.
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

use crate::mesh::{EdgeId, VertId};

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur during mesh operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    /// The mesh (or the construction input) has no valid vertices or faces.
    #[error("mesh is empty")]
    EmptyMesh,

    /// A face references an invalid vertex index.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face has duplicate vertex indices (degenerate triangle).
    #[error("face {face} is degenerate (has duplicate vertices)")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// Two triangles use the same directed edge.
    #[error("directed edge ({v0:?}, {v1:?}) is used by more than one triangle")]
    NonManifoldInput {
        /// Origin of the conflicting directed edge.
        v0: VertId,
        /// Destination of the conflicting directed edge.
        v1: VertId,
    },

    /// A projection target contains no faces.
    #[error("projection target has no faces")]
    EmptyTarget,

    /// A topology query was issued on an edge it does not apply to.
    #[error("invalid topology at {edge:?}: {reason}")]
    InvalidTopology {
        /// The offending half-edge.
        edge: EdgeId,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// An affine transform has a singular linear part.
    #[error("transform is not invertible")]
    NotInvertible,

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl MeshError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    pub(crate) fn topology(edge: EdgeId, reason: &'static str) -> Self {
        MeshError::InvalidTopology { edge, reason }
    }
}
