//! Errors produced while decoding and validating an asset file.
//!
//! Every error is fatal to the parse: no partially-built model is ever returned.

use thiserror::Error;

/// Which entity array an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    Node,
    Bone,
    Mesh,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EntityKind::Node => "node",
            EntityKind::Bone => "bone",
            EntityKind::Mesh => "mesh",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// Fewer bytes remain than a read requires.
    #[error("truncated data: needed {needed} bytes, only {available} left")]
    TruncatedData { needed: usize, available: usize },

    /// A decoded integer (or length) is outside the accepted range.
    #[error("malformed value {value} in {context}")]
    MalformedValue { value: i64, context: &'static str },

    /// A section's total length disagrees with its name and data lengths.
    #[error("section frame mismatch: total length {total}, name length {name}, data length {data}")]
    SectionFrameMismatch { total: i32, name: i32, data: i32 },

    /// Leftover bytes can't be framed into another section or record.
    #[error("{left} trailing bytes in {context}")]
    TrailingGarbage { left: usize, context: String },

    #[error("required section {0:?} is missing")]
    RequiredSectionMissing(&'static str),

    #[error("{context} is not valid UTF-8")]
    InvalidUtf8 { context: String },

    #[error("no {0}s in asset")]
    EmptyCollection(EntityKind),

    #[error("{kind} {index} has an empty name")]
    EmptyName { kind: EntityKind, index: usize },

    #[error("{kind} {index} has invalid parent index {parent}")]
    InvalidParentIndex {
        kind: EntityKind,
        index: usize,
        parent: i32,
    },

    #[error("{0} hierarchy contains a cycle")]
    CyclicHierarchy(EntityKind),

    #[error("mesh {mesh} is claimed by nodes {first} and {second}")]
    DuplicateMeshAssignment {
        mesh: usize,
        first: usize,
        second: usize,
    },

    /// Two counts that must agree don't.
    #[error("count mismatch in {context}: expected {expected}, got {actual}")]
    CountMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// An index stored on an entity points outside the array it refers to.
    #[error("{kind} {index}: {what} {value} is out of range 0..{count}")]
    InvalidReference {
        kind: EntityKind,
        index: usize,
        what: &'static str,
        value: i64,
        count: usize,
    },

    /// Skin weights must be finite and non-negative.
    #[error("mesh {mesh} has invalid skin weight {weight}")]
    InvalidWeight { mesh: usize, weight: f32 },

    #[error("bind matrix of bone {0} is not invertible")]
    SingularMatrix(usize),
}

pub type ParseResult<T> = Result<T, ParseError>;
