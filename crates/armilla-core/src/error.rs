//! Typed errors for structural invariants and usage preconditions.
//!
//! Parse-level failures never surface as errors: they are absorbed into the
//! model as protected fragments. The errors here cover the two remaining
//! classes — a malformed model (structural invariant broken upstream) and a
//! caller asking a question the model cannot answer.

use thiserror::Error;

/// A structural invariant of the object model does not hold.
///
/// These indicate a malformed model (an upstream bug or malformed source)
/// and are reported explicitly rather than silently tolerated, since
/// traversal logic depends on the invariants holding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    /// Two declarations share an identifier within a module namespace.
    /// Types, constants, groups, sensors and operators share one namespace
    /// per module.
    #[error("duplicate declaration `{name}` in module `{module}`")]
    DuplicateDeclaration { module: String, name: String },

    /// A wire endpoint references a LUID that no object of the enclosing
    /// diagram declares.
    #[error("wire endpoint `#{luid}` does not resolve within the enclosing diagram")]
    DanglingWireEndpoint { luid: String },

    /// A state machine with no states has no initial state.
    #[error("state machine has no states")]
    NoInitialState,

    /// Two states are both flagged initial.
    #[error("state machine flags both `{first}` and `{second}` as initial")]
    MultipleInitialStates { first: String, second: String },
}

/// A caller broke a usage precondition of the query surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    /// `full_path` was requested for a node with no enclosing module.
    #[error("no enclosing module: full path is undefined")]
    NoEnclosingModule,

    /// `full_path` was requested for a declaration that has no identifier
    /// (a use directive or a protected declaration).
    #[error("declaration has no identifier: full path is undefined")]
    UnnamedDeclaration,
}
