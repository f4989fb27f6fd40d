//! # Armilla
//!
//! A navigable, strongly-typed in-memory model of Armilla dataflow programs
//! (modules, typed operators, equations, diagrams, state machines), for
//! analysis and tooling that needs to inspect declarations, follow diagram
//! wiring and walk state-machine structure without re-implementing a front
//! end.
//!
//! ## Usage
//!
//! ```
//! use armilla::{Model, SourceUnit};
//!
//! let unit = SourceUnit::body(
//!     "Math",
//!     "function Add (a: int32; b: int32) returns (o: int32)\n  o = a + b;",
//! )
//! .unwrap();
//! let model = Model::new(vec![unit]);
//!
//! let add = model
//!     .find_declaration(|d| d.identifier().is_some_and(|i| i.id() == "Add"))
//!     .unwrap();
//! assert_eq!(add.full_path().unwrap(), "Math::Add");
//! ```
//!
//! Loading is lazy: units are structured one at a time, only as far as a
//! query consumes them, and stay cached afterwards. A unit that cannot be
//! structured degrades to a whole-unit protected declaration; it never
//! aborts the model.

mod model;
mod source;

pub use model::{DeclRef, Model};
pub use source::{ArmillaParser, ModelError, SourceUnit, UnitParser};

pub use armilla_core as core;
pub use armilla_core::{
    DeclKind, Diagram, Endpoint, GlobalDecl, GlobalDeclKind, Module, ModuleKind, ModulePath,
    ObjectId, Operator, ProtectedItem, Span, StateMachine, StructuralError, UsageError,
};
pub use armilla_parser::{Diagnostic, ParseError, ParsedUnit};
