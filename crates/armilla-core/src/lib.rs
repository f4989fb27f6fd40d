//! # Armilla Core
//!
//! The language object model for the Armilla synchronous dataflow language:
//! a navigable, strongly-typed in-memory tree covering modules, typed
//! operators, equations, dataflow diagrams and state machines.
//!
//! # Pipeline Position
//!
//! ```text
//! Source Units
//!     ↓ armilla-parser (lexer + parser, protected fallback)
//! Object Model (these types) - declarations, expressions, diagrams, automata
//!     ↓ armilla (Model: lazy loading + query surface)
//! Analysis & Tooling
//! ```
//!
//! # Organization
//!
//! - [`span`], [`identifier`] — source spans, interned identifiers, paths,
//!   LUIDs, pragmas
//! - [`markup`] — verbatim-preserved protected fragments
//! - [`types`], [`expr`], [`pattern`], [`operator`], [`forward`] — the
//!   expression-level node hierarchy
//! - [`variable`], [`equation`], [`scope`] — declarations inside operators
//! - [`statemachine`] — states, transitions, forks
//! - [`diagram`] — the diagram connectivity graph and its traversal
//! - [`module`] — modules and global declarations
//! - [`error`] — structural invariant and usage precondition errors
//!
//! Every grammar category is a closed enum: consumers discriminate by
//! matching, and the protected fallback is a first-class variant of each
//! relevant category rather than a hidden default. Nodes are immutable after
//! construction and rendering any node reconstructs canonical source text,
//! with protected fragments reproduced byte-for-byte.

pub mod diagram;
pub mod equation;
pub mod error;
pub mod expr;
pub mod forward;
pub mod identifier;
pub mod markup;
pub mod module;
pub mod numeric;
pub mod operator;
pub mod pattern;
pub mod scope;
pub mod span;
pub mod statemachine;
pub mod types;
pub mod variable;

pub use diagram::{
    BlockInstance, Connection, Diagram, DiagramObject, DiagramObjectKind, Endpoint,
    GroupOperation, Neighbor, ObjectId, ResolvedNeighbor, Wire,
};
pub use equation::{DataDef, DefByCase, DefByCaseKind, Equation, EquationKind, Lhs, LhsItem};
pub use error::{StructuralError, UsageError};
pub use expr::{
    BinaryOp, ClockExpr, Expr, ExprKind, Group, GroupAdaptation, GroupItem, GroupRenaming,
    Literal, LiteralKind, PortRef, UnaryOp,
};
pub use identifier::{Id, Ident, Luid, ModulePath, PathId, Pragma};
pub use markup::{Markup, ProtectedItem, ProtectedOrigin};
pub use module::{
    ConstDecl, DeclKind, GlobalDecl, GlobalDeclKind, GroupDecl, Module, ModuleKind, Operator,
    OperatorBody, SensorDecl, Signature, TypeConstraint, TypeDecl, UseDirective,
};
pub use operator::{IteratorKind, NaryOp, OperatorExpr, OperatorExprKind, OperatorRef, OperatorRefKind};
pub use pattern::{Pattern, PatternKind};
pub use scope::{Scope, ScopeSection};
pub use span::{Span, Spanned};
pub use statemachine::{
    Arrow, ArrowTarget, Fork, ForkPriority, Identification, State, StateMachine,
    StateMachineItem, Target, Transition, TransitionDecl,
};
pub use types::{NumericKind, PredefinedType, TypeDefinition, TypeExpr, TypeExprKind};
pub use variable::{VarDecl, Variable};
