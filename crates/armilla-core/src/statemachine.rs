//! State machines: states, transitions and forks.
//!
//! The structure is represented, not resolved: strong transitions are flagged
//! as evaluated before the state body in a cycle, weak transitions after, and
//! forks group transitions sharing an evaluation point. Guards are never
//! executed here; consumers interpret the structure.

use std::fmt;

use crate::error::StructuralError;
use crate::expr::Expr;
use crate::identifier::{Ident, Luid};
use crate::scope::{Scope, ScopeSection};
use crate::span::Span;

/// State identification: `id`, `luid` or `luid id`.
///
/// Also used for transition declarations and targets, where either part may
/// be missing.
#[derive(Debug, Clone, Default)]
pub struct Identification {
    pub luid: Option<Luid>,
    pub id: Option<Ident>,
}

impl Identification {
    pub fn id(id: Ident) -> Self {
        Self {
            luid: None,
            id: Some(id),
        }
    }

    /// True when the luid or the id part is defined.
    pub fn is_valid(&self) -> bool {
        self.luid.is_some() || self.id.is_some()
    }

    /// True when neither part is defined.
    pub fn is_undef(&self) -> bool {
        !self.is_valid()
    }
}

impl fmt::Display for Identification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.luid, &self.id) {
            (Some(luid), Some(id)) => write!(f, "{} {}", luid, id),
            (Some(luid), None) => write!(f, "{}", luid),
            (None, Some(id)) => write!(f, "{}", id),
            (None, None) => Ok(()),
        }
    }
}

/// An arrow target: `restart id` or `resume id`.
#[derive(Debug)]
pub struct Target {
    pub identification: Identification,
    pub is_resume: bool,
}

impl Target {
    pub fn restart(identification: Identification) -> Self {
        Self {
            identification,
            is_resume: false,
        }
    }

    pub fn resume(identification: Identification) -> Self {
        Self {
            identification,
            is_resume: true,
        }
    }

    pub fn is_restart(&self) -> bool {
        !self.is_resume
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_resume { "resume" } else { "restart" };
        if self.identification.is_undef() {
            write!(f, "{}", kind)
        } else {
            write!(f, "{} {}", kind, self.identification)
        }
    }
}

/// Where an arrow lands: a state target or a fork.
#[derive(Debug)]
pub enum ArrowTarget {
    Target(Target),
    Fork(Fork),
}

impl fmt::Display for ArrowTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrowTarget::Target(target) => write!(f, "{}", target),
            ArrowTarget::Fork(fork) => write!(f, "{}", fork),
        }
    }
}

/// An arrow, with or without guard:
/// `[(guard)] [scope] (target | fork)`.
#[derive(Debug)]
pub struct Arrow {
    pub guard: Option<Expr>,
    pub action: Option<Scope>,
    pub target: ArrowTarget,
    pub span: Span,
}

impl fmt::Display for Arrow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(guard) = &self.guard {
            write!(f, "({}) ", guard)?;
        }
        if let Some(action) = &self.action {
            write!(f, "{} ", action)?;
        }
        write!(f, "{}", self.target)
    }
}

/// A fork with priority: `:p: if guarded_arrow` or `:p: else arrow`.
#[derive(Debug)]
pub struct ForkPriority {
    pub priority: i64,
    pub arrow: Arrow,
    pub is_if_arrow: bool,
}

impl ForkPriority {
    /// An `if` fork must carry a guard, an `else` fork must not.
    pub fn is_valid(&self) -> bool {
        if self.is_if_arrow {
            self.arrow.guard.is_some()
        } else {
            self.arrow.guard.is_none()
        }
    }
}

impl fmt::Display for ForkPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_if_arrow { "if" } else { "else" };
        write!(f, ":{}: {} {}", self.priority, kind, self.arrow)
    }
}

/// A fork: deterministic multi-way branching from one evaluation point.
///
/// The two forms are alternative productions of the same grammar rule — a
/// given arrow target is either a tree or a priority list, never both.
/// Evaluating a priority list in order and taking the first true guard
/// yields a unique outcome; the tree form expresses the same rule as nested
/// `if`/`elsif`/`else`.
#[derive(Debug)]
pub enum Fork {
    Tree {
        if_arrow: Box<Arrow>,
        elsif_arrows: Vec<Arrow>,
        else_arrow: Option<Box<Arrow>>,
    },
    Priority(Vec<ForkPriority>),
}

impl fmt::Display for Fork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fork::Tree {
                if_arrow,
                elsif_arrows,
                else_arrow,
            } => {
                write!(f, "if {}", if_arrow)?;
                for arrow in elsif_arrows {
                    write!(f, "\nelsif {}", arrow)?;
                }
                if let Some(arrow) = else_arrow {
                    write!(f, "\nelse {}", arrow)?;
                }
                write!(f, " end")
            }
            Fork::Priority(forks) => {
                for fork in forks {
                    write!(f, "{}\n", fork)?;
                }
                write!(f, "end")
            }
        }
    }
}

/// A transition: `if guarded_arrow;` or `[scope] target;`.
#[derive(Debug)]
pub struct Transition {
    pub arrow: Arrow,
    pub span: Span,
}

impl Transition {
    pub fn is_guarded(&self) -> bool {
        self.arrow.guard.is_some()
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_guarded() {
            write!(f, "if {};", self.arrow)
        } else {
            write!(f, "{};", self.arrow)
        }
    }
}

/// A forward-declared transition of a state machine:
/// `:priority: [luid|id] (unless|until) transition`.
#[derive(Debug)]
pub struct TransitionDecl {
    pub priority: i64,
    pub identification: Identification,
    pub is_strong: bool,
    pub transition: Transition,
    pub span: Span,
}

impl fmt::Display for TransitionDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = if self.identification.is_undef() {
            String::new()
        } else {
            format!(" {} ", self.identification)
        };
        let kind = if self.is_strong { "unless" } else { "until" };
        write!(f, ":{}:{} {} {}", self.priority, id, kind, self.transition)
    }
}

/// A state of a state machine.
#[derive(Debug)]
pub struct State {
    pub identification: Identification,
    pub strong_transitions: Vec<Transition>,
    pub sections: Vec<ScopeSection>,
    pub weak_transitions: Vec<Transition>,
    pub is_initial: bool,
    pub span: Span,
}

impl State {
    pub fn has_strong_transition(&self) -> bool {
        !self.strong_transitions.is_empty()
    }

    pub fn has_weak_transition(&self) -> bool {
        !self.weak_transitions.is_empty()
    }

    /// True when the state has a body, i.e. scope sections.
    pub fn has_body(&self) -> bool {
        !self.sections.is_empty()
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_initial {
            write!(f, "initial ")?;
        }
        write!(f, "state {}:", self.identification)?;
        if self.has_strong_transition() {
            write!(f, "\nunless")?;
            for transition in &self.strong_transitions {
                write!(f, "\n{}", transition)?;
            }
        }
        for section in &self.sections {
            write!(f, "\n{}", section)?;
        }
        if self.has_weak_transition() {
            write!(f, "\nuntil")?;
            for transition in &self.weak_transitions {
                write!(f, "\n{}", transition)?;
            }
        }
        Ok(())
    }
}

/// An item of a state machine: a state or a forward-declared transition.
#[derive(Debug)]
pub enum StateMachineItem {
    State(State),
    Transition(TransitionDecl),
}

impl fmt::Display for StateMachineItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateMachineItem::State(state) => write!(f, "{}", state),
            StateMachineItem::Transition(decl) => write!(f, "{}", decl),
        }
    }
}

/// A state machine.
///
/// States are ordered; the initial state is the explicitly flagged one, or
/// the first state when none is flagged. Construction enforces the
/// structural invariant: at least one state, at most one flagged initial.
#[derive(Debug)]
pub struct StateMachine {
    items: Vec<StateMachineItem>,
    span: Span,
}

impl StateMachine {
    pub fn new(items: Vec<StateMachineItem>, span: Span) -> Result<Self, StructuralError> {
        let mut flagged: Option<&State> = None;
        let mut has_state = false;
        for item in &items {
            let StateMachineItem::State(state) = item else {
                continue;
            };
            has_state = true;
            if state.is_initial {
                if let Some(first) = flagged {
                    return Err(StructuralError::MultipleInitialStates {
                        first: first.identification.to_string(),
                        second: state.identification.to_string(),
                    });
                }
                flagged = Some(state);
            }
        }
        if !has_state {
            return Err(StructuralError::NoInitialState);
        }
        Ok(Self { items, span })
    }

    pub fn items(&self) -> &[StateMachineItem] {
        &self.items
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// The states, in declaration order.
    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.items.iter().filter_map(|item| match item {
            StateMachineItem::State(state) => Some(state),
            StateMachineItem::Transition(_) => None,
        })
    }

    /// The forward-declared transitions, in declaration order.
    pub fn transitions(&self) -> impl Iterator<Item = &TransitionDecl> {
        self.items.iter().filter_map(|item| match item {
            StateMachineItem::Transition(decl) => Some(decl),
            StateMachineItem::State(_) => None,
        })
    }

    /// The initial state: the flagged one, or the first state.
    pub fn initial_state(&self) -> &State {
        self.states()
            .find(|s| s.is_initial)
            .or_else(|| self.states().next())
            .expect("state machine construction guarantees at least one state")
    }
}

impl fmt::Display for StateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", item)?;
        }
        Ok(())
    }
}
