//! The diagram connectivity graph.
//!
//! A diagram is an arena of [`DiagramObject`]s plus a set of [`Wire`]s whose
//! endpoints reference objects by LUID. Objects are addressed with
//! [`ObjectId`] handles rather than owning pointers, so feedback loops are
//! ordinary graph edges.
//!
//! [`Diagram::sources`] and [`Diagram::targets`] are one-hop queries by
//! contract; multi-hop traversal is composed by callers, and the
//! bar-resolving helpers take an explicit visited set to guarantee
//! termination on cycles — the graph reports cycles faithfully and leaves
//! cycle-breaking policy to the caller.

use std::collections::HashMap;
use std::fmt;

use crate::equation::Lhs;
use crate::error::StructuralError;
use crate::expr::{Expr, GroupAdaptation, PortRef};
use crate::identifier::Luid;
use crate::markup::ProtectedItem;
use crate::operator::OperatorRef;
use crate::scope::ScopeSection;
use crate::span::Span;

/// Handle of a diagram object within its [`Diagram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl ObjectId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Group/ungroup operation carried by a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupOperation {
    /// Plain grouping.
    #[default]
    NoOp,
    /// `byname`
    ByName,
    /// `bypos`
    ByPos,
    /// `()` — normalization.
    Normalize,
}

impl fmt::Display for GroupOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupOperation::NoOp => Ok(()),
            GroupOperation::ByName => write!(f, "byname"),
            GroupOperation::ByPos => write!(f, "bypos"),
            GroupOperation::Normalize => write!(f, "()"),
        }
    }
}

/// The defined flows of a `def` block; protected when the definition could
/// not be structured.
#[derive(Debug)]
pub enum DefTarget {
    Lhs(Lhs),
    Protected(ProtectedItem),
}

impl fmt::Display for DefTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefTarget::Lhs(lhs) => write!(f, "{}", lhs),
            DefTarget::Protected(item) => write!(f, "{}", item),
        }
    }
}

/// The called instance of a `block` object; protected when it could not be
/// structured.
#[derive(Debug)]
pub enum BlockInstance {
    Operator(OperatorRef),
    Protected(ProtectedItem),
}

/// The closed set of diagram object descriptions.
#[derive(Debug)]
pub enum DiagramObjectKind {
    /// `expr e` — an expression block.
    Expr(Expr),
    /// `def lhs` — a definition block.
    Def(DefTarget),
    /// `block (operator)` — an operator instance block.
    Block {
        instance: BlockInstance,
        instance_luid: Option<Luid>,
    },
    /// `group [op]` — a bar, grouping or ungrouping a bundle of wires.
    Bar(GroupOperation),
    /// A nested scope section.
    Section(ScopeSection),
}

/// A diagram object: `( [luid] description )`.
#[derive(Debug)]
pub struct DiagramObject {
    pub luid: Option<Luid>,
    pub kind: DiagramObjectKind,
    pub span: Span,
}

impl DiagramObject {
    pub fn new(luid: Option<Luid>, kind: DiagramObjectKind, span: Span) -> Self {
        Self { luid, kind, span }
    }

    /// True when the object is a bar.
    pub fn is_bar(&self) -> bool {
        matches!(self.kind, DiagramObjectKind::Bar(_))
    }
}

impl fmt::Display for DiagramObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        if let Some(luid) = &self.luid {
            write!(f, "{} ", luid)?;
        }
        match &self.kind {
            DiagramObjectKind::Expr(expr) => write!(f, "expr {}", expr)?,
            DiagramObjectKind::Def(def) => write!(f, "def {}", def)?,
            DiagramObjectKind::Block {
                instance,
                instance_luid,
            } => {
                match instance {
                    BlockInstance::Operator(operator) => write!(f, "block ({})", operator)?,
                    BlockInstance::Protected(item) => write!(f, "block {}", item)?,
                }
                if let Some(instance_luid) = instance_luid {
                    write!(f, " {}", instance_luid)?;
                }
            }
            DiagramObjectKind::Bar(operation) => {
                write!(f, "group")?;
                let op = operation.to_string();
                if !op.is_empty() {
                    write!(f, " {}", op)?;
                }
            }
            DiagramObjectKind::Section(section) => write!(f, "{}", section)?,
        }
        write!(f, ")")
    }
}

/// A wire endpoint: a port reference with an optional group adaptation, or
/// `()` for an open endpoint.
#[derive(Debug)]
pub struct Connection {
    pub port: Option<PortRef>,
    pub adaptation: Option<GroupAdaptation>,
    pub span: Span,
}

impl Connection {
    pub fn port(port: PortRef, span: Span) -> Self {
        Self {
            port: Some(port),
            adaptation: None,
            span,
        }
    }

    pub fn open(span: Span) -> Self {
        Self {
            port: None,
            adaptation: None,
            span,
        }
    }

    pub fn with_adaptation(mut self, adaptation: GroupAdaptation) -> Self {
        self.adaptation = Some(adaptation);
        self
    }

    /// A connection is `()` or `port [adaptation]` — an adaptation alone is
    /// not valid.
    pub fn is_valid(&self) -> bool {
        self.port.is_some() || self.adaptation.is_none()
    }

    /// True when connected to some port.
    pub fn is_connected(&self) -> bool {
        self.is_valid() && self.port.is_some()
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.port {
            Some(port) => {
                write!(f, "{}", port)?;
                if let Some(adaptation) = &self.adaptation {
                    write!(f, " {}", adaptation)?;
                }
                Ok(())
            }
            None => write!(f, "()"),
        }
    }
}

/// A wire: `( [luid] wire source => target {, target} )`.
///
/// A wire has one source and at least one target.
#[derive(Debug)]
pub struct Wire {
    pub luid: Option<Luid>,
    pub source: Connection,
    pub targets: Vec<Connection>,
    pub span: Span,
}

impl Wire {
    pub fn has_target(&self) -> bool {
        !self.targets.is_empty()
    }
}

impl fmt::Display for Wire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        if let Some(luid) = &self.luid {
            write!(f, "{} ", luid)?;
        }
        write!(f, "wire {} =>", self.source)?;
        for (i, target) in self.targets.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {}", target)?;
        }
        write!(f, ")")
    }
}

/// A resolved wire endpoint: a diagram object, or a boundary port of the
/// enclosing operator (`self`, or an open `()` endpoint).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Object(ObjectId),
    /// The enclosing recursive instance, `self`.
    SelfBoundary,
    /// An open `()` endpoint.
    Open,
}

/// A one-hop neighbor of a diagram object: the resolved endpoint and the
/// far connection's group adaptation (the port identification at the far
/// end), when present.
#[derive(Debug)]
pub struct Neighbor<'d> {
    pub endpoint: Endpoint,
    pub adaptation: Option<&'d GroupAdaptation>,
}

/// A neighbor reached through any number of bars: the final endpoint and
/// the adaptations encountered along the way, in flow order.
#[derive(Debug)]
pub struct ResolvedNeighbor<'d> {
    pub endpoint: Endpoint,
    pub adaptations: Vec<&'d GroupAdaptation>,
}

/// Traversal direction of the bar-resolving helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Sources,
    Targets,
}

/// A diagram: objects and the wires connecting them.
#[derive(Debug)]
pub struct Diagram {
    objects: Vec<DiagramObject>,
    wires: Vec<Wire>,
    by_luid: HashMap<Luid, ObjectId>,
    span: Span,
}

impl Diagram {
    /// Build a diagram, checking the wiring invariant: every wire endpoint
    /// must reference a LUID declared by an object of this diagram (or be a
    /// `self`/open boundary endpoint).
    pub fn new(
        objects: Vec<DiagramObject>,
        wires: Vec<Wire>,
        span: Span,
    ) -> Result<Self, StructuralError> {
        let mut by_luid = HashMap::new();
        for (index, object) in objects.iter().enumerate() {
            if let Some(luid) = object.luid {
                by_luid.insert(luid, ObjectId(index));
            }
        }
        for wire in &wires {
            for connection in std::iter::once(&wire.source).chain(wire.targets.iter()) {
                if let Some(PortRef::Luid(luid)) = connection.port {
                    if !by_luid.contains_key(&luid) {
                        return Err(StructuralError::DanglingWireEndpoint {
                            luid: luid.value(),
                        });
                    }
                }
            }
        }
        log::trace!(objects = objects.len(), wires = wires.len(); "diagram built");
        Ok(Self {
            objects,
            wires,
            by_luid,
            span,
        })
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// The objects with their handles, in declaration order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &DiagramObject)> {
        self.objects
            .iter()
            .enumerate()
            .map(|(index, object)| (ObjectId(index), object))
    }

    pub fn object(&self, id: ObjectId) -> &DiagramObject {
        &self.objects[id.0]
    }

    pub fn wires(&self) -> &[Wire] {
        &self.wires
    }

    /// Resolve a LUID to its object handle.
    pub fn resolve(&self, luid: Luid) -> Option<ObjectId> {
        self.by_luid.get(&luid).copied()
    }

    /// Find the first object satisfying a predicate.
    pub fn find_object(
        &self,
        mut predicate: impl FnMut(&DiagramObject) -> bool,
    ) -> Option<(ObjectId, &DiagramObject)> {
        self.objects().find(|(_, object)| predicate(object))
    }

    fn endpoint_of(&self, connection: &Connection) -> Endpoint {
        match connection.port {
            Some(PortRef::Luid(luid)) => {
                // construction validated every wired LUID
                Endpoint::Object(self.by_luid[&luid])
            }
            Some(PortRef::SelfRef) => Endpoint::SelfBoundary,
            None => Endpoint::Open,
        }
    }

    fn connects_to(&self, connection: &Connection, id: ObjectId) -> bool {
        matches!(connection.port, Some(PortRef::Luid(luid)) if self.by_luid.get(&luid) == Some(&id))
    }

    /// The objects directly wired to the inputs of `id`: for every wire
    /// targeting `id`, the wire's resolved source endpoint, paired with the
    /// source connection's adaptation.
    ///
    /// One hop only — multi-hop traversals are composed by the caller.
    pub fn sources(&self, id: ObjectId) -> Vec<Neighbor<'_>> {
        let mut neighbors = Vec::new();
        for wire in &self.wires {
            if wire.targets.iter().any(|t| self.connects_to(t, id)) {
                neighbors.push(Neighbor {
                    endpoint: self.endpoint_of(&wire.source),
                    adaptation: wire.source.adaptation.as_ref(),
                });
            }
        }
        neighbors
    }

    /// The objects directly wired to the outputs of `id`: for every wire
    /// sourced at `id`, each resolved target endpoint, paired with that
    /// target connection's adaptation.
    ///
    /// One hop only — multi-hop traversals are composed by the caller.
    pub fn targets(&self, id: ObjectId) -> Vec<Neighbor<'_>> {
        let mut neighbors = Vec::new();
        for wire in &self.wires {
            if self.connects_to(&wire.source, id) {
                for target in &wire.targets {
                    neighbors.push(Neighbor {
                        endpoint: self.endpoint_of(target),
                        adaptation: target.adaptation.as_ref(),
                    });
                }
            }
        }
        neighbors
    }

    /// Like [`Diagram::sources`], but traverses through bars: when a direct
    /// source is a bar, its own sources are reported instead. The
    /// adaptations declared on every crossed connection — leaving the far
    /// object and entering each bar — are accumulated in flow order, so the
    /// caller sees the renaming pipeline the bar declares.
    ///
    /// `visited` guards against feedback cycles threading through bars; the
    /// caller may pass an empty set. Bars already visited are reported as
    /// ordinary endpoints rather than traversed again.
    pub fn sources_through_bars(
        &self,
        id: ObjectId,
        visited: &mut Vec<ObjectId>,
    ) -> Vec<ResolvedNeighbor<'_>> {
        self.through_bars(id, visited, Direction::Sources)
    }

    /// Like [`Diagram::targets`], but traverses through bars. See
    /// [`Diagram::sources_through_bars`].
    pub fn targets_through_bars(
        &self,
        id: ObjectId,
        visited: &mut Vec<ObjectId>,
    ) -> Vec<ResolvedNeighbor<'_>> {
        self.through_bars(id, visited, Direction::Targets)
    }

    /// One step against flow direction: for each wire entering `id`, the far
    /// endpoint and the adaptation chain `[source-side, target-side]` of the
    /// crossed wire, in flow order.
    fn step_back(&self, id: ObjectId) -> Vec<ResolvedNeighbor<'_>> {
        let mut neighbors = Vec::new();
        for wire in &self.wires {
            for target in &wire.targets {
                if self.connects_to(target, id) {
                    let adaptations = [&wire.source.adaptation, &target.adaptation]
                        .into_iter()
                        .filter_map(|a| a.as_ref())
                        .collect();
                    neighbors.push(ResolvedNeighbor {
                        endpoint: self.endpoint_of(&wire.source),
                        adaptations,
                    });
                }
            }
        }
        neighbors
    }

    /// One step along flow direction; see [`Diagram::step_back`].
    fn step_forward(&self, id: ObjectId) -> Vec<ResolvedNeighbor<'_>> {
        let mut neighbors = Vec::new();
        for wire in &self.wires {
            if self.connects_to(&wire.source, id) {
                for target in &wire.targets {
                    let adaptations = [&wire.source.adaptation, &target.adaptation]
                        .into_iter()
                        .filter_map(|a| a.as_ref())
                        .collect();
                    neighbors.push(ResolvedNeighbor {
                        endpoint: self.endpoint_of(target),
                        adaptations,
                    });
                }
            }
        }
        neighbors
    }

    fn through_bars(
        &self,
        id: ObjectId,
        visited: &mut Vec<ObjectId>,
        direction: Direction,
    ) -> Vec<ResolvedNeighbor<'_>> {
        let step = match direction {
            Direction::Sources => Self::step_back,
            Direction::Targets => Self::step_forward,
        };
        let mut resolved = Vec::new();
        for neighbor in step(self, id) {
            match neighbor.endpoint {
                Endpoint::Object(next) if self.object(next).is_bar() => {
                    if visited.contains(&next) {
                        // feedback through a bar: report the bar itself
                        resolved.push(neighbor);
                        continue;
                    }
                    visited.push(next);
                    for deeper in self.through_bars(next, visited, direction) {
                        // flow order: sources walk backwards, so the deeper
                        // hop's adaptations come first
                        let chain = match direction {
                            Direction::Sources => {
                                let mut chain = deeper.adaptations;
                                chain.extend(neighbor.adaptations.iter().copied());
                                chain
                            }
                            Direction::Targets => {
                                let mut chain = neighbor.adaptations.clone();
                                chain.extend(deeper.adaptations);
                                chain
                            }
                        };
                        resolved.push(ResolvedNeighbor {
                            endpoint: deeper.endpoint,
                            adaptations: chain,
                        });
                    }
                }
                _ => resolved.push(neighbor),
            }
        }
        resolved
    }
}

impl fmt::Display for Diagram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "diagram")?;
        for object in &self.objects {
            write!(f, "\n    {}", object)?;
        }
        for wire in &self.wires {
            write!(f, "\n    {}", wire)?;
        }
        Ok(())
    }
}
