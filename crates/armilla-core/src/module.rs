//! Modules and global declarations.
//!
//! A module is an ordered collection of global declarations, either a body
//! (implementation) or an interface (signatures only). Declarations within a
//! module share one namespace: types, constants, groups, sensors and
//! operators may not collide.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::equation::Equation;
use crate::error::{StructuralError, UsageError};
use crate::expr::Expr;
use crate::identifier::{Id, Ident, ModulePath, PathId, Pragma};
use crate::markup::ProtectedItem;
use crate::scope::Scope;
use crate::span::Span;
use crate::types::{GroupTypeExpr, NumericKind, TypeDefinition, TypeExpr};
use crate::variable::Variable;

/// Module kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    /// An implementation (`.arm` unit).
    Body,
    /// Signatures only (`.armi` unit).
    Interface,
}

/// Declaration kinds, for narrowed queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    Type,
    Const,
    Sensor,
    Group,
    Operator,
    Signature,
    Use,
    Protected,
}

/// `type id [= definition];`
#[derive(Debug)]
pub struct TypeDecl {
    pub id: Ident,
    pub definition: Option<TypeDefinition>,
    pub span: Span,
}

impl fmt::Display for TypeDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type {}", self.id)?;
        if let Some(definition) = &self.definition {
            write!(f, " = {}", definition)?;
        }
        write!(f, ";")
    }
}

/// `const id: type [= expr];`
#[derive(Debug)]
pub struct ConstDecl {
    pub id: Ident,
    pub ty: TypeExpr,
    pub value: Option<Expr>,
    pub span: Span,
}

impl fmt::Display for ConstDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "const {}: {}", self.id, self.ty)?;
        if let Some(value) = &self.value {
            write!(f, " = {}", value)?;
        }
        write!(f, ";")
    }
}

/// `sensor id: type;`
#[derive(Debug)]
pub struct SensorDecl {
    pub id: Ident,
    pub ty: TypeExpr,
    pub span: Span,
}

impl fmt::Display for SensorDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sensor {}: {};", self.id, self.ty)
    }
}

/// `group id = group_type_expr;`
#[derive(Debug)]
pub struct GroupDecl {
    pub id: Ident,
    pub ty: GroupTypeExpr,
    pub span: Span,
}

impl fmt::Display for GroupDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group {} = {};", self.id, self.ty)
    }
}

/// `use path [as alias];`
#[derive(Debug)]
pub struct UseDirective {
    pub path: PathId,
    pub alias: Option<Ident>,
    pub span: Span,
}

impl fmt::Display for UseDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "use {}", self.path)?;
        if let Some(alias) = &self.alias {
            write!(f, " as {}", alias)?;
        }
        write!(f, ";")
    }
}

/// The type-variable list of a constraint; protected when it could not be
/// structured.
#[derive(Debug)]
pub enum ConstraintVars {
    Vars(Vec<Ident>),
    Protected(ProtectedItem),
}

/// A generic type constraint: `where 'T {, 'U} numeric_kind`.
#[derive(Debug)]
pub struct TypeConstraint {
    pub vars: ConstraintVars,
    pub kind: NumericKind,
    pub span: Span,
}

impl fmt::Display for TypeConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "where ")?;
        match &self.vars {
            ConstraintVars::Vars(vars) => {
                for (i, var) in vars.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", var)?;
                }
            }
            ConstraintVars::Protected(item) => write!(f, "{}", item)?,
        }
        write!(f, " {}", self.kind)
    }
}

/// An operator signature: name, ordered parameter lists, size parameters,
/// constraints and specialization. In an interface this is the whole
/// declaration; in a body it heads an [`Operator`].
#[derive(Debug)]
pub struct Signature {
    pub id: Ident,
    pub is_node: bool,
    pub is_inline: bool,
    pub inputs: Vec<Variable>,
    pub outputs: Vec<Variable>,
    pub sizes: Vec<Ident>,
    pub constraints: Vec<TypeConstraint>,
    pub specialization: Option<PathId>,
    pub pragmas: Vec<Pragma>,
    pub span: Span,
}

impl Signature {
    fn write_decl(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_inline {
            write!(f, "inline ")?;
        }
        write!(f, "{}", if self.is_node { "node" } else { "function" })?;
        for pragma in &self.pragmas {
            write!(f, " {}", pragma)?;
        }
        write!(f, " {}", self.id)?;
        if !self.sizes.is_empty() {
            let sizes = self
                .sizes
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, " <<{}>>", sizes)?;
        }
        let vars = |list: &[Variable]| {
            list.iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        };
        write!(f, " ({}) returns ({})", vars(&self.inputs), vars(&self.outputs))?;
        for constraint in &self.constraints {
            write!(f, " {}", constraint)?;
        }
        if let Some(specialization) = &self.specialization {
            write!(f, " specialize {}", specialization)?;
        }
        Ok(())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_decl(f)?;
        write!(f, ";")
    }
}

/// An operator body.
#[derive(Debug)]
pub enum OperatorBody {
    /// Declared without a body.
    None,
    /// A single equation.
    Equation(Box<Equation>),
    /// A scope.
    Scope(Scope),
}

impl OperatorBody {
    pub fn is_none(&self) -> bool {
        matches!(self, OperatorBody::None)
    }
}

/// A user-defined operator: a signature plus an optional body.
#[derive(Debug)]
pub struct Operator {
    pub signature: Signature,
    pub body: OperatorBody,
    /// True when the operator was given textually, from a `{text%...%text}`
    /// markup.
    pub is_text: bool,
    pub span: Span,
}

impl Operator {
    pub fn id(&self) -> &Ident {
        &self.signature.id
    }

    pub fn has_body(&self) -> bool {
        !self.body.is_none()
    }

    /// The diagrams of the operator body, in section order.
    pub fn diagrams(&self) -> impl Iterator<Item = &crate::diagram::Diagram> {
        let scope = match &self.body {
            OperatorBody::Scope(scope) => Some(scope),
            _ => None,
        };
        scope.into_iter().flat_map(Scope::diagrams)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.signature.write_decl(f)?;
        match &self.body {
            OperatorBody::None => write!(f, ";"),
            OperatorBody::Equation(equation) => write!(f, "\n  {}", equation),
            OperatorBody::Scope(scope) => write!(f, "\n{}", scope),
        }
    }
}

/// A global declaration node.
#[derive(Debug)]
pub struct GlobalDecl {
    pub kind: GlobalDeclKind,
    pub span: Span,
}

/// The closed set of global declaration variants.
#[derive(Debug)]
pub enum GlobalDeclKind {
    Type(TypeDecl),
    Const(ConstDecl),
    Sensor(SensorDecl),
    Group(GroupDecl),
    Operator(Operator),
    Signature(Signature),
    Use(UseDirective),
    /// A declaration that could not be structured.
    Protected(ProtectedItem),
}

impl GlobalDecl {
    pub fn new(kind: GlobalDeclKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The narrowed kind tag of this declaration.
    pub fn decl_kind(&self) -> DeclKind {
        match &self.kind {
            GlobalDeclKind::Type(_) => DeclKind::Type,
            GlobalDeclKind::Const(_) => DeclKind::Const,
            GlobalDeclKind::Sensor(_) => DeclKind::Sensor,
            GlobalDeclKind::Group(_) => DeclKind::Group,
            GlobalDeclKind::Operator(_) => DeclKind::Operator,
            GlobalDeclKind::Signature(_) => DeclKind::Signature,
            GlobalDeclKind::Use(_) => DeclKind::Use,
            GlobalDeclKind::Protected(_) => DeclKind::Protected,
        }
    }

    /// The declared identifier, when the declaration has one. Use
    /// directives and protected declarations have none.
    pub fn identifier(&self) -> Option<&Ident> {
        match &self.kind {
            GlobalDeclKind::Type(decl) => Some(&decl.id),
            GlobalDeclKind::Const(decl) => Some(&decl.id),
            GlobalDeclKind::Sensor(decl) => Some(&decl.id),
            GlobalDeclKind::Group(decl) => Some(&decl.id),
            GlobalDeclKind::Operator(op) => Some(op.id()),
            GlobalDeclKind::Signature(sig) => Some(&sig.id),
            GlobalDeclKind::Use(_) | GlobalDeclKind::Protected(_) => None,
        }
    }

    pub fn as_operator(&self) -> Option<&Operator> {
        match &self.kind {
            GlobalDeclKind::Operator(op) => Some(op),
            _ => None,
        }
    }

    pub fn is_protected(&self) -> bool {
        matches!(self.kind, GlobalDeclKind::Protected(_))
    }
}

impl fmt::Display for GlobalDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            GlobalDeclKind::Type(decl) => write!(f, "{}", decl),
            GlobalDeclKind::Const(decl) => write!(f, "{}", decl),
            GlobalDeclKind::Sensor(decl) => write!(f, "{}", decl),
            GlobalDeclKind::Group(decl) => write!(f, "{}", decl),
            GlobalDeclKind::Operator(op) => write!(f, "{}", op),
            GlobalDeclKind::Signature(sig) => write!(f, "{}", sig),
            GlobalDeclKind::Use(use_directive) => write!(f, "{}", use_directive),
            GlobalDeclKind::Protected(item) => write!(f, "{}", item),
        }
    }
}

/// A module: a named, ordered collection of global declarations.
///
/// A module owns its declarations exclusively. Construction checks the
/// namespace invariant: named declarations are unique within the module.
#[derive(Debug)]
pub struct Module {
    kind: ModuleKind,
    name: ModulePath,
    declarations: Vec<GlobalDecl>,
    span: Span,
}

impl Module {
    pub fn new(
        kind: ModuleKind,
        name: ModulePath,
        declarations: Vec<GlobalDecl>,
        span: Span,
    ) -> Result<Self, StructuralError> {
        let mut seen: HashSet<Id> = HashSet::new();
        for declaration in &declarations {
            if let Some(ident) = declaration.identifier() {
                if !seen.insert(ident.id()) {
                    return Err(StructuralError::DuplicateDeclaration {
                        module: name.full_name(),
                        name: ident.id().resolve(),
                    });
                }
            }
        }
        Ok(Self {
            kind,
            name,
            declarations,
            span,
        })
    }

    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    pub fn name(&self) -> &ModulePath {
        &self.name
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// The declarations, in source order.
    pub fn declarations(&self) -> &[GlobalDecl] {
        &self.declarations
    }

    /// The use directives, in source order.
    pub fn use_directives(&self) -> impl Iterator<Item = &UseDirective> {
        self.declarations.iter().filter_map(|d| match &d.kind {
            GlobalDeclKind::Use(use_directive) => Some(use_directive),
            _ => None,
        })
    }

    /// Append declarations from a further lazy parse. The sequence only
    /// grows; existing entries are never replaced or reordered.
    pub fn append_declarations(
        &mut self,
        declarations: Vec<GlobalDecl>,
    ) -> Result<(), StructuralError> {
        let mut seen: HashSet<Id> = self
            .declarations
            .iter()
            .filter_map(|d| d.identifier().map(Ident::id))
            .collect();
        for declaration in &declarations {
            if let Some(ident) = declaration.identifier() {
                if !seen.insert(ident.id()) {
                    return Err(StructuralError::DuplicateDeclaration {
                        module: self.name.full_name(),
                        name: ident.id().resolve(),
                    });
                }
            }
        }
        self.declarations.extend(declarations);
        Ok(())
    }

    /// Full path of the module itself.
    pub fn full_path(&self) -> String {
        self.name.full_name()
    }

    /// Full dotted path of a declaration of this module, composed from the
    /// module name. Signals a usage error for declarations without an
    /// identifier.
    pub fn full_path_of(&self, declaration: &GlobalDecl) -> Result<String, UsageError> {
        let ident = declaration
            .identifier()
            .ok_or(UsageError::UnnamedDeclaration)?;
        Ok(format!("{}::{}", self.name.full_name(), ident.id()))
    }

    /// Find a declaration by name.
    pub fn find(&self, name: Id) -> Option<&GlobalDecl> {
        self.declarations
            .iter()
            .find(|d| d.identifier().map(Ident::id) == Some(name))
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, declaration) in self.declarations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", declaration)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PredefinedType, TypeExprKind};

    fn ident(name: &str) -> Ident {
        Ident::new(Id::new(name), Span::default())
    }

    fn int32() -> TypeExpr {
        TypeExpr::new(
            TypeExprKind::Predefined(PredefinedType::Int32),
            Span::default(),
        )
    }

    fn const_decl(name: &str) -> GlobalDecl {
        GlobalDecl::new(
            GlobalDeclKind::Const(ConstDecl {
                id: ident(name),
                ty: int32(),
                value: None,
                span: Span::default(),
            }),
            Span::default(),
        )
    }

    fn module_path(name: &str) -> ModulePath {
        ModulePath::parse(name).unwrap()
    }

    #[test]
    fn test_namespace_invariant() {
        let err = Module::new(
            ModuleKind::Body,
            module_path("M"),
            vec![const_decl("c"), const_decl("c")],
            Span::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            StructuralError::DuplicateDeclaration {
                module: "M".into(),
                name: "c".into(),
            }
        );
    }

    #[test]
    fn test_append_only_growth() {
        let mut module = Module::new(
            ModuleKind::Body,
            module_path("M"),
            vec![const_decl("a")],
            Span::default(),
        )
        .unwrap();

        module.append_declarations(vec![const_decl("b")]).unwrap();
        assert_eq!(module.declarations().len(), 2);

        // appending a duplicate is rejected and leaves the module unchanged
        let err = module.append_declarations(vec![const_decl("a")]).unwrap_err();
        assert!(matches!(err, StructuralError::DuplicateDeclaration { .. }));
        assert_eq!(module.declarations().len(), 2);
    }

    #[test]
    fn test_full_path_of() {
        let module = Module::new(
            ModuleKind::Body,
            module_path("Car::Control"),
            vec![const_decl("limit")],
            Span::default(),
        )
        .unwrap();
        let decl = &module.declarations()[0];
        assert_eq!(module.full_path_of(decl).unwrap(), "Car::Control::limit");
    }

    #[test]
    fn test_full_path_of_unnamed_declaration_is_usage_error() {
        let module = Module::new(
            ModuleKind::Body,
            module_path("M"),
            vec![GlobalDecl::new(
                GlobalDeclKind::Use(UseDirective {
                    path: PathId::from_parts(&["Other"]),
                    alias: None,
                    span: Span::default(),
                }),
                Span::default(),
            )],
            Span::default(),
        )
        .unwrap();
        let decl = &module.declarations()[0];
        assert_eq!(
            module.full_path_of(decl).unwrap_err(),
            UsageError::UnnamedDeclaration
        );
    }

    #[test]
    fn test_display() {
        let module = Module::new(
            ModuleKind::Body,
            module_path("M"),
            vec![const_decl("a"), const_decl("b")],
            Span::default(),
        )
        .unwrap();
        assert_eq!(module.to_string(), "const a: int32;\nconst b: int32;");
    }
}
