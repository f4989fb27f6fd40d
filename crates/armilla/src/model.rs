//! The Model: lazy loading and cross-module lookup.
//!
//! A model holds an ordered set of source units and pulls them through the
//! parser collaborator one at a time, on demand. The module cache is
//! append-only: once a unit is structured its module never changes, so
//! repeated queries do memoized, monotonically-increasing work.
//!
//! All laziness is cooperative, pull-based iteration inside one thread of
//! control. A model must not be driven from multiple threads; callers
//! serialize access externally.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use armilla_core::error::UsageError;
use armilla_core::identifier::ModulePath;
use armilla_core::markup::{Markup, ProtectedItem};
use armilla_core::module::{DeclKind, GlobalDecl, GlobalDeclKind, Module, Operator};
use armilla_core::span::Span;
use armilla_parser::Diagnostic;

use crate::source::{ArmillaParser, ModelError, SourceUnit, UnitParser};

/// A loaded unit: its module and the diagnostics its parse produced.
#[derive(Debug, Clone)]
struct Loaded {
    module: Rc<Module>,
    diagnostics: Rc<[Diagnostic]>,
}

/// A reference to a declaration inside a loaded module.
///
/// The handle keeps its module alive and is what query iterators yield;
/// callers read the declaration through [`DeclRef::decl`].
#[derive(Debug, Clone)]
pub struct DeclRef {
    module: Rc<Module>,
    index: usize,
}

impl DeclRef {
    /// The enclosing module.
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// The referenced declaration.
    pub fn decl(&self) -> &GlobalDecl {
        &self.module.declarations()[self.index]
    }

    /// The narrowed kind tag of the declaration.
    pub fn kind(&self) -> DeclKind {
        self.decl().decl_kind()
    }

    /// The referenced operator, when the declaration is one.
    pub fn as_operator(&self) -> Option<&Operator> {
        self.decl().as_operator()
    }

    /// Full dotted path of the declaration, composed from the enclosing
    /// module name. Signals a usage error for unnamed declarations.
    pub fn full_path(&self) -> Result<String, UsageError> {
        self.module.full_path_of(self.decl())
    }
}

/// The aggregate of all modules belonging to a loaded set of sources.
///
/// Owns the lazy-loading policy and the cross-module query surface. Units
/// are visited in insertion order; declarations in module order then
/// in-module order — this ordering is part of the observable contract.
pub struct Model {
    units: IndexMap<ModulePath, SourceUnit>,
    cache: RefCell<Vec<Option<Loaded>>>,
    parser: Box<dyn UnitParser>,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("units", &self.units.len())
            .field(
                "loaded",
                &self.cache.borrow().iter().filter(|c| c.is_some()).count(),
            )
            .finish()
    }
}

impl Model {
    /// Build a model over the given units, using the default parser
    /// collaborator. Unit order is preserved and observable.
    pub fn new(units: Vec<SourceUnit>) -> Self {
        Self::with_parser(units, Box::new(ArmillaParser))
    }

    /// Build a model with an explicit parser collaborator.
    pub fn with_parser(units: Vec<SourceUnit>, parser: Box<dyn UnitParser>) -> Self {
        let units: IndexMap<ModulePath, SourceUnit> = units
            .into_iter()
            .map(|unit| (unit.name().clone(), unit))
            .collect();
        let cache = RefCell::new(vec![None; units.len()]);
        Self {
            units,
            cache,
            parser,
        }
    }

    /// The source units, in model order.
    pub fn units(&self) -> impl Iterator<Item = &SourceUnit> {
        self.units.values()
    }

    /// True when every unit has been structured.
    pub fn all_modules_loaded(&self) -> bool {
        self.cache.borrow().iter().all(Option::is_some)
    }

    /// Structure the unit at `index`, or return its cached module.
    ///
    /// A unit the parser cannot structure at all becomes a module holding a
    /// single protected declaration covering the whole unit — the model
    /// never aborts because of one bad unit.
    fn load(&self, index: usize) -> Loaded {
        if let Some(loaded) = &self.cache.borrow()[index] {
            return loaded.clone();
        }

        let unit = &self.units[index];
        log::debug!(module = unit.name().full_name(); "structuring unit");
        let loaded = match self.parser.structure(unit) {
            Ok(parsed) => Loaded {
                module: Rc::new(parsed.module),
                diagnostics: parsed.diagnostics.into(),
            },
            Err(error) => {
                log::warn!(
                    module = unit.name().full_name(),
                    error = error.to_string();
                    "unit could not be structured; protecting it whole"
                );
                let span = Span::new(0..unit.content().len());
                let protected = GlobalDecl::new(
                    GlobalDeclKind::Protected(ProtectedItem::from_fallback(
                        Markup::Syntax,
                        unit.content(),
                        span,
                    )),
                    span,
                );
                let module =
                    Module::new(unit.kind(), unit.name().clone(), vec![protected], span)
                        .expect("a single protected declaration breaks no invariant");
                Loaded {
                    module: Rc::new(module),
                    diagnostics: error.diagnostics().to_vec().into(),
                }
            }
        };

        self.cache.borrow_mut()[index] = Some(loaded.clone());
        loaded
    }

    /// The modules of the model, structured on demand as the iterator is
    /// consumed. Re-iterating resumes from the cache without re-parsing.
    pub fn modules(&self) -> impl Iterator<Item = Rc<Module>> + '_ {
        (0..self.units.len()).map(move |index| self.load(index).module)
    }

    /// The module of the named unit, structuring it if needed. Only the
    /// requested unit is loaded.
    pub fn module(&self, name: &ModulePath) -> Result<Rc<Module>, ModelError> {
        let index = self
            .units
            .get_index_of(name)
            .ok_or_else(|| ModelError::UnknownModule(name.full_name()))?;
        Ok(self.load(index).module)
    }

    /// The parse diagnostics of the named unit, structuring it if needed.
    pub fn diagnostics(&self, name: &ModulePath) -> Result<Rc<[Diagnostic]>, ModelError> {
        let index = self
            .units
            .get_index_of(name)
            .ok_or_else(|| ModelError::UnknownModule(name.full_name()))?;
        Ok(self.load(index).diagnostics)
    }

    /// All declarations, in module order then declaration order, structuring
    /// units only as far as the iterator is consumed.
    pub fn declarations(&self) -> impl Iterator<Item = DeclRef> + '_ {
        self.modules().flat_map(|module| {
            (0..module.declarations().len()).map(move |index| DeclRef {
                module: Rc::clone(&module),
                index,
            })
        })
    }

    /// The declarations matched by a filter.
    pub fn filter_declarations<'m, F>(&'m self, mut filter: F) -> impl Iterator<Item = DeclRef> + 'm
    where
        F: FnMut(&GlobalDecl) -> bool + 'm,
    {
        self.declarations().filter(move |d| filter(d.decl()))
    }

    /// The declarations of one kind, already narrowed.
    pub fn all_of(&self, kind: DeclKind) -> impl Iterator<Item = DeclRef> + '_ {
        self.filter_declarations(move |d| d.decl_kind() == kind)
    }

    /// Find the first declaration for which the predicate holds, structuring
    /// units one at a time until it matches. Returns `None` after exhausting
    /// every unit; already-structured modules stay cached for later calls.
    pub fn find_declaration<F>(&self, predicate: F) -> Option<DeclRef>
    where
        F: FnMut(&GlobalDecl) -> bool,
    {
        let mut predicate = predicate;
        self.declarations().find(|d| predicate(d.decl()))
    }

    /// Type declarations.
    pub fn types(&self) -> impl Iterator<Item = DeclRef> + '_ {
        self.all_of(DeclKind::Type)
    }

    /// Constant declarations.
    pub fn constants(&self) -> impl Iterator<Item = DeclRef> + '_ {
        self.all_of(DeclKind::Const)
    }

    /// Sensor declarations.
    pub fn sensors(&self) -> impl Iterator<Item = DeclRef> + '_ {
        self.all_of(DeclKind::Sensor)
    }

    /// Group declarations.
    pub fn groups(&self) -> impl Iterator<Item = DeclRef> + '_ {
        self.all_of(DeclKind::Group)
    }

    /// Operator definitions (with bodies).
    pub fn operators(&self) -> impl Iterator<Item = DeclRef> + '_ {
        self.all_of(DeclKind::Operator)
    }

    /// Operator signatures (interfaces).
    pub fn signatures(&self) -> impl Iterator<Item = DeclRef> + '_ {
        self.all_of(DeclKind::Signature)
    }
}
