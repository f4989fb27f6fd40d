//! Source units and the parser collaborator boundary.

use std::fmt;

use armilla_core::identifier::ModulePath;
use armilla_core::module::ModuleKind;
use armilla_parser::{ParseError, ParsedUnit};
use thiserror::Error;

/// Errors of the model layer.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A source unit was given a name that is not a valid module path.
    #[error("invalid module path `{0}`")]
    InvalidModulePath(String),

    /// A requested module is not part of the model.
    #[error("no unit named `{0}` in the model")]
    UnknownModule(String),
}

/// One source unit: a module body or interface, identified by a stable
/// module path and supplied as a text buffer.
///
/// Project discovery and on-disk layout are owned by the caller; the model
/// only consumes named buffers.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    name: ModulePath,
    kind: ModuleKind,
    content: String,
}

impl SourceUnit {
    /// A module body unit, e.g. `SourceUnit::body("Car::Control", text)`.
    pub fn body(name: &str, content: impl Into<String>) -> Result<Self, ModelError> {
        let name = ModulePath::parse(name)
            .ok_or_else(|| ModelError::InvalidModulePath(name.to_string()))?;
        Ok(Self {
            name,
            kind: ModuleKind::Body,
            content: content.into(),
        })
    }

    /// A module interface unit.
    pub fn interface(name: &str, content: impl Into<String>) -> Result<Self, ModelError> {
        let name = ModulePath::parse(name)
            .ok_or_else(|| ModelError::InvalidModulePath(name.to_string()))?;
        Ok(Self {
            name,
            kind: ModuleKind::Interface,
            content: content.into(),
        })
    }

    pub fn name(&self) -> &ModulePath {
        &self.name
    }

    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

impl fmt::Display for SourceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The parser collaborator boundary.
///
/// For a given unit, `structure` returns either the structured module or an
/// error; the model translates any error into a whole-unit protected
/// declaration so one bad unit never aborts the model.
pub trait UnitParser {
    fn structure(&self, unit: &SourceUnit) -> Result<ParsedUnit, ParseError>;
}

/// The default collaborator, backed by `armilla-parser`.
#[derive(Debug, Default)]
pub struct ArmillaParser;

impl UnitParser for ArmillaParser {
    fn structure(&self, unit: &SourceUnit) -> Result<ParsedUnit, ParseError> {
        match unit.kind() {
            ModuleKind::Body => armilla_parser::module_body(unit.name(), unit.content()),
            ModuleKind::Interface => {
                armilla_parser::module_interface(unit.name(), unit.content())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_unit_names() {
        let unit = SourceUnit::body("Car::Control", "const c: int32;").unwrap();
        assert_eq!(unit.name().full_name(), "Car::Control");
        assert_eq!(unit.kind(), ModuleKind::Body);

        assert!(matches!(
            SourceUnit::body("not a path", ""),
            Err(ModelError::InvalidModulePath(_))
        ));
    }

    #[test]
    fn test_default_parser_structures_units() {
        let unit = SourceUnit::body("M", "const c: int32;").unwrap();
        let parsed = ArmillaParser.structure(&unit).unwrap();
        assert_eq!(parsed.module.declarations().len(), 1);
    }
}
