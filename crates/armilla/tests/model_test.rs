//! End-to-end model tests: lazy loading, memoization, degradation.

use std::cell::Cell;
use std::rc::Rc;

use armilla::{
    ArmillaParser, DeclKind, Model, ModulePath, ParseError, ParsedUnit, SourceUnit, UnitParser,
};

/// A parser collaborator that counts how often it is invoked.
struct CountingParser {
    inner: ArmillaParser,
    calls: Rc<Cell<usize>>,
}

impl UnitParser for CountingParser {
    fn structure(&self, unit: &SourceUnit) -> Result<ParsedUnit, ParseError> {
        self.calls.set(self.calls.get() + 1);
        self.inner.structure(unit)
    }
}

fn counting_model(sources: &[(&str, &str)]) -> (Model, Rc<Cell<usize>>) {
    let calls = Rc::new(Cell::new(0));
    let units = sources
        .iter()
        .map(|(name, content)| SourceUnit::body(name, *content).unwrap())
        .collect();
    let parser = CountingParser {
        inner: ArmillaParser,
        calls: Rc::clone(&calls),
    };
    (Model::with_parser(units, Box::new(parser)), calls)
}

#[test]
fn lazy_enumeration_is_deterministic() {
    let (model, _) = counting_model(&[
        ("A", "function F1 (i: int32) returns (o: int32)\n  o = i;\nconst c: int32;"),
        ("B", "function F2 (i: int32) returns (o: int32)\n  o = i;"),
    ]);
    let first: Vec<_> = model
        .operators()
        .map(|d| d.full_path().unwrap())
        .collect();
    let second: Vec<_> = model
        .operators()
        .map(|d| d.full_path().unwrap())
        .collect();
    assert_eq!(first, vec!["A::F1", "B::F2"]);
    assert_eq!(first, second);
}

#[test]
fn lookup_work_is_memoized() {
    let (model, calls) = counting_model(&[
        ("A", "const a: int32;"),
        ("B", "const b: int32;"),
        ("C", "const c: int32;"),
    ]);

    // finding `b` structures A and B but not C
    let found = model
        .find_declaration(|d| d.identifier().is_some_and(|i| i.id() == "b"))
        .unwrap();
    assert_eq!(found.full_path().unwrap(), "B::b");
    assert_eq!(calls.get(), 2);

    // a second search over the already-structured prefix re-invokes nothing
    let found = model
        .find_declaration(|d| d.identifier().is_some_and(|i| i.id() == "a"))
        .unwrap();
    assert_eq!(found.full_path().unwrap(), "A::a");
    assert_eq!(calls.get(), 2);

    // an exhaustive miss structures the rest exactly once
    assert!(model.find_declaration(|_| false).is_none());
    assert_eq!(calls.get(), 3);
    assert!(model.find_declaration(|_| false).is_none());
    assert_eq!(calls.get(), 3);
}

#[test]
fn partial_consumption_resumes_from_cache() {
    let (model, calls) = counting_model(&[
        ("A", "const a: int32;"),
        ("B", "const b: int32;"),
        ("C", "const c: int32;"),
    ]);

    // consume only the first declaration, then abandon the iterator
    let first = model.declarations().next().unwrap();
    assert_eq!(first.full_path().unwrap(), "A::a");
    assert_eq!(calls.get(), 1);

    // re-iterating resumes from the cached prefix
    let all: Vec<_> = model
        .declarations()
        .map(|d| d.full_path().unwrap())
        .collect();
    assert_eq!(all, vec!["A::a", "B::b", "C::c"]);
    assert_eq!(calls.get(), 3);
}

#[test]
fn one_bad_unit_never_aborts_the_model() {
    let (model, _) = counting_model(&[
        ("Bad", "{syntax% this unit never closes its markup"),
        ("Good", "sensor temp: float32;"),
    ]);
    let kinds: Vec<_> = model.declarations().map(|d| d.kind()).collect();
    assert_eq!(kinds, vec![DeclKind::Protected, DeclKind::Sensor]);

    // the degraded unit still renders byte-for-byte
    let bad = model.module(&ModulePath::parse("Bad").unwrap()).unwrap();
    assert_eq!(bad.to_string(), "{syntax% this unit never closes its markup");
}

#[test]
fn typed_queries_narrow_by_kind() {
    let unit = SourceUnit::body(
        "M",
        "type speed = float32;\nconst limit: int32 = 100;\nsensor temp: float32;\ngroup pair = (int32, int32);\nfunction F (i: int32) returns (o: int32)\n  o = i;",
    )
    .unwrap();
    let interface = SourceUnit::interface(
        "N",
        "node G (i: int32) returns (o: int32);",
    )
    .unwrap();
    let model = Model::new(vec![unit, interface]);

    assert_eq!(model.types().count(), 1);
    assert_eq!(model.constants().count(), 1);
    assert_eq!(model.sensors().count(), 1);
    assert_eq!(model.groups().count(), 1);
    assert_eq!(model.operators().count(), 1);
    assert_eq!(model.signatures().count(), 1);
}

#[test]
fn cross_module_lookup_spans_dependencies() {
    // a two-module program: M's diagram instantiates N::Saturate
    let m = SourceUnit::body(
        "M",
        "use N;\nnode Ctl (i: int32) returns (o: int32)\n{\ndiagram\n    (#0 expr i)\n    (#1 block (N::Saturate))\n    (#2 def o)\n    (#3 wire #0 => #1)\n    (#4 wire #1 => #2)\n}",
    )
    .unwrap();
    let n = SourceUnit::body(
        "N",
        "function Saturate (i: int32) returns (o: int32)\n  o = if i > 100 then 100 else i;",
    )
    .unwrap();
    let model = Model::new(vec![m, n]);

    let saturate = model
        .find_declaration(|d| d.identifier().is_some_and(|i| i.id() == "Saturate"))
        .unwrap();
    assert_eq!(saturate.full_path().unwrap(), "N::Saturate");

    let ctl = model
        .find_declaration(|d| d.identifier().is_some_and(|i| i.id() == "Ctl"))
        .unwrap();
    let operator = ctl.as_operator().unwrap();
    assert_eq!(operator.diagrams().count(), 1);
}

#[test]
fn render_round_trips_through_the_model() {
    let source = "const limit: int32 = 100;\nfunction Add (a: int32; b: int32) returns (o: int32)\n  o = a + b;";
    let unit = SourceUnit::body("M", source).unwrap();
    let model = Model::new(vec![unit]);
    let module = model.module(&ModulePath::parse("M").unwrap()).unwrap();
    assert_eq!(module.to_string(), source);
}
