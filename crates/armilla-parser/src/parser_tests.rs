//! Parser unit tests: canonical round-trips and failure recovery.

use armilla_core::equation::EquationKind;
use armilla_core::identifier::ModulePath;
use armilla_core::markup::Markup;
use armilla_core::module::{DeclKind, GlobalDeclKind, ModuleKind, OperatorBody};
use armilla_core::scope::ScopeSection;

use crate::{declaration, equation, expression, module_body, module_interface};

fn body(source: &str) -> crate::ParsedUnit {
    let name = ModulePath::parse("M").unwrap();
    module_body(&name, source).expect("module body should parse")
}

/// Parse a canonical source and check the renderer reproduces it exactly.
fn round_trip(source: &str) {
    let unit = body(source);
    assert!(
        unit.diagnostics.is_empty(),
        "unexpected diagnostics for {:?}: {:?}",
        source,
        unit.diagnostics
    );
    assert_eq!(unit.module.to_string(), source);
}

#[test]
fn test_const_round_trip() {
    round_trip("const limit: int32 = 100;");
    round_trip("const speed: float32;");
}

#[test]
fn test_type_round_trip() {
    round_trip("type speed = float32;");
    round_trip("type opaque;");
    round_trip("type switch = enum {On, Off};");
    round_trip("type point = {x: int32, y: int32};");
    round_trip("type buffer = int32^8;");
    round_trip("type opt = Some { int32 } | None {};");
}

#[test]
fn test_sensor_and_group_round_trip() {
    round_trip("sensor temp: float32;");
    round_trip("group pair = (int32, int32);");
    round_trip("group mixed = (int32, n: bool);");
}

#[test]
fn test_use_round_trip() {
    round_trip("use Car::Control;");
    round_trip("use Car::Control as Ctl;");
}

#[test]
fn test_operator_with_equation_body() {
    round_trip(
        "function Add (a: int32; b: int32) returns (o: int32)\n  o = a + b;",
    );
}

#[test]
fn test_operator_with_scope_body() {
    round_trip(
        "node Counter (tick: bool) returns (count: int32)\n{\nvar\n    x: int32;\nlet\n    count = 0 -> pre count + 1;\n}",
    );
}

#[test]
fn test_operator_without_body() {
    round_trip("node Engine (cmd: float32) returns (torque: float32);");
}

#[test]
fn test_interface_signature() {
    let name = ModulePath::parse("M").unwrap();
    let unit = module_interface(
        &name,
        "node Engine (cmd: float32) returns (torque: float32);",
    )
    .unwrap();
    assert_eq!(unit.module.kind(), ModuleKind::Interface);
    assert_eq!(
        unit.module.declarations()[0].decl_kind(),
        DeclKind::Signature
    );
}

#[test]
fn test_signature_with_constraint() {
    round_trip(
        "function Sum <<n>> (a: 'T^n) returns (o: 'T) where 'T numeric\n  o = a[0];",
    );
}

#[test]
fn test_inline_operator() {
    round_trip("inline function Id (i: int32) returns (o: int32)\n  o = i;");
}

#[test]
fn test_diagram_round_trip() {
    round_trip(
        "node Ctl (i: int32) returns (o: int32)\n{\ndiagram\n    (#0 expr i)\n    (#1 def o)\n    (#2 wire #0 => #1)\n}",
    );
}

#[test]
fn test_diagram_with_bar_and_adaptation() {
    round_trip(
        "node Ctl (i0: int32; i1: int32) returns (o: int32)\n{\ndiagram\n    (#0 group)\n    (#1 expr i0)\n    (#2 expr i1)\n    (#3 group byname)\n    (#4 def o)\n    (#5 wire #1 => #0 .(a))\n    (#6 wire #2 => #0 .(b))\n    (#7 wire #0 => #3)\n    (#8 wire #3 .(a) => #4)\n}",
    );
}

#[test]
fn test_diagram_block_round_trip() {
    round_trip(
        "node Ctl (i: int32) returns (o: int32)\n{\ndiagram\n    (#0 expr i)\n    (#1 block (Saturate))\n    (#2 def o)\n    (#3 wire #0 => #1)\n    (#4 wire #1 => #2)\n}",
    );
}

#[test]
fn test_automaton_round_trip() {
    round_trip(
        "node SM (go: bool) returns (o: int32)\n{\nlet\n    o : automaton\ninitial state Run:\nlet\n    o = 1;\nstate Idle:\nunless\nif (go) restart Run;;\n}",
    );
}

#[test]
fn test_activate_if_round_trip() {
    round_trip(
        "node Act (c: bool) returns (o: int32)\n{\nlet\n    o : activate\nif c then o = 1;\nelse o = 0;;\n}",
    );
}

#[test]
fn test_protected_declaration_round_trip() {
    round_trip("{const% const c: ; %const}");
    round_trip("{text%node N (i: int32) returns (o: int32) o = i;%text}");
}

#[test]
fn test_expression_round_trips() {
    for source in [
        "CruiseSpeed - CarSpeed",
        "a + b * c",
        "(a + b) * c",
        "if on then 1 else 0",
        "x when not c",
        "x when match M::On",
        "(x :> float64)",
        "(case state of | On: 1 | _: 0)",
        "merge (a) (b)",
        "window <<3>> (x) (0)",
        "pre x",
        "last 'x",
        "bundle .(a: b, 2)",
        "t[0]",
        "t[1 .. 2]",
        "s.field",
        "(s with .f = 5)",
        "[1, 2, 3]",
        "{x: 1, y: 2} : point",
        "Saturate (x)",
        "Filter <<3>> (x)",
        "(map Incr) <<8>> (v)",
        "(restart Ctl every reset) (x)",
        "(activate Ctl every c) (x)",
        "(Add \\ 1, _) (x)",
        "-8_i16",
        "2.5e-3_f64",
        "true and false or c",
    ] {
        let expr = expression(source).unwrap_or_else(|e| {
            panic!("expression {:?} should parse: {}", source, e);
        });
        assert_eq!(expr.to_string(), source);
    }
}

#[test]
fn test_standalone_equation() {
    let eq = equation("o = a + b;").unwrap();
    assert_eq!(eq.to_string(), "o = a + b;");

    let eq = equation("x, _ = f (a);").unwrap();
    assert_eq!(eq.to_string(), "x, _ = f (a);");

    let eq = equation("() = Trace (a);").unwrap();
    assert_eq!(eq.to_string(), "() = Trace (a);");
}

#[test]
fn test_standalone_declaration() {
    let decl = declaration("const c: int32 = 5;").unwrap();
    assert_eq!(decl.decl_kind(), DeclKind::Const);
}

#[test]
fn test_trailing_input_is_rejected() {
    assert!(expression("a + b extra").is_err());
}

#[test]
fn test_invalid_equation_is_protected_not_fatal() {
    let source =
        "node M (i: int32) returns (o: int32)\n{\nlet\n    o = i;\n    p = ;\n    q = i;\n}";
    let unit = body(source);
    assert_eq!(unit.diagnostics.len(), 1);

    let decl = &unit.module.declarations()[0];
    let operator = decl.as_operator().unwrap();
    let OperatorBody::Scope(scope) = &operator.body else {
        panic!("expected scope body");
    };
    let ScopeSection::Let { equations, .. } = &scope.sections[0] else {
        panic!("expected let section");
    };
    assert_eq!(equations.len(), 3);
    assert!(!equations[0].is_protected());
    assert!(equations[1].is_protected());
    assert!(!equations[2].is_protected());

    // the protected equation preserves the source bytes exactly
    let EquationKind::Protected(item) = &equations[1].kind else {
        panic!("expected protected equation");
    };
    assert_eq!(item.data(), "p = ;");

    // and the whole module still renders back to the original text
    assert_eq!(unit.module.to_string(), source);
}

#[test]
fn test_invalid_declaration_is_protected_not_fatal() {
    let source = "const limit: int32 = 100;\nconst broken: = ;\nsensor temp: float32;";
    let unit = body(source);
    assert_eq!(unit.diagnostics.len(), 1);
    let kinds: Vec<_> = unit
        .module
        .declarations()
        .iter()
        .map(|d| d.decl_kind())
        .collect();
    assert_eq!(
        kinds,
        vec![DeclKind::Const, DeclKind::Protected, DeclKind::Sensor]
    );

    let GlobalDeclKind::Protected(item) = &unit.module.declarations()[1].kind else {
        panic!("expected protected declaration");
    };
    assert!(item.has_markup(Markup::Const));
    assert_eq!(item.data(), "const broken: = ;");
}

#[test]
fn test_duplicate_declarations_fail_the_unit() {
    let name = ModulePath::parse("M").unwrap();
    let result = module_body(&name, "const c: int32;\nconst c: int32;");
    assert!(result.is_err());
}

#[test]
fn test_state_machine_with_two_initial_states_is_protected() {
    // the machine breaks a structural invariant, so the equation is
    // preserved verbatim rather than structured
    let source = "node SM (go: bool) returns (o: int32)\n{\nlet\n    o : automaton\ninitial state A:\nlet\n    o = 1;\ninitial state B:\nlet\n    o = 2;;\n}";
    let unit = body(source);
    assert!(!unit.diagnostics.is_empty());
    let operator = unit.module.declarations()[0].as_operator().unwrap();
    let OperatorBody::Scope(scope) = &operator.body else {
        panic!("expected scope body");
    };
    let ScopeSection::Let { equations, .. } = &scope.sections[0] else {
        panic!("expected let section");
    };
    assert!(equations[0].is_protected());
}

#[test]
fn test_dangling_wire_is_protected() {
    let source = "node Ctl (i: int32) returns (o: int32)\n{\ndiagram\n    (#0 expr i)\n    (#1 wire #0 => #9)\n}";
    let unit = body(source);
    assert!(!unit.diagnostics.is_empty());
    // the whole operator is preserved verbatim
    assert!(unit.module.declarations()[0].is_protected());
    assert_eq!(unit.module.to_string(), source);
}

#[test]
fn test_module_paths() {
    let name = ModulePath::parse("Car::Control").unwrap();
    let unit = module_body(&name, "const limit: int32;").unwrap();
    let decl = &unit.module.declarations()[0];
    assert_eq!(
        unit.module.full_path_of(decl).unwrap(),
        "Car::Control::limit"
    );
}
