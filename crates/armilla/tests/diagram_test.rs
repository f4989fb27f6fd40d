//! Diagram navigation over parsed operators: one-hop wiring queries,
//! adaptation resolution through bars, feedback loops.

use armilla::core::diagram::{DiagramObjectKind, Endpoint};
use armilla::core::expr::ExprKind;
use armilla::core::identifier::Luid;
use armilla::{Diagram, Model, SourceUnit};

fn with_diagram(source: &str, f: impl FnOnce(&Diagram)) {
    let unit = SourceUnit::body("M", source).unwrap();
    let model = Model::new(vec![unit]);
    let decl = model
        .find_declaration(|d| d.identifier().is_some_and(|i| i.id() == "Ctl"))
        .expect("operator should exist");
    let operator = decl.as_operator().expect("declaration should be an operator");
    let diagram = operator.diagrams().next().expect("operator should have a diagram");
    f(diagram);
}

#[test]
fn wiring_is_navigable_in_both_directions() {
    // A.out -> B.in
    with_diagram(
        "node Ctl (i: int32) returns (o: int32)\n{\ndiagram\n    (#a expr i)\n    (#b def o)\n    (#w wire #a .(out) => #b .(in))\n}",
        |diagram| {
            let a = diagram.resolve(Luid::new("a")).unwrap();
            let b = diagram.resolve(Luid::new("b")).unwrap();

            let targets = diagram.targets(a);
            assert_eq!(targets.len(), 1);
            assert_eq!(targets[0].endpoint, Endpoint::Object(b));
            assert_eq!(targets[0].adaptation.unwrap().to_string(), ".(in)");

            let sources = diagram.sources(b);
            assert_eq!(sources.len(), 1);
            assert_eq!(sources[0].endpoint, Endpoint::Object(a));
            assert_eq!(sources[0].adaptation.unwrap().to_string(), ".(out)");
        },
    );
}

#[test]
fn traversal_symmetry_holds_for_every_wire() {
    with_diagram(
        "node Ctl (i0: int32; i1: int32) returns (o: int32)\n{\ndiagram\n    (#0 expr i0)\n    (#1 expr i1)\n    (#2 block (Max))\n    (#3 def o)\n    (#4 wire #0 => #2 .(a))\n    (#5 wire #1 => #2 .(b))\n    (#6 wire #2 => #3)\n}",
        |diagram| {
            for (id, _) in diagram.objects() {
                for target in diagram.targets(id) {
                    let Endpoint::Object(other) = target.endpoint else {
                        continue;
                    };
                    assert!(
                        diagram
                            .sources(other)
                            .iter()
                            .any(|s| s.endpoint == Endpoint::Object(id)),
                        "targets/sources are not symmetric"
                    );
                }
            }
        },
    );
}

#[test]
fn block_neighbors_match_the_wiring() {
    with_diagram(
        "node Ctl (i: int32) returns (o: int32)\n{\ndiagram\n    (#0 expr i)\n    (#1 block (Saturate))\n    (#2 def o)\n    (#3 wire #0 => #1)\n    (#4 wire #1 => #2)\n}",
        |diagram| {
            let (block_id, _) = diagram
                .find_object(|o| matches!(o.kind, DiagramObjectKind::Block { .. }))
                .unwrap();

            let sources = diagram.sources(block_id);
            assert_eq!(sources.len(), 1);
            let Endpoint::Object(source_id) = sources[0].endpoint else {
                panic!("expected an object endpoint");
            };
            assert!(matches!(
                &diagram.object(source_id).kind,
                DiagramObjectKind::Expr(e) if matches!(e.kind, ExprKind::Path(_))
            ));

            let targets = diagram.targets(block_id);
            assert_eq!(targets.len(), 1);
            let Endpoint::Object(target_id) = targets[0].endpoint else {
                panic!("expected an object endpoint");
            };
            assert!(matches!(
                diagram.object(target_id).kind,
                DiagramObjectKind::Def(_)
            ));
        },
    );
}

#[test]
fn bars_group_and_split_bundles() {
    // i0 and i1 feed a bar; the bar feeds byname/bypos bars feeding o
    with_diagram(
        "node Ctl (i0: int32; i1: int32) returns (o: int32)\n{\ndiagram\n    (#0 group)\n    (#1 expr i0)\n    (#2 group byname)\n    (#3 group bypos)\n    (#4 def o)\n    (#5 group)\n    (#12 expr i1)\n    (#6 wire #1 => #0 .(a))\n    (#7 wire #0 => #2)\n    (#8 wire #0 => #3)\n    (#9 wire #2 => #5)\n    (#10 wire #5 .(a) => #4)\n    (#11 wire #3 => #5)\n    (#13 wire #12 => #0 .(b))\n}",
        |diagram| {
            let bar = diagram.resolve(Luid::new("0")).unwrap();
            let i0 = diagram.resolve(Luid::new("1")).unwrap();
            let i12 = diagram.resolve(Luid::new("12")).unwrap();

            let sources = diagram.sources(bar);
            assert_eq!(sources.len(), 2);
            assert_eq!(sources[0].endpoint, Endpoint::Object(i0));
            assert_eq!(sources[1].endpoint, Endpoint::Object(i12));

            let targets = diagram.targets(bar);
            assert_eq!(targets.len(), 2);
            for target in &targets {
                let Endpoint::Object(id) = target.endpoint else {
                    panic!("expected an object endpoint");
                };
                assert!(diagram.object(id).is_bar());
                assert!(target.adaptation.is_none());
            }

            // the adaptation at the bar input is the far-end port of i0
            let i0_targets = diagram.targets(i0);
            assert_eq!(i0_targets.len(), 1);
            assert_eq!(i0_targets[0].adaptation.unwrap().to_string(), ".(a)");
        },
    );
}

#[test]
fn multi_hop_traversal_resolves_through_bars() {
    with_diagram(
        "node Ctl (i0: int32) returns (o: int32)\n{\ndiagram\n    (#1 expr i0)\n    (#0 group)\n    (#2 def o)\n    (#3 wire #1 => #0 .(a))\n    (#4 wire #0 => #2)\n}",
        |diagram| {
            let i0 = diagram.resolve(Luid::new("1")).unwrap();
            let o = diagram.resolve(Luid::new("2")).unwrap();

            let mut visited = Vec::new();
            let resolved = diagram.sources_through_bars(o, &mut visited);
            assert_eq!(resolved.len(), 1);
            assert_eq!(resolved[0].endpoint, Endpoint::Object(i0));
            let chain: Vec<_> = resolved[0]
                .adaptations
                .iter()
                .map(|a| a.to_string())
                .collect();
            assert_eq!(chain, vec![".(a)"]);

            let mut visited = Vec::new();
            let resolved = diagram.targets_through_bars(i0, &mut visited);
            assert_eq!(resolved.len(), 1);
            assert_eq!(resolved[0].endpoint, Endpoint::Object(o));
        },
    );
}

#[test]
fn feedback_loops_are_reported_not_broken() {
    // o feeds back into the block through a delay expression
    with_diagram(
        "node Ctl (i: int32) returns (o: int32)\n{\ndiagram\n    (#0 block (Acc))\n    (#1 expr pre #2)\n    (#2 def o)\n    (#3 wire #0 => #2)\n    (#4 wire #2 => #1)\n    (#5 wire #1 => #0)\n}",
        |diagram| {
            let block = diagram.resolve(Luid::new("0")).unwrap();
            let delay = diagram.resolve(Luid::new("1")).unwrap();
            let def = diagram.resolve(Luid::new("2")).unwrap();

            // one-hop queries report the cycle faithfully
            assert_eq!(diagram.targets(block)[0].endpoint, Endpoint::Object(def));
            assert_eq!(diagram.targets(def)[0].endpoint, Endpoint::Object(delay));
            assert_eq!(diagram.targets(delay)[0].endpoint, Endpoint::Object(block));

            // a caller-composed walk with a visited set terminates
            let mut visited = vec![block];
            let mut frontier = vec![block];
            while let Some(current) = frontier.pop() {
                for neighbor in diagram.targets(current) {
                    let Endpoint::Object(next) = neighbor.endpoint else {
                        continue;
                    };
                    if !visited.contains(&next) {
                        visited.push(next);
                        frontier.push(next);
                    }
                }
            }
            assert_eq!(visited.len(), 3);
        },
    );
}
