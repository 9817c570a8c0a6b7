use quadflow::driver::{self, PASSES};
use quadflow::error::ErrorKind;
use quadflow::ir::*;

const PROGRAM: &str = r#"{
  "functions": [
    {
      "name": "checks",
      "parameters": ["P0"],
      "control_flow_graph": {
        "entry": 0,
        "blocks": [
          {
            "index": 0,
            "quads": [
              { "id": 0, "operation": { "NullCheck": { "src": "P0" } } },
              { "id": 1, "operation": { "Move": { "dst": "R1", "src": { "Register": "P0" } } } },
              { "id": 2, "operation": { "NullCheck": { "src": "P0" } } },
              { "id": 3, "operation": { "NullCheck": { "src": "R1" } } },
              { "id": 4, "operation": { "Return": { "Register": "R1" } } }
            ]
          }
        ],
        "edges": []
      }
    },
    {
      "name": "diamond",
      "control_flow_graph": {
        "entry": 0,
        "blocks": [
          { "index": 0, "quads": [ { "id": 0, "operation": { "Branch": { "condition": { "Register": "C" } } } } ] },
          { "index": 1, "quads": [ { "id": 1, "operation": { "NullCheck": { "src": "R0" } } } ] },
          { "index": 2, "quads": [] },
          { "index": 3, "quads": [ { "id": 2, "operation": { "NullCheck": { "src": "R0" } } } ] }
        ],
        "edges": [
          { "head": 0, "tail": 1 },
          { "head": 0, "tail": 2 },
          { "head": 1, "tail": 3 },
          { "head": 2, "tail": 3 }
        ]
      }
    }
  ]
}"#;

fn program() -> Program {
    Program::from_json(PROGRAM).unwrap()
}

fn removed(program: &mut Program, pass: &str) -> Vec<(String, Vec<QuadId>)> {
    driver::optimize(program, pass)
        .unwrap()
        .into_iter()
        .map(|report| (report.function().to_string(), report.removed().to_vec()))
        .collect()
}

#[test]
fn programs_load_from_json() {
    let program = program();
    assert_eq!(program.functions().len(), 2);

    let checks = program.function_by_name("checks").unwrap();
    assert_eq!(checks.parameters(), &[reg("P0")]);
    assert_eq!(checks.quads().count(), 5);
    assert!(checks.quad(1).unwrap().is_move());
    assert_eq!(checks.quad(3).unwrap().operation(), &null_check("R1"));

    let diamond = program.function_by_name("diamond").unwrap();
    assert!(diamond.parameters().is_empty());
    assert_eq!(diamond.control_flow_graph().edges().len(), 4);
    assert_eq!(
        diamond.control_flow_graph().predecessors(2).unwrap(),
        vec![Neighbor::Quad(1), Neighbor::Quad(0)]
    );
}

#[test]
fn json_round_trip_keeps_the_graph() {
    let program = program();
    let reloaded = Program::from_json(&program.to_json().unwrap()).unwrap();
    for (before, after) in program.functions().iter().zip(reloaded.functions()) {
        assert_eq!(before.name(), after.name());
        assert_eq!(before.control_flow_graph().entry(), after.control_flow_graph().entry());
        assert_eq!(
            before.control_flow_graph().blocks(),
            after.control_flow_graph().blocks()
        );
        let mut before_edges = before.control_flow_graph().edges();
        let mut after_edges = after.control_flow_graph().edges();
        before_edges.sort();
        after_edges.sort();
        assert_eq!(before_edges, after_edges);
    }
}

#[test]
fn null_check_passes_remove_redundant_checks() {
    let mut basic = program();
    assert_eq!(
        removed(&mut basic, "null-checks"),
        vec![("checks".to_string(), vec![2]), ("diamond".to_string(), Vec::<QuadId>::new())]
    );
    let checks = basic.function_by_name("checks").unwrap();
    assert!(checks.quad(2).is_err());
    assert!(checks.quad(3).is_ok());

    for pass in &["move-null-checks", "edge-null-checks"] {
        let mut aware = program();
        assert_eq!(
            removed(&mut aware, pass),
            vec![("checks".to_string(), vec![2, 3]), ("diamond".to_string(), Vec::<QuadId>::new())]
        );
        assert_eq!(
            aware.function_by_name("checks").unwrap().quads().count(),
            3
        );
    }
}

#[test]
fn analysis_passes_leave_programs_untouched() {
    for pass in &["reaching-definitions", "edge-reaching-definitions", "live-variables"] {
        let mut program = program();
        for (_, quads) in removed(&mut program, pass) {
            assert!(quads.is_empty());
        }
        assert_eq!(program.to_json().unwrap(), self::program().to_json().unwrap());
    }
}

#[test]
fn registry_lists_every_pass() {
    let names = PASSES.keys().cloned().collect::<Vec<&str>>();
    assert_eq!(
        names,
        vec![
            "edge-null-checks",
            "edge-reaching-definitions",
            "live-variables",
            "move-null-checks",
            "null-checks",
            "reaching-definitions",
        ]
    );
}

#[test]
fn unknown_pass_is_an_error() {
    let mut program = program();
    match driver::optimize(&mut program, "inline") {
        Err(e) => match e.kind() {
            ErrorKind::UnknownPass(name) => assert_eq!(name, "inline"),
            kind => panic!("unexpected error {}", kind),
        },
        Ok(_) => panic!("inline is not a pass"),
    }
}

#[test]
fn malformed_graphs_are_rejected() {
    let duplicate = PROGRAM.replace("\"id\": 4", "\"id\": 3");
    assert!(Program::from_json(&duplicate).is_err());
}

#[test]
fn sparse_quad_ids_are_solved() {
    let json = r#"{
      "functions": [
        {
          "name": "sparse",
          "control_flow_graph": {
            "entry": 0,
            "blocks": [
              {
                "index": 0,
                "quads": [
                  { "id": 1000000000000, "operation": { "NullCheck": { "src": "R0" } } },
                  { "id": 18446744073709551615, "operation": { "NullCheck": { "src": "R0" } } }
                ]
              }
            ],
            "edges": []
          }
        }
      ]
    }"#;
    for pass in PASSES.keys() {
        let mut program = Program::from_json(json).unwrap();
        let reports = driver::optimize(&mut program, pass).unwrap();
        let expected = if pass.ends_with("null-checks") {
            vec![usize::MAX]
        } else {
            Vec::new()
        };
        assert_eq!(reports[0].removed(), expected.as_slice());
    }
}

#[test]
fn optimized_functions_print_without_removed_quads() {
    let mut program = program();
    driver::optimize(&mut program, "move-null-checks").unwrap();
    let printed = program.function_by_name("checks").unwrap().to_string();
    assert!(printed.starts_with("checks(P0)"));
    assert!(printed.contains(&Quad::new(1, mov("R1", "P0")).to_string()));
    assert!(!printed.contains(&Quad::new(3, null_check("R1")).to_string()));
}
