// Integration tests for snapshots, determinism and reset

use maplit::btreemap;
use serde_json::json;

use memstep::config::RunConfig;
use memstep::interpreter::Interpreter;
use memstep::memory::heap::BlockKind;
use memstep::parser::parse;
use memstep::programs::{example, EXAMPLES};
use memstep::snapshot::{BlockView, SnapshotHistory, Status, ValueView};

const BOX_AND_VEC: &str = r#"fn main() {
    let b = Box::new(7);
    let v = vec![1, 2];
}
"#;

fn interpreter(source: &str) -> Interpreter {
    let program = parse(source).expect("Parsing failed");
    Interpreter::new(program, RunConfig::default())
}

#[test]
fn test_paced_runs_are_deterministic() {
    for scenario in EXAMPLES {
        let mut first = interpreter(scenario.source);
        let mut second = interpreter(scenario.source);

        for _ in 0..500 {
            assert_eq!(
                first.snapshot(),
                second.snapshot(),
                "'{}' diverged at step {}",
                scenario.name,
                first.steps_taken()
            );
            if first.is_finished() {
                break;
            }
            assert_eq!(first.step(), second.step());
        }
    }
}

#[test]
fn test_reset_reproduces_initial_snapshot() {
    let mut interpreter = interpreter(example("vec-growth").unwrap().source);
    let initial = interpreter.snapshot();
    assert_eq!(initial.status, Status::Ready);
    assert_eq!(initial.steps, 0);

    interpreter.run_to_end(1_000);
    let finished = interpreter.snapshot();
    assert_eq!(finished.status, Status::Finished);
    assert_ne!(finished, initial);

    interpreter.reset();
    assert_eq!(interpreter.snapshot(), initial);

    // Heap addresses start over too
    interpreter.run_to_end(1_000);
    assert_eq!(interpreter.snapshot(), finished);
}

#[test]
fn test_final_heap_contents() {
    let mut interpreter = interpreter(BOX_AND_VEC);
    interpreter.run_to_end(100);

    // Nothing was dropped, and with main's frame gone nothing reaches the blocks

    let expected = btreemap! {
        0x1000_0000 => BlockView {
            kind: BlockKind::Boxed,
            elements: vec![ValueView::Int(7)],
            capacity: 1,
            length: 1,
            live: true,
            reachable: false,
        },
        0x1000_0010 => BlockView {
            kind: BlockKind::Vector,
            elements: vec![ValueView::Int(1), ValueView::Int(2)],
            capacity: 2,
            length: 2,
            live: true,
            reachable: false,
        },
    };
    let snapshot = interpreter.snapshot();
    assert!(snapshot.stack.is_empty());
    assert_eq!(snapshot.heap, expected);
    assert_eq!(snapshot.leaked_blocks().count(), 2);
}

#[test]
fn test_snapshot_serializes_to_json() {
    let mut interpreter = interpreter(BOX_AND_VEC);
    interpreter.step();
    interpreter.step();

    let value = serde_json::to_value(interpreter.snapshot()).expect("serialization failed");
    assert_eq!(value["status"], json!({ "state": "ready" }));
    assert_eq!(value["current"], json!({ "function": "main", "line": 4 }));
    assert_eq!(value["stack"][0]["function"], json!("main"));
    assert_eq!(
        value["stack"][0]["vars"][0],
        json!({
            "name": "b",
            "ty": "Box<i32>",
            "value": { "heap": { "address": 0x1000_0000u64, "live": true } },
            "aliased": false,
            "live": true,
        })
    );
    assert_eq!(value["heap"]["268435472"]["kind"], json!("Vector"));

    interpreter.run_to_end(100);
    let value = serde_json::to_value(interpreter.snapshot()).expect("serialization failed");
    assert_eq!(value["status"], json!({ "state": "finished" }));
    assert_eq!(value["current"], json!(null));
    assert_eq!(value["stack"], json!([]));
    assert_eq!(value["heap"]["268435472"]["reachable"], json!(false));
}

#[test]
fn test_error_status_serializes_kind_and_line() {
    let mut interpreter = interpreter(example("double-free").unwrap().source);
    interpreter.run_to_end(100);

    let value = serde_json::to_value(interpreter.snapshot()).expect("serialization failed");
    assert_eq!(value["status"]["state"], json!("error"));
    assert_eq!(value["status"]["kind"], json!("DoubleFreeAttempt"));
    assert_eq!(value["status"]["line"], json!(4));
}

#[test]
fn test_history_records_every_step() {
    let mut interpreter = interpreter(BOX_AND_VEC);
    let mut history = SnapshotHistory::new(1 << 20);
    history.push(interpreter.snapshot());
    while !interpreter.is_finished() {
        interpreter.step();
        history.push(interpreter.snapshot());
    }

    assert_eq!(history.len(), interpreter.steps_taken() + 1);
    assert_eq!(history.evicted(), 0);
    let steps: Vec<usize> = (0..history.len())
        .filter_map(|i| history.get(i).map(|s| s.steps))
        .collect();
    assert_eq!(steps, (0..history.len()).collect::<Vec<_>>());

    // Snapshots are independent copies of the state at their step
    assert!(history.get(0).unwrap().heap.is_empty());
    assert_eq!(history.latest().unwrap().heap.len(), 2);
}
