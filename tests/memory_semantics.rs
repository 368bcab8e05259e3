// Integration tests for stack and heap behaviour

use memstep::config::{GrowthPolicy, RunConfig};
use memstep::interpreter::{HaltReason, Interpreter, RunState, RuntimeError, StepOutcome};
use memstep::memory::heap::BlockKind;
use memstep::parser::parse;
use memstep::programs::example;
use memstep::snapshot::{Snapshot, Status, ValueView};

fn interpreter(source: &str) -> Interpreter {
    let program = parse(source).expect("Parsing failed");
    Interpreter::new(program, RunConfig::default())
}

fn run(source: &str) -> Interpreter {
    let mut interpreter = interpreter(source);
    interpreter.run_to_end(10_000);
    interpreter
}

fn run_example(name: &str) -> Interpreter {
    run(example(name).expect("unknown example").source)
}

/// Step to the end of the run, returning the last snapshot taken while
/// `main`'s frame was still on the stack
fn finish(interpreter: &mut Interpreter) -> Snapshot {
    let mut last = interpreter.snapshot();
    for _ in 0..10_000 {
        match interpreter.step() {
            StepOutcome::Continued => last = interpreter.snapshot(),
            StepOutcome::Halted(HaltReason::Finished) => break,
            StepOutcome::Halted(HaltReason::Error(_)) => return interpreter.snapshot(),
        }
    }
    last
}

/// Run `source` to completion; see [`finish`]
fn run_final(source: &str) -> (Interpreter, Snapshot) {
    let mut interpreter = interpreter(source);
    let last = finish(&mut interpreter);
    (interpreter, last)
}

fn halt_error(interpreter: &Interpreter) -> Option<&RuntimeError> {
    match interpreter.state() {
        RunState::Halted(HaltReason::Error(err)) => Some(err),
        _ => None,
    }
}

fn heap_address(value: &ValueView) -> u64 {
    match value {
        ValueView::Heap { address, .. } => *address,
        other => panic!("expected a heap handle, got {:?}", other),
    }
}

#[test]
fn test_vector_growth_moves_block_and_strands_copies() {
    let source = r#"fn main() {
    let v = vec![1, 2];
    let stale = v;
    v.push(3);
}
"#;
    let (interpreter, snapshot) = run_final(source);
    assert!(halt_error(&interpreter).is_none());

    let new = heap_address(&snapshot.var("v").unwrap().value);
    let old = heap_address(&snapshot.var("stale").unwrap().value);
    assert_ne!(new, old);

    let grown = &snapshot.heap[&new];
    assert_eq!(grown.kind, BlockKind::Vector);
    assert_eq!(
        grown.elements,
        vec![ValueView::Int(1), ValueView::Int(2), ValueView::Int(3)]
    );
    assert!(grown.capacity >= 3);
    assert!(grown.live);

    // The stale copy still holds the old address, whose block is gone
    assert!(!snapshot.heap[&old].live);
    assert_eq!(
        snapshot.var("stale").unwrap().value,
        ValueView::Heap {
            address: old,
            live: false
        }
    );
}

#[test]
fn test_growth_policy_sets_new_capacity() {
    let source = "fn main() {\n    let v = Vec::new();\n    v.push(1);\n    v.push(2);\n}\n";
    let program = parse(source).unwrap();
    let config = RunConfig {
        growth: GrowthPolicy::Increment(5),
        ..RunConfig::default()
    };
    let mut interpreter = Interpreter::new(program, config);
    let snapshot = finish(&mut interpreter);

    let address = heap_address(&snapshot.var("v").unwrap().value);
    assert_eq!(snapshot.heap[&address].capacity, 5);
    assert_eq!(snapshot.heap[&address].length, 2);
}

#[test]
fn test_reference_parameter_aliases_caller_slot() {
    let source = r#"fn main() {
    let mut y = 7;
    process(y, &mut y);
}

fn process(copy: i32, target: &mut i32) {
    copy = 0;
    *target = 999;
}
"#;
    let mut interpreter = interpreter(source);
    interpreter.step();
    interpreter.step();
    assert_eq!(interpreter.current_instruction(), Some(("process", 7)));

    let inside = interpreter.snapshot();
    let frame = &inside.stack[1];
    assert_eq!(frame.function, "process");
    assert_eq!(frame.vars[0].value, ValueView::Int(7));
    assert!(!frame.vars[0].aliased);
    assert!(frame.vars[1].aliased);
    assert_eq!(
        frame.vars[1].value,
        ValueView::Ref {
            target: "main::y".to_string(),
            live: true
        }
    );

    let last = finish(&mut interpreter);
    assert_eq!(interpreter.state(), &RunState::Halted(HaltReason::Finished));
    assert_eq!(last.var("y").unwrap().value, ValueView::Int(999));
}

#[test]
fn test_three_level_reference_chain_writes_through() {
    let (interpreter, snapshot) = run_final(example("ref-to-ref").unwrap().source);
    assert!(halt_error(&interpreter).is_none());

    assert_eq!(snapshot.var("x").unwrap().value, ValueView::Int(42));
    assert_eq!(
        snapshot.var("ppp").unwrap().value,
        ValueView::Ref {
            target: "main::pp".to_string(),
            live: true
        }
    );
    assert_eq!(snapshot.output, vec!["x = 42"]);
}

#[test]
fn test_out_of_bounds_write_lands_in_later_variable() {
    let source = r#"fn main() {
    let arr: [i32; 4] = [1, 2, 3, 4];
    let x: i32 = 7;
    arr[5] = -99;
}
"#;
    let (interpreter, snapshot) = run_final(source);
    assert!(halt_error(&interpreter).is_none());

    assert_eq!(snapshot.var("x").unwrap().value, ValueView::Int(-99));
    assert_eq!(
        snapshot.var("arr").unwrap().value,
        ValueView::Array((1..=4).map(ValueView::Int).collect())
    );
}

#[test]
fn test_index_one_past_the_end_hits_padding() {
    let source = r#"fn main() {
    let arr: [i32; 4] = [1, 2, 3, 4];
    let x: i32 = 7;
    arr[4] = 55;
    println!("{} {x}", arr[4]);
    println!("{}", arr[-1]);
}
"#;
    let interpreter = run(source);
    assert!(halt_error(&interpreter).is_none());
    // Nothing was declared before the array, so -1 is past the top of the stack
    assert_eq!(interpreter.output().get_output(), vec!["55 7", "<uninit>"]);
}

#[test]
fn test_overflow_reaches_caller_frame() {
    let interpreter = run_example("memory-tampering");
    assert!(halt_error(&interpreter).is_none());
    assert_eq!(interpreter.output().get_output(), vec!["x = 42", "bank = -99"]);
}

#[test]
fn test_negative_index_reaches_earlier_variable() {
    let source = r#"fn main() {
    let x = 1;
    let arr = [5, 6];
    arr[-1] = 9;
    println!("{x}");
}
"#;
    let interpreter = run(source);
    assert!(halt_error(&interpreter).is_none());
    assert_eq!(interpreter.output().get_output(), vec!["9"]);
}

#[test]
fn test_out_of_bounds_past_the_stack_is_unmapped() {
    let source = r#"fn main() {
    let arr = [1, 2];
    arr[10] = 5;
    println!("{}", arr[10]);
}
"#;
    let interpreter = run(source);
    assert!(halt_error(&interpreter).is_none());
    assert_eq!(interpreter.output().get_output(), vec!["<uninit>"]);
}

#[test]
fn test_double_free_is_reported() {
    let interpreter = run_example("double-free");
    let err = halt_error(&interpreter).expect("run should fail");
    assert!(matches!(err, RuntimeError::DoubleFreeAttempt { address: 0x1000_0000, .. }));
    assert_eq!(err.location().line, 4);

    // The failed step was rolled back; the block was freed exactly once
    let snapshot = interpreter.snapshot();
    assert!(!snapshot.heap[&0x1000_0000].live);
    assert!(matches!(
        snapshot.status,
        Status::Error { ref kind, line: 4, .. } if kind == "DoubleFreeAttempt"
    ));
}

#[test]
fn test_blocks_leak_when_their_frame_returns() {
    let interpreter = run_example("memory-leak");
    assert!(halt_error(&interpreter).is_none());
    assert_eq!(
        interpreter.output().get_output(),
        vec!["allocated 0", "allocated 100", "allocated 200"]
    );

    let snapshot = interpreter.snapshot();
    assert_eq!(snapshot.heap.len(), 4);
    assert_eq!(snapshot.leaked_blocks().count(), 3);
    assert!(snapshot.heap.values().all(|b| b.kind == BlockKind::Boxed));
    // `kept` was dropped, so it is freed rather than leaked
    let kept = snapshot.heap.values().last().unwrap();
    assert!(!kept.live && !kept.is_leaked());
}

#[test]
fn test_reading_through_stale_vec_handle_dangles() {
    let interpreter = run_example("vec-by-value");
    let err = halt_error(&interpreter).expect("run should fail");
    assert!(matches!(err, RuntimeError::DanglingPointerAccess { .. }));
    assert_eq!(err.location().line, 4);
    assert_eq!(interpreter.output().get_output(), vec!["inside: [0, 1, 2]"]);
}

#[test]
fn test_callee_grows_callers_vec_through_reference() {
    let interpreter = run_example("vec-by-reference");
    assert!(halt_error(&interpreter).is_none());
    assert_eq!(interpreter.output().get_output(), vec!["v = [0, 1, 2, 3]"]);
}

#[test]
fn test_clone_allocates_independent_blocks() {
    let interpreter = run_example("clone-and-drop");
    assert!(halt_error(&interpreter).is_none());
    assert_eq!(interpreter.output().get_output(), vec!["p=100 q=200", "w=[1, 2]"]);

    let snapshot = interpreter.snapshot();
    assert_eq!(snapshot.heap.len(), 4);
    assert!(snapshot.heap.values().all(|b| !b.live));
}

#[test]
fn test_drop_of_scalar_is_a_type_error() {
    let interpreter = run("fn main() {\n    let x = 1;\n    drop(x);\n}\n");
    assert!(matches!(
        halt_error(&interpreter),
        Some(RuntimeError::TypeMismatch { location, .. }) if location.line == 3
    ));
}

#[test]
fn test_box_deref_assignment() {
    let interpreter = run_example("heap-variables");
    assert!(halt_error(&interpreter).is_none());
    assert_eq!(
        interpreter.output().get_output(),
        vec!["b=101 v=[10, 2, 3, 4] len=4"]
    );
}

#[test]
fn test_error_rolls_back_the_failing_step() {
    let mut interpreter = interpreter("fn main() {\n    let b = Box::new(1);\n    let c = 1 / 0;\n}\n");
    interpreter.step();
    let before = interpreter.snapshot();

    let outcome = interpreter.step();
    assert!(matches!(
        outcome,
        StepOutcome::Halted(HaltReason::Error(RuntimeError::ArithmeticError { .. }))
    ));

    let after = interpreter.snapshot();
    assert_eq!(after.stack, before.stack);
    assert_eq!(after.heap, before.heap);
    assert!(after.var("c").is_none());
}

#[test]
fn test_reference_escaping_callee_frame_dangles_on_write() {
    let source = r#"fn main() {
    let r = escape();
    *r = 5;
}

fn escape() -> &i32 {
    let x = 1;
    return &x;
}
"#;
    let interpreter = run(source);
    match halt_error(&interpreter) {
        Some(RuntimeError::DanglingPointerAccess { target, location }) => {
            assert_eq!(target, "'x' is no longer live");
            assert_eq!(location.line, 3);
        }
        other => panic!("expected a dangling access, got {:?}", other),
    }
}

#[test]
fn test_reference_escaping_callee_frame_dangles_on_read() {
    let source = r#"fn main() {
    let r = escape();
    println!("{}", *r);
}

fn escape() -> &i32 {
    let x = 1;
    return &x;
}
"#;
    let interpreter = run(source);
    let err = halt_error(&interpreter).expect("run should halt on the read");
    assert!(matches!(err, RuntimeError::DanglingPointerAccess { target, .. } if target == "'x' is no longer live"));
    assert_eq!(err.location().line, 3);
    assert!(interpreter.output().get_output().is_empty());
}

#[test]
fn test_reference_escaping_if_body_dangles() {
    let read = r#"fn main() {
    let r: &i32;
    if true {
        let y = 1;
        r = &y;
    }
    println!("{}", *r);
}
"#;
    let interpreter = run(read);
    let err = halt_error(&interpreter).expect("run should halt on the read");
    assert!(matches!(err, RuntimeError::DanglingPointerAccess { target, .. } if target == "'y' is no longer live"));
    assert_eq!(err.location().line, 7);

    let write = r#"fn main() {
    let r: &mut i32;
    if true {
        let mut y = 1;
        r = &mut y;
    }
    *r = 2;
}
"#;
    let interpreter = run(write);
    let err = halt_error(&interpreter).expect("run should halt on the write");
    assert_eq!(err.kind(), "DanglingPointerAccess");
    assert_eq!(err.location().line, 7);
}

#[test]
fn test_huge_vec_capacity_is_refused() {
    let source = "fn main() {\n    let v: Vec<i32> = Vec::with_capacity(2147483647);\n}\n";
    let interpreter = run(source);

    match halt_error(&interpreter) {
        Some(RuntimeError::AllocationTooLarge { requested, limit, location }) => {
            assert_eq!(*requested, 2_147_483_647);
            assert_eq!(*limit, RunConfig::default().max_alloc_cells);
            assert_eq!(location.line, 2);
        }
        other => panic!("expected an allocation error, got {:?}", other),
    }
    assert_eq!(interpreter.memory().heap().blocks().count(), 0);
}

#[test]
fn test_huge_repeat_literals_are_refused() {
    for source in [
        "fn main() {\n    let v = vec![0; 2000000000];\n}\n",
        "fn main() {\n    let a = [0; 2000000000];\n}\n",
        "fn main() {\n    let a: [i32; 2147483647];\n}\n",
    ] {
        let interpreter = run(source);
        let err = halt_error(&interpreter).expect("run should halt");
        assert_eq!(err.kind(), "AllocationTooLarge", "{source}");
        assert_eq!(err.location().line, 2);
        assert_eq!(interpreter.memory().slots().live_slots().count(), 0);
    }
}

#[test]
fn test_vector_cannot_grow_past_the_limit() {
    let source = r#"fn main() {
    let mut v = Vec::new();
    let mut i = 0;
    while i < 10 {
        v.push(i);
        i += 1;
    }
}
"#;
    let config = RunConfig {
        max_alloc_cells: 4,
        ..RunConfig::default()
    };
    let mut interpreter = Interpreter::new(parse(source).unwrap(), config);
    let snapshot = finish(&mut interpreter);

    let err = halt_error(&interpreter).expect("the fifth push should fail");
    assert!(matches!(err, RuntimeError::AllocationTooLarge { requested: 5, limit: 4, .. }));
    assert_eq!(err.location().line, 5);

    let address = heap_address(&snapshot.var("v").unwrap().value);
    assert_eq!(snapshot.heap[&address].length, 4);
    assert_eq!(snapshot.heap[&address].capacity, 4);
}
