// Integration tests for stepping, calls and control flow

use memstep::config::RunConfig;
use memstep::interpreter::{HaltReason, Interpreter, RunState, RuntimeError, StepOutcome};
use memstep::parser::parse;
use memstep::programs::example;

fn interpreter_with(source: &str, config: RunConfig) -> Interpreter {
    let program = parse(source).expect("Parsing failed");
    Interpreter::new(program, config)
}

fn run(source: &str) -> Interpreter {
    let mut interpreter = interpreter_with(source, RunConfig::default());
    interpreter.run_to_end(10_000);
    interpreter
}

fn halt_error(interpreter: &Interpreter) -> Option<&RuntimeError> {
    match interpreter.state() {
        RunState::Halted(HaltReason::Error(err)) => Some(err),
        _ => None,
    }
}

#[test]
fn test_recursive_fibonacci() {
    let interpreter = run(example("fibonacci").unwrap().source);
    assert_eq!(interpreter.state(), &RunState::Halted(HaltReason::Finished));
    assert_eq!(interpreter.output().get_output(), vec!["fibonacci(5) = 5"]);
    assert!(interpreter.snapshot().stack.is_empty());
}

#[test]
fn test_finished_run_leaves_empty_stack() {
    let mut interpreter = run("fn main() {\n    let a = 1;\n}\n");
    assert_eq!(interpreter.state(), &RunState::Halted(HaltReason::Finished));
    assert_eq!(interpreter.memory().stack().depth(), 0);
    assert!(interpreter.memory().slots().live_slots().next().is_none());
    assert_eq!(interpreter.current_instruction(), None);

    interpreter.reset();
    assert_eq!(interpreter.memory().stack().depth(), 1);
}

#[test]
fn test_call_takes_two_steps() {
    let source = r#"fn main() {
    let s = add(1, 2);
}

fn add(a: i32, b: i32) -> i32 {
    return a + b;
}
"#;
    let mut interpreter = interpreter_with(source, RunConfig::default());
    let mut positions = vec![interpreter.current_instruction().map(|(f, l)| (f.to_string(), l))];
    let mut last = interpreter.snapshot();
    while !interpreter.is_finished() {
        last = interpreter.snapshot();
        interpreter.step();
        positions.push(interpreter.current_instruction().map(|(f, l)| (f.to_string(), l)));
    }

    let expected = vec![
        Some(("main".to_string(), 2)),
        Some(("add".to_string(), 6)),
        // back on the call, with the returned value pending
        Some(("main".to_string(), 2)),
        // implicit return at the closing brace
        Some(("main".to_string(), 3)),
        None,
    ];
    assert_eq!(positions, expected);
    assert_eq!(interpreter.steps_taken(), 4);
    // Taken on main's closing brace, before its frame is popped
    assert_eq!(
        last.var("s").map(|v| v.value.clone()),
        Some(memstep::snapshot::ValueView::Int(3))
    );
}

#[test]
fn test_while_with_else_if_chain() {
    let source = r#"fn main() {
    let mut i = 0;
    let mut evens = 0;
    let mut odds = 0;
    while i < 10 {
        if i % 2 == 0 {
            evens += 1;
        } else if i == 5 {
            odds += 10;
        } else {
            odds += 1;
        }
        i += 1;
    }
    println!("{evens} {odds}");
}
"#;
    let interpreter = run(source);
    assert!(halt_error(&interpreter).is_none());
    assert_eq!(interpreter.output().get_output(), vec!["5 14"]);
}

#[test]
fn test_block_scope_ends_with_its_body() {
    let source = r#"fn main() {
    let x = 1;
    if x == 1 {
        let y = 2;
    }
    let y = 3;
    println!("{y}");
}
"#;
    let interpreter = run(source);
    assert!(halt_error(&interpreter).is_none());
    assert_eq!(interpreter.output().get_output(), vec!["3"]);
}

#[test]
fn test_duplicate_and_undeclared_names() {
    let duplicate = run("fn main() {\n    let a = 1;\n    let a = 2;\n}\n");
    assert!(matches!(
        halt_error(&duplicate),
        Some(RuntimeError::DuplicateDeclaration { name, location }) if name == "a" && location.line == 3
    ));

    let undeclared = run("fn main() {\n    println!(\"{z}\");\n}\n");
    assert!(matches!(
        halt_error(&undeclared),
        Some(RuntimeError::UndeclaredVariable { name, .. }) if name == "z"
    ));
}

#[test]
fn test_division_and_remainder_by_zero() {
    for op in ["/", "%"] {
        let source = format!("fn main() {{\n    let a = 1;\n    let b = a {} 0;\n}}\n", op);
        let interpreter = run(&source);
        let err = halt_error(&interpreter).expect("run should fail");
        assert!(matches!(err, RuntimeError::ArithmeticError { .. }));
        assert_eq!(err.location().line, 3);
    }
}

#[test]
fn test_stack_overflow_respects_depth_limit() {
    let config = RunConfig {
        max_call_depth: 8,
        ..RunConfig::default()
    };
    let mut interpreter = interpreter_with(example("stack-overflow").unwrap().source, config);
    let outcome = interpreter.run_to_end(1_000);

    assert!(matches!(
        outcome,
        StepOutcome::Halted(HaltReason::Error(RuntimeError::StackOverflow { limit: 8, .. }))
    ));
    assert_eq!(interpreter.snapshot().stack.len(), 8);
    assert!(interpreter.output().get_output().is_empty());
}

#[test]
fn test_argument_count_mismatch() {
    let interpreter = run("fn main() {\n    f(1, 2);\n}\n\nfn f(a: i32) {\n}\n");
    assert!(matches!(
        halt_error(&interpreter),
        Some(RuntimeError::ArgumentCountMismatch { expected: 1, got: 2, .. })
    ));
}

#[test]
fn test_returning_values_to_caller() {
    let interpreter = run(example("returning-values").unwrap().source);
    assert!(halt_error(&interpreter).is_none());
    assert_eq!(
        interpreter.output().get_output(),
        vec!["sum=42 arr=[12, 2] v=[1, 2]"]
    );
    // The returned Vec is reachable from main and was dropped there
    assert_eq!(interpreter.snapshot().leaked_blocks().count(), 0);
}

#[test]
fn test_halted_run_repeats_its_outcome() {
    let mut interpreter = run("fn main() {\n    let a = 1;\n}\n");
    let steps = interpreter.steps_taken();
    assert_eq!(interpreter.step(), StepOutcome::Halted(HaltReason::Finished));
    assert_eq!(interpreter.steps_taken(), steps);
}

#[test]
fn test_step_budget_stops_infinite_loop() {
    let mut interpreter = interpreter_with(
        "fn main() {\n    let mut i = 0;\n    while true {\n        i += 1;\n    }\n}\n",
        RunConfig::default(),
    );
    assert_eq!(interpreter.run_to_end(50), StepOutcome::Continued);
    assert_eq!(interpreter.steps_taken(), 50);
    assert!(!interpreter.is_finished());
}

#[test]
fn test_rand_int_is_seeded() {
    let source = "fn main() {\n    let a = rand_int(1, 1000);\n    let b = rand_int(1, 1000);\n    println!(\"{a} {b}\");\n}\n";
    let first = run(source).output().get_output();
    let second = run(source).output().get_output();
    assert_eq!(first, second);

    let reseeded = {
        let mut interpreter = interpreter_with(
            source,
            RunConfig {
                seed: 99,
                ..RunConfig::default()
            },
        );
        interpreter.run_to_end(100);
        interpreter.output().get_output()
    };
    assert_eq!(reseeded.len(), 1);
}
