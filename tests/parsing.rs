// Integration tests for the parser

use memstep::parser::ast::{CallTarget, Instruction, PassMode, Type};
use memstep::parser::{parse, ParseError};
use memstep::programs::{build_references_program, example};

#[test]
fn test_functions_keep_declaration_order() {
    let source = r#"
fn main() {
    let x = helper(1);
}

fn helper(n: i32) -> i32 {
    return n + 1;
}

fn unused(v: &mut Vec<i32>, b: Box<i32>) {
    v.push(1);
}
"#;

    let program = parse(source).expect("Parsing failed");
    let names: Vec<&str> = program.functions().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["main", "helper", "unused"]);

    let unused = program.function("unused").unwrap();
    assert_eq!(unused.params[0].mode, PassMode::ByReference);
    assert_eq!(unused.params[0].ty, Type::reference(Type::vector(Type::Int), true));
    assert_eq!(unused.params[1].mode, PassMode::ByValue);
    assert_eq!(unused.params[1].ty, Type::boxed(Type::Int));
    assert_eq!(program.function("helper").unwrap().return_type, Some(Type::Int));
}

#[test]
fn test_statements_lower_to_instructions() {
    let source = r#"fn main() {
    let mut v: Vec<i32> = Vec::new();
    v.push(3);
    let b = Box::new(7);
    let r = &mut v;
    let n = twice(2);
    drop(b);
    while n > 0 {
        n -= 1;
    }
}

fn twice(x: i32) -> i32 {
    return x * 2;
}
"#;

    let program = parse(source).expect("Parsing failed");
    let body = &program.main().unwrap().body;
    let kinds: Vec<&str> = body.iter().map(|i| i.kind()).collect();
    assert_eq!(
        kinds,
        vec!["vec-new", "push", "box-new", "take-ref", "call", "drop", "while"]
    );

    assert!(matches!(
        &body[4],
        Instruction::Call { function, target: CallTarget::Declare { name, .. }, .. }
            if function == "twice" && name == "n"
    ));

    // Locations point at the first token of each statement
    let lines: Vec<usize> = body.iter().map(|i| i.location().line).collect();
    assert_eq!(lines, vec![2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(body[0].location().column, 5);
}

#[test]
fn test_syntax_error_reports_location() {
    let source = "fn main() {\n    let x = ;\n}\n";
    match parse(source) {
        Err(ParseError::Syntax { location, .. }) => assert_eq!(location.line, 2),
        other => panic!("expected a syntax error, got {:?}", other),
    }
}

#[test]
fn test_program_level_errors() {
    assert_eq!(parse("fn helper() {}\n"), Err(ParseError::MissingMain));
    assert!(matches!(
        parse("fn main() {}\nfn main() {}\n"),
        Err(ParseError::DuplicateFunction { name, .. }) if name == "main"
    ));
}

#[test]
fn test_built_program_equals_parsed_source() {
    let parsed = parse(example("references").unwrap().source).unwrap();
    assert_eq!(build_references_program().unwrap(), parsed);
}
