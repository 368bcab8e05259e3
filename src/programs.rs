//! Built-in scenarios
//!
//! Each entry of [`EXAMPLES`] is a small program that shows one memory-model
//! behaviour. They are available from the CLI with `--example NAME` and listed
//! by `--list-examples`.
//!
//! [`build_references_program`] constructs the `references` scenario directly
//! from AST values, without going through the parser.

use crate::parser::ast::*;
use crate::parser::ParseError;

/// A named scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Example {
    pub name: &'static str,
    pub description: &'static str,
    pub source: &'static str,
}

/// Look up a scenario by name
pub fn example(name: &str) -> Option<&'static Example> {
    EXAMPLES.iter().find(|e| e.name == name)
}

pub const EXAMPLES: &[Example] = &[
    Example {
        name: "stack-variables",
        description: "Scalars and arrays live in the frame",
        source: STACK_VARIABLES,
    },
    Example {
        name: "heap-variables",
        description: "Box and Vec handles on the stack, contents on the heap",
        source: HEAP_VARIABLES,
    },
    Example {
        name: "clone-and-drop",
        description: "clone() allocates a new block, drop() frees one",
        source: CLONE_AND_DROP,
    },
    Example {
        name: "vec-growth",
        description: "push() past capacity moves the vector to a new block",
        source: VEC_GROWTH,
    },
    Example {
        name: "static-array",
        description: "Fibonacci numbers in a two-cell array",
        source: STATIC_ARRAY,
    },
    Example {
        name: "references",
        description: "A mutable reference, written through and passed on",
        source: REFERENCES,
    },
    Example {
        name: "ref-to-ref",
        description: "Writing through a three-level reference chain",
        source: REF_TO_REF,
    },
    Example {
        name: "value-vs-reference",
        description: "The same variable passed by value and by reference",
        source: VALUE_VS_REFERENCE,
    },
    Example {
        name: "vec-by-value",
        description: "A Vec handle copied into the callee; growing it strands the caller's copy",
        source: VEC_BY_VALUE,
    },
    Example {
        name: "vec-by-reference",
        description: "The callee grows the caller's Vec",
        source: VEC_BY_REFERENCE,
    },
    Example {
        name: "returning-values",
        description: "Scalars, arrays and heap handles returned to the caller",
        source: RETURNING_VALUES,
    },
    Example {
        name: "fibonacci",
        description: "Recursive calls, one frame per call",
        source: FIBONACCI,
    },
    Example {
        name: "memory-leak",
        description: "Boxes outlive the frames that owned them",
        source: MEMORY_LEAK,
    },
    Example {
        name: "double-free",
        description: "Dropping the same Box twice",
        source: DOUBLE_FREE,
    },
    Example {
        name: "stack-overflow",
        description: "Unbounded recursion hits the call depth limit",
        source: STACK_OVERFLOW,
    },
    Example {
        name: "memory-tampering",
        description: "An out-of-bounds array write corrupts the caller's frame",
        source: MEMORY_TAMPERING,
    },
];

const STACK_VARIABLES: &str = r#"fn main() {
    let a = 1 + 1;
    let b = a * 2;
    let c = a + b * 2;
    let arr: [i32; 3] = [10, 20, 30];
    let mut x = arr[0];
    x = arr[1] + arr[2];
    x += 5;
    let flag = x == 55;
    println!("a={a} b={b} c={c} x={x} flag={flag}");
}
"#;

const HEAP_VARIABLES: &str = r#"fn main() {
    let b = Box::new(100);
    *b = *b + 1;
    let mut v = vec![1, 2, 3];
    v.push(4);
    v[0] = 10;
    println!("b={} v={} len={}", b, v, v.len());
    drop(b);
    drop(v);
}
"#;

const CLONE_AND_DROP: &str = r#"fn main() {
    let p = Box::new(100);
    let q = p.clone();
    *q = 200;
    let v = vec![1, 2];
    let w = v.clone();
    println!("p={p} q={q}");
    drop(p);
    drop(v);
    println!("w={w}");
    drop(q);
    drop(w);
}
"#;

const VEC_GROWTH: &str = r#"fn main() {
    let mut v: Vec<i32> = Vec::new();
    let mut i = 0;
    while i < 5 {
        v.push(i * 10);
        i += 1;
    }
    let w = Vec::with_capacity(4);
    w.push(1);
    println!("v={v} w={w}");
    drop(v);
    drop(w);
}
"#;

const STATIC_ARRAY: &str = r#"fn main() {
    let n: i32 = 10;
    let mut i: i32 = 2;
    let mut fibo: [i32; 2] = [1, 1];
    let mut prev: i32;
    while i < n {
        prev = fibo[1];
        fibo[1] = fibo[0] + fibo[1];
        fibo[0] = prev;
        i += 1;
    }
    println!("fib({n}) = {}", fibo[1]);
}
"#;

const REFERENCES: &str = "fn main() {
    let mut x = 5;
    let r = &mut x;
    *r += 1;
    bump(r);
    println!(\"x = {x}\");
}

fn bump(n: &mut i32) {
    *n = *n * 10;
}
";

const REF_TO_REF: &str = r#"fn main() {
    let mut x = 1;
    let mut p = &mut x;
    let mut pp = &mut p;
    let ppp = &mut pp;
    ***ppp = 42;
    println!("x = {x}");
}
"#;

const VALUE_VS_REFERENCE: &str = r#"fn main() {
    let mut y = 7;
    process(y, &mut y);
    println!("y = {y}");
}

fn process(copy: i32, target: &mut i32) {
    copy = 0;
    *target = 999;
}
"#;

const VEC_BY_VALUE: &str = r#"fn main() {
    let v = vec![0, 1];
    helper(v);
    println!("v = {v}");
}

fn helper(v: Vec<i32>) {
    v.push(2);
    println!("inside: {v}");
}
"#;

const VEC_BY_REFERENCE: &str = r#"fn main() {
    let mut v = vec![0, 1];
    helper(&mut v);
    println!("v = {v}");
    drop(v);
}

fn helper(v: &mut Vec<i32>) {
    v.push(2);
    v.push(3);
}
"#;

const RETURNING_VALUES: &str = r#"fn main() {
    let sum = add(12, 30);
    let mut arr: [i32; 2] = [1, 2];
    arr = modify(arr);
    let v: Vec<i32> = make_vec();
    println!("sum={sum} arr={arr} v={v}");
    drop(v);
}

fn add(a: i32, b: i32) -> i32 {
    return a + b;
}

fn modify(arr: [i32; 2]) -> [i32; 2] {
    arr[0] = 12;
    return arr;
}

fn make_vec() -> Vec<i32> {
    let v = vec![1, 2];
    return v;
}
"#;

const FIBONACCI: &str = r#"fn main() {
    let n: i32 = 5;
    let f = fibonacci(n);
    println!("fibonacci({n}) = {f}");
}

fn fibonacci(n: i32) -> i32 {
    if n <= 2 {
        return 1;
    }
    let a = fibonacci(n - 1);
    let b = fibonacci(n - 2);
    return a + b;
}
"#;

const MEMORY_LEAK: &str = r#"fn main() {
    let mut i = 0;
    while i < 3 {
        make_box(i);
        i += 1;
    }
    let kept = Box::new(7);
    drop(kept);
}

fn make_box(n: i32) {
    let b = Box::new(n * 100);
    println!("allocated {b}");
}
"#;

const DOUBLE_FREE: &str = r#"fn main() {
    let b = Box::new(5);
    drop(b);
    drop(b);
}
"#;

const STACK_OVERFLOW: &str = r#"fn main() {
    let depth = recurse(1);
    println!("never printed: {depth}");
}

fn recurse(n: i32) -> i32 {
    return recurse(n + 1);
}
"#;

const MEMORY_TAMPERING: &str = r#"fn main() {
    let bank: i32 = 25000;
    tampering();
    println!("bank = {bank}");
}

fn tampering() {
    let x: i32 = 42;
    let arr: [i32; 4] = [1, 2, 3, 4];
    arr[5] = -99;
    println!("x = {x}");
}
"#;

/// The `references` scenario, built without the parser.
///
/// Locations match what the parser records for the scenario's source text.
pub fn build_references_program() -> Result<Program, ParseError> {
    let at = SourceLocation::new;
    let var = |name: &str, loc| Expr::Variable(name.to_string(), loc);

    let main = FunctionDef {
        name: "main".to_string(),
        params: Vec::new(),
        return_type: None,
        body: vec![
            Instruction::Let {
                name: "x".to_string(),
                mutable: true,
                ty: None,
                value: Some(Expr::IntLiteral(5, at(2, 17))),
                location: at(2, 5),
            },
            Instruction::TakeRef {
                name: "r".to_string(),
                mutable: true,
                target: Place::Var("x".to_string()),
                location: at(3, 5),
            },
            Instruction::Assign {
                target: Place::Deref(Box::new(var("r", at(4, 6)))),
                op: Some(BinOp::Add),
                value: Expr::IntLiteral(1, at(4, 11)),
                location: at(4, 5),
            },
            Instruction::Call {
                function: "bump".to_string(),
                args: vec![var("r", at(5, 10))],
                target: CallTarget::Discard,
                location: at(5, 5),
            },
            Instruction::Print {
                format: vec![
                    FormatPiece::Text("x = ".to_string()),
                    FormatPiece::Named("x".to_string()),
                ],
                args: Vec::new(),
                newline: true,
                location: at(6, 5),
            },
        ],
        location: at(1, 1),
        end_location: at(7, 1),
    };

    let bump = FunctionDef {
        name: "bump".to_string(),
        params: vec![Param::new("n", Type::reference(Type::Int, true))],
        return_type: None,
        body: vec![Instruction::Assign {
            target: Place::Deref(Box::new(var("n", at(10, 6)))),
            op: None,
            value: Expr::Binary {
                op: BinOp::Mul,
                left: Box::new(Expr::Deref(Box::new(var("n", at(10, 11))), at(10, 10))),
                right: Box::new(Expr::IntLiteral(10, at(10, 15))),
                location: at(10, 13),
            },
            location: at(10, 5),
        }],
        location: at(9, 1),
        end_location: at(11, 1),
    };

    Program::new([main, bump])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_every_example_parses() {
        for example in EXAMPLES {
            assert!(
                parse(example.source).is_ok(),
                "example '{}' failed to parse: {:?}",
                example.name,
                parse(example.source).err()
            );
        }
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = EXAMPLES.iter().map(|e| e.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), EXAMPLES.len());
        assert!(example("fibonacci").is_some());
        assert!(example("nope").is_none());
    }

    #[test]
    fn test_built_program_matches_parsed_source() {
        let built = build_references_program().unwrap();
        let parsed = parse(REFERENCES).unwrap();
        assert_eq!(built, parsed);
    }
}
