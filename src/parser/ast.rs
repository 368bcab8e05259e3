// AST definitions: the closed instruction set executed by the interpreter

use rustc_hash::FxHashMap;
use std::fmt;

use super::parse::ParseError;

/// Source location information for error reporting and display correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Semantic type tags understood by the memory model
///
/// Integer spellings (`i32`, `i64`, `usize`, `u32`) all collapse to [`Type::Int`]:
/// the machine model is a single 32-bit signed integer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Int,
    Bool,
    /// Fixed-size stack array `[T; N]`
    Array(Box<Type>, usize),
    /// Reference `&T` / `&mut T`
    Ref { mutable: bool, inner: Box<Type> },
    /// Owning heap pointer `Box<T>`
    Boxed(Box<Type>),
    /// Growable heap vector `Vec<T>`
    Vector(Box<Type>),
    /// No annotation and nothing to infer from yet
    Unknown,
}

impl Type {
    pub fn reference(inner: Type, mutable: bool) -> Self {
        Type::Ref {
            mutable,
            inner: Box::new(inner),
        }
    }

    pub fn array(elem: Type, len: usize) -> Self {
        Type::Array(Box::new(elem), len)
    }

    pub fn vector(elem: Type) -> Self {
        Type::Vector(Box::new(elem))
    }

    pub fn boxed(inner: Type) -> Self {
        Type::Boxed(Box::new(inner))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Ref { .. })
    }

    /// Number of contiguous stack cells a value of this type occupies.
    pub fn cell_count(&self) -> usize {
        match self {
            Type::Array(_, len) => *len,
            _ => 1,
        }
    }

    /// Element type for arrays, the type itself otherwise.
    pub fn element(&self) -> Type {
        match self {
            Type::Array(elem, _) => (**elem).clone(),
            other => other.clone(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "i32"),
            Type::Bool => write!(f, "bool"),
            Type::Array(elem, len) => write!(f, "[{}; {}]", elem, len),
            Type::Ref { mutable: true, inner } => write!(f, "&mut {}", inner),
            Type::Ref { mutable: false, inner } => write!(f, "&{}", inner),
            Type::Boxed(inner) => write!(f, "Box<{}>", inner),
            Type::Vector(elem) => write!(f, "Vec<{}>", elem),
            Type::Unknown => write!(f, "_"),
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical
    And,
    Or,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg, // -x
    Not, // !x
}

/// Expressions are pure reads of the memory model, except for heap literals
/// (`vec![..]`, `Box::new(..)`, `.clone()`) which allocate.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntLiteral(i32, SourceLocation),
    BoolLiteral(bool, SourceLocation),
    Variable(String, SourceLocation),
    ArrayLiteral(Vec<Expr>, SourceLocation),
    /// `[value; count]`
    ArrayRepeat {
        value: Box<Expr>,
        count: usize,
        location: SourceLocation,
    },
    /// `&place` / `&mut place`
    Reference {
        mutable: bool,
        target: Box<Place>,
        location: SourceLocation,
    },
    /// `*expr`; `**p` nests two of these
    Deref(Box<Expr>, SourceLocation),
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
        location: SourceLocation,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        location: SourceLocation,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
        location: SourceLocation,
    },
    /// `v.len()`
    Len(Box<Expr>, SourceLocation),
    /// `x.clone()`
    Clone(Box<Expr>, SourceLocation),
    /// `vec![a, b]`, `vec![v; n]`, `Vec::new()`, `Vec::with_capacity(n)`
    VecLiteral {
        elements: VecInit,
        capacity: Option<Box<Expr>>,
        location: SourceLocation,
    },
    /// `Box::new(value)`
    BoxNew(Box<Expr>, SourceLocation),
    /// `rand_int(lo, hi)`, inclusive on both ends
    RandInt {
        low: Box<Expr>,
        high: Box<Expr>,
        location: SourceLocation,
    },
}

impl Expr {
    pub fn location(&self) -> SourceLocation {
        match self {
            Expr::IntLiteral(_, loc)
            | Expr::BoolLiteral(_, loc)
            | Expr::Variable(_, loc)
            | Expr::ArrayLiteral(_, loc)
            | Expr::Deref(_, loc)
            | Expr::Len(_, loc)
            | Expr::Clone(_, loc)
            | Expr::BoxNew(_, loc) => *loc,
            Expr::ArrayRepeat { location, .. }
            | Expr::Reference { location, .. }
            | Expr::Index { location, .. }
            | Expr::Binary { location, .. }
            | Expr::Unary { location, .. }
            | Expr::VecLiteral { location, .. }
            | Expr::RandInt { location, .. } => *location,
        }
    }

    /// Reinterpret an expression as an assignable place, if it denotes one.
    pub fn into_place(self) -> Option<Place> {
        match self {
            Expr::Variable(name, _) => Some(Place::Var(name)),
            Expr::Deref(inner, _) => Some(Place::Deref(inner)),
            Expr::Index { base, index, .. } => {
                let base = base.into_place()?;
                Some(Place::Index {
                    base: Box::new(base),
                    index,
                })
            }
            _ => None,
        }
    }
}

/// Initial contents of a `Vec`
#[derive(Debug, Clone, PartialEq)]
pub enum VecInit {
    /// `vec![a, b, c]`; empty for `Vec::new()` and `Vec::with_capacity(n)`
    List(Vec<Expr>),
    /// `vec![value; count]`, expanded when it is evaluated
    Repeat { value: Box<Expr>, count: usize },
}

impl VecInit {
    pub fn len(&self) -> usize {
        match self {
            VecInit::List(elements) => elements.len(),
            VecInit::Repeat { count, .. } => *count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Assignable memory locations (l-values)
#[derive(Debug, Clone, PartialEq)]
pub enum Place {
    Var(String),
    /// The target of a pointer-valued expression (`*p`, `**pp` = `Deref(Deref(pp))`)
    Deref(Box<Expr>),
    Index { base: Box<Place>, index: Box<Expr> },
}

/// Where the value produced by a function call goes once the callee returns
#[derive(Debug, Clone, PartialEq)]
pub enum CallTarget {
    /// `f(x);`
    Discard,
    /// `let [mut] y[: T] = f(x);`
    Declare {
        name: String,
        mutable: bool,
        ty: Option<Type>,
    },
    /// `y = f(x);` / `y += f(x);`
    Assign { place: Place, op: Option<BinOp> },
    /// `return f(x);`
    Return,
}

/// One piece of a `print!`/`println!` format string
#[derive(Debug, Clone, PartialEq)]
pub enum FormatPiece {
    Text(String),
    /// `{}`: next positional argument
    Next,
    /// `{name}`: inline variable capture
    Named(String),
}

/// Parameter passing mode, derived from the declared parameter type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMode {
    ByValue,
    ByReference,
}

/// Function parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
    pub mode: PassMode,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        let mode = if ty.is_reference() {
            PassMode::ByReference
        } else {
            PassMode::ByValue
        };
        Self {
            name: name.into(),
            ty,
            mode,
        }
    }
}

/// The closed instruction set
///
/// Every variant records the source location of the statement it came from.
/// The location is used for display only; evaluation never looks at it.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// `let [mut] name[: ty] [= value];`
    Let {
        name: String,
        mutable: bool,
        ty: Option<Type>,
        value: Option<Expr>,
        location: SourceLocation,
    },
    /// `target = value;` or `target op= value;`
    Assign {
        target: Place,
        op: Option<BinOp>,
        value: Expr,
        location: SourceLocation,
    },
    /// `let v = vec![..];` / `Vec::new()` / `Vec::with_capacity(n)`
    VecNew {
        name: String,
        mutable: bool,
        ty: Option<Type>,
        elements: VecInit,
        capacity: Option<Expr>,
        location: SourceLocation,
    },
    /// `vector.push(value);`
    Push {
        vector: Place,
        value: Expr,
        location: SourceLocation,
    },
    /// `let b = Box::new(value);`
    BoxNew {
        name: String,
        mutable: bool,
        ty: Option<Type>,
        value: Expr,
        location: SourceLocation,
    },
    /// `let r = &target;` / `let r = &mut target;`
    TakeRef {
        name: String,
        mutable: bool,
        target: Place,
        location: SourceLocation,
    },
    /// `drop(name);`
    Drop {
        name: String,
        location: SourceLocation,
    },
    /// A call to a user-defined function
    Call {
        function: String,
        args: Vec<Expr>,
        target: CallTarget,
        location: SourceLocation,
    },
    /// `return [value];`
    Return {
        value: Option<Expr>,
        location: SourceLocation,
    },
    If {
        condition: Expr,
        then_body: Vec<Instruction>,
        else_body: Option<Vec<Instruction>>,
        location: SourceLocation,
    },
    While {
        condition: Expr,
        body: Vec<Instruction>,
        location: SourceLocation,
    },
    /// `print!` / `println!`
    Print {
        format: Vec<FormatPiece>,
        args: Vec<Expr>,
        newline: bool,
        location: SourceLocation,
    },
}

impl Instruction {
    pub fn location(&self) -> SourceLocation {
        match self {
            Instruction::Let { location, .. }
            | Instruction::Assign { location, .. }
            | Instruction::VecNew { location, .. }
            | Instruction::Push { location, .. }
            | Instruction::BoxNew { location, .. }
            | Instruction::TakeRef { location, .. }
            | Instruction::Drop { location, .. }
            | Instruction::Call { location, .. }
            | Instruction::Return { location, .. }
            | Instruction::If { location, .. }
            | Instruction::While { location, .. }
            | Instruction::Print { location, .. } => *location,
        }
    }

    /// Short mnemonic used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Instruction::Let { .. } => "let",
            Instruction::Assign { .. } => "assign",
            Instruction::VecNew { .. } => "vec-new",
            Instruction::Push { .. } => "push",
            Instruction::BoxNew { .. } => "box-new",
            Instruction::TakeRef { .. } => "take-ref",
            Instruction::Drop { .. } => "drop",
            Instruction::Call { .. } => "call",
            Instruction::Return { .. } => "return",
            Instruction::If { .. } => "if",
            Instruction::While { .. } => "while",
            Instruction::Print { .. } => "print",
        }
    }
}

/// Function definition
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<Type>,
    pub body: Vec<Instruction>,
    pub location: SourceLocation,
    /// Location of the closing brace, where the implicit return happens
    pub end_location: SourceLocation,
}

/// Complete program: a static, immutable table of functions
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    functions: FxHashMap<String, FunctionDef>,
    order: Vec<String>,
}

impl Program {
    /// Build a program from function definitions.
    ///
    /// Both the parser and hand-built scenarios go through here, so a program
    /// always has a `main` and unique function names.
    pub fn new(functions: impl IntoIterator<Item = FunctionDef>) -> Result<Self, ParseError> {
        let mut table = FxHashMap::default();
        let mut order = Vec::new();

        for function in functions {
            if table.contains_key(&function.name) {
                return Err(ParseError::DuplicateFunction {
                    name: function.name.clone(),
                    location: function.location,
                });
            }
            order.push(function.name.clone());
            table.insert(function.name.clone(), function);
        }

        if !table.contains_key("main") {
            return Err(ParseError::MissingMain);
        }

        Ok(Self {
            functions: table,
            order,
        })
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }

    pub fn main(&self) -> Option<&FunctionDef> {
        self.functions.get("main")
    }

    /// Functions in declaration order
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.order.iter().filter_map(|name| self.functions.get(name))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
