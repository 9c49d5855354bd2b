use crate::lang::context::Context;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub filename: String,
    pub version: f64,
    pub includes: Vec<Include>,
    pub statements: Vec<Statement>,
}

/// An `include "path";` directive.
#[derive(Debug, Clone, PartialEq)]
pub struct Include {
    pub path: String,
    pub context: Context,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterKind {
    Qubit,
    Classical,
}

impl fmt::Display for RegisterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterKind::Qubit => write!(f, "qreg"),
            RegisterKind::Classical => write!(f, "creg"),
        }
    }
}

/// `name` or `name[index]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub index: Option<usize>,
    pub context: Context,
}

impl Variable {
    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "{}[{}]", self.name, i),
            None => write!(f, "{}", self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    /// Operation name used in diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            BinaryOp::Add => "Addition",
            BinaryOp::Sub => "Subtraction",
            BinaryOp::Mul => "Multiplication",
            BinaryOp::Div => "Division",
            BinaryOp::Pow => "Exponentiation",
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
            BinaryOp::Pow => '^',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryFn {
    Sin,
    Cos,
    Tan,
    Exp,
    Ln,
    Sqrt,
}

impl UnaryFn {
    pub fn name(&self) -> &'static str {
        match self {
            UnaryFn::Sin => "sin",
            UnaryFn::Cos => "cos",
            UnaryFn::Tan => "tan",
            UnaryFn::Exp => "exp",
            UnaryFn::Ln => "ln",
            UnaryFn::Sqrt => "sqrt",
        }
    }

    pub fn apply(&self, x: f64) -> f64 {
        match self {
            UnaryFn::Sin => x.sin(),
            UnaryFn::Cos => x.cos(),
            UnaryFn::Tan => x.tan(),
            UnaryFn::Exp => x.exp(),
            UnaryFn::Ln => x.ln(),
            UnaryFn::Sqrt => x.sqrt(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub kind: ExpressionKind,
    pub context: Context,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Real(f64),
    Integer(u64),
    Pi,
    Variable(Variable),
    Minus(Box<Expression>),
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Unary {
        func: UnaryFn,
        target: Box<Expression>,
    },
}

impl Expression {
    pub fn new(kind: ExpressionKind, context: Context) -> Self {
        Expression { kind, context }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExpressionKind::Real(v) => write!(f, "{}", v),
            ExpressionKind::Integer(v) => write!(f, "{}", v),
            ExpressionKind::Pi => write!(f, "pi"),
            ExpressionKind::Variable(v) => write!(f, "{}", v),
            ExpressionKind::Minus(e) => write!(f, "-{}", e),
            ExpressionKind::Binary { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            ExpressionKind::Unary { func, target } => write!(f, "{}({})", func.name(), target),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operator {
    U,
    CX,
    Named(String),
}

impl Operator {
    pub fn name(&self) -> &str {
        match self {
            Operator::U => "U",
            Operator::CX => "CX",
            Operator::Named(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitaryOperation {
    pub operator: Operator,
    pub parameters: Option<Vec<Expression>>,
    pub arguments: Vec<Variable>,
}

impl UnitaryOperation {
    pub fn parameter_count(&self) -> usize {
        self.parameters.as_ref().map_or(0, Vec::len)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GateDeclaration {
    pub name: String,
    pub parameters: Option<Vec<String>>,
    pub arguments: Vec<String>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpaqueDeclaration {
    pub name: String,
    pub parameters: Option<Vec<String>>,
    pub arguments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub context: Context,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    VariableDeclaration {
        register: RegisterKind,
        name: String,
        width: usize,
    },
    Gate(GateDeclaration),
    Opaque(OpaqueDeclaration),
    Unitary(UnitaryOperation),
    Measure {
        source: Variable,
        target: Variable,
    },
    Reset {
        target: Variable,
    },
    Barrier {
        variables: Vec<Variable>,
    },
    If {
        variable: Variable,
        value: Expression,
        operation: Box<Statement>,
    },
}

impl Statement {
    pub fn new(kind: StatementKind, context: Context) -> Self {
        Statement { kind, context }
    }
}
