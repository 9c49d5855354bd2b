use crate::lang::context::Context;
use std::path::PathBuf;
use thiserror::Error;

pub type MathResult<T> = Result<T, MathError>;
pub type RuntimeResult<T> = Result<T, RuntimeError>;
pub type SemanticResult<T> = Result<T, SemanticError>;
pub type ParseResult<T> = Result<T, ParseError>;

/// Precondition violations raised by the vector and unitary algebra.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MathError {
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("{0} entries cannot form a square matrix")]
    NotSquare(usize),

    #[error("measured a zero-probability state")]
    ZeroProbability,

    #[error("invalid permutation: {0}")]
    InvalidPermutation(String),

    #[error("a {0}-qubit state is too large to allocate")]
    TooWide(usize),

    #[error("{width} bits at offset {offset} do not fit a {qubits}-qubit state")]
    OutOfRange {
        offset: usize,
        width: usize,
        qubits: usize,
    },
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Math(#[from] MathError),

    #[error("register {0} is not defined")]
    UndefinedRegister(String),

    #[error("register {0} has already been declared")]
    DuplicateRegister(String),

    #[error("register {0} must have at least one bit")]
    EmptyRegister(String),

    #[error("gate {0} is not defined")]
    UndefinedGate(String),

    #[error("gate {0} is opaque and cannot be simulated")]
    OpaqueGate(String),

    #[error("gate {0} instantiates itself")]
    RecursiveGate(String),

    #[error("register {name} of width {width} cannot be indexed at {index}")]
    IndexOutOfRange {
        name: String,
        index: usize,
        width: usize,
    },

    #[error("size mismatch: {0}")]
    SizeMismatch(String),

    #[error("qubit {0} is used more than once in the same operation")]
    DuplicateQubit(String),

    #[error("declaring {requested} qubits exceeds the limit of {limit}")]
    TooManyQubits { requested: usize, limit: usize },

    #[error("parameter {0} is not bound")]
    UnboundParameter(String),

    #[error("expression {0} does not evaluate to a finite number")]
    NotANumber(String),

    #[error("[{context}] {source}")]
    At {
        context: Context,
        source: Box<RuntimeError>,
    },
}

impl RuntimeError {
    /// Attaches a statement location unless one is already present.
    pub fn at(self, context: &Context) -> RuntimeError {
        match self {
            RuntimeError::At { .. } => self,
            other => RuntimeError::At {
                context: context.clone(),
                source: Box::new(other),
            },
        }
    }

    /// Strips location wrappers.
    pub fn root(&self) -> &RuntimeError {
        match self {
            RuntimeError::At { source, .. } => source.root(),
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticErrorKind {
    Redeclaration,
    UndefinedSymbol,
    KindMismatch,
    ArityMismatch,
    IndexOutOfRange,
    EmptyRegister,
    Internal,
}

#[derive(Debug, Clone, Error)]
#[error("[{context}] {message}")]
pub struct SemanticError {
    pub kind: SemanticErrorKind,
    pub message: String,
    pub context: Context,
    // enclosing declarations, innermost first
    pub trace: Vec<Context>,
}

impl SemanticError {
    pub fn new(kind: SemanticErrorKind, message: impl Into<String>, context: &Context) -> Self {
        SemanticError {
            kind,
            message: message.into(),
            context: context.clone(),
            trace: Vec::new(),
        }
    }

    pub fn within(mut self, context: &Context) -> Self {
        self.trace.push(context.clone());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("[{context}] {message}")]
pub struct ParseError {
    pub message: String,
    pub context: Context,
}

impl ParseError {
    pub fn new(message: impl Into<String>, context: &Context) -> Self {
        ParseError {
            message: message.into(),
            context: context.clone(),
        }
    }
}

/// Everything the command line can fail with.
#[derive(Debug, Error)]
pub enum QasmError {
    #[error("parse error {0}")]
    Parse(#[from] ParseError),

    #[error("semantic error {0}")]
    Semantic(#[from] SemanticError),

    #[error("runtime error {0}")]
    Runtime(#[from] RuntimeError),

    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot write state snapshot: {0}")]
    Json(#[from] serde_json::Error),
}
