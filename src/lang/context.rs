use std::fmt;
use std::sync::Arc;

// source position attached to every ast node and diagnostic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    pub filename: Arc<str>,
    pub line: usize,
    pub column: usize,
}

impl Context {
    pub fn new(filename: Arc<str>, line: usize, column: usize) -> Self {
        Context {
            filename,
            line,
            column,
        }
    }

    /// Context used for nodes built in code rather than parsed from a file.
    pub fn builtin() -> Self {
        Context {
            filename: Arc::from("<builtin>"),
            line: 0,
            column: 0,
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.filename, self.line, self.column)
    }
}
