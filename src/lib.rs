pub mod config; // run configuration
pub mod error; // error types for every layer
pub mod lang; // lexer, parser, loader and semantic checks
pub mod runtime; // statevector simulation
pub mod vectorization; // hot numeric loops

pub use config::RunConfig;
pub use error::QasmError;

use crate::lang::ast::Program;
use crate::runtime::State;

/// Verifies `program` and runs it on a fresh state.
pub fn check_and_run(program: &Program, config: &RunConfig) -> Result<State, QasmError> {
    lang::sema::check(program)?;
    Ok(runtime::execute(program, config)?)
}

/// Parses, verifies and runs in-memory source.
pub fn run_source(source: &str, filename: &str, config: &RunConfig) -> Result<State, QasmError> {
    let program = lang::parse_source(source, filename)?;
    check_and_run(&program, config)
}
