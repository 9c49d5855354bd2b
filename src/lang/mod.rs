pub mod ast;
pub mod context;
pub mod lexer;
pub mod parser;
pub mod sema;
pub mod symbol_table;

use crate::error::{ParseError, QasmError};
use crate::lang::ast::{Include, Program};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// Name under which the bundled standard gate library is included.
pub const QELIB1_NAME: &str = "qelib1.inc";
pub const QELIB1: &str = include_str!("qelib1.inc");

/// Reads `path` and splices every included file in front of its statements.
pub fn load_file(path: impl AsRef<Path>) -> Result<Program, QasmError> {
    let path = path.as_ref();
    let source = read(path)?;
    let mut loader = Loader {
        stack: vec![canonical(path)],
    };
    let program = parser::parse(&source, &path.display().to_string())?;
    loader.resolve(program, path.parent())
}

/// Parses in-memory source. Includes other than the bundled library are
/// resolved against the working directory.
pub fn parse_source(source: &str, filename: &str) -> Result<Program, QasmError> {
    let mut loader = Loader {
        stack: vec![canonical(Path::new(filename))],
    };
    let program = parser::parse(source, filename)?;
    loader.resolve(program, None)
}

fn read(path: &Path) -> Result<String, QasmError> {
    fs::read_to_string(path).map_err(|source| QasmError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

struct Loader {
    // files currently being expanded, outermost first
    stack: Vec<PathBuf>,
}

impl Loader {
    fn resolve(&mut self, mut program: Program, dir: Option<&Path>) -> Result<Program, QasmError> {
        let mut statements = Vec::new();
        for Include { path: include, context } in &program.includes {
            if include == QELIB1_NAME {
                debug!("{}: using bundled {}", program.filename, QELIB1_NAME);
                let library = parser::parse_fragment(QELIB1, QELIB1_NAME)?;
                statements.extend(library.statements);
                continue;
            }

            let path = dir.map_or_else(|| PathBuf::from(include), |d| d.join(include));
            let key = canonical(&path);
            if self.stack.last() == Some(&key) {
                return Err(ParseError::new(
                    format!("file {} includes itself", include),
                    context,
                )
                .into());
            }
            if self.stack.contains(&key) {
                return Err(ParseError::new(
                    format!("include cycle through {}", include),
                    context,
                )
                .into());
            }

            debug!("{}: including {}", program.filename, path.display());
            let source = read(&path)?;
            let included = parser::parse_fragment(&source, &path.display().to_string())?;
            self.stack.push(key);
            let included = self.resolve(included, path.parent())?;
            self.stack.pop();
            statements.extend(included.statements);
        }
        statements.append(&mut program.statements);
        program.statements = statements;
        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::ast::StatementKind;
    use std::io::Write;

    fn gate_names(program: &Program) -> Vec<String> {
        program
            .statements
            .iter()
            .filter_map(|s| match &s.kind {
                StatementKind::Gate(g) => Some(g.name.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn bundled_library_precedes_program() {
        let p = parse_source(
            "OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[1];\nh q;",
            "main.qasm",
        )
        .unwrap();
        let names = gate_names(&p);
        for expected in ["u3", "cx", "h", "ccx", "cu3"] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
        assert!(matches!(
            p.statements.last().map(|s| &s.kind),
            Some(StatementKind::Unitary(_))
        ));
    }

    #[test]
    fn bundled_library_passes_semantic_checks() {
        let p = parse_source("OPENQASM 2.0;\ninclude \"qelib1.inc\";", "main.qasm").unwrap();
        assert!(sema::check(&p).is_ok());
    }

    #[test]
    fn includes_resolve_relative_to_the_including_file() {
        let dir = tempfile::tempdir().unwrap();
        let lib = dir.path().join("lib.inc");
        writeln!(fs::File::create(&lib).unwrap(), "gate flip a {{ U(pi, 0, pi) a; }}").unwrap();
        let main = dir.path().join("main.qasm");
        writeln!(
            fs::File::create(&main).unwrap(),
            "OPENQASM 2.0;\ninclude \"lib.inc\";\nqreg q[1];\nflip q;"
        )
        .unwrap();

        let p = load_file(&main).unwrap();
        assert_eq!(gate_names(&p), vec!["flip".to_string()]);
        assert_eq!(p.statements.len(), 3);
    }

    #[test]
    fn self_include_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("main.qasm");
        writeln!(
            fs::File::create(&main).unwrap(),
            "OPENQASM 2.0;\ninclude \"main.qasm\";"
        )
        .unwrap();
        match load_file(&main) {
            Err(QasmError::Parse(e)) => {
                assert!(e.message.contains("includes itself"));
                assert_eq!(e.context.line, 2);
            }
            other => panic!("unexpected {:?}", other.map(|p| p.statements.len())),
        }
    }

    #[test]
    fn missing_files_are_io_errors() {
        assert!(matches!(
            load_file("/definitely/not/here.qasm"),
            Err(QasmError::Io { .. })
        ));
    }
}
