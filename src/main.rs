use clap::Parser;
use log::info;
use qasmsim::config::{RunConfig, DEFAULT_MAX_QUBITS};
use qasmsim::error::QasmError;
use qasmsim::lang;
use serde_json::to_writer_pretty;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;


const QASMSIM_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "qasmsim", version = QASMSIM_VERSION,
    about = "Checks and simulates OpenQASM 2.0 programs on a dense statevector.\n\n\
             Use 'qasmsim help <command>' for more information on a specific command, e.g., 'qasmsim help run'.",
    long_about = None)]
struct Cli {
    /// Log debug output (RUST_LOG still takes precedence).
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Parses and semantically checks a .qasm file without running it.
    Check {
        /// Source .qasm file path
        file: PathBuf,
        /// Print the symbol table after a successful check.
        #[arg(long)]
        dump_symbols: bool,
    },
    /// Checks and runs a .qasm file, printing the final classical registers.
    Run {
        /// Source .qasm file path
        file: PathBuf,
        /// Seed for the measurement RNG, for reproducible runs.
        #[arg(long)]
        seed: Option<u64>,
        /// Refuse programs that declare more qubits than this.
        #[arg(long, default_value_t = DEFAULT_MAX_QUBITS)]
        max_qubits: usize,
        /// Also print every non-zero amplitude of the final state.
        #[arg(long)]
        show_state: bool,
        /// Write the final state as JSON to this path.
        #[arg(long, value_name = "PATH")]
        json: Option<PathBuf>,
    },
    /// Prints the qasmsim version.
    Version,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn check(file: &Path, dump_symbols: bool) -> Result<(), QasmError> {
    let program = lang::load_file(file)?;
    let symbols = lang::sema::check(&program)?;
    println!("{}: ok ({} statements)", file.display(), program.statements.len());
    if dump_symbols {
        print!("{}", symbols.dump());
    }
    Ok(())
}

fn run(
    file: &Path,
    config: &RunConfig,
    show_state: bool,
    json: Option<&Path>,
) -> Result<(), QasmError> {
    let program = lang::load_file(file)?;

    let start = Instant::now();
    let state = qasmsim::check_and_run(&program, config)?;
    info!(
        "{} executed on {} qubits in {:.3?}",
        file.display(),
        state.qubits(),
        start.elapsed()
    );

    if show_state {
        print!("{}", state);
    } else {
        for reg in state.classical_registers() {
            let bits: String = reg.bits.iter().rev().map(|b| b.to_string()).collect();
            match reg.value() {
                Some(value) => println!("{}[{}] = {} ({})", reg.name, reg.bits.len(), bits, value),
                None => println!("{}[{}] = {}", reg.name, reg.bits.len(), bits),
            }
        }
    }

    if let Some(path) = json {
        let out = File::create(path).map_err(|source| QasmError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        to_writer_pretty(BufWriter::new(out), &state.snapshot())?;
        println!("state written to '{}'", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Commands::Check { file, dump_symbols } => check(file, *dump_symbols),
        Commands::Run {
            file,
            seed,
            max_qubits,
            show_state,
            json,
        } => {
            let mut config = RunConfig::default().with_max_qubits(*max_qubits);
            if let Some(seed) = seed {
                config = config.with_seed(*seed);
            }
            run(file, &config, *show_state, json.as_deref())
        }
        Commands::Version => {
            println!("qasmsim version {}", QASMSIM_VERSION);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
