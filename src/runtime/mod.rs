pub mod executor; // program walker
pub mod expression; // parameter arithmetic
pub mod gate; // gate library
pub mod math; // vectors and unitaries
pub mod state; // registers and amplitudes

pub use executor::{execute, Executor};
pub use gate::{Gate, GateApplication};
pub use state::State;
