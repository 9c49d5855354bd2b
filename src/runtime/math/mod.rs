pub mod unitary;
pub mod vector;

pub use unitary::Unitary;
pub use vector::Vector;

/// Absolute tolerance used by the approximate equality helpers.
pub const TOLERANCE: f64 = 0.001;
