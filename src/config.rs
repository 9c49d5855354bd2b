use serde::{Deserialize, Serialize};

// a 24-qubit statevector is 256 MiB of Complex64
pub const DEFAULT_MAX_QUBITS: usize = 24;

/// Knobs for one simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Seed for the measurement rng; `None` draws from entropy.
    pub seed: Option<u64>,
    /// Upper bound on the total number of declared qubits.
    pub max_qubits: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            seed: None,
            max_qubits: DEFAULT_MAX_QUBITS,
        }
    }
}

impl RunConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_qubits(mut self, max_qubits: usize) -> Self {
        self.max_qubits = max_qubits;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: RunConfig = serde_json::from_str(r#"{ "seed": 9 }"#).unwrap();
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.max_qubits, DEFAULT_MAX_QUBITS);
    }
}
