use crate::config::RunConfig;
use crate::error::{RuntimeError, RuntimeResult};
use crate::runtime::gate::Gate;
use crate::runtime::math::vector::MAX_QUBITS;
use crate::runtime::math::Vector;
use crate::vectorization;
use log::{info, trace};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::fmt;

// amplitudes below this are left out of the printed state
const PRINT_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuantumRegister {
    pub name: String,
    pub offset: usize,
    pub width: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassicalRegister {
    pub name: String,
    pub bits: Vec<u8>,
}

impl ClassicalRegister {
    /// The bits read as an unsigned integer, bit 0 least significant, or
    /// `None` when a set bit lies beyond what a `u64` holds.
    pub fn value(&self) -> Option<u64> {
        if self.bits.iter().skip(64).any(|&b| b != 0) {
            return None;
        }
        Some(
            self.bits
                .iter()
                .take(64)
                .rev()
                .fold(0u64, |acc, &b| (acc << 1) | u64::from(b)),
        )
    }

    /// Whether the register reads as the integer `value`, at any width.
    pub fn holds(&self, value: f64) -> bool {
        if value < 0.0 || value.fract() != 0.0 {
            return false;
        }
        // halving an integral f64 is exact, so this peels off one bit at a time
        let mut rest = value;
        for &bit in &self.bits {
            let low = rest % 2.0;
            if low != f64::from(bit) {
                return false;
            }
            rest = (rest - low) / 2.0;
        }
        rest == 0.0
    }
}

/// Serializable view of a finished run.
#[derive(Debug, Serialize)]
pub struct StateSnapshot<'a> {
    pub qubits: usize,
    pub amplitudes: &'a [Complex64],
    pub quantum_registers: &'a [QuantumRegister],
    pub classical_registers: &'a [ClassicalRegister],
}

/// The simulated machine: one global statevector plus register bookkeeping.
///
/// Quantum registers occupy consecutive bit ranges in declaration order: the
/// first register declared holds the lowest-order bits of a basis index.
pub struct State {
    vector: Vector,
    quantum: Vec<QuantumRegister>,
    classical: Vec<ClassicalRegister>,
    rng: StdRng,
    max_qubits: usize,
}

impl State {
    pub fn new() -> Self {
        State::with_config(&RunConfig::default())
    }

    pub fn with_seed(seed: u64) -> Self {
        State::with_config(&RunConfig::default().with_seed(seed))
    }

    pub fn with_config(config: &RunConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        State {
            // the empty product: a single amplitude of 1
            vector: Vector::from_literal(vec![Complex64::new(1.0, 0.0)]),
            quantum: Vec::new(),
            classical: Vec::new(),
            rng,
            max_qubits: config.max_qubits.min(MAX_QUBITS),
        }
    }

    pub fn vector(&self) -> &Vector {
        &self.vector
    }

    pub fn qubits(&self) -> usize {
        self.quantum.iter().map(|r| r.width).sum()
    }

    pub fn quantum_registers(&self) -> &[QuantumRegister] {
        &self.quantum
    }

    pub fn classical_registers(&self) -> &[ClassicalRegister] {
        &self.classical
    }

    fn check_fresh(&self, name: &str, width: usize) -> RuntimeResult<()> {
        if width == 0 {
            return Err(RuntimeError::EmptyRegister(name.to_string()));
        }
        if self.quantum.iter().any(|r| r.name == name)
            || self.classical.iter().any(|r| r.name == name)
        {
            return Err(RuntimeError::DuplicateRegister(name.to_string()));
        }
        Ok(())
    }

    pub fn declare_quantum_register(&mut self, name: &str, width: usize) -> RuntimeResult<()> {
        self.check_fresh(name, width)?;
        let offset = self.qubits();
        let requested = offset.checked_add(width).unwrap_or(usize::MAX);
        if requested > self.max_qubits {
            return Err(RuntimeError::TooManyQubits {
                requested,
                limit: self.max_qubits,
            });
        }
        // the new register lands on the high-order bits
        self.vector = Vector::zero_state(width)?.tensor(&self.vector);
        info!(
            "qreg {}[{}] at offset {}, state now {} amplitudes",
            name,
            width,
            offset,
            self.vector.len()
        );
        self.quantum.push(QuantumRegister {
            name: name.to_string(),
            offset,
            width,
        });
        Ok(())
    }

    pub fn declare_classical_register(&mut self, name: &str, width: usize) -> RuntimeResult<()> {
        self.check_fresh(name, width)?;
        info!("creg {}[{}]", name, width);
        self.classical.push(ClassicalRegister {
            name: name.to_string(),
            bits: vec![0; width],
        });
        Ok(())
    }

    pub fn quantum_register(&self, name: &str) -> RuntimeResult<&QuantumRegister> {
        self.quantum
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| RuntimeError::UndefinedRegister(name.to_string()))
    }

    pub fn classical_register(&self, name: &str) -> RuntimeResult<&ClassicalRegister> {
        self.classical
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| RuntimeError::UndefinedRegister(name.to_string()))
    }

    fn classical_register_mut(&mut self, name: &str) -> RuntimeResult<&mut ClassicalRegister> {
        self.classical
            .iter_mut()
            .find(|r| r.name == name)
            .ok_or_else(|| RuntimeError::UndefinedRegister(name.to_string()))
    }

    pub fn is_quantum(&self, name: &str) -> bool {
        self.quantum.iter().any(|r| r.name == name)
    }

    /// Absolute bit position of `name[index]`.
    pub fn qubit(&self, name: &str, index: usize) -> RuntimeResult<usize> {
        let reg = self.quantum_register(name)?;
        check_index(name, index, reg.width)?;
        Ok(reg.offset + index)
    }

    pub fn reset_register(&mut self, name: &str) -> RuntimeResult<()> {
        let (offset, width) = self.span(name)?;
        self.vector.reset(offset, width)?;
        Ok(())
    }

    pub fn reset_register_bit(&mut self, name: &str, index: usize) -> RuntimeResult<()> {
        let bit = self.qubit(name, index)?;
        self.vector.reset(bit, 1)?;
        Ok(())
    }

    pub fn reset_classical(&mut self, name: &str) -> RuntimeResult<()> {
        self.classical_register_mut(name)?.bits.fill(0);
        Ok(())
    }

    pub fn reset_classical_bit(&mut self, name: &str, index: usize) -> RuntimeResult<()> {
        let reg = self.classical_register_mut(name)?;
        check_index(name, index, reg.bits.len())?;
        reg.bits[index] = 0;
        Ok(())
    }

    /// Measures a whole quantum register into a classical register of the same width.
    pub fn measure(&mut self, qreg: &str, creg: &str) -> RuntimeResult<()> {
        let (offset, width) = self.span(qreg)?;
        let target_width = self.classical_register(creg)?.bits.len();
        if target_width != width {
            return Err(RuntimeError::SizeMismatch(format!(
                "cannot measure {} qubits of {} into {} bits of {}",
                width, qreg, target_width, creg
            )));
        }
        let bits = self.vector.measure(offset, width, &mut self.rng)?;
        trace!("measure {} -> {} = {:?}", qreg, creg, bits);
        self.classical_register_mut(creg)?.bits = bits;
        Ok(())
    }

    /// Measures `qreg[qindex]` into `creg[cindex]`.
    pub fn measure_bit(
        &mut self,
        qreg: &str,
        qindex: usize,
        creg: &str,
        cindex: usize,
    ) -> RuntimeResult<()> {
        let bit = self.qubit(qreg, qindex)?;
        check_index(creg, cindex, self.classical_register(creg)?.bits.len())?;
        let outcome = self.vector.measure(bit, 1, &mut self.rng)?;
        trace!("measure {}[{}] -> {}[{}] = {:?}", qreg, qindex, creg, cindex, outcome);
        self.classical_register_mut(creg)?.bits[cindex] = outcome[0];
        Ok(())
    }

    /// Applies `gate`, its local qubit `j` acting on absolute bit `qubits[j]`.
    pub fn apply(&mut self, gate: Gate, qubits: &[usize]) -> RuntimeResult<()> {
        let total = self.qubits();
        for (i, &q) in qubits.iter().enumerate() {
            if q >= total {
                return Err(RuntimeError::SizeMismatch(format!(
                    "qubit {} outside a {}-qubit state",
                    q, total
                )));
            }
            if qubits[..i].contains(&q) {
                return Err(RuntimeError::DuplicateQubit(format!("at bit {}", q)));
            }
        }
        let unitary = gate.resolve()?;
        if unitary.dim() != 1 << qubits.len() {
            return Err(RuntimeError::SizeMismatch(format!(
                "a {0}x{0} operator cannot act on {1} qubits",
                unitary.dim(),
                qubits.len()
            )));
        }
        trace!("apply {}x{} on bits {:?}", unitary.dim(), unitary.dim(), qubits);
        let amps =
            vectorization::apply_on_targets(self.vector.as_slice(), unitary.as_slice(), qubits);
        self.vector.replace(amps);
        Ok(())
    }

    pub fn snapshot(&self) -> StateSnapshot<'_> {
        StateSnapshot {
            qubits: self.qubits(),
            amplitudes: self.vector.as_slice(),
            quantum_registers: &self.quantum,
            classical_registers: &self.classical,
        }
    }

    fn span(&self, name: &str) -> RuntimeResult<(usize, usize)> {
        let reg = self.quantum_register(name)?;
        Ok((reg.offset, reg.width))
    }
}

impl Default for State {
    fn default() -> Self {
        State::new()
    }
}

fn check_index(name: &str, index: usize, width: usize) -> RuntimeResult<()> {
    if index >= width {
        return Err(RuntimeError::IndexOutOfRange {
            name: name.to_string(),
            index,
            width,
        });
    }
    Ok(())
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for reg in &self.quantum {
            writeln!(
                f,
                "qreg {}[{}] bits {}..{}",
                reg.name,
                reg.width,
                reg.offset,
                reg.offset + reg.width
            )?;
        }
        for reg in &self.classical {
            // printed most significant bit first
            let bits: String = reg
                .bits
                .iter()
                .rev()
                .map(|b| if *b == 1 { '1' } else { '0' })
                .collect();
            match reg.value() {
                Some(value) => writeln!(
                    f,
                    "creg {}[{}] = {} ({})",
                    reg.name,
                    reg.bits.len(),
                    bits,
                    value
                )?,
                None => writeln!(f, "creg {}[{}] = {}", reg.name, reg.bits.len(), bits)?,
            }
        }
        let width = self.qubits();
        for (i, amp) in self.vector.as_slice().iter().enumerate() {
            if amp.norm_sqr() < PRINT_EPSILON {
                continue;
            }
            writeln!(
                f,
                "|{:0width$b}> {:+.6}{:+.6}i  p={:.6}",
                i,
                amp.re,
                amp.im,
                amp.norm_sqr(),
                width = width.max(1)
            )?;
        }
        Ok(())
    }
}
