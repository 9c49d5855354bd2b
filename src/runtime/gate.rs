use crate::error::{MathError, MathResult};
use crate::runtime::math::Unitary;
use num_complex::Complex64;
use std::sync::OnceLock;

/// A quantum operation expressed in gate-local qubit indices.
///
/// Local qubit `j` is bit `j` of the operator's basis index. Offsets into the
/// global state are the caller's business.
#[derive(Debug)]
pub enum Gate {
    /// One of the process-wide constant operators.
    Fixed(&'static Unitary),
    /// An operator computed for one call, e.g. a rotation.
    Matrix(Unitary),
    /// Sub-gate applications run in order on `qubits` local qubits.
    Composite {
        qubits: usize,
        steps: Vec<GateApplication>,
    },
}

/// One step of a composite gate: `gate` acts on the listed local qubits of
/// the enclosing gate, `targets[j]` receiving the sub-gate's qubit `j`.
#[derive(Debug)]
pub struct GateApplication {
    pub gate: Gate,
    pub targets: Vec<usize>,
}

impl GateApplication {
    pub fn new(gate: Gate, targets: Vec<usize>) -> Self {
        GateApplication { gate, targets }
    }
}

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

static IDENTITY: OnceLock<Unitary> = OnceLock::new();
static PAULI_X: OnceLock<Unitary> = OnceLock::new();
static PAULI_Y: OnceLock<Unitary> = OnceLock::new();
static PAULI_Z: OnceLock<Unitary> = OnceLock::new();
static CONTROLLED_NOT: OnceLock<Unitary> = OnceLock::new();

pub fn identity_matrix() -> &'static Unitary {
    IDENTITY.get_or_init(|| Unitary::identity(2))
}

pub fn pauli_x_matrix() -> &'static Unitary {
    PAULI_X.get_or_init(|| {
        Unitary::from_rows([[c(0.0, 0.0), c(1.0, 0.0)], [c(1.0, 0.0), c(0.0, 0.0)]])
    })
}

pub fn pauli_y_matrix() -> &'static Unitary {
    PAULI_Y.get_or_init(|| {
        Unitary::from_rows([[c(0.0, 0.0), c(0.0, -1.0)], [c(0.0, 1.0), c(0.0, 0.0)]])
    })
}

pub fn pauli_z_matrix() -> &'static Unitary {
    PAULI_Z.get_or_init(|| {
        Unitary::from_rows([[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(-1.0, 0.0)]])
    })
}

/// Control on local qubit 0, target on local qubit 1.
pub fn controlled_not_matrix() -> &'static Unitary {
    CONTROLLED_NOT.get_or_init(|| {
        let (o, l) = (c(0.0, 0.0), c(1.0, 0.0));
        Unitary::from_rows([
            [l, o, o, o],
            [o, o, o, l],
            [o, o, l, o],
            [o, l, o, o],
        ])
    })
}

impl Gate {
    pub fn identity() -> Gate {
        Gate::Fixed(identity_matrix())
    }

    pub fn pauli_x() -> Gate {
        Gate::Fixed(pauli_x_matrix())
    }

    pub fn pauli_y() -> Gate {
        Gate::Fixed(pauli_y_matrix())
    }

    pub fn pauli_z() -> Gate {
        Gate::Fixed(pauli_z_matrix())
    }

    pub fn controlled_not() -> Gate {
        Gate::Fixed(controlled_not_matrix())
    }

    /// The `U(theta, phi, lambda)` single-qubit rotation.
    pub fn rotation(theta: f64, phi: f64, lambda: f64) -> Gate {
        let (s, co) = (theta / 2.0).sin_cos();
        let sum = Complex64::from_polar(1.0, (phi + lambda) / 2.0);
        let diff = Complex64::from_polar(1.0, (lambda - phi) / 2.0);
        Gate::Matrix(Unitary::from_rows([
            [(sum * co).conj(), -(diff * s)],
            [(diff * s).conj(), sum * co],
        ]))
    }

    pub fn composite(qubits: usize, steps: Vec<GateApplication>) -> Gate {
        Gate::Composite { qubits, steps }
    }

    /// Number of local qubits the gate acts on.
    pub fn qubits(&self) -> usize {
        match self {
            Gate::Fixed(u) => u.qubits().unwrap_or_default(),
            Gate::Matrix(u) => u.qubits().unwrap_or_default(),
            Gate::Composite { qubits, .. } => *qubits,
        }
    }

    /// Collapses the gate into a single operator on its local qubits.
    ///
    /// Each step is lifted into the full local space and multiplied on the
    /// left, so steps take effect in the order they were listed.
    pub fn resolve(self) -> MathResult<Unitary> {
        match self {
            Gate::Fixed(u) => Ok(u.duplicate()),
            Gate::Matrix(u) => Ok(u),
            Gate::Composite { qubits, steps } => {
                let mut full = Unitary::identity(1 << qubits);
                for GateApplication { gate, targets } in steps {
                    let sub = gate.resolve()?;
                    let perm = placement(qubits, &targets, &sub)?;
                    full = sub.redimension(&perm)?.mat_mul(&full)?;
                }
                Ok(full)
            }
        }
    }
}

// sub-gate qubit j goes to targets[j], the remaining padding qubits fill the
// unused positions in ascending order
fn placement(qubits: usize, targets: &[usize], sub: &Unitary) -> MathResult<Vec<usize>> {
    let width = sub.qubits().ok_or_else(|| {
        MathError::InvalidPermutation(format!("dimension {} is not a power of two", sub.dim()))
    })?;
    if targets.len() != width {
        return Err(MathError::DimensionMismatch {
            expected: width,
            found: targets.len(),
        });
    }
    if let Some(&bad) = targets.iter().find(|&&t| t >= qubits) {
        return Err(MathError::InvalidPermutation(format!(
            "target {} outside a {}-qubit gate",
            bad, qubits
        )));
    }
    let mut perm = targets.to_vec();
    perm.extend((0..qubits).filter(|q| !targets.contains(q)));
    Ok(perm)
}
