use crate::error::{MathError, MathResult};
use crate::runtime::math::vector::Vector;
use crate::vectorization;
use itertools::{iproduct, Itertools};
use num_complex::Complex64;
use std::ops::{Index, IndexMut};

/// Square complex matrix stored row-major. Move-only like [`Vector`].
#[derive(Debug, PartialEq)]
pub struct Unitary {
    dim: usize,
    entries: Vec<Complex64>,
}

impl Unitary {
    pub fn new(dim: usize) -> Self {
        Unitary {
            dim,
            entries: vec![Complex64::new(0.0, 0.0); dim * dim],
        }
    }

    /// Builds a matrix from `dim * dim` row-major entries.
    pub fn from_literal(entries: Vec<Complex64>) -> MathResult<Self> {
        let dim = (entries.len() as f64).sqrt().round() as usize;
        if dim * dim != entries.len() {
            return Err(MathError::NotSquare(entries.len()));
        }
        Ok(Unitary { dim, entries })
    }

    /// Builds a matrix from rows whose shape is fixed at compile time.
    pub fn from_rows<const N: usize>(rows: [[Complex64; N]; N]) -> Self {
        Unitary {
            dim: N,
            entries: rows.into_iter().flatten().collect(),
        }
    }

    pub fn identity(dim: usize) -> Self {
        let mut u = Unitary::new(dim);
        for i in 0..dim {
            u[(i, i)] = Complex64::new(1.0, 0.0);
        }
        u
    }

    /// Explicit deep copy; the type is never duplicated implicitly.
    pub fn duplicate(&self) -> Unitary {
        Unitary {
            dim: self.dim,
            entries: self.entries.clone(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of qubits the operator acts on, if `dim` is a power of two.
    pub fn qubits(&self) -> Option<usize> {
        self.dim
            .is_power_of_two()
            .then(|| self.dim.trailing_zeros() as usize)
    }

    pub fn as_slice(&self) -> &[Complex64] {
        &self.entries
    }

    /// `self * other`.
    pub fn mat_mul(&self, other: &Unitary) -> MathResult<Unitary> {
        self.check_dim(other.dim)?;
        Ok(Unitary {
            dim: self.dim,
            entries: vectorization::mat_mul(&self.entries, &other.entries, self.dim),
        })
    }

    pub fn apply(&self, vector: &Vector) -> MathResult<Vector> {
        self.check_dim(vector.len())?;
        Ok(Vector::from_literal(vectorization::mat_apply(
            &self.entries,
            self.dim,
            vector.as_slice(),
        )))
    }

    /// Kronecker product: entry `(i * b + k, j * b + l)` is `self(i, j) * other(k, l)`.
    pub fn tensor(&self, other: &Unitary) -> Unitary {
        let dim = self.dim * other.dim;
        let mut out = Unitary::new(dim);
        for (i, j) in iproduct!(0..self.dim, 0..self.dim) {
            let a = self[(i, j)];
            if a == Complex64::new(0.0, 0.0) {
                continue;
            }
            for (k, l) in iproduct!(0..other.dim, 0..other.dim) {
                out[(i * other.dim + k, j * other.dim + l)] = a * other[(k, l)];
            }
        }
        out
    }

    /// Lifts the operator into the `2^perm.len()` dimensional space.
    ///
    /// The operator is first padded with an identity on the high-order bits,
    /// then bit `i` of every row and column index is moved to `perm[i]`.
    pub fn redimension(&self, perm: &[usize]) -> MathResult<Unitary> {
        let qubits = perm.len();
        let full = 1usize << qubits;
        if !self.dim.is_power_of_two() || self.dim > full {
            return Err(MathError::InvalidPermutation(format!(
                "a {0}x{0} operator cannot be embedded in {1} qubits",
                self.dim, qubits
            )));
        }
        if !perm.iter().copied().sorted().eq(0..qubits) {
            return Err(MathError::InvalidPermutation(format!(
                "{:?} is not a permutation of 0..{}",
                perm, qubits
            )));
        }

        let embedded = Unitary::identity(full / self.dim).tensor(self);
        let mut out = Unitary::new(full);
        let rows: Vec<usize> = (0..full)
            .map(|i| vectorization::permute_bits(i, perm))
            .collect();
        for (r, c) in iproduct!(0..full, 0..full) {
            let value = embedded[(r, c)];
            if value != Complex64::new(0.0, 0.0) {
                out[(rows[r], rows[c])] = value;
            }
        }
        Ok(out)
    }

    /// Conjugate transpose.
    pub fn adjoint(&self) -> Unitary {
        let mut out = Unitary::new(self.dim);
        for (i, j) in iproduct!(0..self.dim, 0..self.dim) {
            out[(j, i)] = self[(i, j)].conj();
        }
        out
    }

    pub fn approx_eq(&self, other: &Unitary, tolerance: f64) -> bool {
        self.dim == other.dim
            && self.entries.iter().zip(&other.entries).all(|(a, b)| {
                (a.re - b.re).abs() <= tolerance && (a.im - b.im).abs() <= tolerance
            })
    }

    /// Checks `U * U^dagger == I` within `tolerance`.
    pub fn is_unitary(&self, tolerance: f64) -> bool {
        self.mat_mul(&self.adjoint())
            .map(|p| p.approx_eq(&Unitary::identity(self.dim), tolerance))
            .unwrap_or(false)
    }

    fn check_dim(&self, found: usize) -> MathResult<()> {
        if found != self.dim {
            return Err(MathError::DimensionMismatch {
                expected: self.dim,
                found,
            });
        }
        Ok(())
    }
}

impl Index<(usize, usize)> for Unitary {
    type Output = Complex64;

    fn index(&self, (row, col): (usize, usize)) -> &Complex64 {
        &self.entries[row * self.dim + col]
    }
}

impl IndexMut<(usize, usize)> for Unitary {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut Complex64 {
        &mut self.entries[row * self.dim + col]
    }
}
