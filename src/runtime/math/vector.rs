use crate::error::{MathError, MathResult};
use crate::vectorization;
use num_complex::Complex64;
use rand::Rng;
use std::ops::{Index, IndexMut};

// total probability below this counts as an empty state
pub const ZERO_MASS: f64 = 1e-12;

/// Widest state whose amplitude buffer still fits in `isize::MAX` bytes.
pub const MAX_QUBITS: usize = usize::BITS as usize - 6;

/// Owned array of complex amplitudes.
///
/// Deliberately not `Clone`: statevectors grow exponentially and are only
/// ever moved between owners.
#[derive(Debug, PartialEq)]
pub struct Vector {
    amps: Vec<Complex64>,
}

impl Vector {
    /// `size` zeroed amplitudes.
    pub fn new(size: usize) -> Self {
        Vector {
            amps: vec![Complex64::new(0.0, 0.0); size],
        }
    }

    pub fn from_literal(amps: Vec<Complex64>) -> Self {
        Vector { amps }
    }

    /// The `|0...0>` state of `width` qubits.
    pub fn zero_state(width: usize) -> MathResult<Self> {
        if width > MAX_QUBITS {
            return Err(MathError::TooWide(width));
        }
        let mut v = Vector::new(1 << width);
        v.amps[0] = Complex64::new(1.0, 0.0);
        Ok(v)
    }

    pub fn len(&self) -> usize {
        self.amps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amps.is_empty()
    }

    /// Number of qubits a power-of-two sized vector describes.
    pub fn qubits(&self) -> usize {
        self.amps.len().trailing_zeros() as usize
    }

    pub fn as_slice(&self) -> &[Complex64] {
        &self.amps
    }

    pub fn as_mut_slice(&mut self) -> &mut [Complex64] {
        &mut self.amps
    }

    pub(crate) fn replace(&mut self, amps: Vec<Complex64>) {
        debug_assert_eq!(amps.len(), self.amps.len());
        self.amps = amps;
    }

    /// Kronecker product: entry `i * other.len() + j` is `self[i] * other[j]`.
    pub fn tensor(&self, other: &Vector) -> Vector {
        let mut amps = Vec::with_capacity(self.len() * other.len());
        for a in &self.amps {
            amps.extend(other.amps.iter().map(|b| a * b));
        }
        Vector { amps }
    }

    pub fn checked_add(&self, other: &Vector) -> MathResult<Vector> {
        self.check_len(other.len())?;
        Ok(Vector {
            amps: self.amps.iter().zip(&other.amps).map(|(a, b)| a + b).collect(),
        })
    }

    pub fn probabilities(&self) -> Vec<f64> {
        self.amps.iter().map(|a| a.norm_sqr()).collect()
    }

    pub fn norm_sqr(&self) -> f64 {
        vectorization::norm_sqr(&self.amps)
    }

    /// Scales the amplitudes to unit total probability.
    pub fn normalize(&mut self) -> MathResult<()> {
        let mass = self.norm_sqr();
        if mass < ZERO_MASS {
            return Err(MathError::ZeroProbability);
        }
        vectorization::scale(&mut self.amps, mass.sqrt());
        Ok(())
    }

    /// Projects the register at `offset..offset + width` onto `|0...0>` and
    /// renormalizes.
    ///
    /// This is a projection, not a physical reset: a register that is certainly
    /// not in `|0...0>` leaves nothing behind and fails with `ZeroProbability`.
    /// The amplitudes are untouched when it fails.
    pub fn reset(&mut self, offset: usize, width: usize) -> MathResult<()> {
        self.check_range(offset, width)?;
        let mask = register_mask(width) << offset;
        let kept: f64 = self
            .amps
            .iter()
            .enumerate()
            .filter(|(i, _)| i & mask == 0)
            .map(|(_, amp)| amp.norm_sqr())
            .sum();
        if kept < ZERO_MASS {
            return Err(MathError::ZeroProbability);
        }
        for (i, amp) in self.amps.iter_mut().enumerate() {
            if i & mask != 0 {
                *amp = Complex64::new(0.0, 0.0);
            }
        }
        vectorization::scale(&mut self.amps, kept.sqrt());
        Ok(())
    }

    /// Measures the register at `offset..offset + width`, collapses the vector
    /// onto the drawn outcome and returns its bits, least significant first.
    pub fn measure<R: Rng + ?Sized>(
        &mut self,
        offset: usize,
        width: usize,
        rng: &mut R,
    ) -> MathResult<Vec<u8>> {
        self.check_range(offset, width)?;
        let mask = register_mask(width);

        let mut outcomes = vec![0.0f64; 1 << width];
        for (i, amp) in self.amps.iter().enumerate() {
            outcomes[(i >> offset) & mask] += amp.norm_sqr();
        }
        let total: f64 = outcomes.iter().sum();
        if total < ZERO_MASS {
            return Err(MathError::ZeroProbability);
        }

        // outcomes too faint to renormalize onto are never drawn
        let Some(last) = outcomes.iter().rposition(|&p| p >= ZERO_MASS) else {
            return Err(MathError::ZeroProbability);
        };
        let draw = rng.gen::<f64>() * total;
        let mut acc = 0.0;
        // rounding can leave draw just above the last partial sum
        let mut outcome = last;
        for (value, p) in outcomes.iter().enumerate() {
            acc += p;
            if *p >= ZERO_MASS && draw < acc {
                outcome = value;
                break;
            }
        }

        for (i, amp) in self.amps.iter_mut().enumerate() {
            if (i >> offset) & mask != outcome {
                *amp = Complex64::new(0.0, 0.0);
            }
        }
        vectorization::scale(&mut self.amps, outcomes[outcome].sqrt());

        Ok((0..width).map(|bit| ((outcome >> bit) & 1) as u8).collect())
    }

    /// Entrywise comparison with an absolute tolerance on each component.
    pub fn approx_eq(&self, other: &Vector, tolerance: f64) -> bool {
        self.len() == other.len()
            && self.amps.iter().zip(&other.amps).all(|(a, b)| {
                (a.re - b.re).abs() <= tolerance && (a.im - b.im).abs() <= tolerance
            })
    }

    fn check_len(&self, found: usize) -> MathResult<()> {
        if found != self.len() {
            return Err(MathError::DimensionMismatch {
                expected: self.len(),
                found,
            });
        }
        Ok(())
    }

    fn check_range(&self, offset: usize, width: usize) -> MathResult<()> {
        let qubits = self.qubits();
        if offset.checked_add(width).map_or(true, |end| end > qubits) {
            return Err(MathError::OutOfRange {
                offset,
                width,
                qubits,
            });
        }
        Ok(())
    }
}

#[inline]
fn register_mask(width: usize) -> usize {
    (1usize << width) - 1
}

impl From<Vec<Complex64>> for Vector {
    fn from(amps: Vec<Complex64>) -> Self {
        Vector::from_literal(amps)
    }
}

impl Index<usize> for Vector {
    type Output = Complex64;

    fn index(&self, i: usize) -> &Complex64 {
        &self.amps[i]
    }
}

impl IndexMut<usize> for Vector {
    fn index_mut(&mut self, i: usize) -> &mut Complex64 {
        &mut self.amps[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn amps_strategy(len: usize) -> impl Strategy<Value = Vec<Complex64>> {
        prop::collection::vec((-10.0f64..10.0, -10.0f64..10.0), len)
            .prop_map(|v| v.into_iter().map(|(re, im)| c(re, im)).collect())
    }

    #[test]
    fn new_is_zeroed() {
        let v = Vector::new(4);
        assert_eq!(v.len(), 4);
        assert!(v.as_slice().iter().all(|a| *a == c(0.0, 0.0)));
    }

    #[test]
    fn tensor_places_other_in_low_order_positions() {
        let a = Vector::from_literal(vec![c(1.0, 0.0), c(2.0, 0.0)]);
        let b = Vector::from_literal(vec![c(3.0, 0.0), c(0.0, 1.0), c(5.0, 0.0)]);
        let t = a.tensor(&b);
        assert_eq!(t.len(), 6);
        assert_eq!(t[0], c(3.0, 0.0));
        assert_eq!(t[1], c(0.0, 1.0));
        assert_eq!(t[4], c(0.0, 2.0));
        assert_eq!(t[5], c(10.0, 0.0));
    }

    #[test]
    fn normalize_of_zero_vector_fails() {
        let mut v = Vector::new(2);
        assert_eq!(v.normalize(), Err(MathError::ZeroProbability));
    }

    #[test]
    fn measure_of_basis_state_is_deterministic() {
        // |q2 q1 q0> = |110>, register of width 2 at offset 1 holds 0b11
        let mut v = Vector::new(8);
        v[0b110] = c(1.0, 0.0);
        let mut rng = StdRng::seed_from_u64(7);
        let bits = v.measure(1, 2, &mut rng).unwrap();
        assert_eq!(bits, vec![1, 1]);
        assert_eq!(v[0b110], c(1.0, 0.0));
    }

    #[test]
    fn measure_collapses_superposition() {
        let h = 1.0 / 2f64.sqrt();
        for seed in 0..16 {
            let mut v = Vector::from_literal(vec![c(h, 0.0), c(h, 0.0)]);
            let mut rng = StdRng::seed_from_u64(seed);
            let bits = v.measure(0, 1, &mut rng).unwrap();
            let expected = bits[0] as usize;
            assert!((v[expected].norm() - 1.0).abs() < 1e-9);
            assert_eq!(v[1 - expected], c(0.0, 0.0));
        }
    }

    #[test]
    fn measure_rejects_bits_outside_the_state() {
        let mut v = Vector::zero_state(2).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            v.measure(1, 2, &mut rng),
            Err(MathError::OutOfRange { .. })
        ));
    }

    #[test]
    fn reset_projects_register_onto_zero() {
        // (|00> + |01> + |10> + |11>) / 2, reset bit 1
        let mut v = Vector::from_literal(vec![c(0.5, 0.0); 4]);
        v.reset(1, 1).unwrap();
        let h = 1.0 / 2f64.sqrt();
        let expected = Vector::from_literal(vec![c(h, 0.0), c(h, 0.0), c(0.0, 0.0), c(0.0, 0.0)]);
        assert!(v.approx_eq(&expected, 0.001));
    }

    #[test]
    fn reset_of_certain_one_is_a_zero_probability_projection() {
        let mut v = Vector::from_literal(vec![c(0.0, 0.0), c(1.0, 0.0)]);
        assert_eq!(v.reset(0, 1), Err(MathError::ZeroProbability));
        // a failed reset leaves the amplitudes as they were
        assert_eq!(v.as_slice(), &[c(0.0, 0.0), c(1.0, 0.0)]);
    }

    #[test]
    fn measure_ignores_outcomes_too_faint_to_keep() {
        let mut v = Vector::from_literal(vec![c(1.0, 0.0), c(1e-8, 0.0)]);
        for seed in 0..16 {
            let mut rng = StdRng::seed_from_u64(seed);
            assert_eq!(v.measure(0, 1, &mut rng).unwrap(), vec![0]);
        }
        assert!(v.approx_eq(&Vector::zero_state(1).unwrap(), 1e-12));
    }

    #[test]
    fn zero_state_refuses_unaddressable_widths() {
        assert_eq!(Vector::zero_state(3).unwrap().len(), 8);
        assert_eq!(
            Vector::zero_state(MAX_QUBITS + 1),
            Err(MathError::TooWide(MAX_QUBITS + 1))
        );
        assert!(Vector::zero_state(64).is_err());
    }

    #[test]
    fn range_checks_do_not_overflow() {
        let mut v = Vector::zero_state(2).unwrap();
        assert!(matches!(
            v.reset(1, usize::MAX),
            Err(MathError::OutOfRange { .. })
        ));
    }

    proptest! {
        #[test]
        fn tensor_dimension_law(a in amps_strategy(4), b in amps_strategy(2)) {
            let va = Vector::from_literal(a.clone());
            let vb = Vector::from_literal(b.clone());
            let t = va.tensor(&vb);
            prop_assert_eq!(t.len(), 8);
            for i in 0..4 {
                for j in 0..2 {
                    prop_assert_eq!(t[i * 2 + j], a[i] * b[j]);
                }
            }
        }

        #[test]
        fn normalize_is_idempotent(a in amps_strategy(8)) {
            let mut once = Vector::from_literal(a);
            prop_assume!(once.norm_sqr() > 1e-6);
            once.normalize().unwrap();
            let mut twice = Vector::from_literal(once.as_slice().to_vec());
            twice.normalize().unwrap();
            prop_assert!(once.approx_eq(&twice, 0.001));
            prop_assert!((once.norm_sqr() - 1.0).abs() < 1e-9);
        }
    }
}
