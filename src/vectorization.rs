/*
    hot loops of the simulator. everything that scales with the size of the
    statevector or of a resolved unitary lives here so a faster kernel can be
    swapped in without touching the callers.

    matrices are flat row-major slices of dim * dim entries.
*/

use num_complex::Complex64;
use rayon::prelude::*; // for parallel iterators

// below this many output entries the sequential loop wins over rayon
pub const PARALLEL_THRESHOLD: usize = 1 << 12;

const ZERO: Complex64 = Complex64 { re: 0.0, im: 0.0 };

#[inline]
fn dot_row(row: &[Complex64], input: &[Complex64]) -> Complex64 {
    row.iter().zip(input).fold(ZERO, |acc, (m, v)| acc + m * v)
}

/// Matrix-vector product. `input.len()` must equal `dim`.
pub fn mat_apply(matrix: &[Complex64], dim: usize, input: &[Complex64]) -> Vec<Complex64> {
    debug_assert_eq!(matrix.len(), dim * dim);
    debug_assert_eq!(input.len(), dim);
    if dim >= PARALLEL_THRESHOLD {
        matrix
            .par_chunks(dim)
            .map(|row| dot_row(row, input))
            .collect()
    } else {
        matrix.chunks(dim).map(|row| dot_row(row, input)).collect()
    }
}

/// Matrix product `a * b` of two `dim x dim` matrices.
pub fn mat_mul(a: &[Complex64], b: &[Complex64], dim: usize) -> Vec<Complex64> {
    debug_assert_eq!(a.len(), dim * dim);
    debug_assert_eq!(b.len(), dim * dim);
    let mut out = vec![ZERO; dim * dim];
    // i-k-j order keeps the inner loop on contiguous rows of b and out
    let fill_row = |(i, out_row): (usize, &mut [Complex64])| {
        for k in 0..dim {
            let aik = a[i * dim + k];
            if aik == ZERO {
                continue;
            }
            let b_row = &b[k * dim..(k + 1) * dim];
            for (o, bkj) in out_row.iter_mut().zip(b_row) {
                *o += aik * bkj;
            }
        }
    };
    if dim * dim >= PARALLEL_THRESHOLD {
        out.par_chunks_mut(dim).enumerate().for_each(fill_row);
    } else {
        out.chunks_mut(dim).enumerate().for_each(fill_row);
    }
    out
}

/// Moves bit `i` of `index` to bit `perm[i]`.
#[inline]
pub fn permute_bits(index: usize, perm: &[usize]) -> usize {
    perm.iter()
        .enumerate()
        .filter(|(bit, _)| (index >> bit) & 1 == 1)
        .fold(0, |acc, (_, &to)| acc | (1 << to))
}

/// Applies a `2^k x 2^k` matrix to the bits `targets` of a statevector.
///
/// Local bit `j` of the matrix acts on global bit `targets[j]`. Every output
/// amplitude only reads the `2^k` amplitudes that share its non-target bits,
/// so the full lifted operator is never built.
pub fn apply_on_targets(
    amps: &[Complex64],
    matrix: &[Complex64],
    targets: &[usize],
) -> Vec<Complex64> {
    let dim = 1usize << targets.len();
    debug_assert_eq!(matrix.len(), dim * dim);

    let mask = targets.iter().fold(0usize, |m, &t| m | (1 << t));
    // offsets[j] spreads local index j over the target bits
    let offsets: Vec<usize> = (0..dim).map(|j| permute_bits(j, targets)).collect();

    let kernel = |i: usize| {
        let base = i & !mask;
        let row = targets
            .iter()
            .enumerate()
            .fold(0usize, |r, (bit, &t)| r | (((i >> t) & 1) << bit));
        let m_row = &matrix[row * dim..(row + 1) * dim];
        m_row
            .iter()
            .zip(&offsets)
            .fold(ZERO, |acc, (m, off)| acc + m * amps[base | off])
    };

    if amps.len() >= PARALLEL_THRESHOLD {
        (0..amps.len()).into_par_iter().map(kernel).collect()
    } else {
        (0..amps.len()).map(kernel).collect()
    }
}

/// Total probability mass of a statevector.
pub fn norm_sqr(amps: &[Complex64]) -> f64 {
    if amps.len() >= PARALLEL_THRESHOLD {
        amps.par_iter().map(|a| a.norm_sqr()).sum()
    } else {
        amps.iter().map(|a| a.norm_sqr()).sum()
    }
}

/// Divides every amplitude by `norm`.
pub fn scale(amps: &mut [Complex64], norm: f64) {
    if amps.len() >= PARALLEL_THRESHOLD {
        amps.par_iter_mut().for_each(|a| *a /= norm);
    } else {
        amps.iter_mut().for_each(|a| *a /= norm);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn mat_apply_matches_hand_computed_product() {
        let m = [c(1.0, 2.0), c(3.0, 4.0), c(5.0, 6.0), c(7.0, 8.0)];
        let v = [c(2.0, 1.0), c(1.0, 2.0)];
        let out = mat_apply(&m, 2, &v);
        assert_eq!(out, vec![c(-5.0, 15.0), c(-5.0, 39.0)]);
    }

    #[test]
    fn mat_mul_with_identity_is_noop() {
        let m = [c(1.0, 2.0), c(3.0, 4.0), c(5.0, 6.0), c(7.0, 8.0)];
        let id = [c(1.0, 0.0), ZERO, ZERO, c(1.0, 0.0)];
        assert_eq!(mat_mul(&m, &id, 2), m.to_vec());
        assert_eq!(mat_mul(&id, &m, 2), m.to_vec());
    }

    #[test]
    fn permute_bits_moves_each_bit() {
        // bit0 -> 2, bit1 -> 0, bit2 -> 1
        let perm = [2, 0, 1];
        assert_eq!(permute_bits(0b001, &perm), 0b100);
        assert_eq!(permute_bits(0b010, &perm), 0b001);
        assert_eq!(permute_bits(0b100, &perm), 0b010);
        assert_eq!(permute_bits(0b111, &perm), 0b111);
    }

    #[test]
    fn apply_on_targets_flips_only_the_target_bit() {
        let x = [ZERO, c(1.0, 0.0), c(1.0, 0.0), ZERO];
        // |000> with X on bit 2 -> |100>
        let mut amps = vec![ZERO; 8];
        amps[0] = c(1.0, 0.0);
        let out = apply_on_targets(&amps, &x, &[2]);
        assert_eq!(out[0b100], c(1.0, 0.0));
        assert_eq!(norm_sqr(&out), 1.0);
    }

    #[test]
    fn apply_on_targets_respects_target_order() {
        // little-endian cx: control is local bit 0, target local bit 1
        let one = c(1.0, 0.0);
        #[rustfmt::skip]
        let cx = [
            one, ZERO, ZERO, ZERO,
            ZERO, ZERO, ZERO, one,
            ZERO, ZERO, one, ZERO,
            ZERO, one, ZERO, ZERO,
        ];
        // state |q2 q1 q0> = |010>, control on bit 1, target bit 2
        let mut amps = vec![ZERO; 8];
        amps[0b010] = one;
        let out = apply_on_targets(&amps, &cx, &[1, 2]);
        assert_eq!(out[0b110], one);

        // control on bit 0 (clear) leaves the state alone
        let out = apply_on_targets(&amps, &cx, &[0, 2]);
        assert_eq!(out[0b010], one);
    }

    #[test]
    fn scale_normalizes() {
        let mut amps = vec![c(3.0, 0.0), c(0.0, 4.0)];
        let n = norm_sqr(&amps).sqrt();
        scale(&mut amps, n);
        assert!((norm_sqr(&amps) - 1.0).abs() < 1e-12);
    }
}
