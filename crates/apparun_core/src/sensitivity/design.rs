//! Unit-hypercube sample designs

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use crate::config::DesignKind;

/// Generates points of the unit hypercube `[0, 1)^dims`
pub trait DesignGenerator: Send + Sync {
    /// Largest dimension count this generator supports
    fn max_dimensions(&self) -> usize;

    /// `n` points of `dims` coordinates each, deterministic in `seed`
    fn generate(&self, n: usize, dims: usize, seed: u64) -> Vec<Vec<f64>>;
}

impl DesignKind {
    #[must_use]
    pub fn generator(self) -> Box<dyn DesignGenerator> {
        match self {
            DesignKind::Sobol => Box::new(SobolDesign),
            DesignKind::Random => Box::new(RandomDesign),
        }
    }
}

/// Independent uniform coordinates from a PCG64 stream
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomDesign;

impl DesignGenerator for RandomDesign {
    fn max_dimensions(&self) -> usize {
        usize::MAX
    }

    fn generate(&self, n: usize, dims: usize, seed: u64) -> Vec<Vec<f64>> {
        let mut rng = Pcg64::seed_from_u64(seed);
        (0..n)
            .map(|_| (0..dims).map(|_| rng.random::<f64>()).collect())
            .collect()
    }
}

/// Sobol low-discrepancy sequence with a random digital shift keyed by the
/// seed
#[derive(Debug, Clone, Copy, Default)]
pub struct SobolDesign;

impl DesignGenerator for SobolDesign {
    fn max_dimensions(&self) -> usize {
        SobolSequence::MAX_DIMENSIONS
    }

    fn generate(&self, n: usize, dims: usize, seed: u64) -> Vec<Vec<f64>> {
        let mut rng = Pcg64::seed_from_u64(seed);
        let shift: Vec<u32> = (0..dims).map(|_| rng.random::<u32>()).collect();
        SobolSequence::new(dims).with_shift(shift).take(n).collect()
    }
}

/// Primitive polynomial (degree, coefficients) and initial direction
/// numbers for dimensions 2 and up, from the Joe and Kuo tables
const DIRECTIONS: &[(u32, u32, &[u32])] = &[
    (1, 0, &[1]),
    (2, 1, &[1, 3]),
    (3, 1, &[1, 3, 1]),
    (3, 2, &[1, 1, 1]),
    (4, 1, &[1, 1, 3, 3]),
    (4, 4, &[1, 3, 5, 13]),
    (5, 2, &[1, 1, 5, 5, 17]),
    (5, 4, &[1, 1, 5, 5, 5]),
    (5, 7, &[1, 1, 7, 11, 19]),
    (5, 11, &[1, 1, 5, 1, 1]),
    (5, 13, &[1, 1, 1, 3, 11]),
    (5, 14, &[1, 3, 5, 5, 31]),
    (6, 1, &[1, 3, 3, 9, 7, 49]),
    (6, 13, &[1, 1, 1, 15, 21, 21]),
    (6, 16, &[1, 3, 1, 13, 27, 49]),
    (6, 19, &[1, 1, 1, 15, 7, 5]),
    (6, 22, &[1, 3, 1, 15, 13, 25]),
    (6, 25, &[1, 1, 5, 5, 19, 61]),
    (7, 1, &[1, 3, 7, 11, 23, 15, 103]),
    (7, 4, &[1, 3, 7, 13, 13, 15, 69]),
    (7, 7, &[1, 1, 3, 13, 7, 35, 63]),
    (7, 8, &[1, 3, 5, 9, 1, 25, 53]),
    (7, 14, &[1, 3, 1, 13, 9, 35, 107]),
    (7, 19, &[1, 3, 1, 5, 27, 61, 31]),
    (7, 21, &[1, 1, 5, 11, 19, 41, 61]),
    (7, 28, &[1, 3, 5, 3, 3, 13, 69]),
    (7, 31, &[1, 1, 7, 13, 1, 19, 1]),
    (7, 32, &[1, 3, 7, 5, 13, 19, 59]),
    (7, 37, &[1, 1, 3, 9, 25, 29, 41]),
    (7, 41, &[1, 3, 5, 13, 23, 1, 55]),
    (7, 42, &[1, 3, 7, 3, 13, 59, 17]),
    (7, 50, &[1, 3, 1, 3, 5, 53, 69]),
    (7, 55, &[1, 1, 5, 5, 23, 33, 13]),
    (7, 56, &[1, 1, 7, 7, 1, 61, 123]),
    (7, 59, &[1, 1, 7, 9, 13, 61, 49]),
    (7, 62, &[1, 3, 3, 5, 3, 55, 33]),
    (8, 14, &[1, 3, 1, 15, 31, 13, 49, 245]),
    (8, 21, &[1, 3, 5, 15, 31, 59, 63, 97]),
    (8, 22, &[1, 3, 1, 11, 11, 11, 77, 249]),
];

const BITS: usize = 32;

/// Gray-code Sobol sequence over 32-bit integers
#[derive(Debug, Clone)]
pub struct SobolSequence {
    /// Direction numbers per dimension
    directions: Vec<[u32; BITS]>,
    /// Integer coordinates of the current point
    state: Vec<u32>,
    shift: Vec<u32>,
    index: u64,
}

impl SobolSequence {
    pub const MAX_DIMENSIONS: usize = DIRECTIONS.len() + 1;

    /// Unshifted sequence starting at the origin.
    ///
    /// `dims` above [`Self::MAX_DIMENSIONS`] are clamped.
    #[must_use]
    pub fn new(dims: usize) -> Self {
        let dims = dims.min(Self::MAX_DIMENSIONS);
        let mut directions = Vec::with_capacity(dims);
        if dims > 0 {
            let mut first = [0u32; BITS];
            for (k, v) in first.iter_mut().enumerate() {
                *v = 1 << (BITS - 1 - k);
            }
            directions.push(first);
        }
        for &(degree, coefficients, initial) in DIRECTIONS.iter().take(dims.saturating_sub(1)) {
            directions.push(direction_numbers(degree as usize, coefficients, initial));
        }
        Self {
            directions,
            state: vec![0; dims],
            shift: vec![0; dims],
            index: 0,
        }
    }

    /// XOR every coordinate with a per-dimension shift
    #[must_use]
    pub fn with_shift(mut self, shift: Vec<u32>) -> Self {
        for (s, value) in self.shift.iter_mut().zip(shift) {
            *s = value;
        }
        self
    }

    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.directions.len()
    }
}

fn direction_numbers(degree: usize, coefficients: u32, initial: &[u32]) -> [u32; BITS] {
    let mut v = [0u32; BITS];
    for k in 0..BITS {
        v[k] = if k < degree {
            initial[k] << (BITS - 1 - k)
        } else {
            let mut value = v[k - degree] ^ (v[k - degree] >> degree);
            for l in 1..degree {
                if (coefficients >> (degree - 1 - l)) & 1 == 1 {
                    value ^= v[k - l];
                }
            }
            value
        };
    }
    v
}

impl Iterator for SobolSequence {
    type Item = Vec<f64>;

    fn next(&mut self) -> Option<Self::Item> {
        const SCALE: f64 = 1.0 / 4_294_967_296.0;
        if self.index >= 1 << BITS {
            return None;
        }
        // Midpoint of the 2^-32 cell keeps coordinates strictly inside (0, 1)
        let point = self
            .state
            .iter()
            .zip(&self.shift)
            .map(|(&x, &s)| ((x ^ s) as f64 + 0.5) * SCALE)
            .collect();

        let bit = self.index.trailing_ones() as usize;
        if bit < BITS {
            for (x, v) in self.state.iter_mut().zip(&self.directions) {
                *x ^= v[bit];
            }
        }
        self.index += 1;
        Some(point)
    }
}

/// Saltelli cross-sampling of one base row of `2 * d` coordinates.
///
/// Emits `d + 2` points: `A`, then `A` with column `i` taken from `B` for
/// every `i`, then `B`.
pub(crate) fn saltelli_row(base: &[f64], d: usize, out: &mut Vec<Vec<f64>>) {
    let (a, b) = base.split_at(d);
    out.push(a.to_vec());
    for i in 0..d {
        let mut ab = a.to_vec();
        ab[i] = b[i];
        out.push(ab);
    }
    out.push(b[..d].to_vec());
}
