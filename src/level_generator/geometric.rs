//! Geometric level generator.

use rand::prelude::*;
use thiserror::Error;

use crate::level_generator::{LevelGenerator, draw_height};

/// The default number of levels of a list.
pub const DEFAULT_MAX_HEIGHT: usize = 16;

/// The default probability that a node reaches the next level.
pub const DEFAULT_P: f64 = 0.5;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Errors that can occur when configuring a [`Geometric`] level generator.
#[expect(
    clippy::module_name_repetitions,
    reason = "Using 'Error' would be too generic and may cause confusion."
)]
#[non_exhaustive]
pub enum GeometricError {
    /// The maximum number of levels must be non-zero.
    #[error("max must be non-zero.")]
    ZeroMax,
    /// The probability `$p$` must be in the range `$[0, 1]$`.
    ///
    /// [`recommended_height`][crate::recommended_height] further excludes
    /// both end points.
    #[error("p must be in [0, 1].")]
    InvalidProbability,
    /// The expected number of elements must be non-zero.
    #[error("expected count must be non-zero.")]
    ZeroCount,
}

/// A level generator using a geometric distribution.
///
/// This distribution assumes that if a node is present at some level `$n$`,
/// then the probability that it is present at level `$n+1$` is some constant
/// `$p \in [0, 1]$`. This produces a geometric distribution, albeit truncated
/// at the maximum number of levels allowed.
#[derive(Debug, Clone)]
pub struct Geometric {
    /// The total number of levels that are assumed to exist.
    total: usize,
    /// The probability that a node is present in the next level.
    p: f64,
    /// The random number generator.
    rng: SmallRng,
}

impl Geometric {
    /// Create a new geometric level generator with `total` number of levels,
    /// and `p` as the probability that a given node is present in the next
    /// level. The generator is seeded from the thread-local RNG.
    ///
    /// # Errors
    ///
    /// `p` must be between 0 and 1 (inclusive), and `total` must be at least 1.
    #[inline]
    pub fn new(total: usize, p: f64) -> Result<Self, GeometricError> {
        Self::validate(total, p)?;
        Ok(Geometric {
            total,
            p,
            rng: SmallRng::from_rng(&mut rand::rng()),
        })
    }

    /// Create a geometric level generator with a fixed seed, so that the
    /// sequence of generated levels is reproducible.
    ///
    /// # Errors
    ///
    /// Same as [`Geometric::new`].
    #[inline]
    pub fn with_seed(total: usize, p: f64, seed: u64) -> Result<Self, GeometricError> {
        Self::validate(total, p)?;
        Ok(Geometric {
            total,
            p,
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    /// The probability that a node is present in the next level.
    #[inline]
    #[must_use]
    pub fn p(&self) -> f64 {
        self.p
    }

    fn validate(total: usize, p: f64) -> Result<(), GeometricError> {
        if total == 0 {
            return Err(GeometricError::ZeroMax);
        }
        // NaN fails both comparisons and is rejected too.
        if !(0.0..=1.0).contains(&p) {
            return Err(GeometricError::InvalidProbability);
        }
        Ok(())
    }
}

impl Default for Geometric {
    /// [`DEFAULT_MAX_HEIGHT`] levels with `$p = 1/2$`.
    #[inline]
    fn default() -> Self {
        Geometric {
            total: DEFAULT_MAX_HEIGHT,
            p: DEFAULT_P,
            rng: SmallRng::from_rng(&mut rand::rng()),
        }
    }
}

impl LevelGenerator for Geometric {
    #[inline]
    fn total(&self) -> usize {
        self.total
    }

    /// Generate a level for a new node using a geometric distribution.
    ///
    /// The level is one less than the tower height drawn by
    /// [`draw_height`], so it lies in `$[0, \text{total})$`.
    #[inline]
    fn level(&mut self) -> usize {
        draw_height(&mut self.rng, self.p, self.total) - 1
    }
}
