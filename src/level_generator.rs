//! Skiplists use a probabilistic distribution of nodes over the internal
//! levels, whereby the lowest level (level 0) contains all the nodes, and each
//! level $n > 0$ will contain a random subset of the nodes on level `n - 1`.
//!
//! Most commonly, a geometric distribution is used whereby the chance that a
//! node occupies level $n$ is $p$ times the chance of occupying level $n-1$
//! (with $0 \le p \le 1$).
//!
//! It is very unlikely that this will need to be changed as the default should
//! suffice, but if need be custom level generators can be implemented.

pub mod geometric;

use rand::Rng;

pub use self::geometric::{Geometric, GeometricError};

// ////////////////////////////////////////////////////////////////////////////
// Level Generator
// ////////////////////////////////////////////////////////////////////////////

/// Upon the insertion of a new node in the list, the node is replicated to high
/// levels with a certain probability as determined by a [`LevelGenerator`].
///
/// A node generated at level `$n$` has a tower of height `$n + 1$`: it is
/// linked into levels `$0, \dots, n$`.
pub trait LevelGenerator {
    /// The total number of levels that are assumed to exist.
    ///
    /// This is the height of the head node's tower, and therefore the inclusive
    /// upper bound on the height of any node.
    #[must_use]
    fn total(&self) -> usize;

    /// Generate a random level for a new node in the range `[0, total)`.
    ///
    /// This function should _never_ return a level greater or equal to
    /// [`total`][LevelGenerator::total].
    #[must_use]
    fn level(&mut self) -> usize;
}

/// Draw the height of a new node's tower.
///
/// Starting at 1, a uniform sample in `[0, 1)` is drawn and the height is
/// incremented for as long as the sample falls below `p`, up to and including
/// `max_height`. The result is always in `[1, max_height]`, except that a
/// `max_height` of 0 is treated as 1.
///
/// With `p == 0` every tower has height 1; with `p == 1` every tower reaches
/// `max_height`.
#[inline]
pub fn draw_height<R>(rng: &mut R, p: f64, max_height: usize) -> usize
where
    R: Rng + ?Sized,
{
    let mut height = 1;
    while height < max_height && rng.random::<f64>() < p {
        height += 1;
    }
    height
}

/// Suggest a maximum height for a list expected to hold `expected_count`
/// elements, where `p` is the probability of a node reaching the next level.
///
/// The suggestion is $\lfloor \log_{1/p} n \rfloor$, the level at which only a
/// handful of nodes are expected to remain, clamped to at least 1.
///
/// # Errors
///
/// `p` must lie strictly inside `(0, 1)` and `expected_count` must be
/// non-zero.
#[inline]
pub fn recommended_height(expected_count: usize, p: f64) -> Result<usize, GeometricError> {
    if expected_count == 0 {
        return Err(GeometricError::ZeroCount);
    }
    if !(0.0 < p && p < 1.0) {
        return Err(GeometricError::InvalidProbability);
    }
    Ok(height_for(expected_count, p))
}

/// Unchecked form of [`recommended_height`]; callers guarantee
/// `expected_count > 0` and `0 < p < 1`.
#[expect(clippy::float_arithmetic, reason = "Computing a logarithm ratio")]
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::as_conversions,
    reason = "The ratio is a small non-negative number"
)]
pub(crate) fn height_for(expected_count: usize, p: f64) -> usize {
    let levels = ((expected_count as f64).ln() / p.recip().ln()).floor();
    (levels as usize).max(1)
}
