//! Saliency-weighted importance sampling.
//!
//! Candidates are drawn uniformly over the image and accepted with
//! probability equal to the saliency at that pixel.  The accepted points
//! form an ordered pool; frames take prefixes of it, so the draw order is
//! part of the output contract.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::saliency::SaliencyField;
use crate::types::{PipelineError, SamplePoint};

/// Rejection sampler owning its own seeded generator.
///
/// Two samplers created with the same seed produce identical pools from
/// the same field.  Repeated calls to [`sample`](Self::sample) on one
/// sampler continue the same random stream.
#[derive(Debug, Clone)]
pub struct ImportanceSampler {
    rng: StdRng,
}

impl ImportanceSampler {
    /// Create a sampler seeded with `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw `draws` candidates and return the accepted ones in draw order.
    ///
    /// Each draw consumes a column, a row, and a threshold in `[0, 1)`;
    /// the candidate is accepted iff the threshold is below the saliency.
    #[tracing::instrument(skip(self, field))]
    pub fn sample(&mut self, field: &SaliencyField, draws: usize) -> SamplePool {
        let dims = field.dimensions();
        if dims.is_empty() {
            return SamplePool::default();
        }

        let mut points = Vec::new();
        for _ in 0..draws {
            let x = self.rng.random_range(0..dims.width);
            let y = self.rng.random_range(0..dims.height);
            let threshold = self.rng.random::<f32>();
            let saliency = field.get(x, y).unwrap_or(0.0);
            if threshold < saliency {
                points.push(SamplePoint { x, y, saliency });
            }
        }

        tracing::debug!(accepted = points.len(), "sampling finished");
        SamplePool { points }
    }
}

/// Ordered pool of accepted sample points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SamplePool {
    points: Vec<SamplePoint>,
}

impl SamplePool {
    /// Wrap an existing ordered sequence of points.
    #[must_use]
    pub const fn new(points: Vec<SamplePoint>) -> Self {
        Self { points }
    }

    /// Number of accepted points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if no candidate was accepted.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// All accepted points in draw order.
    #[must_use]
    pub fn points(&self) -> &[SamplePoint] {
        &self.points
    }

    /// The first `n` accepted points.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::PoolExhausted`] if `n` exceeds the pool
    /// size.  The request is never clamped.
    pub fn prefix(&self, n: usize) -> Result<&[SamplePoint], PipelineError> {
        self.points
            .get(..n)
            .ok_or(PipelineError::PoolExhausted {
                requested: n,
                available: self.points.len(),
            })
    }
}
