//! Rollout pacing: how many sampled points each frame uses.
//!
//! A schedule maps a 0-based frame index to a cumulative count of pool
//! points.  Counts never decrease, so every frame's point set contains the
//! previous frame's and the mosaic refines without reshuffling.

use serde::{Deserialize, Serialize};

use crate::types::PipelineError;

/// Formula producing the sampled-point count for a frame index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleFormula {
    /// `constant + linear * i + quadratic * i^2`.
    Polynomial {
        /// Count at frame 0.
        constant: usize,
        /// Linear coefficient.
        linear: usize,
        /// Quadratic coefficient.
        quadratic: usize,
    },
    /// An explicit, non-decreasing list of counts.  Frame `i` uses entry
    /// `i`; the list length bounds the frame count.
    Explicit(Vec<usize>),
}

impl Default for ScheduleFormula {
    fn default() -> Self {
        Self::Polynomial {
            constant: 1,
            linear: 1,
            quadratic: 2,
        }
    }
}

/// A rollout schedule: a formula and the number of frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointSchedule {
    /// Pacing formula.
    pub formula: ScheduleFormula,
    /// Number of frames in the rollout.
    pub frames: usize,
}

impl Default for PointSchedule {
    fn default() -> Self {
        Self {
            formula: ScheduleFormula::default(),
            frames: Self::DEFAULT_FRAMES,
        }
    }
}

impl PointSchedule {
    /// Default number of rollout frames.
    pub const DEFAULT_FRAMES: usize = 100;

    /// Polynomial schedule over `frames` frames.
    #[must_use]
    pub const fn polynomial(constant: usize, linear: usize, quadratic: usize, frames: usize) -> Self {
        Self {
            formula: ScheduleFormula::Polynomial {
                constant,
                linear,
                quadratic,
            },
            frames,
        }
    }

    /// Explicit schedule; the frame count is the list length.
    #[must_use]
    pub fn explicit(counts: Vec<usize>) -> Self {
        let frames = counts.len();
        Self {
            formula: ScheduleFormula::Explicit(counts),
            frames,
        }
    }

    /// Sampled-point count for frame `index`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `index` is past the
    /// last frame or the polynomial overflows `usize`.
    pub fn count(&self, index: usize) -> Result<usize, PipelineError> {
        if index >= self.frames {
            return Err(PipelineError::InvalidConfig(format!(
                "frame index {index} is outside a {}-frame schedule",
                self.frames
            )));
        }
        match &self.formula {
            ScheduleFormula::Polynomial {
                constant,
                linear,
                quadratic,
            } => index
                .checked_mul(index)
                .and_then(|sq| sq.checked_mul(*quadratic))
                .and_then(|q| index.checked_mul(*linear).and_then(|l| l.checked_add(q)))
                .and_then(|v| v.checked_add(*constant))
                .ok_or_else(|| {
                    PipelineError::InvalidConfig(format!(
                        "schedule count overflows at frame {index}"
                    ))
                }),
            ScheduleFormula::Explicit(counts) => counts.get(index).copied().ok_or_else(|| {
                PipelineError::InvalidConfig(format!(
                    "explicit schedule has no entry for frame {index}"
                ))
            }),
        }
    }

    /// Counts for every frame, in frame order.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the schedule is invalid
    /// (see [`validate`](Self::validate)).
    pub fn counts(&self) -> Result<Vec<usize>, PipelineError> {
        self.validate()?;
        (0..self.frames).map(|i| self.count(i)).collect()
    }

    /// Largest count the schedule requests.  The pool must hold at least
    /// this many points.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the schedule is invalid.
    pub fn max_count(&self) -> Result<usize, PipelineError> {
        Ok(self.counts()?.into_iter().max().unwrap_or(0))
    }

    /// Check that the schedule has frames and never decreases.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for an empty schedule, an
    /// explicit list shorter than `frames` or decreasing anywhere, or a
    /// polynomial that overflows within `frames`.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.frames == 0 {
            return Err(PipelineError::InvalidConfig(
                "schedule must have at least one frame".to_string(),
            ));
        }
        match &self.formula {
            ScheduleFormula::Polynomial { .. } => {
                // Non-negative coefficients are monotone; only overflow
                // at the last frame can fail.
                self.count(self.frames - 1).map(|_| ())
            }
            ScheduleFormula::Explicit(counts) => {
                if counts.len() < self.frames {
                    return Err(PipelineError::InvalidConfig(format!(
                        "explicit schedule lists {} counts for {} frames",
                        counts.len(),
                        self.frames
                    )));
                }
                if let Some(i) = counts.windows(2).position(|w| w[1] < w[0]) {
                    return Err(PipelineError::InvalidConfig(format!(
                        "explicit schedule decreases from {} to {} at frame {}",
                        counts[i],
                        counts[i + 1],
                        i + 1
                    )));
                }
                Ok(())
            }
        }
    }
}
