//! Pipeline diagnostics: timing and counts for the shared stages and for
//! every rendered frame.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::Dimensions;

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics for the stages computed once per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    /// Source image dimensions.
    pub dimensions: Dimensions,
    /// Size of the encoded input in bytes.
    pub input_bytes: usize,
    /// Decoding and luminance conversion.
    #[serde(with = "duration_serde")]
    pub decode: Duration,
    /// Both blurs and normalization.
    #[serde(with = "duration_serde")]
    pub saliency: Duration,
    /// Importance sampling.
    #[serde(with = "duration_serde")]
    pub sampling: Duration,
    /// Candidates drawn.
    pub draws: usize,
    /// Candidates accepted into the pool.
    pub pool_size: usize,
}

/// Diagnostics for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameDiagnostics {
    /// Sampled points in the frame (anchors excluded).
    pub sampled_points: usize,
    /// Distinct vertices inserted into the triangulation.
    pub vertices: usize,
    /// Triangles in the triangulation.
    pub triangles: usize,
    /// Pixels located inside the convex hull.
    pub covered_pixels: u64,
    /// Triangles that received no pixel.
    pub undefined_triangles: usize,
    /// Triangulation time.
    #[serde(with = "duration_serde")]
    pub triangulate: Duration,
    /// Color aggregation time.
    #[serde(with = "duration_serde")]
    pub aggregate: Duration,
}

impl RunDiagnostics {
    /// Format as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        #[allow(clippy::cast_precision_loss)]
        let acceptance = if self.draws > 0 {
            self.pool_size as f64 / self.draws as f64 * 100.0
        } else {
            0.0
        };
        let lines = [
            format!("Run Diagnostics\n{}", "=".repeat(60)),
            format!(
                "Image: {}x{} ({} pixels, {} bytes)",
                self.dimensions.width,
                self.dimensions.height,
                self.dimensions.pixel_count(),
                self.input_bytes,
            ),
            format!("{:<16} {:>10.3}ms", "Decode", duration_ms(self.decode)),
            format!("{:<16} {:>10.3}ms", "Saliency", duration_ms(self.saliency)),
            format!(
                "{:<16} {:>10.3}ms  {} of {} accepted ({acceptance:.2}%)",
                "Sampling",
                duration_ms(self.sampling),
                self.pool_size,
                self.draws,
            ),
        ];
        lines.join("\n")
    }
}

impl FrameDiagnostics {
    /// Format as a single report line.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "n={} vertices={} triangles={} covered={} undefined={} triangulate={:.3}ms aggregate={:.3}ms",
            self.sampled_points,
            self.vertices,
            self.triangles,
            self.covered_pixels,
            self.undefined_triangles,
            duration_ms(self.triangulate),
            duration_ms(self.aggregate),
        )
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
