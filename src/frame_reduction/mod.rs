pub mod compare;
pub mod frames;
pub mod reduce;
#[cfg(feature = "ffmpeg")]
pub mod video;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{ReduceError, Result};

pub const DEFAULT_THRESHOLD: f64 = 0.8;
pub const DEFAULT_MIN_INTERVAL: usize = 6;
pub const DEFAULT_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Similarity metric used to compare a candidate against the reference frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Correlation of 50x60 hue/saturation histograms
    Histogram,
    /// Grayscale structural similarity
    Ssim,
}

impl Strategy {
    /// Reference policy used when the caller does not pick one
    pub fn default_reference_policy(self) -> ReferencePolicy {
        match self {
            Strategy::Histogram => ReferencePolicy::LastKept,
            Strategy::Ssim => ReferencePolicy::PreviousFrame,
        }
    }
}

impl FromStr for Strategy {
    type Err = ReduceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hist" | "histogram" => Ok(Strategy::Histogram),
            "ssim" | "structural-similarity" => Ok(Strategy::Ssim),
            other => Err(ReduceError::UnknownStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Histogram => f.write_str("histogram"),
            Strategy::Ssim => f.write_str("ssim"),
        }
    }
}

/// Which frame becomes the comparison baseline after each step.
///
/// `LastKept` only moves the reference when a frame is kept, so every
/// candidate is measured against the most recent output frame.
/// `PreviousFrame` moves it after every comparison, kept or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferencePolicy {
    LastKept,
    PreviousFrame,
}

impl FromStr for ReferencePolicy {
    type Err = ReduceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last-kept" | "last_kept" => Ok(ReferencePolicy::LastKept),
            "previous-frame" | "previous_frame" | "previous" => Ok(ReferencePolicy::PreviousFrame),
            other => Err(ReduceError::UnknownReferencePolicy(other.to_string())),
        }
    }
}

impl fmt::Display for ReferencePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferencePolicy::LastKept => f.write_str("last-kept"),
            ReferencePolicy::PreviousFrame => f.write_str("previous-frame"),
        }
    }
}

/// Parameters of a reduction run
#[derive(Debug, Clone, PartialEq)]
pub struct ReducerConfig {
    pub strategy: Strategy,
    /// Candidates scoring below this are kept as divergent
    pub threshold: f64,
    /// Maximum index gap between kept frames (histogram only)
    pub min_interval: usize,
    /// Overrides the strategy's default reference policy
    pub reference_policy: Option<ReferencePolicy>,
    /// Lowercase extensions without the leading dot
    pub extensions: Vec<String>,
}

impl Default for ReducerConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Histogram,
            threshold: DEFAULT_THRESHOLD,
            min_interval: DEFAULT_MIN_INTERVAL,
            reference_policy: None,
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl ReducerConfig {
    pub fn histogram(threshold: f64, min_interval: usize) -> Self {
        Self {
            strategy: Strategy::Histogram,
            threshold,
            min_interval,
            ..Self::default()
        }
    }

    pub fn ssim(threshold: f64) -> Self {
        Self {
            strategy: Strategy::Ssim,
            threshold,
            ..Self::default()
        }
    }

    pub fn with_reference_policy(mut self, policy: ReferencePolicy) -> Self {
        self.reference_policy = Some(policy);
        self
    }

    pub fn reference_policy(&self) -> ReferencePolicy {
        self.reference_policy
            .unwrap_or_else(|| self.strategy.default_reference_policy())
    }

    /// Reject bad parameters before any frame is touched
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ReduceError::InvalidThreshold(self.threshold));
        }
        Ok(())
    }
}

/// A frame file positioned in its sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub index: usize,
    pub path: PathBuf,
}

impl Frame {
    /// Display form of the file name; not suitable for building paths
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeepReason {
    /// Seeds the reference
    First,
    /// The interval since the last kept frame reached `min_interval`
    Forced,
    /// Similarity fell below the threshold
    Divergent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeptFrame {
    pub index: usize,
    pub name: String,
    pub reason: KeepReason,
    /// Similarity against the reference, absent for the first frame
    pub score: Option<f64>,
}

/// Outcome of a reduction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReductionReport {
    pub strategy: Strategy,
    pub reference_policy: ReferencePolicy,
    pub total_frames: usize,
    pub kept: Vec<KeptFrame>,
    pub copied: usize,
    pub skipped_existing: usize,
}

impl ReductionReport {
    pub fn kept_indices(&self) -> Vec<usize> {
        self.kept.iter().map(|k| k.index).collect()
    }
}
