use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reducing a frame sequence.
///
/// Every variant is fatal to the run: a skipped frame would shift the
/// indices the forced-interval policy is measured against.
#[derive(Debug, Error)]
pub enum ReduceError {
    #[error("no frames found in {}", dir.display())]
    NoFrames { dir: PathBuf },

    #[error("failed to read directory {}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode frame {}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error(
        "frame {} is {}x{} but reference {} is {}x{}",
        candidate.display(),
        candidate_size.0,
        candidate_size.1,
        reference.display(),
        reference_size.0,
        reference_size.1
    )]
    DimensionMismatch {
        reference: PathBuf,
        reference_size: (u32, u32),
        candidate: PathBuf,
        candidate_size: (u32, u32),
    },

    #[error("frame {} is {}x{}, smaller than the {window}x{window} SSIM window", path.display(), size.0, size.1)]
    FrameTooSmall {
        path: PathBuf,
        size: (u32, u32),
        window: u32,
    },

    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("similarity threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("min_interval must be non-negative, got {0}")]
    NegativeInterval(i64),

    #[error("unknown strategy '{0}' (expected 'histogram' or 'ssim')")]
    UnknownStrategy(String),

    #[error("unknown reference policy '{0}' (expected 'last-kept' or 'previous-frame')")]
    UnknownReferencePolicy(String),

    #[error("invalid config file {}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ReduceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReduceError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = ReduceError> = std::result::Result<T, E>;
