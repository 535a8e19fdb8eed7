#![deny(clippy::all)]

pub mod config;
pub mod error;
pub mod file_utils;
pub mod frame_reduction;

pub use config::ConfigOverrides;
pub use error::ReduceError;
pub use frame_reduction::frames::{FrameSequence, FrameSink};
pub use frame_reduction::reduce::{reduce_directory, reduce_sequence, select_frames};
pub use frame_reduction::{
    KeepReason, KeptFrame, ReducerConfig, ReductionReport, ReferencePolicy, Strategy,
};
