use log::{debug, info};
use std::path::{Path, PathBuf};

use super::compare::{HistogramCorrelation, LoadedFrame, Metric, StructuralSimilarity};
use super::frames::{CopyOutcome, FrameSequence, FrameSink, normalize_extension};
use super::{
    Frame, KeepReason, KeptFrame, ReducerConfig, ReductionReport, ReferencePolicy, Strategy,
};
use crate::error::{ReduceError, Result};

/// Decision parameters for one pass over a sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionPolicy {
    pub threshold: f64,
    /// Force a keep once this many indices have passed since the last one
    pub min_interval: Option<usize>,
    pub reference: ReferencePolicy,
}

impl SelectionPolicy {
    pub fn from_config(config: &ReducerConfig) -> Self {
        let min_interval = match config.strategy {
            Strategy::Histogram => Some(config.min_interval),
            Strategy::Ssim => None,
        };
        Self {
            threshold: config.threshold,
            min_interval,
            reference: config.reference_policy(),
        }
    }
}

/// The current comparison baseline
struct Reference<S> {
    path: PathBuf,
    dimensions: (u32, u32),
    signature: S,
}

fn analyse<M: Metric>(metric: &M, frame: &Frame) -> Result<Reference<M::Signature>> {
    let loaded = LoadedFrame::open(&frame.path)?;
    let dimensions = loaded.dimensions();

    let min_side = metric.min_side();
    if dimensions.0 < min_side || dimensions.1 < min_side {
        return Err(ReduceError::FrameTooSmall {
            path: frame.path.clone(),
            size: dimensions,
            window: min_side,
        });
    }

    Ok(Reference {
        path: loaded.path,
        dimensions,
        signature: metric.signature(&loaded.image),
    })
}

/// Walk the sequence once and decide which frames to keep.
///
/// `on_keep` runs for every kept frame, in order, before the next frame is
/// decoded. Any error aborts the pass.
pub fn select_frames<M, F>(
    metric: &M,
    sequence: &FrameSequence,
    policy: &SelectionPolicy,
    mut on_keep: F,
) -> Result<Vec<KeptFrame>>
where
    M: Metric,
    F: FnMut(&Frame) -> Result<()>,
{
    let first = sequence.first();
    let mut reference = analyse(metric, first)?;
    on_keep(first)?;

    let mut kept = vec![KeptFrame {
        index: first.index,
        name: first.file_name(),
        reason: KeepReason::First,
        score: None,
    }];
    let mut last_kept = first.index;

    for frame in &sequence.frames()[1..] {
        let candidate = analyse(metric, frame)?;

        if candidate.dimensions != reference.dimensions {
            return Err(ReduceError::DimensionMismatch {
                reference: reference.path,
                reference_size: reference.dimensions,
                candidate: candidate.path,
                candidate_size: candidate.dimensions,
            });
        }

        let score = metric.score(&reference.signature, &candidate.signature);
        let forced = policy
            .min_interval
            .is_some_and(|interval| frame.index - last_kept >= interval);
        // correlation can go negative; clamping keeps a zero threshold inert
        let divergent = score.clamp(0.0, 1.0) < policy.threshold;

        let reason = match (forced, divergent) {
            (true, _) => Some(KeepReason::Forced),
            (false, true) => Some(KeepReason::Divergent),
            (false, false) => None,
        };

        debug!(
            "{} score={:.4} since_last={} -> {}",
            frame.file_name(),
            score,
            frame.index - last_kept,
            match reason {
                Some(KeepReason::Forced) => "keep (forced)",
                Some(_) => "keep (divergent)",
                None => "skip",
            }
        );

        if let Some(reason) = reason {
            on_keep(frame)?;
            kept.push(KeptFrame {
                index: frame.index,
                name: frame.file_name(),
                reason,
                score: Some(score),
            });
            last_kept = frame.index;
            reference = candidate;
        } else if policy.reference == ReferencePolicy::PreviousFrame {
            reference = candidate;
        }
    }

    Ok(kept)
}

/// Reduce a scanned sequence into `sink`
pub fn reduce_sequence(
    sequence: &FrameSequence,
    sink: &FrameSink,
    config: &ReducerConfig,
) -> Result<ReductionReport> {
    config.validate()?;
    let policy = SelectionPolicy::from_config(config);

    info!(
        "Reducing {} frames from {} with {} (threshold={}, reference={})",
        sequence.len(),
        sequence.dir().display(),
        config.strategy,
        config.threshold,
        policy.reference
    );

    let mut copied = 0;
    let mut skipped_existing = 0;
    let write = |frame: &Frame| -> Result<()> {
        match sink.write(frame)? {
            CopyOutcome::Copied => copied += 1,
            CopyOutcome::Unchanged => skipped_existing += 1,
        }
        Ok(())
    };

    let kept = match config.strategy {
        Strategy::Histogram => select_frames(&HistogramCorrelation, sequence, &policy, write)?,
        Strategy::Ssim => select_frames(&StructuralSimilarity, sequence, &policy, write)?,
    };

    info!(
        "Kept {} of {} frames in {} ({} copied, {} already present)",
        kept.len(),
        sequence.len(),
        sink.dir().display(),
        copied,
        skipped_existing
    );

    Ok(ReductionReport {
        strategy: config.strategy,
        reference_policy: policy.reference,
        total_frames: sequence.len(),
        kept,
        copied,
        skipped_existing,
    })
}

/// Scan `input`, keep the distinct frames and copy them into `output`.
///
/// Configuration and the input listing are checked before `output` is
/// created, so a bad threshold or an empty input leaves no directory behind.
pub fn reduce_directory<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    config: &ReducerConfig,
) -> Result<ReductionReport> {
    config.validate()?;

    let extensions: Vec<String> = config
        .extensions
        .iter()
        .map(|e| normalize_extension(e))
        .collect();
    let sequence = FrameSequence::scan(input, &extensions)?;
    info!(
        "Found {} frames in {}",
        sequence.len(),
        sequence.dir().display()
    );

    let sink = FrameSink::create(output)?;
    reduce_sequence(&sequence, &sink, config)
}
