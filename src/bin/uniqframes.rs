//! uniqframes - keep the visually distinct frames of an extracted video.
//!
//! `reduce` is the main entry point; the other subcommands cover the small
//! chores around it (frame extraction, duplicate scans, counting, renaming).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};

use uniqframes_rs::file_utils::{count_files, find_duplicates, strip_label_prefix};
use uniqframes_rs::{ConfigOverrides, ReducerConfig, ReductionReport, Strategy, reduce_directory};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Select visually distinct frames from an ordered frame directory"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

/// Reducer settings shared by `reduce` and `reduce-video`
#[derive(clap::Args, Debug)]
struct ReduceFlags {
    /// TOML file with reducer settings; flags take precedence.
    #[arg(long, env = "UNIQFRAMES_CONFIG")]
    config: Option<PathBuf>,

    /// Similarity metric: histogram or ssim.
    #[arg(long)]
    strategy: Option<String>,

    /// Frames scoring below this are kept.
    #[arg(long)]
    threshold: Option<f64>,

    /// Force a keep after this many frames (histogram only).
    #[arg(long, allow_negative_numbers = true)]
    min_interval: Option<i64>,

    /// Reference update policy: last-kept or previous-frame.
    #[arg(long)]
    reference: Option<String>,

    /// Frame extensions to include (repeatable).
    #[arg(long = "ext")]
    extensions: Vec<String>,

    /// Print the reduction report as JSON.
    #[arg(long)]
    json: bool,
}

impl ReduceFlags {
    fn load_config(&self) -> Result<ReducerConfig> {
        let overrides = ConfigOverrides {
            strategy: self.strategy.clone(),
            threshold: self.threshold,
            min_interval: self.min_interval,
            reference: self.reference.clone(),
            extensions: (!self.extensions.is_empty()).then(|| self.extensions.clone()),
        };
        let config = ReducerConfig::load(self.config.as_deref(), overrides)
            .context("Invalid reducer configuration")?;
        if self.min_interval.is_some() && config.strategy == Strategy::Ssim {
            warn!("--min-interval has no effect with the ssim strategy");
        }
        Ok(config)
    }

    fn print_report(&self, report: &ReductionReport, output: &Path) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(report)?);
        } else {
            info!(
                "Saved {} of {} frames to {}",
                report.kept.len(),
                report.total_frames,
                output.display()
            );
        }
        Ok(())
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Copy the distinct frames of INPUT into OUTPUT
    Reduce {
        input: PathBuf,
        output: PathBuf,

        #[command(flatten)]
        flags: ReduceFlags,
    },

    /// Extract frames of VIDEO to a scratch directory and reduce them into OUTPUT
    #[cfg(feature = "ffmpeg")]
    ReduceVideo {
        video: PathBuf,
        output: PathBuf,

        #[command(flatten)]
        flags: ReduceFlags,

        #[arg(long, default_value = "10")]
        every: u32,

        /// Target size as WIDTHxHEIGHT.
        #[arg(long, default_value = "448x448")]
        size: String,
    },

    /// Extract every Nth frame of each video in VIDEOS into OUTPUT
    #[cfg(feature = "ffmpeg")]
    Extract {
        videos: PathBuf,
        output: PathBuf,

        #[arg(long, default_value = "10")]
        every: u32,

        /// Target size as WIDTHxHEIGHT.
        #[arg(long, default_value = "448x448")]
        size: String,

        /// JPEG quality (1-100).
        #[arg(long, default_value = "95")]
        quality: u8,

        #[arg(long = "video-ext", default_value = "mkv")]
        video_extensions: Vec<String>,
    },

    /// List groups of byte-identical images under DIR
    Duplicates {
        dir: PathBuf,

        #[arg(long = "ext", default_values = ["png", "jpg", "jpeg"])]
        extensions: Vec<String>,

        #[arg(long)]
        json: bool,
    },

    /// Count files in DIR with the given extensions
    Count {
        dir: PathBuf,

        #[arg(long = "ext", required = true)]
        extensions: Vec<String>,
    },

    /// Rename `prefix-name` files in DIR to `name`
    StripPrefix { dir: PathBuf },
}

#[cfg(feature = "ffmpeg")]
fn parse_size(size: &str) -> Result<(u32, u32)> {
    size.split_once(['x', 'X'])
        .and_then(|(w, h)| Some((w.trim().parse().ok()?, h.trim().parse().ok()?)))
        .with_context(|| format!("Invalid size '{}', expected WIDTHxHEIGHT", size))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match args.command {
        Command::Reduce {
            input,
            output,
            flags,
        } => {
            let config = flags.load_config()?;
            let report = reduce_directory(&input, &output, &config)
                .with_context(|| format!("Failed to reduce frames from {}", input.display()))?;
            flags.print_report(&report, &output)?;
        }

        #[cfg(feature = "ffmpeg")]
        Command::ReduceVideo {
            video,
            output,
            flags,
            every,
            size,
        } => {
            use uniqframes_rs::frame_reduction::video::{ExtractOptions, reduce_video};

            let config = flags.load_config()?;
            let (width, height) = parse_size(&size)?;
            let options = ExtractOptions {
                every,
                width,
                height,
                ..ExtractOptions::default()
            };
            let report = reduce_video(&video, &output, &config, &options)
                .with_context(|| format!("Failed to reduce frames of {}", video.display()))?;
            flags.print_report(&report, &output)?;
        }

        #[cfg(feature = "ffmpeg")]
        Command::Extract {
            videos,
            output,
            every,
            size,
            quality,
            video_extensions,
        } => {
            use uniqframes_rs::frame_reduction::video::{ExtractOptions, extract_directory};

            let (width, height) = parse_size(&size)?;
            let options = ExtractOptions {
                every,
                width,
                height,
                quality,
                video_extensions,
            };

            let frames = extract_directory(&videos, &output, &options)?;
            info!("Saved {} frames to {}", frames.len(), output.display());
        }

        Command::Duplicates {
            dir,
            extensions,
            json,
        } => {
            let groups = find_duplicates(&dir, &extensions)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&groups)?);
            } else if groups.is_empty() {
                println!("No duplicates found.");
            } else {
                println!("Duplicates found:");
                for group in &groups {
                    println!("Hash {}:", group.digest);
                    for path in &group.paths {
                        println!("  - {}", path.display());
                    }
                }
            }
        }

        Command::Count { dir, extensions } => {
            let count = count_files(&dir, &extensions)?;
            println!("{}", count);
        }

        Command::StripPrefix { dir } => {
            let report = strip_label_prefix(&dir)?;
            info!(
                "Renamed {} files ({} targets existed, {} without prefix)",
                report.renamed.len(),
                report.skipped_existing.len(),
                report.skipped_no_match.len()
            );
        }
    }

    Ok(())
}
