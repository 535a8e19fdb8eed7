use anyhow::{Context, Result};
use ffmpeg_next as ffmpeg;
use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use log::{info, warn};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::frames::{has_extension, natural_cmp, normalize_extension};
use super::reduce::reduce_directory;
use super::{ReducerConfig, ReductionReport};

/// How frames are sampled and stored when extracting from video
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Keep decode indices divisible by this
    pub every: u32,
    pub width: u32,
    pub height: u32,
    /// JPEG quality, 1-100
    pub quality: u8,
    pub video_extensions: Vec<String>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            every: 10,
            width: 448,
            height: 448,
            quality: 95,
            video_extensions: vec!["mkv".to_string()],
        }
    }
}

/// Initialize FFmpeg (safe to call more than once)
pub fn init_ffmpeg() -> Result<()> {
    ffmpeg::init().context("Failed to initialize FFmpeg")?;

    Ok(())
}

/// File name of the `seq`-th extracted frame of a video group
pub fn frame_file_name(group: usize, seq: usize) -> String {
    format!("{}_frame_{:04}.jpg", group, seq)
}

/// Copy an RGB24 frame into an image, dropping row padding
fn frame_to_image(frame: &ffmpeg::util::frame::video::Video) -> Result<RgbImage> {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let stride = frame.stride(0);
    let data = frame.data(0);

    let mut pixels = Vec::with_capacity(width * height * 3);
    for row in 0..height {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + width * 3]);
    }

    RgbImage::from_raw(width as u32, height as u32, pixels)
        .context("Failed to create image buffer from frame")
}

fn save_jpeg(image: &RgbImage, path: &Path, quality: u8) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), quality);
    image
        .write_with_encoder(encoder)
        .with_context(|| format!("Failed to encode {}", path.display()))?;
    Ok(())
}

/// Decode `video_path`, keep every `options.every`-th frame, scale it and
/// write it as `<group>_frame_<seq>.jpg` into `output_dir`.
pub fn extract_frames<P: AsRef<Path>, Q: AsRef<Path>>(
    video_path: P,
    output_dir: Q,
    group: usize,
    options: &ExtractOptions,
) -> Result<Vec<PathBuf>> {
    let video_path = video_path.as_ref();
    let output_dir = output_dir.as_ref();
    let every = options.every.max(1) as u64;

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let mut input = ffmpeg::format::input(&video_path)
        .with_context(|| format!("Failed to open video file {}", video_path.display()))?;

    let (video_stream_index, mut decoder) = {
        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .context("Could not find video stream")?;
        let decoder = ffmpeg::codec::context::Context::from_parameters(stream.parameters())
            .context("Failed to create codec context")?
            .decoder()
            .video()
            .context("Failed to create video decoder")?;
        (stream.index(), decoder)
    };

    let mut scaler = ffmpeg::software::scaling::context::Context::get(
        decoder.format(),
        decoder.width(),
        decoder.height(),
        ffmpeg::format::Pixel::RGB24,
        options.width,
        options.height,
        ffmpeg::software::scaling::flag::Flags::BILINEAR,
    )
    .context("Failed to create scaler")?;

    info!(
        "Extracting every {} frame(s) from {} ({}x{} -> {}x{})",
        every,
        video_path.display(),
        decoder.width(),
        decoder.height(),
        options.width,
        options.height
    );

    let mut frame_paths = Vec::new();
    let mut decoded_index = 0u64;
    let mut decoded_frame = ffmpeg::util::frame::video::Video::empty();

    let mut drain = |decoder: &mut ffmpeg::decoder::Video,
                     frame_paths: &mut Vec<PathBuf>|
     -> Result<()> {
        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            if decoded_index % every == 0 {
                let mut rgb_frame = ffmpeg::util::frame::video::Video::empty();
                scaler
                    .run(&decoded_frame, &mut rgb_frame)
                    .context("Failed to scale frame")?;

                let path = output_dir.join(frame_file_name(group, frame_paths.len() + 1));
                save_jpeg(&frame_to_image(&rgb_frame)?, &path, options.quality)?;
                frame_paths.push(path);
            }
            decoded_index += 1;
        }
        Ok(())
    };

    for (stream, packet) in input.packets() {
        if stream.index() != video_stream_index {
            continue;
        }
        if let Err(e) = decoder.send_packet(&packet) {
            warn!("Skipping undecodable packet in {}: {}", video_path.display(), e);
            continue;
        }
        drain(&mut decoder, &mut frame_paths)?;
    }

    decoder.send_eof().ok();
    drain(&mut decoder, &mut frame_paths)?;

    if frame_paths.is_empty() {
        anyhow::bail!("Failed to extract any frames from {}", video_path.display());
    }

    info!(
        "Extracted {} of {} frames from {}",
        frame_paths.len(),
        decoded_index,
        video_path.display()
    );

    Ok(frame_paths)
}

/// Extract frames from every video in `videos_dir`. Videos are numbered
/// from 1 in natural name order and that number becomes the frame prefix.
pub fn extract_directory<P: AsRef<Path>, Q: AsRef<Path>>(
    videos_dir: P,
    output_dir: Q,
    options: &ExtractOptions,
) -> Result<Vec<PathBuf>> {
    let videos_dir = videos_dir.as_ref();
    let extensions: Vec<String> = options
        .video_extensions
        .iter()
        .map(|e| normalize_extension(e))
        .collect();

    let mut videos: Vec<PathBuf> = std::fs::read_dir(videos_dir)
        .with_context(|| format!("Failed to read directory {}", videos_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && has_extension(path, &extensions))
        .collect();
    videos.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));

    info!("Found {} videos in {}", videos.len(), videos_dir.display());

    init_ffmpeg()?;
    let mut all = Vec::new();
    for (i, video) in videos.iter().enumerate() {
        all.extend(extract_frames(video, &output_dir, i + 1, options)?);
    }

    Ok(all)
}

/// Extract one video into a scratch directory and reduce it into `output`.
/// The scratch frames are removed when this returns.
pub fn reduce_video<P: AsRef<Path>, Q: AsRef<Path>>(
    video_path: P,
    output: Q,
    config: &ReducerConfig,
    options: &ExtractOptions,
) -> Result<ReductionReport> {
    config.validate()?;
    init_ffmpeg()?;

    let temp_dir = TempDir::new().context("Failed to create temp directory")?;
    extract_frames(&video_path, temp_dir.path(), 1, options)
        .context("Failed to extract frames from video")?;

    let report = reduce_directory(temp_dir.path(), output, config)?;
    Ok(report)
}
