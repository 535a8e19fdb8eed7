use image::{GrayImage, Luma, RgbImage};
use std::path::{Path, PathBuf};

use crate::error::{ReduceError, Result};

pub const HUE_BINS: usize = 50;
pub const SATURATION_BINS: usize = 60;
/// 8-bit hue is stored halved, in [0, 180)
const HUE_RANGE: f64 = 180.0;
const SATURATION_RANGE: f64 = 256.0;

pub const SSIM_WINDOW: u32 = 7;
const SSIM_K1: f64 = 0.01;
const SSIM_K2: f64 = 0.03;
const SSIM_DATA_RANGE: f64 = 255.0;

/// A decoded frame together with the file it came from
#[derive(Debug, Clone)]
pub struct LoadedFrame {
    pub path: PathBuf,
    pub image: RgbImage,
}

impl LoadedFrame {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|source| ReduceError::Decode {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgb8();

        Ok(Self {
            path: path.to_path_buf(),
            image,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

/// A similarity measure between two frames, higher meaning more alike.
///
/// The signature is computed once per decoded frame so the reference does
/// not have to be re-analysed for every candidate.
pub trait Metric {
    type Signature;

    /// Smallest width and height the metric accepts
    fn min_side(&self) -> u32 {
        1
    }

    fn signature(&self, image: &RgbImage) -> Self::Signature;

    fn score(&self, reference: &Self::Signature, candidate: &Self::Signature) -> f64;
}

/// Correlation of hue/saturation histograms
#[derive(Debug, Clone, Copy, Default)]
pub struct HistogramCorrelation;

impl Metric for HistogramCorrelation {
    type Signature = Vec<f64>;

    fn signature(&self, image: &RgbImage) -> Vec<f64> {
        let mut hist = hs_histogram(image);
        normalize_min_max(&mut hist);
        hist
    }

    fn score(&self, reference: &Vec<f64>, candidate: &Vec<f64>) -> f64 {
        histogram_correlation(reference, candidate)
    }
}

/// Mean structural similarity of the grayscale frames
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralSimilarity;

impl Metric for StructuralSimilarity {
    type Signature = GrayImage;

    fn min_side(&self) -> u32 {
        SSIM_WINDOW
    }

    fn signature(&self, image: &RgbImage) -> GrayImage {
        to_luma(image)
    }

    fn score(&self, reference: &GrayImage, candidate: &GrayImage) -> f64 {
        structural_similarity(reference, candidate)
    }
}

/// Convert one RGB pixel to 8-bit HSV: hue in [0, 180), saturation and
/// value in [0, 255].
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (rf, gf, bf) = (r as f64, g as f64, b as f64);
    let v = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let diff = v - min;

    let s = if v > 0.0 { (255.0 * diff / v).round() } else { 0.0 };

    let h = if diff == 0.0 {
        0.0
    } else {
        let mut h = if v == rf {
            60.0 * (gf - bf) / diff
        } else if v == gf {
            120.0 + 60.0 * (bf - rf) / diff
        } else {
            240.0 + 60.0 * (rf - gf) / diff
        };
        if h < 0.0 {
            h += 360.0;
        }
        (h / 2.0).round() % HUE_RANGE
    };

    (h as u8, s as u8, v as u8)
}

/// Joint hue x saturation histogram, row-major over hue bins
pub fn hs_histogram(image: &RgbImage) -> Vec<f64> {
    let mut hist = vec![0.0; HUE_BINS * SATURATION_BINS];

    for pixel in image.pixels() {
        let [r, g, b] = pixel.0;
        let (h, s, _) = rgb_to_hsv(r, g, b);
        let h_bin = ((h as f64 * HUE_BINS as f64 / HUE_RANGE) as usize).min(HUE_BINS - 1);
        let s_bin = ((s as f64 * SATURATION_BINS as f64 / SATURATION_RANGE) as usize)
            .min(SATURATION_BINS - 1);
        hist[h_bin * SATURATION_BINS + s_bin] += 1.0;
    }

    hist
}

/// Rescale values into [0, 1]. A flat histogram collapses to all zeros.
pub fn normalize_min_max(values: &mut [f64]) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    for v in values.iter_mut() {
        *v = if span > f64::EPSILON { (*v - min) / span } else { 0.0 };
    }
}

/// Pearson correlation of two equally sized histograms.
///
/// Returns 1.0 when either side has no variance.
pub fn histogram_correlation(h1: &[f64], h2: &[f64]) -> f64 {
    let n = h1.len().min(h2.len());
    if n == 0 {
        return 1.0;
    }

    let (mut s1, mut s2, mut s11, mut s12, mut s22) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for (&a, &b) in h1.iter().zip(h2.iter()) {
        s1 += a;
        s2 += b;
        s11 += a * a;
        s12 += a * b;
        s22 += b * b;
    }

    let n = n as f64;
    let num = s12 - s1 * s2 / n;
    let denom = (s11 - s1 * s1 / n) * (s22 - s2 * s2 / n);

    if denom.abs() > f64::EPSILON {
        num / denom.sqrt()
    } else {
        1.0
    }
}

/// Histogram correlation of two RGB frames
pub fn compare_histograms(a: &RgbImage, b: &RgbImage) -> f64 {
    let metric = HistogramCorrelation;
    metric.score(&metric.signature(a), &metric.signature(b))
}

/// BT.601 luma with 14-bit fixed-point weights
pub fn to_luma(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        let luma = (r as u32 * 4899 + g as u32 * 9617 + b as u32 * 1868 + (1 << 13)) >> 14;
        Luma([luma.min(255) as u8])
    })
}

/// Summed-area table with a zero first row and column
struct Integral {
    stride: usize,
    data: Vec<f64>,
}

impl Integral {
    fn build(width: usize, height: usize, value: impl Fn(usize, usize) -> f64) -> Self {
        let stride = width + 1;
        let mut data = vec![0.0; stride * (height + 1)];
        for y in 0..height {
            let mut row = 0.0;
            for x in 0..width {
                row += value(x, y);
                data[(y + 1) * stride + x + 1] = data[y * stride + x + 1] + row;
            }
        }
        Self { stride, data }
    }

    fn window(&self, x: usize, y: usize, size: usize) -> f64 {
        let s = self.stride;
        self.data[(y + size) * s + x + size] - self.data[y * s + x + size]
            - self.data[(y + size) * s + x]
            + self.data[y * s + x]
    }
}

/// Mean SSIM over every fully contained 7x7 window with uniform weights and
/// sample covariance.
///
/// Both images must share dimensions of at least 7x7.
pub fn structural_similarity(a: &GrayImage, b: &GrayImage) -> f64 {
    let (w, h) = (a.width() as usize, a.height() as usize);
    let win = SSIM_WINDOW as usize;
    if w < win || h < win || a.dimensions() != b.dimensions() {
        return 0.0;
    }

    let pa = |x: usize, y: usize| a.get_pixel(x as u32, y as u32).0[0] as f64;
    let pb = |x: usize, y: usize| b.get_pixel(x as u32, y as u32).0[0] as f64;

    let sum_a = Integral::build(w, h, pa);
    let sum_b = Integral::build(w, h, pb);
    let sum_aa = Integral::build(w, h, |x, y| pa(x, y) * pa(x, y));
    let sum_bb = Integral::build(w, h, |x, y| pb(x, y) * pb(x, y));
    let sum_ab = Integral::build(w, h, |x, y| pa(x, y) * pb(x, y));

    let np = (win * win) as f64;
    let cov_norm = np / (np - 1.0);
    let c1 = (SSIM_K1 * SSIM_DATA_RANGE).powi(2);
    let c2 = (SSIM_K2 * SSIM_DATA_RANGE).powi(2);

    let mut total = 0.0;
    let mut count = 0usize;
    for y in 0..=(h - win) {
        for x in 0..=(w - win) {
            let ux = sum_a.window(x, y, win) / np;
            let uy = sum_b.window(x, y, win) / np;
            let uxx = sum_aa.window(x, y, win) / np;
            let uyy = sum_bb.window(x, y, win) / np;
            let uxy = sum_ab.window(x, y, win) / np;

            let vx = cov_norm * (uxx - ux * ux);
            let vy = cov_norm * (uyy - uy * uy);
            let vxy = cov_norm * (uxy - ux * uy);

            let numerator = (2.0 * ux * uy + c1) * (2.0 * vxy + c2);
            let denominator = (ux * ux + uy * uy + c1) * (vx + vy + c2);
            total += numerator / denominator;
            count += 1;
        }
    }

    total / count as f64
}

/// Grayscale SSIM of two RGB frames
pub fn compare_ssim(a: &RgbImage, b: &RgbImage) -> f64 {
    structural_similarity(&to_luma(a), &to_luma(b))
}
