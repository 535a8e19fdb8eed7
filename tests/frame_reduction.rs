use image::{Rgb, RgbImage};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use uniqframes_rs::{
    KeepReason, ReduceError, ReducerConfig, ReferencePolicy, Strategy, reduce_directory,
};

const RED: [u8; 3] = [220, 20, 20];
const GREEN: [u8; 3] = [20, 200, 20];
const BLUE: [u8; 3] = [20, 20, 220];

fn write_frame(dir: &Path, name: &str, color: [u8; 3]) {
    RgbImage::from_pixel(32, 32, Rgb(color))
        .save(dir.join(name))
        .unwrap();
}

fn write_sequence(dir: &Path, colors: &[[u8; 3]]) {
    for (i, color) in colors.iter().enumerate() {
        write_frame(dir, &format!("1_frame_{:04}.png", i + 1), *color);
    }
}

fn output_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn static_footage_keeps_only_forced_frames() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    for i in 0..20 {
        write_frame(input.path(), &format!("f_{:04}.jpg", i), [90, 140, 60]);
    }

    let report = reduce_directory(
        input.path(),
        output.path(),
        &ReducerConfig::histogram(0.8, 6),
    )
    .unwrap();

    assert_eq!(report.total_frames, 20);
    assert_eq!(report.kept_indices(), vec![0, 6, 12, 18]);
    assert_eq!(report.kept[0].reason, KeepReason::First);
    assert!(report.kept[1..].iter().all(|k| k.reason == KeepReason::Forced));
    assert_eq!(
        output_names(output.path()),
        vec!["f_0000.jpg", "f_0006.jpg", "f_0012.jpg", "f_0018.jpg"]
    );
    assert_eq!(
        fs::read(output.path().join("f_0000.jpg")).unwrap(),
        fs::read(input.path().join("f_0000.jpg")).unwrap()
    );
}

#[test]
fn alternating_frames_are_all_divergent() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_sequence(input.path(), &[RED, BLUE, RED, BLUE, RED]);

    let report = reduce_directory(
        input.path(),
        output.path(),
        &ReducerConfig::histogram(0.9, 100),
    )
    .unwrap();

    assert_eq!(report.kept_indices(), vec![0, 1, 2, 3, 4]);
    assert!(report.kept[1..].iter().all(|k| k.reason == KeepReason::Divergent));
    assert_eq!(output_names(output.path()).len(), 5);
}

#[test]
fn ssim_keeps_alternating_frames() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_sequence(input.path(), &[RED, BLUE, RED, BLUE, RED]);

    let report =
        reduce_directory(input.path(), output.path(), &ReducerConfig::ssim(0.9)).unwrap();

    assert_eq!(report.strategy, Strategy::Ssim);
    assert_eq!(report.reference_policy, ReferencePolicy::PreviousFrame);
    assert_eq!(report.kept_indices(), vec![0, 1, 2, 3, 4]);
}

#[test]
fn empty_input_fails_without_creating_output() {
    let input = TempDir::new().unwrap();
    let parent = TempDir::new().unwrap();
    let output = parent.path().join("unique_frames");
    fs::write(input.path().join("notes.txt"), b"not a frame").unwrap();

    let err = reduce_directory(input.path(), &output, &ReducerConfig::default()).unwrap_err();

    assert!(matches!(err, ReduceError::NoFrames { .. }));
    assert!(err.to_string().contains("no frames found"));
    assert!(!output.exists());
}

#[test]
fn invalid_threshold_is_rejected_before_any_work() {
    let input = TempDir::new().unwrap();
    let parent = TempDir::new().unwrap();
    let output = parent.path().join("out");
    write_sequence(input.path(), &[RED, BLUE]);

    let err =
        reduce_directory(input.path(), &output, &ReducerConfig::histogram(1.5, 6)).unwrap_err();

    assert!(matches!(err, ReduceError::InvalidThreshold(t) if t == 1.5));
    assert!(!output.exists());
}

#[test]
fn corrupt_frame_names_the_file() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_sequence(input.path(), &[RED, RED]);
    fs::write(input.path().join("1_frame_0003.png"), b"not really a png").unwrap();

    let err = reduce_directory(
        input.path(),
        output.path(),
        &ReducerConfig::histogram(0.8, 6),
    )
    .unwrap_err();

    match err {
        ReduceError::Decode { path, .. } => {
            assert_eq!(path, input.path().join("1_frame_0003.png"))
        }
        other => panic!("unexpected error: {other}"),
    }
    // frames kept before the failure stay in place
    assert_eq!(output_names(output.path()), vec!["1_frame_0001.png"]);
}

#[test]
fn rerun_into_same_output_is_idempotent() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_sequence(input.path(), &[RED, RED, BLUE, BLUE, GREEN]);
    let config = ReducerConfig::histogram(0.9, 100);

    let first = reduce_directory(input.path(), output.path(), &config).unwrap();
    let second = reduce_directory(input.path(), output.path(), &config).unwrap();

    assert_eq!(first.copied, 3);
    assert_eq!(first.skipped_existing, 0);
    assert_eq!(second.copied, 0);
    assert_eq!(second.skipped_existing, 3);
    assert_eq!(first.kept, second.kept);
    assert_eq!(output_names(output.path()).len(), 3);
}

#[test]
fn identical_frames_with_wide_interval_keep_one() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_sequence(input.path(), &[GREEN; 8]);

    for threshold in [0.1, 0.5, 0.99] {
        let report = reduce_directory(
            input.path(),
            output.path(),
            &ReducerConfig::histogram(threshold, 9),
        )
        .unwrap();
        assert_eq!(report.kept_indices(), vec![0], "threshold {threshold}");
    }
}

#[test]
fn unit_interval_keeps_every_frame() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_sequence(input.path(), &[RED, RED, RED, BLUE, BLUE]);

    for threshold in [0.0, 0.5, 1.0] {
        let report = reduce_directory(
            input.path(),
            output.path(),
            &ReducerConfig::histogram(threshold, 1),
        )
        .unwrap();
        assert_eq!(report.kept_indices(), vec![0, 1, 2, 3, 4]);
    }
}

#[test]
fn kept_frames_respect_order_gap_and_threshold_monotonicity() {
    let input = TempDir::new().unwrap();
    let colors = [RED, RED, GREEN, GREEN, GREEN, GREEN, GREEN, BLUE, RED, RED];
    write_sequence(input.path(), &colors);
    let min_interval = 4;

    let mut previous_count = 0;
    for threshold in [0.0, 0.25, 0.5, 0.75, 1.0] {
        let output = TempDir::new().unwrap();
        let report = reduce_directory(
            input.path(),
            output.path(),
            &ReducerConfig::histogram(threshold, min_interval),
        )
        .unwrap();
        let kept = report.kept_indices();

        assert_eq!(kept[0], 0);
        for pair in kept.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[1] - pair[0] <= min_interval);
        }
        assert!(
            kept.len() >= previous_count,
            "threshold {threshold} kept {} < {previous_count}",
            kept.len()
        );
        previous_count = kept.len();

        if threshold == 0.0 {
            assert_eq!(kept, vec![0, 4, 8]);
        } else if threshold == 0.5 {
            assert_eq!(kept, vec![0, 2, 6, 7, 8]);
        }
    }
}

#[test]
fn mismatched_dimensions_fail_the_run() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_frame(input.path(), "1_frame_0001.png", RED);
    RgbImage::from_pixel(48, 32, Rgb(RED))
        .save(input.path().join("1_frame_0002.png"))
        .unwrap();

    let err = reduce_directory(
        input.path(),
        output.path(),
        &ReducerConfig::histogram(0.8, 6),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        ReduceError::DimensionMismatch {
            reference_size: (32, 32),
            candidate_size: (48, 32),
            ..
        }
    ));
}

#[test]
fn extension_filter_is_configurable() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    write_frame(input.path(), "a_frame_0001.png", RED);
    write_frame(input.path(), "a_frame_0002.bmp", BLUE);

    let config = ReducerConfig {
        extensions: vec!["bmp".to_string()],
        ..ReducerConfig::histogram(0.9, 100)
    };
    let report = reduce_directory(input.path(), output.path(), &config).unwrap();

    assert_eq!(report.total_frames, 1);
    assert_eq!(output_names(output.path()), vec!["a_frame_0002.bmp"]);
}

#[cfg(target_os = "linux")]
#[test]
fn non_utf8_frame_names_are_copied_verbatim() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let name = OsStr::from_bytes(b"f_\xFF0001.png");
    RgbImage::from_pixel(32, 32, Rgb(RED))
        .save(input.path().join(name))
        .unwrap();

    let config = ReducerConfig::histogram(0.8, 6);
    let report = reduce_directory(input.path(), output.path(), &config).unwrap();
    assert_eq!(report.copied, 1);

    let listed: Vec<_> = fs::read_dir(output.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(listed, vec![name.to_os_string()]);

    let rerun = reduce_directory(input.path(), output.path(), &config).unwrap();
    assert_eq!((rerun.copied, rerun.skipped_existing), (0, 1));
}
