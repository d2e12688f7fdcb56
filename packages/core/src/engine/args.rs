//! FFmpeg argument construction
//!
//! Kept separate from process spawning so the exact command line can be
//! tested without an ffmpeg binary.

use super::ProcessingOptions;
use std::path::Path;

/// Thumbnail size (portrait, quarter of 1080x1920)
pub const THUMBNAIL_SIZE: (u32, u32) = (270, 480);

/// Arguments for a trim + rescale render of `input` into `output`
pub fn process_args(input: &Path, output: &Path, options: &ProcessingOptions) -> Vec<String> {
    let start = options.start_time.unwrap_or(0.0);
    let (width, height) = options.resolution.dimensions();

    let mut args = vec![
        "-i".to_string(),
        input.display().to_string(),
        "-ss".to_string(),
        start.to_string(),
    ];

    if let Some(end) = options.end_time {
        args.push("-t".to_string());
        args.push((end - start).to_string());
    }

    // Fit inside the portrait target, then letterbox to exactly W:H
    args.push("-vf".to_string());
    args.push(format!(
        "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1",
        w = width,
        h = height
    ));

    args.push("-r".to_string());
    args.push(options.fps.as_u32().to_string());

    args.extend(
        [
            "-c:v", "libx264", "-preset", "fast", "-crf", "23", "-c:a", "aac", "-ar", "44100",
            "-ac", "2", "-b:a", "128k", "-movflags", "+faststart", "-y",
        ]
        .iter()
        .map(|s| s.to_string()),
    );

    args.push(output.display().to_string());
    args
}

/// Arguments for a single JPEG frame of `input` at `time` seconds
pub fn thumbnail_args(input: &Path, output: &Path, time: f64) -> Vec<String> {
    let (width, height) = THUMBNAIL_SIZE;
    vec![
        "-i".to_string(),
        input.display().to_string(),
        "-ss".to_string(),
        time.max(0.0).to_string(),
        "-vframes".to_string(),
        "1".to_string(),
        "-vf".to_string(),
        format!("scale={}:{}", width, height),
        "-f".to_string(),
        "image2".to_string(),
        "-y".to_string(),
        output.display().to_string(),
    ]
}

/// Parse an ffmpeg `HH:MM:SS.ms` progress timestamp into seconds
pub fn parse_timestamp(timestamp: &str) -> Option<f64> {
    let timestamp = timestamp.trim();
    // ffmpeg reports small negative times before the first output frame
    if timestamp.starts_with('-') {
        return None;
    }
    let mut parts = timestamp.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Convert elapsed output time into a whole percentage of `total`
pub fn progress_percent(elapsed: f64, total: f64) -> u8 {
    if total <= 0.0 || !elapsed.is_finite() {
        return 0;
    }
    (elapsed / total * 100.0).round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export_settings::{FrameRate, Resolution};
    use std::path::PathBuf;

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .map(|s| s.as_str())
    }

    #[test]
    fn test_process_args_full_length() {
        let options = ProcessingOptions::full(Resolution::Hd1080, FrameRate::Fps30);
        let args = process_args(
            &PathBuf::from("in.mp4"),
            &PathBuf::from("out.mp4"),
            &options,
        );

        assert_eq!(value_after(&args, "-i"), Some("in.mp4"));
        assert_eq!(value_after(&args, "-ss"), Some("0"));
        assert_eq!(value_after(&args, "-t"), None);
        assert_eq!(value_after(&args, "-r"), Some("30"));
        assert_eq!(
            value_after(&args, "-vf"),
            Some("scale=1080:1920:force_original_aspect_ratio=decrease,pad=1080:1920:(ow-iw)/2:(oh-ih)/2,setsar=1")
        );
        assert_eq!(value_after(&args, "-c:v"), Some("libx264"));
        assert_eq!(value_after(&args, "-movflags"), Some("+faststart"));
        assert_eq!(args.last().map(|s| s.as_str()), Some("out.mp4"));
    }

    #[test]
    fn test_process_args_trimmed() {
        let options = ProcessingOptions {
            start_time: Some(2.0),
            end_time: Some(5.5),
            resolution: Resolution::Hd720,
            fps: FrameRate::Fps60,
        };
        let args = process_args(
            &PathBuf::from("in.mp4"),
            &PathBuf::from("out.mp4"),
            &options,
        );

        assert_eq!(value_after(&args, "-ss"), Some("2"));
        assert_eq!(value_after(&args, "-t"), Some("3.5"));
        assert_eq!(value_after(&args, "-r"), Some("60"));
        assert!(value_after(&args, "-vf").unwrap().starts_with("scale=720:1280"));
    }

    #[test]
    fn test_thumbnail_args() {
        let args = thumbnail_args(&PathBuf::from("in.mp4"), &PathBuf::from("thumb.jpg"), 1.5);
        assert_eq!(value_after(&args, "-ss"), Some("1.5"));
        assert_eq!(value_after(&args, "-vframes"), Some("1"));
        assert_eq!(value_after(&args, "-vf"), Some("scale=270:480"));
        assert_eq!(value_after(&args, "-f"), Some("image2"));
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("00:00:12.50"), Some(12.5));
        assert_eq!(parse_timestamp("01:02:03.00"), Some(3723.0));
        assert_eq!(parse_timestamp("N/A"), None);
        assert_eq!(parse_timestamp("-00:00:00.02"), None);
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(5.0, 10.0), 50);
        assert_eq!(progress_percent(12.0, 10.0), 100);
        assert_eq!(progress_percent(1.0, 0.0), 0);
        assert_eq!(progress_percent(f64::NAN, 10.0), 0);
    }
}
