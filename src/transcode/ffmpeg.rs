use std::path::Path;
use std::process::{Command, Stdio};

use crate::audio::error::{DecodeError, DecodeResult};

/// Arguments that make ffmpeg write a canonical 16-bit stereo 44.1 kHz WAVE
/// with no metadata chunks between `fmt ` and `data`.
pub fn decode_args(source: &Path, dest: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-hide_banner".into(),
        "-loglevel".into(), "error".into(),
        "-i".into(), source.to_string_lossy().into_owned(),
        "-vn".into(),
        "-map_metadata".into(), "-1".into(),
        "-fflags".into(), "+bitexact".into(),
        "-flags:a".into(), "+bitexact".into(),
        "-acodec".into(), "pcm_s16le".into(),
        "-ar".into(), "44100".into(),
        "-ac".into(), "2".into(),
        "-f".into(), "wav".into(),
        dest.to_string_lossy().into_owned(),
    ]
}

pub fn decode_to_wave(program: &str, source: &Path, dest: &Path) -> DecodeResult<()> {
    let args = decode_args(source, dest);
    log::debug!("Running {} {}", program, args.join(" "));

    let output = Command::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| DecodeError::Transcode {
            file: source.to_path_buf(),
            message: format!("Failed to spawn {}. Is ffmpeg installed? ({})", program, e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DecodeError::Transcode {
            file: source.to_path_buf(),
            message: format!("{} exited with {}:\n{}", program, output.status, stderr.trim()),
        });
    }

    log::info!("ffmpeg decoded {} -> {}", source.display(), dest.display());
    Ok(())
}
