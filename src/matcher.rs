//! Pairwise comparison of decoded files.
//!
//! A single pair is handled strictly in sequence. Sets of files are decoded
//! and fingerprinted once per distinct path on the rayon pool, then every
//! (first, second) pair is scored. Each file is closed as soon as its
//! fingerprint exists, so only one handle per worker is open at a time.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::audio::AudioSource;
use crate::fingerprint::compare::{compare, ComparisonResult};
use crate::fingerprint::fft::transform;
use crate::fingerprint::Fingerprint;
use crate::transcode::Transcoder;

/// Decoded file reduced to what scoring needs.
struct Track {
    short_name: String,
    fingerprint: Fingerprint,
}

/// Decodes and transforms `path`; its file handle is released on return.
fn track(path: &Path, transcoder: &Transcoder) -> Result<Track> {
    let source = AudioSource::classify(path)?;
    let wave = source.open(transcoder)?;
    let samples = wave.samples()?;
    let fingerprint = transform(samples);

    if log::log_enabled!(log::Level::Debug) {
        let peak = fingerprint
            .as_slice()
            .iter()
            .map(|c| c.abs())
            .fold(0.0, f64::max);
        log::debug!(
            "{}: {} samples -> {} bins, peak magnitude {:.6}",
            wave.path().display(),
            samples.len(),
            fingerprint.len(),
            peak
        );
    }

    Ok(Track {
        short_name: source.short_name(),
        fingerprint,
    })
}

fn score(first: &Track, second: &Track) -> ComparisonResult {
    let (verdict, mse) = compare(&first.fingerprint, &second.fingerprint);
    ComparisonResult {
        verdict,
        first: first.short_name.clone(),
        second: second.short_name.clone(),
        mse,
    }
}

/// Compares two files: decode and transform the first, then the second.
pub fn compare_pair(first: &Path, second: &Path, transcoder: &Transcoder) -> Result<ComparisonResult> {
    let a = track(first, transcoder)?;
    let b = track(second, transcoder)?;
    Ok(score(&a, &b))
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files ({eta} remaining)")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb
}

/// Compares every file of `first` with every file of `second`.
///
/// Results come back in (first, second) order. The first decode failure
/// aborts the whole run.
pub fn compare_sets(
    first: &[PathBuf],
    second: &[PathBuf],
    transcoder: &Transcoder,
) -> Result<Vec<ComparisonResult>> {
    if let ([a], [b]) = (first, second) {
        return Ok(vec![compare_pair(a, b, transcoder)?]);
    }

    let mut unique: Vec<&PathBuf> = first.iter().chain(second).collect();
    unique.sort();
    unique.dedup();

    // MPEG sources share companion paths by short name, so they are decoded in turn.
    let (mpeg, wave): (Vec<&PathBuf>, Vec<&PathBuf>) = unique
        .into_iter()
        .partition(|p| matches!(AudioSource::classify(p), Ok(AudioSource::Mpeg(_))));

    let pb = progress_bar(wave.len() + mpeg.len());
    let mut tracks: HashMap<PathBuf, Track> = wave
        .into_par_iter()
        .map(|path| -> Result<(PathBuf, Track)> {
            let decoded = track(path, transcoder)?;
            pb.inc(1);
            Ok((path.clone(), decoded))
        })
        .collect::<Result<_>>()?;
    for path in mpeg {
        tracks.insert(path.clone(), track(path, transcoder)?);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let results = first
        .par_iter()
        .flat_map_iter(|a| {
            let tracks = &tracks;
            second.iter().map(move |b| score(&tracks[a], &tracks[b]))
        })
        .collect();

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::error::{DecodeError, HeaderRule};
    use crate::audio::wave::tests::wave_bytes;
    use crate::fingerprint::compare::Verdict;
    use crate::transcode::Backend;

    fn transcoder(dir: &Path) -> Transcoder {
        Transcoder {
            backend: Backend::Builtin,
            ffmpeg: "ffmpeg".into(),
            temp_dir: dir.join("decoded"),
        }
    }

    fn write(dir: &Path, name: &str, bytes: Vec<u8>) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    fn silence(frames: usize) -> Vec<u8> {
        wave_bytes(2, 44_100, 16, &vec![0u8; frames * 4])
    }

    fn blip(frames: usize) -> Vec<u8> {
        let mut data = vec![0u8; frames * 4];
        data[40] = 1;
        wave_bytes(2, 44_100, 16, &data)
    }

    #[test]
    fn identical_silent_files_match() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.wav", silence(1024));
        let b = write(dir.path(), "b.wav", silence(1024));

        let result = compare_pair(&a, &b, &transcoder(dir.path())).unwrap();
        assert_eq!(result.verdict, Verdict::Match);
        assert_eq!(result.mse, 0.0);
        assert_eq!(result.to_string(), "MATCH a.wav b.wav");
    }

    #[test]
    fn single_nonzero_sample_does_not_match() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.wav", silence(1024));
        let b = write(dir.path(), "b.wav", blip(1024));

        let result = compare_pair(&a, &b, &transcoder(dir.path())).unwrap();
        assert_eq!(result.verdict, Verdict::NoMatch);
        assert!(result.mse > 0.0);
        assert_eq!(result.to_string(), "NO MATCH");
    }

    #[test]
    fn zero_padding_lets_unequal_silence_match() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.wav", silence(1000));
        let b = write(dir.path(), "b.wav", silence(1024));

        // Data chunk lengths differ, yet both spectra are all zero.
        let result = compare_pair(&a, &b, &transcoder(dir.path())).unwrap();
        assert_eq!(result.verdict, Verdict::Match);
        assert_eq!(result.mse, 0.0);

        let results = compare_sets(&[a.clone(), b.clone()], &[b, a], &transcoder(dir.path())).unwrap();
        assert!(results.iter().all(|r| r.is_match()));
    }

    #[test]
    fn junk_header_aborts_with_riff_rule() {
        let dir = tempfile::tempdir().unwrap();
        let mut junk = silence(16);
        junk[..4].copy_from_slice(b"JUNK");
        let a = write(dir.path(), "junk.wav", junk);
        let b = write(dir.path(), "b.wav", silence(16));

        let err = compare_pair(&a, &b, &transcoder(dir.path())).unwrap_err();
        let decode = err.downcast_ref::<DecodeError>().expect("decode error");
        assert_eq!(decode.header_rule(), Some(HeaderRule::Riff));
        assert!(err.to_string().contains("junk.wav"));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.flac", silence(16));
        let b = write(dir.path(), "b.wav", silence(16));
        let err = compare_pair(&a, &b, &transcoder(dir.path())).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DecodeError>(),
            Some(DecodeError::UnsupportedFile { .. })
        ));
    }

    #[test]
    fn sets_compare_every_pair_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let x = write(dir.path(), "x.wav", silence(512));
        let y = write(dir.path(), "y.wav", blip(512));
        let z = write(dir.path(), "z.wav", silence(256));

        let results = compare_sets(
            &[x.clone(), y.clone()],
            &[x.clone(), y.clone(), z.clone()],
            &transcoder(dir.path()),
        )
        .unwrap();

        let lines: Vec<String> = results.iter().map(|r| r.to_string()).collect();
        assert_eq!(
            lines,
            vec![
                "MATCH x.wav x.wav",
                "NO MATCH",
                "MATCH x.wav z.wav",
                "NO MATCH",
                "MATCH y.wav y.wav",
                "NO MATCH",
            ]
        );
        assert_eq!(results[3].first, "y.wav");
        assert_eq!(results[3].second, "x.wav");
    }

    #[test]
    fn sets_are_symmetric() {
        let dir = tempfile::tempdir().unwrap();
        let x = write(dir.path(), "x.wav", silence(300));
        let y = write(dir.path(), "y.wav", blip(300));
        let transcoder = transcoder(dir.path());

        let forward = compare_sets(&[x.clone(), y.clone()], &[y.clone()], &transcoder).unwrap();
        let backward = compare_sets(&[y.clone()], &[x.clone(), y.clone()], &transcoder).unwrap();
        assert_eq!(forward[0].verdict, backward[0].verdict);
        assert_eq!(forward[0].mse, backward[0].mse);
        assert_eq!(forward[1].verdict, Verdict::Match);
    }

    #[test]
    fn large_sets_close_each_file_after_use() {
        // More files than the usual 1024 open-file soft limit.
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<PathBuf> = (0..1536)
            .map(|i| write(dir.path(), &format!("f{:04}.wav", i), silence(4)))
            .collect();
        let reference = write(dir.path(), "ref.wav", silence(4));

        let results = compare_sets(&files, &[reference], &transcoder(dir.path())).unwrap();
        assert_eq!(results.len(), files.len());
        assert!(results.iter().all(|r| r.is_match()));
    }

    #[test]
    fn missing_file_in_set_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let x = write(dir.path(), "x.wav", silence(8));
        let missing = dir.path().join("gone.wav");

        let err = compare_sets(&[x.clone(), missing], &[x], &transcoder(dir.path())).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DecodeError>(),
            Some(DecodeError::NotFound { .. })
        ));
    }
}
