//! Turning compressed input into a companion WAVE file.

pub mod builtin;
pub mod ffmpeg;

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::Deserialize;

use crate::audio::error::{DecodeError, DecodeResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Run an external ffmpeg process
    #[default]
    Ffmpeg,
    /// Decode in process with symphonia
    Builtin,
}

#[derive(Clone, Debug)]
pub struct Transcoder {
    pub backend: Backend,
    pub ffmpeg: String,
    pub temp_dir: PathBuf,
}

impl Transcoder {
    /// Fixed location of the decoded companion for `short_name`.
    pub fn wave_path(&self, short_name: &str) -> PathBuf {
        self.temp_dir.join(format!("{}.wav", short_name))
    }

    /// Decodes `source` into `<temp_dir>/<short_name>.wav` and returns that path.
    pub fn to_wave(&self, source: &Path, short_name: &str) -> DecodeResult<PathBuf> {
        std::fs::create_dir_all(&self.temp_dir).map_err(|e| DecodeError::io(&self.temp_dir, e))?;
        let dest = self.wave_path(short_name);

        match self.backend {
            Backend::Ffmpeg => ffmpeg::decode_to_wave(&self.ffmpeg, source, &dest)?,
            Backend::Builtin => builtin::decode_to_wave(source, &dest)?,
        }

        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn companion_is_keyed_by_short_name() {
        let transcoder = Transcoder {
            backend: Backend::Ffmpeg,
            ffmpeg: "ffmpeg".into(),
            temp_dir: PathBuf::from("/tmp/audiomatch"),
        };
        assert_eq!(
            transcoder.wave_path("song.mp3"),
            PathBuf::from("/tmp/audiomatch/song.mp3.wav")
        );
    }

    #[test]
    fn failed_transcode_names_source() {
        let dir = tempfile::tempdir().unwrap();
        let transcoder = Transcoder {
            backend: Backend::Ffmpeg,
            ffmpeg: "audiomatch-no-such-ffmpeg".into(),
            temp_dir: dir.path().join("decoded"),
        };
        let err = transcoder.to_wave(Path::new("in/song.mp3"), "song.mp3").unwrap_err();
        assert!(err.to_string().starts_with("in/song.mp3"));
        assert!(dir.path().join("decoded").is_dir());
    }
}
