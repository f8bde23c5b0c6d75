pub mod error;
pub mod mpeg;
pub mod wave;

use std::path::{Path, PathBuf};

use error::{DecodeError, DecodeResult};
use wave::WaveFile;

use crate::transcode::Transcoder;

/// Input file, classified once by extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AudioSource {
    /// Uncompressed PCM WAVE, decoded directly.
    Wave(PathBuf),
    /// MPEG audio frames, sniffed and handed to a transcoder.
    Mpeg(PathBuf),
}

/// File name without its directory, used to label results.
pub fn short_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn is_supported_extension(path: &Path) -> bool {
    AudioSource::classify(path).is_ok()
}

impl AudioSource {
    pub fn classify(path: &Path) -> DecodeResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "wav" | "wave" => Ok(AudioSource::Wave(path.to_path_buf())),
            "mp3" => Ok(AudioSource::Mpeg(path.to_path_buf())),
            _ => Err(DecodeError::UnsupportedFile {
                file: path.to_path_buf(),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            AudioSource::Wave(path) | AudioSource::Mpeg(path) => path,
        }
    }

    pub fn short_name(&self) -> String {
        short_name(self.path())
    }

    /// Opens the source as a header-validated WAVE file.
    ///
    /// MPEG input is sniffed first and only transcoded when its first frame
    /// header is plausible.
    pub fn open(&self, transcoder: &Transcoder) -> DecodeResult<WaveFile> {
        match self {
            AudioSource::Wave(path) => WaveFile::open(path),
            AudioSource::Mpeg(path) => {
                mpeg::sniff(path)?;
                let decoded = transcoder.to_wave(path, &self.short_name())?;
                WaveFile::open(&decoded)
            }
        }
    }
}
