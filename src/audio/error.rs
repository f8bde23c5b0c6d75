use std::fmt;
use std::path::{Path, PathBuf};

/// WAVE header expectations, in the order the decoder checks them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeaderRule {
    Riff,
    Wave,
    FmtChunk,
    AudioFormat,
    Channels,
    SampleRate,
    BitsPerSample,
    DataChunk,
}

impl fmt::Display for HeaderRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            HeaderRule::Riff => "The file should be in RIFF format",
            HeaderRule::Wave => "The file should be in WAVE format",
            HeaderRule::FmtChunk => "The chunk should be of type fmt",
            HeaderRule::AudioFormat => "The audio format should be linear PCM (1)",
            HeaderRule::Channels => "The audio should have 1 or 2 channels",
            HeaderRule::SampleRate => {
                "The sampling rate should be one of 11025, 22050, 44100 or 48000 Hz"
            }
            HeaderRule::BitsPerSample => "There should be 8 or 16 bits/sample",
            HeaderRule::DataChunk => "There should be a proper data chunk",
        };
        f.write_str(text)
    }
}

/// MPEG frame header expectations checked by the sniffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameRule {
    TooShort,
    FrameSync,
    Version,
    Layer,
    Bitrate,
    SampleRate,
}

impl fmt::Display for FrameRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FrameRule::TooShort => "The file is too short to hold an MPEG frame header",
            FrameRule::FrameSync => "Invalid frame sync in the MPEG header",
            FrameRule::Version => "MPEG version is reserved",
            FrameRule::Layer => "MPEG layer is reserved",
            FrameRule::Bitrate => "Bit rate is invalid",
            FrameRule::SampleRate => "Sampling rate is invalid",
        };
        f.write_str(text)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("{}: File not found", .file.display())]
    NotFound {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {rule}", .file.display())]
    Format { file: PathBuf, rule: HeaderRule },

    #[error("{}: {rule}, found {found}", .file.display())]
    UnsupportedEncoding {
        file: PathBuf,
        rule: HeaderRule,
        found: u64,
    },

    #[error("{}: I/O error", .file.display())]
    Io {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {rule}", .file.display())]
    InvalidFrame { file: PathBuf, rule: FrameRule },

    #[error("{}: Unsupported file type (expected .wav or .mp3)", .file.display())]
    UnsupportedFile { file: PathBuf },

    #[error("{}: Transcoding failed: {message}", .file.display())]
    Transcode { file: PathBuf, message: String },
}

impl DecodeError {
    pub(crate) fn io(file: &Path, source: std::io::Error) -> Self {
        DecodeError::Io {
            file: file.to_path_buf(),
            source,
        }
    }

    /// Maps a failed open to `NotFound` when the path cannot be read at all.
    pub(crate) fn open(file: &Path, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                DecodeError::NotFound {
                    file: file.to_path_buf(),
                    source,
                }
            }
            _ => DecodeError::io(file, source),
        }
    }

    /// The header rule behind a WAVE rejection, if any.
    #[allow(dead_code)]
    pub fn header_rule(&self) -> Option<HeaderRule> {
        match self {
            DecodeError::Format { rule, .. } | DecodeError::UnsupportedEncoding { rule, .. } => {
                Some(*rule)
            }
            _ => None,
        }
    }
}

pub type DecodeResult<T> = Result<T, DecodeError>;
