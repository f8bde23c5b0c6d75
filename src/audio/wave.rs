//! Canonical PCM WAVE decoding.
//!
//! The header is validated in a single pass when the file is opened. Samples
//! are read in a separate pass that rewinds to the data chunk, so no read
//! position survives between calls.

use std::cell::OnceCell;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use super::error::{DecodeError, DecodeResult, HeaderRule};

const RIFF_ID: u64 = 0x4646_4952; // "RIFF"
const WAVE_ID: u64 = 0x4556_4157; // "WAVE"
const FMT_ID: u64 = 0x2074_6d66; // "fmt "
const DATA_ID: u64 = 0x6174_6164; // "data"

const WAVE_FORMAT_PCM: u64 = 1;
const SUPPORTED_CHANNELS: [u64; 2] = [1, 2];
const SUPPORTED_SAMPLE_RATES: [u64; 4] = [11_025, 22_050, 44_100, 48_000];
const SUPPORTED_BITS_PER_SAMPLE: [u64; 2] = [8, 16];

/// 2^16, the divisor applied to every raw 16-bit sample.
const SAMPLE_SCALE: f32 = 65_536.0;

/// Little-endian value of `len` bytes starting at `offset`.
///
/// A window that runs past the end of `bytes` yields 0 instead of failing.
pub fn little_endian(bytes: &[u8], offset: usize, len: usize) -> u64 {
    match offset.checked_add(len) {
        Some(end) if end <= bytes.len() => bytes[offset..end]
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, &b)| acc | (u64::from(b) << (8 * i))),
        _ => 0,
    }
}

/// Validated description of a PCM WAVE stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AudioStream {
    channel_count: u16,
    sample_rate_hz: u32,
    bits_per_sample: u16,
    data_byte_length: u64,
    samples_per_channel: u64,
}

impl AudioStream {
    fn new(channel_count: u16, sample_rate_hz: u32, bits_per_sample: u16, data_byte_length: u64) -> Self {
        let bytes_per_sample = u64::from(bits_per_sample / 8);
        let channels = u64::from(channel_count);
        let bytes_per_frame = bytes_per_sample * channels;
        let samples_per_frame = bytes_per_frame / bytes_per_sample;
        let frame_count = data_byte_length / bytes_per_frame;
        let samples_per_channel = frame_count * samples_per_frame / channels;

        Self {
            channel_count,
            sample_rate_hz,
            bits_per_sample,
            data_byte_length,
            samples_per_channel,
        }
    }

    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    pub fn data_byte_length(&self) -> u64 {
        self.data_byte_length
    }

    pub fn samples_per_channel(&self) -> u64 {
        self.samples_per_channel
    }

    pub fn bytes_per_sample(&self) -> u64 {
        u64::from(self.bits_per_sample / 8)
    }

    #[allow(dead_code)]
    pub fn bytes_per_frame(&self) -> u64 {
        self.bytes_per_sample() * u64::from(self.channel_count)
    }

    /// Bytes skipped after each 2-byte sample read.
    fn sample_skip(&self) -> usize {
        (2 * u64::from(self.channel_count) / self.bytes_per_sample()) as usize
    }
}

/// Result of the header pass: the stream plus where its data chunk begins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaveHeader {
    pub stream: AudioStream,
    pub data_offset: u64,
}

/// Reads up to `buf.len()` bytes, stopping early only at end of input.
fn read_window<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

struct HeaderReader<'a, R> {
    reader: R,
    file: &'a Path,
}

impl<R: Read + Seek> HeaderReader<'_, R> {
    fn field(&mut self, len: usize) -> DecodeResult<u64> {
        let mut buf = [0u8; 4];
        let filled = read_window(&mut self.reader, &mut buf[..len])
            .map_err(|e| DecodeError::io(self.file, e))?;
        Ok(little_endian(&buf[..filled], 0, len))
    }

    fn skip(&mut self, len: i64) -> DecodeResult<()> {
        self.reader
            .seek(SeekFrom::Current(len))
            .map(|_| ())
            .map_err(|e| DecodeError::io(self.file, e))
    }

    fn expect_tag(&mut self, tag: u64, rule: HeaderRule) -> DecodeResult<()> {
        if self.field(4)? != tag {
            return Err(DecodeError::Format {
                file: self.file.to_path_buf(),
                rule,
            });
        }
        Ok(())
    }

    fn expect_one_of(&mut self, len: usize, allowed: &[u64], rule: HeaderRule) -> DecodeResult<u64> {
        let value = self.field(len)?;
        if !allowed.contains(&value) {
            return Err(DecodeError::UnsupportedEncoding {
                file: self.file.to_path_buf(),
                rule,
                found: value,
            });
        }
        Ok(value)
    }
}

/// Validates a WAVE header, stopping at the first violated rule.
///
/// `file` is only used to label errors.
pub fn read_header<R: Read + Seek>(reader: R, file: &Path) -> DecodeResult<WaveHeader> {
    let mut header = HeaderReader { reader, file };

    header.expect_tag(RIFF_ID, HeaderRule::Riff)?;
    header.skip(4)?;
    header.expect_tag(WAVE_ID, HeaderRule::Wave)?;
    header.expect_tag(FMT_ID, HeaderRule::FmtChunk)?;
    header.skip(4)?;
    header.expect_one_of(2, &[WAVE_FORMAT_PCM], HeaderRule::AudioFormat)?;
    let channels = header.expect_one_of(2, &SUPPORTED_CHANNELS, HeaderRule::Channels)?;
    let sample_rate = header.expect_one_of(4, &SUPPORTED_SAMPLE_RATES, HeaderRule::SampleRate)?;
    header.skip(6)?;
    let bits = header.expect_one_of(2, &SUPPORTED_BITS_PER_SAMPLE, HeaderRule::BitsPerSample)?;
    header.expect_tag(DATA_ID, HeaderRule::DataChunk)?;
    let data_byte_length = header.field(4)?;

    let data_offset = header
        .reader
        .stream_position()
        .map_err(|e| DecodeError::io(file, e))?;

    // The whitelists above bound every value well inside the target widths.
    let stream = AudioStream::new(channels as u16, sample_rate as u32, bits as u16, data_byte_length);

    Ok(WaveHeader { stream, data_offset })
}

/// Reads `samples_per_channel` normalized samples starting at `data_offset`.
///
/// Each sample is the unsigned little-endian 16-bit value over 2^16; the sign
/// bit is not interpreted.
pub fn read_samples<R: Read + Seek>(
    mut reader: R,
    header: &WaveHeader,
    file: &Path,
) -> DecodeResult<Vec<f32>> {
    reader
        .seek(SeekFrom::Start(header.data_offset))
        .map_err(|e| DecodeError::io(file, e))?;

    let count = header.stream.samples_per_channel();
    let skip = header.stream.sample_skip();
    // The declared length is untrusted; let the vector grow past this.
    let mut samples = Vec::with_capacity(count.min(1 << 20) as usize);
    let mut buf = [0u8; 2];
    let mut rest = [0u8; 4];

    for _ in 0..count {
        let filled = read_window(&mut reader, &mut buf).map_err(|e| DecodeError::io(file, e))?;
        samples.push(little_endian(&buf[..filled], 0, 2) as f32 / SAMPLE_SCALE);
        read_window(&mut reader, &mut rest[..skip]).map_err(|e| DecodeError::io(file, e))?;
    }

    Ok(samples)
}

/// An opened, header-validated WAVE file.
///
/// The file handle is held until the value is dropped.
pub struct WaveFile {
    path: PathBuf,
    file: File,
    header: WaveHeader,
    samples: OnceCell<Vec<f32>>,
}

impl WaveFile {
    pub fn open(path: &Path) -> DecodeResult<Self> {
        let file = File::open(path).map_err(|e| DecodeError::open(path, e))?;
        let header = read_header(BufReader::new(&file), path)?;

        log::debug!(
            "{}: {} ch, {} Hz, {} bit, {} data bytes",
            path.display(),
            header.stream.channel_count(),
            header.stream.sample_rate_hz(),
            header.stream.bits_per_sample(),
            header.stream.data_byte_length()
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            header,
            samples: OnceCell::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stream(&self) -> &AudioStream {
        &self.header.stream
    }

    /// Samples of the first channel, read on first call and cached.
    pub fn samples(&self) -> DecodeResult<&[f32]> {
        if let Some(samples) = self.samples.get() {
            return Ok(samples);
        }
        let samples = read_samples(BufReader::new(&self.file), &self.header, &self.path)?;
        Ok(self.samples.get_or_init(|| samples))
    }
}
