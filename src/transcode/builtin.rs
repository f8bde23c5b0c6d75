use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::audio::error::{DecodeError, DecodeResult};

/// Interleaved 16-bit PCM decoded in process.
pub struct Pcm16 {
    pub samples: Vec<i16>,
    pub channels: u16,
    pub sample_rate: u32,
}

/// Layout of every companion file, matching the ffmpeg backend's `-ar`/`-ac`.
pub const TARGET_RATE: u32 = 44_100;
pub const TARGET_CHANNELS: u16 = 2;

fn failed(source: &Path, message: impl Into<String>) -> DecodeError {
    DecodeError::Transcode {
        file: source.to_path_buf(),
        message: message.into(),
    }
}

/// Splits interleaved i16 into one f32 plane per output channel.
///
/// Mono is duplicated into both planes; channels past the second are dropped.
fn stereo_planes(pcm: &Pcm16) -> Vec<Vec<f32>> {
    let channels = usize::from(pcm.channels.max(1));
    let frames = pcm.samples.len() / channels;
    let mut planes = vec![Vec::with_capacity(frames); usize::from(TARGET_CHANNELS)];
    for frame in pcm.samples.chunks_exact(channels) {
        let left = frame[0];
        let right = if channels > 1 { frame[1] } else { left };
        planes[0].push(f32::from(left) / 32_768.0);
        planes[1].push(f32::from(right) / 32_768.0);
    }
    planes
}

fn resample(planes: Vec<Vec<f32>>, from_rate: u32, source: &Path) -> DecodeResult<Vec<Vec<f32>>> {
    use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};

    let frames = planes.first().map_or(0, Vec::len);
    if from_rate == TARGET_RATE || frames == 0 {
        return Ok(planes);
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let ratio = f64::from(TARGET_RATE) / f64::from(from_rate);
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, frames, planes.len())
        .map_err(|e| failed(source, format!("Failed to create resampler: {}", e)))?;

    resampler
        .process(&planes, None)
        .map_err(|e| failed(source, format!("Resampling failed: {}", e)))
}

/// Re-lays `pcm` out as 44.1 kHz stereo so the WAVE reader accepts it and
/// sees the same frame layout whichever backend produced it.
pub fn canonicalize(pcm: Pcm16, source: &Path) -> DecodeResult<Pcm16> {
    if pcm.channels == TARGET_CHANNELS && pcm.sample_rate == TARGET_RATE {
        return Ok(pcm);
    }

    let planes = resample(stereo_planes(&pcm), pcm.sample_rate, source)?;
    let frames = planes.iter().map(Vec::len).min().unwrap_or(0);
    let mut samples = Vec::with_capacity(frames * usize::from(TARGET_CHANNELS));
    for i in 0..frames {
        for plane in &planes {
            samples.push((plane[i] * 32_768.0).round().clamp(-32_768.0, 32_767.0) as i16);
        }
    }

    log::debug!(
        "{}: {} ch @ {}Hz -> {} ch @ {}Hz",
        source.display(),
        pcm.channels,
        pcm.sample_rate,
        TARGET_CHANNELS,
        TARGET_RATE
    );

    Ok(Pcm16 {
        samples,
        channels: TARGET_CHANNELS,
        sample_rate: TARGET_RATE,
    })
}

pub fn decode_pcm16(source: &Path) -> DecodeResult<Pcm16> {
    let file = File::open(source).map_err(|e| DecodeError::open(source, e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = source.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| failed(source, format!("Failed to probe audio format: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| failed(source, "No audio tracks found"))?;

    let track_id = track.id;
    let channels = track.codec_params.channels.map_or(1, |c| c.count());
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| failed(source, "Unknown sample rate"))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| failed(source, format!("Failed to create audio decoder: {}", e)))?;

    let mut samples: Vec<i16> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(failed(source, e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(failed(source, e.to_string())),
        };

        let spec = *decoded.spec();
        let mut sample_buf = SampleBuffer::<i16>::new(decoded.frames() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(sample_buf.samples());
    }

    log::info!(
        "Decoded {}: {} samples, {} ch, {}Hz",
        source.display(),
        samples.len(),
        channels,
        sample_rate
    );

    Ok(Pcm16 {
        samples,
        channels: channels as u16,
        sample_rate,
    })
}

/// Writes a canonical 44-byte-header PCM WAVE.
pub fn write_wave<W: Write>(mut out: W, pcm: &Pcm16) -> std::io::Result<()> {
    let data_len = (pcm.samples.len() * 2) as u32;
    let block_align = pcm.channels * 2;

    out.write_all(b"RIFF")?;
    out.write_all(&(36 + data_len).to_le_bytes())?;
    out.write_all(b"WAVE")?;
    out.write_all(b"fmt ")?;
    out.write_all(&16u32.to_le_bytes())?;
    out.write_all(&1u16.to_le_bytes())?;
    out.write_all(&pcm.channels.to_le_bytes())?;
    out.write_all(&pcm.sample_rate.to_le_bytes())?;
    out.write_all(&(pcm.sample_rate * u32::from(block_align)).to_le_bytes())?;
    out.write_all(&block_align.to_le_bytes())?;
    out.write_all(&16u16.to_le_bytes())?;
    out.write_all(b"data")?;
    out.write_all(&data_len.to_le_bytes())?;
    for sample in &pcm.samples {
        out.write_all(&sample.to_le_bytes())?;
    }
    out.flush()
}

pub fn decode_to_wave(source: &Path, dest: &Path) -> DecodeResult<()> {
    let pcm = canonicalize(decode_pcm16(source)?, source)?;
    let file = File::create(dest).map_err(|e| DecodeError::io(dest, e))?;
    write_wave(BufWriter::new(file), &pcm).map_err(|e| DecodeError::io(dest, e))?;
    log::info!("Wrote {}", dest.display());
    Ok(())
}
