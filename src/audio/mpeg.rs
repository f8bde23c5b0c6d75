//! MPEG audio frame header sniffing.
//!
//! Only the first frame header is checked; decoding is left to a transcoder.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::error::{DecodeError, DecodeResult, FrameRule};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MpegVersion {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    Layer1,
    Layer2,
    Layer3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelMode {
    Stereo,
    JointStereo,
    DualChannel,
    Mono,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: MpegVersion,
    pub layer: Layer,
    /// A 16-bit CRC follows the header.
    pub crc_protected: bool,
    /// Kilobits per second.
    pub bitrate: u32,
    pub sample_rate: u32,
    pub padding: bool,
    pub channel_mode: ChannelMode,
}

// kbps by bitrate index; index 0 (free format) and 15 (bad) are rejected.
const BITRATES_V1_L1: [u32; 16] = [0, 32, 64, 96, 128, 160, 192, 224, 256, 288, 320, 352, 384, 416, 448, 0];
const BITRATES_V1_L2: [u32; 16] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 0];
const BITRATES_V1_L3: [u32; 16] = [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0];
const BITRATES_V2_L1: [u32; 16] = [0, 32, 48, 56, 64, 80, 96, 112, 128, 144, 160, 176, 192, 224, 256, 0];
const BITRATES_V2_L23: [u32; 16] = [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0];

const SAMPLE_RATES_V1: [u32; 3] = [44_100, 48_000, 32_000];
const SAMPLE_RATES_V2: [u32; 3] = [22_050, 24_000, 16_000];
const SAMPLE_RATES_V25: [u32; 3] = [11_025, 12_000, 8_000];

impl FrameHeader {
    pub fn parse(bytes: [u8; 4]) -> Result<Self, FrameRule> {
        let word = u32::from_be_bytes(bytes);

        if word >> 21 != 0x7FF {
            return Err(FrameRule::FrameSync);
        }

        let version = match (word >> 19) & 0b11 {
            0b00 => MpegVersion::Mpeg25,
            0b10 => MpegVersion::Mpeg2,
            0b11 => MpegVersion::Mpeg1,
            _ => return Err(FrameRule::Version),
        };

        let layer = match (word >> 17) & 0b11 {
            0b01 => Layer::Layer3,
            0b10 => Layer::Layer2,
            0b11 => Layer::Layer1,
            _ => return Err(FrameRule::Layer),
        };

        let crc_protected = (word >> 16) & 1 == 0;

        let bitrate_table = match (version, layer) {
            (MpegVersion::Mpeg1, Layer::Layer1) => &BITRATES_V1_L1,
            (MpegVersion::Mpeg1, Layer::Layer2) => &BITRATES_V1_L2,
            (MpegVersion::Mpeg1, Layer::Layer3) => &BITRATES_V1_L3,
            (_, Layer::Layer1) => &BITRATES_V2_L1,
            (_, _) => &BITRATES_V2_L23,
        };
        let bitrate = bitrate_table[((word >> 12) & 0xF) as usize];
        if bitrate == 0 {
            return Err(FrameRule::Bitrate);
        }

        let rate_index = ((word >> 10) & 0b11) as usize;
        let rates = match version {
            MpegVersion::Mpeg1 => &SAMPLE_RATES_V1,
            MpegVersion::Mpeg2 => &SAMPLE_RATES_V2,
            MpegVersion::Mpeg25 => &SAMPLE_RATES_V25,
        };
        let sample_rate = *rates.get(rate_index).ok_or(FrameRule::SampleRate)?;

        let padding = (word >> 9) & 1 == 1;

        let channel_mode = match (word >> 6) & 0b11 {
            0b00 => ChannelMode::Stereo,
            0b01 => ChannelMode::JointStereo,
            0b10 => ChannelMode::DualChannel,
            _ => ChannelMode::Mono,
        };

        Ok(Self {
            version,
            layer,
            crc_protected,
            bitrate,
            sample_rate,
            padding,
            channel_mode,
        })
    }

    pub fn samples_per_frame(&self) -> u32 {
        match (self.layer, self.version) {
            (Layer::Layer1, _) => 384,
            (Layer::Layer2, _) | (Layer::Layer3, MpegVersion::Mpeg1) => 1152,
            (Layer::Layer3, _) => 576,
        }
    }

    /// Frame length in bytes, header included.
    pub fn frame_length(&self) -> u32 {
        let bits_per_second = self.bitrate * 1000;
        match self.layer {
            Layer::Layer1 => (12 * bits_per_second / self.sample_rate + u32::from(self.padding)) * 4,
            _ => {
                self.samples_per_frame() / 8 * bits_per_second / self.sample_rate
                    + u32::from(self.padding)
            }
        }
    }
}

/// Length of a leading ID3v2 tag, or 0 when there is none.
fn id3v2_len(data: &[u8]) -> usize {
    if data.len() >= 10 && &data[0..3] == b"ID3" {
        // Tag size is a 4-byte syncsafe integer (7 bits per byte)
        let size = ((data[6] as usize & 0x7F) << 21)
            | ((data[7] as usize & 0x7F) << 14)
            | ((data[8] as usize & 0x7F) << 7)
            | (data[9] as usize & 0x7F);
        let footer = if data[5] & 0x10 != 0 { 10 } else { 0 };
        return 10 + size + footer;
    }
    0
}

/// Checks that `path` starts with a plausible MPEG audio frame.
pub fn sniff(path: &Path) -> DecodeResult<FrameHeader> {
    let mut file = File::open(path).map_err(|e| DecodeError::open(path, e))?;

    let mut head = [0u8; 10];
    let read = file
        .by_ref()
        .take(head.len() as u64)
        .read(&mut head)
        .map_err(|e| DecodeError::io(path, e))?;

    let skip = id3v2_len(&head[..read]);
    let mut header = [0u8; 4];
    let filled: std::io::Result<()> = if skip > 0 {
        std::io::copy(&mut file.by_ref().take((skip - read) as u64), &mut std::io::sink())
            .map_err(|e| DecodeError::io(path, e))?;
        file.read_exact(&mut header)
    } else if read >= header.len() {
        header.copy_from_slice(&head[..4]);
        Ok(())
    } else {
        Err(std::io::ErrorKind::UnexpectedEof.into())
    };
    filled.map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => DecodeError::InvalidFrame {
            file: path.to_path_buf(),
            rule: FrameRule::TooShort,
        },
        _ => DecodeError::io(path, e),
    })?;

    let frame = FrameHeader::parse(header).map_err(|rule| DecodeError::InvalidFrame {
        file: path.to_path_buf(),
        rule,
    })?;

    log::debug!(
        "{}: {:?} {:?} {:?}, {} kbps, {} Hz, crc={}, frame {} bytes",
        path.display(),
        frame.version,
        frame.layer,
        frame.channel_mode,
        frame.bitrate,
        frame.sample_rate,
        frame.crc_protected,
        frame.frame_length()
    );

    Ok(frame)
}
