//! On-disk multi-RPM sample bank: a little-endian, 16-bit-word framed blob
//! produced by [`crate::recorder`] and consumed by [`crate::player`].
//!
//! Layout (all words little-endian `u16`):
//! `magic(2) | version(2) | pcm_byte_size(2) | sample_count(2) |
//!  padding_frames(2) | descriptor* | padding frames(zero) | pcm16 stereo`
//!
//! Each descriptor is three `u32`s (six words): `rpm` (IEEE-754 bits),
//! `start_frame`, `end_frame`.

use thiserror::Error;

pub const MAGIC_LOW: u16 = 0x5555;
pub const MAGIC_HIGH: u16 = 0xAAAA;
pub const VERSION: u32 = 0;

const HEADER_WORDS: usize = 10; // magic(2) + version(2) + pcm_byte_size(2) + sample_count(2) + padding_frames(2)
const DESCRIPTOR_WORDS: usize = 6;

#[derive(Debug, Error, PartialEq)]
pub enum BankParseError {
    #[error("invalid identifier")]
    BadMagic,
    #[error("invalid version")]
    UnsupportedVersion,
    #[error("too small")]
    TooSmall,
    #[error("unsupported pcm format")]
    UnsupportedFormat,
}

/// One segment of the sweep: the `[start_frame, end_frame)` range in the
/// PCM payload sampled at `rpm`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Descriptor {
    pub rpm: f32,
    pub start_frame: u32,
    pub end_frame: u32,
}

impl Descriptor {
    pub fn len(&self) -> u32 {
        self.end_frame - self.start_frame
    }

    pub fn is_empty(&self) -> bool {
        self.end_frame <= self.start_frame
    }
}

/// A parsed bank: rpm-ordered descriptors plus the interleaved stereo PCM16
/// payload they index into.
#[derive(Debug, Clone)]
pub struct Bank {
    pub padding_frames: u32,
    pub descriptors: Vec<Descriptor>,
    /// interleaved stereo, i.e. `pcm[2*frame + channel]`
    pub pcm: Vec<i16>,
}

fn read_u32(words: &[u16], idx: usize) -> u32 {
    (words[idx] as u32) | ((words[idx + 1] as u32) << 16)
}

fn write_u32(out: &mut Vec<u16>, value: u32) {
    out.push((value & 0xFFFF) as u16);
    out.push((value >> 16) as u16);
}

impl Bank {
    /// parses a baked bank blob, validating the header and total length
    pub fn parse(bytes: &[u8]) -> Result<Bank, BankParseError> {
        if bytes.len() <= 4 {
            return Err(BankParseError::TooSmall);
        }
        if bytes.len() % 2 != 0 {
            return Err(BankParseError::UnsupportedFormat);
        }

        let words: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();

        if words.len() < HEADER_WORDS {
            return Err(BankParseError::TooSmall);
        }

        if words[0] != MAGIC_LOW || words[1] != MAGIC_HIGH {
            return Err(BankParseError::BadMagic);
        }

        let version = read_u32(&words, 2);
        if version != VERSION {
            return Err(BankParseError::UnsupportedVersion);
        }

        let pcm_byte_size = read_u32(&words, 4) as usize;
        let sample_count = read_u32(&words, 6) as usize;
        let padding_frames = read_u32(&words, 8);

        let descriptors_end = HEADER_WORDS + sample_count * DESCRIPTOR_WORDS;
        if words.len() < descriptors_end {
            return Err(BankParseError::TooSmall);
        }

        let mut descriptors = Vec::with_capacity(sample_count);
        for i in 0..sample_count {
            let base = HEADER_WORDS + i * DESCRIPTOR_WORDS;
            let rpm = f32::from_bits(read_u32(&words, base));
            let start_frame = read_u32(&words, base + 2);
            let end_frame = read_u32(&words, base + 4);
            descriptors.push(Descriptor {
                rpm,
                start_frame,
                end_frame,
            });
        }

        if pcm_byte_size % 4 != 0 {
            return Err(BankParseError::UnsupportedFormat);
        }
        let pcm_words = pcm_byte_size / 2;
        if words.len() < descriptors_end + pcm_words {
            return Err(BankParseError::TooSmall);
        }

        let pcm: Vec<i16> = words[descriptors_end..descriptors_end + pcm_words]
            .iter()
            .map(|w| *w as i16)
            .collect();

        Ok(Bank {
            padding_frames,
            descriptors,
            pcm,
        })
    }

    /// serializes back into the exact on-disk layout `parse` accepts
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut words = Vec::with_capacity(
            HEADER_WORDS + self.descriptors.len() * DESCRIPTOR_WORDS + self.pcm.len(),
        );

        words.push(MAGIC_LOW);
        words.push(MAGIC_HIGH);
        write_u32(&mut words, VERSION);
        write_u32(&mut words, (self.pcm.len() * 2) as u32);
        write_u32(&mut words, self.descriptors.len() as u32);
        write_u32(&mut words, self.padding_frames);

        for d in &self.descriptors {
            write_u32(&mut words, d.rpm.to_bits());
            write_u32(&mut words, d.start_frame);
            write_u32(&mut words, d.end_frame);
        }

        words.extend(self.pcm.iter().map(|s| *s as u16));

        let mut bytes = Vec::with_capacity(words.len() * 2);
        for w in words {
            bytes.extend_from_slice(&w.to_le_bytes());
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bank() -> Bank {
        Bank {
            padding_frames: 2,
            descriptors: vec![
                Descriptor {
                    rpm: 1000.0,
                    start_frame: 0,
                    end_frame: 4,
                },
                Descriptor {
                    rpm: 2000.0,
                    start_frame: 4,
                    end_frame: 8,
                },
            ],
            pcm: (0..16).map(|i| i * 100).collect(),
        }
    }

    #[test]
    fn round_trips_through_bytes() {
        let bank = sample_bank();
        let bytes = bank.to_bytes();
        let parsed = Bank::parse(&bytes).unwrap();
        assert_eq!(parsed.padding_frames, bank.padding_frames);
        assert_eq!(parsed.descriptors, bank.descriptors);
        assert_eq!(parsed.pcm, bank.pcm);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = sample_bank().to_bytes();
        bytes[0] = 0x00;
        assert_eq!(Bank::parse(&bytes).unwrap_err(), BankParseError::BadMagic);
    }

    #[test]
    fn rejects_truncated_header() {
        let bytes = vec![0x55, 0x55, 0xAA];
        assert_eq!(Bank::parse(&bytes).unwrap_err(), BankParseError::TooSmall);
    }

    #[test]
    fn rejects_truncated_body() {
        let mut bytes = sample_bank().to_bytes();
        bytes.truncate(bytes.len() - 4);
        assert_eq!(Bank::parse(&bytes).unwrap_err(), BankParseError::TooSmall);
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut bytes = sample_bank().to_bytes();
        bytes[4] = 1; // low byte of the version's first word
        assert_eq!(
            Bank::parse(&bytes).unwrap_err(),
            BankParseError::UnsupportedVersion
        );
    }
}
