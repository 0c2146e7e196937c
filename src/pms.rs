//! Plantower PMSA003 serial frame codec.
//!
//! In active mode the sensor streams 32-byte frames at 9600 baud:
//!
//! | bytes  | content                                             |
//! |--------|-----------------------------------------------------|
//! | 0..2   | start characters `0x42 0x4d`                        |
//! | 2..4   | frame length, always 28 (2 × 13 data words + checksum) |
//! | 4..10  | PM1.0 / PM2.5 / PM10 at CF=1, µg/m³                 |
//! | 10..16 | PM1.0 / PM2.5 / PM10 under atmospheric environment  |
//! | 16..28 | particles > 0.3 / 0.5 / 1.0 / 2.5 / 5.0 / 10 µm per 0.1 L |
//! | 28..30 | reserved                                            |
//! | 30..32 | checksum: sum of bytes 0..30                        |
//!
//! All words are big-endian.

use anyhow::{Context as _, Result, bail};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::measurement::PmSample;

pub const FRAME_LEN: usize = 32;

const START_1: u8 = 0x42;
const START_2: u8 = 0x4d;

const PAYLOAD_LEN: u16 = 28;

fn word(frame: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([frame[offset], frame[offset + 1]])
}

pub fn decode_frame(frame: &[u8]) -> Result<PmSample> {
    if frame.len() < FRAME_LEN {
        bail!(
            "PMSA003 frame too short: expected {FRAME_LEN} bytes, got {}",
            frame.len()
        )
    }

    if frame[0] != START_1 || frame[1] != START_2 {
        bail!(
            "PMSA003 frame has bad start characters: 0x{:02x} 0x{:02x}",
            frame[0],
            frame[1]
        )
    }

    let length = word(frame, 2);
    if length != PAYLOAD_LEN {
        bail!("PMSA003 frame length mismatch: expected {PAYLOAD_LEN}, got {length}")
    }

    let expected = word(frame, 30);
    let actual = frame[..30]
        .iter()
        .fold(0u16, |sum, &b| sum.wrapping_add(b.into()));
    if expected != actual {
        bail!("PMSA003 checksum mismatch: frame says 0x{expected:04x}, computed 0x{actual:04x}")
    }

    Ok(PmSample {
        pm10_cf1: word(frame, 4),
        pm25_cf1: word(frame, 6),
        pm100_cf1: word(frame, 8),
        pm10_std: word(frame, 10),
        pm25_std: word(frame, 12),
        pm100_std: word(frame, 14),
        gr03um: word(frame, 16),
        gr05um: word(frame, 18),
        gr10um: word(frame, 20),
        gr25um: word(frame, 22),
        gr50um: word(frame, 24),
        gr100um: word(frame, 26),
    })
}

/// Pulls frames out of a byte stream, resynchronising on the start
/// characters after garbage or a partial frame.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Reads up to the next frame that decodes. Frames failing validation
    /// are logged and skipped; I/O errors (including end of stream) are
    /// returned.
    pub async fn next_sample(&mut self) -> Result<PmSample> {
        loop {
            let frame = self.next_frame().await?;
            match decode_frame(&frame) {
                Ok(sample) => return Ok(sample),
                Err(e) => tracing::debug!(error = %e, "Skipping PMSA003 frame"),
            }
        }
    }

    async fn next_frame(&mut self) -> Result<[u8; FRAME_LEN]> {
        let mut frame = [0u8; FRAME_LEN];

        let mut prev = self.read_byte().await?;
        loop {
            let b = self.read_byte().await?;
            if prev == START_1 && b == START_2 {
                break;
            }
            prev = b;
        }

        frame[0] = START_1;
        frame[1] = START_2;
        self.inner
            .read_exact(&mut frame[2..])
            .await
            .context("failed to read PMSA003 frame body")?;

        Ok(frame)
    }

    async fn read_byte(&mut self) -> Result<u8> {
        self.inner
            .read_u8()
            .await
            .context("failed to read from PMSA003 serial stream")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(words: [u16; 13]) -> Vec<u8> {
        let mut f = vec![START_1, START_2];
        f.extend_from_slice(&PAYLOAD_LEN.to_be_bytes());
        for w in words {
            f.extend_from_slice(&w.to_be_bytes());
        }
        let sum = f.iter().fold(0u16, |s, &b| s.wrapping_add(b.into()));
        f.extend_from_slice(&sum.to_be_bytes());
        f
    }

    const WORDS: [u16; 13] = [3, 5, 6, 3, 5, 6, 780, 230, 40, 4, 1, 0, 0];

    #[test]
    fn decodes_valid_frame() {
        let sample = decode_frame(&frame(WORDS)).unwrap();
        assert_eq!(sample.pm25_cf1, 5);
        assert_eq!(sample.pm100_std, 6);
        assert_eq!(sample.gr03um, 780);
        assert_eq!(sample.gr50um, 1);
        assert_eq!(sample.gr100um, 0);
    }

    #[test]
    fn rejects_corrupted_frames() {
        let mut bad_checksum = frame(WORDS);
        bad_checksum[6] ^= 0x01;
        let err = decode_frame(&bad_checksum).unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));

        let mut bad_start = frame(WORDS);
        bad_start[0] = 0x00;
        assert!(decode_frame(&bad_start).is_err());

        assert!(decode_frame(&frame(WORDS)[..20]).is_err());
    }

    #[tokio::test]
    async fn reader_resyncs_and_skips_bad_frames() {
        let mut stream = vec![0x00, 0x42, 0x13, 0x4d];
        let mut corrupt = frame(WORDS);
        corrupt[31] ^= 0xff;
        stream.extend(corrupt);
        let mut second = WORDS;
        second[1] = 42;
        stream.extend(frame(second));

        let mut reader = FrameReader::new(stream.as_slice());
        let sample = reader.next_sample().await.unwrap();
        assert_eq!(sample.pm25_cf1, 42);

        // end of stream
        assert!(reader.next_sample().await.is_err());
    }
}
