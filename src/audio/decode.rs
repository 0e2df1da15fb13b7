// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, warn};

use super::AudioError;

/// Audio decoded entirely into memory as interleaved f32 samples.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedAudio {
    channels: u16,
    sample_rate: u32,
    samples: Vec<f32>,
}

impl DecodedAudio {
    pub fn new(channels: u16, sample_rate: u32, samples: Vec<f32>) -> DecodedAudio {
        DecodedAudio {
            channels,
            sample_rate,
            samples,
        }
    }

    pub fn channel_count(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The interleaved samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.samples.len() * std::mem::size_of::<f32>()
    }
}

/// Reads the next packet. Returns `Ok(None)` at end of stream; ResetRequired
/// is propagated so the caller can reset its decoder.
fn read_next_packet(format_reader: &mut dyn FormatReader) -> Result<Option<Packet>, AudioError> {
    match format_reader.next_packet() {
        Ok(packet) => Ok(Some(packet)),
        Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Ok(None)
        }
        Err(e) => Err(AudioError::Decode(e)),
    }
}

/// Decodes an encoded audio file (WAV, FLAC, MP3, ...) held in memory.
pub fn decode_audio(bytes: Arc<[u8]>) -> Result<DecodedAudio, AudioError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let probed = get_probe().format(
        &Hint::new(),
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(AudioError::NoAudioTrack)?;
    let track_id = track.id;
    let mut sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(AudioError::MissingSampleRate)?;
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    let mut decoder = get_codecs().make(&track.codec_params, &DecoderOptions::default())?;
    let mut samples = Vec::new();

    loop {
        let packet = match read_next_packet(format_reader.as_mut()) {
            Ok(Some(packet)) => packet,
            Ok(None) => break,
            Err(AudioError::Decode(SymphoniaError::ResetRequired)) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                // A corrupt packet is skipped rather than failing the whole file.
                warn!(error = e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        channels = spec.channels.count() as u16;
        sample_rate = spec.rate;

        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buffer.samples());
    }

    let decoded = DecodedAudio::new(channels, sample_rate, samples);
    debug!(
        channels,
        sample_rate,
        frames = decoded.frames(),
        "Decoded audio"
    );
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::wav_bytes;

    #[test]
    fn test_decode_mono_wav() {
        let bytes = wav_bytes(&[vec![0.0, 0.5, -0.5, 1.0]], 44100);
        let decoded = decode_audio(bytes).unwrap();

        assert_eq!(decoded.channel_count(), 1);
        assert_eq!(decoded.sample_rate(), 44100);
        assert_eq!(decoded.frames(), 4);
        assert!((decoded.samples()[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_decode_stereo_interleaves() {
        let bytes = wav_bytes(&[vec![1.0, 1.0, 1.0], vec![-1.0, -1.0, -1.0]], 48000);
        let decoded = decode_audio(bytes).unwrap();

        assert_eq!(decoded.channel_count(), 2);
        assert_eq!(decoded.frames(), 3);
        assert_eq!(&decoded.samples()[..4], &[1.0, -1.0, 1.0, -1.0]);
        assert_eq!(decoded.memory_size(), 6 * 4);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let bytes: Arc<[u8]> = Arc::from(&b"definitely not audio"[..]);
        assert!(decode_audio(bytes).is_err());
    }
}
