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
use std::f32::consts::PI;
use std::io::Cursor;
use std::sync::Arc;

use hound::{SampleFormat, WavSpec, WavWriter};

const WAV_SPEC_BITS: u16 = 32;

fn spec(channels: usize, sample_rate: u32) -> WavSpec {
    assert!(channels <= u16::MAX.into(), "Too many channels!");
    WavSpec {
        channels: channels as u16,
        sample_rate,
        bits_per_sample: WAV_SPEC_BITS,
        sample_format: SampleFormat::Float,
    }
}

fn write_interleaved<W: std::io::Write + std::io::Seek>(
    writer: &mut WavWriter<W>,
    channels: &[Vec<f32>],
) -> Result<(), hound::Error> {
    let frames = channels.iter().map(Vec::len).max().unwrap_or(0);
    for frame in 0..frames {
        for channel in channels {
            writer.write_sample(channel.get(frame).copied().unwrap_or(0.0))?;
        }
    }
    Ok(())
}

/// Encodes per-channel float samples as an in-memory WAV file.
pub fn wav_bytes(channels: &[Vec<f32>], sample_rate: u32) -> Arc<[u8]> {
    let mut bytes = Vec::new();
    {
        let mut writer = WavWriter::new(Cursor::new(&mut bytes), spec(channels.len(), sample_rate))
            .expect("wav writer");
        write_interleaved(&mut writer, channels).expect("wav samples");
        writer.finalize().expect("wav finalize");
    }
    bytes.into()
}

/// A mono sine tone.
pub fn sine(frequency: f32, sample_rate: u32, frames: usize) -> Vec<f32> {
    (0..frames)
        .map(|i| 0.5 * (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin())
        .collect()
}
