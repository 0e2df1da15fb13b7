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
use std::path::Path;

use config::{Config, File};
use serde::Deserialize;
use tracing::info;

use super::error::ConfigError;
use crate::controller::{ControllerContext, DEFAULT_SECTION};
use crate::instrument::{Instrument, PitchCorrection};
use crate::samples::{samples_by_frequency, samples_by_index, SampleLibrary};

fn default_section() -> String {
    DEFAULT_SECTION.to_string()
}

/// Describes an instrument and where its samples live.
#[derive(Deserialize, Debug)]
pub struct InstrumentManifest {
    name: String,

    #[serde(default)]
    modes: Vec<String>,

    #[serde(default)]
    pitch_correction: PitchCorrection,

    /// The input section samples are assigned against.
    #[serde(default = "default_section")]
    section: String,

    /// Samples laid out on consecutive registers.
    by_index: Option<IndexedSamples>,

    /// Samples at explicit frequencies.
    #[serde(default)]
    by_frequency: Vec<FrequencySamples>,
}

#[derive(Deserialize, Debug)]
struct IndexedSamples {
    /// The MIDI note number of the first entry.
    start: usize,
    files: Vec<SampleFiles>,
}

/// One pitch's sample, or all of its velocity layers.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum SampleFiles {
    Single(String),
    Layers(Vec<String>),
}

impl SampleFiles {
    fn into_vec(self) -> Vec<String> {
        match self {
            SampleFiles::Single(file) => vec![file],
            SampleFiles::Layers(files) => files,
        }
    }
}

#[derive(Deserialize, Debug)]
struct FrequencySamples {
    frequency: f64,
    files: Vec<String>,
}

impl InstrumentManifest {
    /// Parse an instrument manifest from a YAML file.
    pub fn deserialize(path: &Path) -> Result<InstrumentManifest, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<InstrumentManifest>()?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pitch_correction(&self) -> PitchCorrection {
        self.pitch_correction
    }

    /// Builds the (unloaded) instrument, assigning samples against the
    /// manifest's input section of `context`.
    pub fn build(self, context: &ControllerContext) -> Result<Instrument, ConfigError> {
        let inputs = context.input_section(&self.section)?;
        let mut samples = Vec::new();

        if let Some(indexed) = self.by_index {
            let entries: Vec<Vec<String>> = indexed
                .files
                .into_iter()
                .map(SampleFiles::into_vec)
                .collect();
            samples.extend(samples_by_index(
                &context.registers().indexed(),
                &inputs,
                indexed.start,
                &entries,
            ));
        }

        if !self.by_frequency.is_empty() {
            let entries: Vec<(f64, Vec<String>)> = self
                .by_frequency
                .into_iter()
                .map(|entry| (entry.frequency, entry.files))
                .collect();
            samples.extend(samples_by_frequency(&inputs, &entries));
        }

        if samples.is_empty() {
            return Err(ConfigError::NoSamples(self.name));
        }

        info!(
            instrument = self.name,
            samples = samples.len(),
            section = self.section,
            "Built instrument"
        );
        Ok(
            Instrument::new(&self.name, SampleLibrary::new(samples), self.pitch_correction)
                .with_modes(self.modes),
        )
    }
}
