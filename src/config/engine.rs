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
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use config::{Config, File};
use duration_string::DurationString;
use serde::Deserialize;
use tracing::info;

use super::error::ConfigError;
use crate::audio::AudioBackend;
use crate::controller::{ControllerContext, DEFAULT_SECTION};
use crate::registers::{registers_for_count, Register};
use crate::resources::{ByteCache, DirectoryCache, FileFetcher, ResourceLoader};
use crate::voice::{Envelope, DEFAULT_VOICE_VOLUME};

/// The default master volume.
pub const DEFAULT_MASTER_VOLUME: f32 = 1.0;

/// The keybed used when no input sections are configured.
pub const DEFAULT_KEYBED: usize = 88;

fn default_master_volume() -> f32 {
    DEFAULT_MASTER_VOLUME
}

fn default_voice_volume() -> f32 {
    DEFAULT_VOICE_VOLUME
}

/// The configuration of the engine.
#[derive(Deserialize, Debug)]
pub struct EngineConfig {
    /// Gain of the master bus.
    #[serde(default = "default_master_volume")]
    master_volume: f32,

    /// The gain voices ramp up to.
    #[serde(default = "default_voice_volume")]
    voice_volume: f32,

    #[serde(default)]
    envelope: EnvelopeConfig,

    /// Persists fetched sample bytes across sessions when set.
    cache_dir: Option<PathBuf>,

    /// The base directory for relative sample paths. Defaults to the
    /// directory of the config file.
    samples_root: Option<PathBuf>,

    /// Named sections of input registers.
    #[serde(default)]
    inputs: BTreeMap<String, InputSection>,

    #[serde(skip)]
    base_path: PathBuf,
}

/// Envelope timings as duration strings, e.g. "20ms".
#[derive(Deserialize, Debug, Default)]
pub struct EnvelopeConfig {
    attack: Option<String>,
    release: Option<String>,
    settle: Option<String>,
}

/// A section of input registers: either a physical keybed or an explicit
/// range of register distances.
#[derive(Deserialize, Debug, Clone)]
pub struct InputSection {
    keybed: Option<usize>,
    registers: Option<RegisterRange>,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct RegisterRange {
    start: i32,
    count: usize,
}

fn parse_duration(value: &Option<String>, default: Duration) -> Result<Duration, ConfigError> {
    value.as_ref().map_or(Ok(default), |duration| {
        Ok(DurationString::from_string(duration.clone())?.into())
    })
}

impl EnvelopeConfig {
    fn to_envelope(&self, volume: f32) -> Result<Envelope, ConfigError> {
        let defaults = Envelope::default();
        Ok(Envelope {
            attack: parse_duration(&self.attack, defaults.attack)?,
            release: parse_duration(&self.release, defaults.release)?,
            settle: parse_duration(&self.settle, defaults.settle)?,
            volume,
        })
    }
}

impl InputSection {
    pub fn keybed(key_count: usize) -> InputSection {
        InputSection {
            keybed: Some(key_count),
            registers: None,
        }
    }

    /// Builds the registers of the section.
    fn build(&self, key: &str, context: &ControllerContext) -> Result<Vec<Register>, ConfigError> {
        match (self.keybed, self.registers) {
            (Some(key_count), None) => Ok(context
                .registers()
                .keybed(key_count)?
                .iter()
                .map(|keybed| keybed.register.clone())
                .collect()),
            (None, Some(range)) => Ok(registers_for_count(range.count, range.start)?),
            _ => Err(ConfigError::InvalidInputSection(key.to_string())),
        }
    }
}

impl EngineConfig {
    /// Parse an engine config from a YAML file.
    pub fn deserialize(path: &Path) -> Result<EngineConfig, ConfigError> {
        let mut config = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<EngineConfig>()?;
        config.base_path = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(config)
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// The voice envelope.
    pub fn envelope(&self) -> Result<Envelope, ConfigError> {
        self.envelope.to_envelope(self.voice_volume)
    }

    pub fn cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir.as_ref().map(|dir| self.base_path.join(dir))
    }

    /// The directory relative sample paths resolve against.
    pub fn samples_root(&self) -> PathBuf {
        match &self.samples_root {
            Some(root) => self.base_path.join(root),
            None => self.base_path.clone(),
        }
    }

    /// The configured input sections, or a single 88-key keybed.
    pub fn inputs(&self) -> BTreeMap<String, InputSection> {
        if self.inputs.is_empty() {
            return BTreeMap::from([(
                DEFAULT_SECTION.to_string(),
                InputSection::keybed(DEFAULT_KEYBED),
            )]);
        }
        self.inputs.clone()
    }

    /// Builds the resource loader: a file fetcher rooted at the samples root,
    /// behind an on-disk cache if one is configured.
    pub fn resource_loader(&self) -> Result<ResourceLoader, ConfigError> {
        let cache = match self.cache_dir() {
            Some(dir) => Some(Arc::new(DirectoryCache::open(&dir)?) as Arc<dyn ByteCache>),
            None => None,
        };
        Ok(ResourceLoader::new(
            Arc::new(FileFetcher::new(&self.samples_root())),
            cache,
        ))
    }

    /// Creates a controller context on `backend` with every input section
    /// registered.
    pub fn build_context(
        &self,
        backend: Arc<dyn AudioBackend>,
    ) -> Result<ControllerContext, ConfigError> {
        let context = ControllerContext::new(
            backend,
            self.resource_loader()?,
            self.envelope()?,
            self.master_volume,
        )?;

        let inputs = self.inputs();
        for (key, section) in &inputs {
            context.register_input_section(key, section.build(key, &context)?);
        }
        info!(sections = inputs.len(), "Engine configured");
        Ok(context)
    }
}
