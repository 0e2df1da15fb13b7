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

//! The process-wide engine state shared by every instrument.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::audio::{AudioBackend, AudioError, Automation, GainHandle};
use crate::instrument::{Instrument, InstrumentError};
use crate::note::Note;
use crate::registers::{find_register, Register, RegisterCache, RegisterError};
use crate::registry::ActiveVoiceRegistry;
use crate::resources::ResourceLoader;
use crate::voice::{Envelope, ReleaseOutcome, ReleaseScheduler};

/// The input section used when none is named.
pub const DEFAULT_SECTION: &str = "main";

/// Owns the audio backend, the master bus and everything voices share.
pub struct ControllerContext {
    backend: Arc<dyn AudioBackend>,
    master: GainHandle,
    registry: ActiveVoiceRegistry,
    releases: ReleaseScheduler,
    registers: RegisterCache,
    inputs: RwLock<HashMap<String, Arc<[Register]>>>,
    resources: ResourceLoader,
    envelope: Envelope,
}

impl ControllerContext {
    /// Creates the context and connects a master gain at `master_volume` to
    /// the backend's destination.
    pub fn new(
        backend: Arc<dyn AudioBackend>,
        resources: ResourceLoader,
        envelope: Envelope,
        master_volume: f32,
    ) -> Result<ControllerContext, AudioError> {
        let master = backend.create_gain()?;
        backend.schedule_gain(
            master,
            &[Automation::SetValue {
                value: master_volume,
                at: backend.current_time(),
            }],
        )?;
        backend.connect(master.node(), backend.destination())?;
        info!(backend = ?backend, master_volume, "Controller context ready");

        Ok(ControllerContext {
            backend,
            master,
            registry: ActiveVoiceRegistry::new(),
            releases: ReleaseScheduler::new(),
            registers: RegisterCache::new(),
            inputs: RwLock::new(HashMap::new()),
            resources,
            envelope,
        })
    }

    pub fn backend(&self) -> &Arc<dyn AudioBackend> {
        &self.backend
    }

    /// The master bus every voice connects to.
    pub fn master(&self) -> GainHandle {
        self.master
    }

    pub fn registry(&self) -> &ActiveVoiceRegistry {
        &self.registry
    }

    pub fn releases(&self) -> &ReleaseScheduler {
        &self.releases
    }

    pub fn registers(&self) -> &RegisterCache {
        &self.registers
    }

    pub fn resources(&self) -> &ResourceLoader {
        &self.resources
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Registers (or replaces) a named section of input registers.
    pub fn register_input_section(&self, key: &str, registers: Vec<Register>) {
        debug!(section = key, registers = registers.len(), "Registered input section");
        self.inputs.write().insert(key.to_string(), registers.into());
    }

    /// The registers of an input section.
    pub fn input_section(&self, key: &str) -> Result<Arc<[Register]>, RegisterError> {
        self.inputs
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| RegisterError::UnknownSection(key.to_string()))
    }

    /// Finds the input register of a section matching `frequency` within tolerance.
    pub fn find_input_register(
        &self,
        key: &str,
        frequency: f64,
    ) -> Result<Option<Register>, RegisterError> {
        let section = self.input_section(key)?;
        Ok(find_register(&section, frequency).cloned())
    }

    /// Plays a note and registers its voice.
    pub fn note_on(&self, instrument: &Instrument, note: &Note) -> Result<(), InstrumentError> {
        let voice = instrument.play_note(self, note)?;
        self.registry.insert(voice);
        Ok(())
    }

    /// Releases a note and, once the release completes, disconnects and
    /// unregisters its voice. A superseded release leaves the voice to
    /// whichever release replaced it.
    pub async fn note_off(
        &self,
        instrument: &Instrument,
        note: &Note,
    ) -> Result<ReleaseOutcome, InstrumentError> {
        let outcome = instrument.end_note(self, note)?.await;
        if outcome == ReleaseOutcome::Completed {
            // The voice is unregistered even if its nodes fail to disconnect.
            let disconnected = instrument.disconnect_note(self, note);
            self.registry.remove(instrument.id(), note);
            disconnected?;
        }
        Ok(outcome)
    }
}

impl fmt::Debug for ControllerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerContext")
            .field("backend", &self.backend)
            .field("registry", &self.registry)
            .field("releases", &self.releases)
            .field("inputs", &self.inputs.read().keys().collect::<Vec<_>>())
            .finish()
    }
}
