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
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use duration_string::DurationString;
use tracing::info;
use tracing_subscriber::EnvFilter;

use magnit::audio::mock::MockBackend;
use magnit::config::{EngineConfig, InstrumentManifest};
use magnit::note::Note;
use magnit::registers::{build_registers, RegisterCache};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A sample-based instrument engine."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prints the registers between two distances (in semitones) from A4.
    Registers {
        /// The first distance, inclusive.
        #[arg(allow_negative_numbers = true)]
        start: i32,
        /// The last distance, exclusive.
        #[arg(allow_negative_numbers = true)]
        end: i32,
    },
    /// Prints the keybed layout of a keyboard with the given number of keys.
    Keybed {
        /// One of 88, 61, 49, 32 or 25.
        count: usize,
    },
    /// Loads an instrument and plays notes through the in-process backend.
    Play {
        /// The path to the engine config.
        engine_config: PathBuf,
        /// The path to the instrument manifest.
        manifest: PathBuf,
        /// Notes to play in order, e.g. A4, C#5@90 or 450hz.
        #[arg(required = true)]
        notes: Vec<String>,
        /// How long each note is held before it is released.
        #[arg(short = 'd', long, default_value = "500ms")]
        hold: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Registers { start, end } => {
            for register in build_registers(start, end)? {
                println!("{}", register);
            }
        }
        Commands::Keybed { count } => {
            let registers = RegisterCache::new();
            for key in registers.keybed(count)?.iter() {
                println!("{:>4}  {}", key.offset, key.register);
            }
        }
        Commands::Play {
            engine_config,
            manifest,
            notes,
            hold,
        } => {
            let notes = notes
                .iter()
                .map(|note| note.parse::<Note>())
                .collect::<Result<Vec<_>, _>>()?;
            let hold: Duration = DurationString::from_string(hold)?.into();

            let engine = EngineConfig::deserialize(&engine_config)?;
            let context = engine.build_context(Arc::new(MockBackend::new("magnit")))?;
            let mut instrument = InstrumentManifest::deserialize(&manifest)?.build(&context)?;

            let summary = instrument
                .load(&context, |p| {
                    info!(instrument = p.name, progress = p.progress, "Loading")
                })
                .await;
            if summary.failed > 0 {
                println!("{} samples failed to load.", summary.failed);
            }

            for note in notes {
                context.note_on(&instrument, &note)?;
                if let Some(voice) = context.registry().get(instrument.id(), &note) {
                    println!(
                        "{} -> {} (rate {:.4})",
                        note,
                        voice.sample().name(),
                        voice.playback_rate()
                    );
                }
                tokio::time::sleep(hold).await;
                context.note_off(&instrument, &note).await?;
            }
        }
    }

    Ok(())
}
