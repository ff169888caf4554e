use std::io::Write;
use std::time::Duration;

use arpeggio_core::{lookup, AudioOutput, SourceKind};
use arpeggio_services::AudioOutputService;
use tracing::error;

use super::commands::{Command, HELP};
use super::config::{config_path, save_config};
use super::ArpApp;

const LOAD_WAIT: Duration = Duration::from_secs(10);

impl<O: AudioOutput> ArpApp<O> {
    /// Apply one command. Returns false when the app should exit.
    pub(super) fn handle_command(&mut self, command: Command, out: &mut impl Write) -> std::io::Result<bool> {
        match command {
            Command::Mode(intent) => {
                self.session.select_mode(intent);
                self.print_status(out)?;
            }
            Command::Upload(path) => {
                self.session.upload_file(path.as_deref());
                self.print_status(out)?;
            }
            Command::Record => {
                self.session.toggle_record();
                self.print_status(out)?;
            }
            Command::Play => {
                self.session.play();
                self.print_status(out)?;
            }
            Command::Export(path) => {
                self.session.export(&path, self.config.export_sample_rate);
                self.print_status(out)?;
            }
            Command::Chord(chord) => {
                self.session.request_mut().chord = chord;
                writeln!(out, "Chord: {chord} {:?}", lookup(chord).as_slice())?;
            }
            Command::Octaves(octaves) => {
                self.session.request_mut().octaves = octaves;
                if octaves < 0 {
                    writeln!(out, "Octaves: {octaves} (plays as 0)")?;
                } else {
                    writeln!(out, "Octaves: {octaves}")?;
                }
            }
            Command::Pattern(pattern) => {
                self.session.request_mut().pattern = pattern;
                writeln!(out, "Pattern: {pattern}")?;
            }
            Command::Tempo(tempo) => {
                self.session.request_mut().tempo_bpm = tempo;
                writeln!(out, "Tempo: {tempo} bpm")?;
            }
            Command::Wait => {
                self.session.wait_for_loads(LOAD_WAIT);
                self.print_status(out)?;
            }
            Command::Show => self.print_settings(out)?,
            Command::Save => {
                self.config.arpeggio = self.session.request().clone();
                match save_config(&self.config) {
                    Ok(()) => writeln!(out, "Saved {}", config_path().display())?,
                    Err(err) => {
                        error!("Failed to save config: {}", err);
                        writeln!(out, "Could not save settings: {err}")?;
                    }
                }
            }
            Command::Devices => match AudioOutputService::get_default_device_info() {
                Ok((name, sample_rate, channels)) => {
                    writeln!(out, "Output: {name} ({sample_rate} Hz, {channels} ch)")?
                }
                Err(err) => writeln!(out, "Output unavailable: {err}")?,
            },
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }

    fn print_status(&self, out: &mut impl Write) -> std::io::Result<()> {
        writeln!(out, "{}", self.session.status())
    }

    fn print_settings(&self, out: &mut impl Write) -> std::io::Result<()> {
        let request = self.session.request();
        let resolver = self.session.resolver();
        writeln!(
            out,
            "chord {} | octaves {} | pattern {} | tempo {} bpm",
            request.chord, request.octaves, request.pattern, request.tempo_bpm
        )?;
        writeln!(out, "notes {:?}", request.notes())?;
        writeln!(out, "source intent: {}", resolver.intent())?;
        for kind in [SourceKind::Uploaded, SourceKind::Recorded, SourceKind::Default] {
            writeln!(out, "  {kind}: {:?}", resolver.status(kind))?;
        }
        Ok(())
    }
}
