mod action_handlers;
mod commands;
mod config;

use std::io::{BufRead, Write};
use std::sync::Arc;

use arpeggio_core::{AudioOutput, Capture};
use arpeggio_services::{ArpSession, DeviceOutput, MicrophoneCapture, ResourceFetcher, WavDecoder};
use tracing::warn;

pub(crate) use config::{load_config, AppConfig};

/// Line-oriented front end over an [`ArpSession`]
pub(crate) struct ArpApp<O: AudioOutput> {
    session: ArpSession<O>,
    config: AppConfig,
}

impl ArpApp<DeviceOutput> {
    /// App wired to the default output and input devices
    pub(crate) fn with_devices(config: AppConfig) -> Self {
        Self::new(config, DeviceOutput::new(), Box::new(MicrophoneCapture::default()))
    }
}

impl<O: AudioOutput> ArpApp<O> {
    pub(crate) fn new(config: AppConfig, output: O, capture: Box<dyn Capture>) -> Self {
        let mut session = ArpSession::new(
            output,
            capture,
            Arc::new(WavDecoder),
            Arc::new(ResourceFetcher::default()),
            config.default_sound.clone(),
        );
        *session.request_mut() = config.arpeggio.clone();
        session.load_default();
        Self { session, config }
    }

    /// Read commands until EOF or `quit`, printing the status after each one
    pub(crate) fn run(&mut self, input: impl BufRead, mut out: impl Write) -> std::io::Result<()> {
        writeln!(out, "Type 'help' for commands.")?;
        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            self.session.poll();
            match commands::parse(&line) {
                Ok(command) => {
                    if !self.handle_command(command, &mut out)? {
                        break;
                    }
                }
                Err(msg) => {
                    warn!(input = %line, "Rejected command");
                    writeln!(out, "{msg}")?;
                }
            }
        }
        Ok(())
    }
}
