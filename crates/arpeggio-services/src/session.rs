//! Session controller: owns source state and turns every outcome into a status line

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arpeggio_core::{
    play_arpeggio, ArpeggioRequest, AudioDecoder, AudioOutput, Capture, CaptureSession, Fetch, LoadOutcome,
    Resolution, ScheduleReport, SourceIntent, SourceKind, SourceResolver,
};
use tracing::{debug, error, info};

use crate::loader::{LoadJob, LoadResult, SourceLoader};
use crate::render::OfflineOutput;
use crate::wav_codec::write_wav;

pub struct ArpSession<O: AudioOutput> {
    resolver: SourceResolver,
    loader: SourceLoader,
    capture: Box<dyn Capture>,
    recording: Option<Box<dyn CaptureSession>>,
    output: O,
    request: ArpeggioRequest,
    default_sound: String,
    status: String,
}

impl<O: AudioOutput> ArpSession<O> {
    pub fn new(
        output: O,
        capture: Box<dyn Capture>,
        decoder: Arc<dyn AudioDecoder>,
        fetcher: Arc<dyn Fetch>,
        default_sound: impl Into<String>,
    ) -> Self {
        Self {
            resolver: SourceResolver::new(),
            loader: SourceLoader::new(decoder, fetcher),
            capture,
            recording: None,
            output,
            request: ArpeggioRequest::default(),
            default_sound: default_sound.into(),
            status: String::from("Ready"),
        }
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn request(&self) -> &ArpeggioRequest {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut ArpeggioRequest {
        &mut self.request
    }

    pub fn resolver(&self) -> &SourceResolver {
        &self.resolver
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    pub fn pending_loads(&self) -> usize {
        self.loader.in_flight()
    }

    fn set_status(&mut self, msg: impl Into<String>) {
        self.status = msg.into();
        info!(status = %self.status, "Status");
    }

    /// Start fetching the default sound. Does nothing once it is loaded or loading.
    pub fn load_default(&mut self) {
        let Some(ticket) = self.resolver.begin_load(SourceKind::Default) else {
            debug!("Default sound already loaded or loading");
            return;
        };
        let resource = self.default_sound.clone();
        self.loader.submit(ticket, resource.clone(), LoadJob::Resource(resource));
    }

    pub fn select_mode(&mut self, intent: SourceIntent) {
        self.resolver.select_intent(intent);
        self.set_status(match intent {
            SourceIntent::Upload => "Source: Uploaded File",
            SourceIntent::Record => "Source: Last Recorded Sound",
            SourceIntent::None => "Source: Default Sound",
        });
    }

    /// Load a sound file. `None` or an empty path means the selection was cancelled.
    pub fn upload_file(&mut self, path: Option<&Path>) {
        let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) else {
            self.resolver.clear(SourceKind::Uploaded);
            self.set_status("File selection cancelled.");
            return;
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        if let Some(ticket) = self.resolver.begin_load(SourceKind::Uploaded) {
            self.loader.submit(ticket, name.clone(), LoadJob::File(path.to_path_buf()));
            self.set_status(format!("Loading {name}..."));
        }
    }

    /// Load an already-read sound file
    pub fn upload_bytes(&mut self, name: &str, bytes: Vec<u8>) {
        if let Some(ticket) = self.resolver.begin_load(SourceKind::Uploaded) {
            self.loader.submit(ticket, name, LoadJob::Bytes(bytes));
            self.set_status(format!("Loading {name}..."));
        }
    }

    /// Start a recording, or stop the running one and decode it
    pub fn toggle_record(&mut self) {
        match self.recording.take() {
            Some(session) => self.finish_recording(session),
            None => self.start_recording(),
        }
    }

    fn start_recording(&mut self) {
        match self.capture.start() {
            Ok(session) => {
                self.recording = Some(session);
                self.set_status("Recording...");
            }
            Err(err) => {
                error!("Error accessing microphone: {}", err);
                self.set_status("Error accessing microphone. Please allow permission.");
            }
        }
    }

    fn finish_recording(&mut self, session: Box<dyn CaptureSession>) {
        match session.stop() {
            Ok(bytes) => {
                if let Some(ticket) = self.resolver.begin_load(SourceKind::Recorded) {
                    self.loader.submit(ticket, "recording", LoadJob::Bytes(bytes));
                    self.set_status("Processing recording...");
                }
            }
            Err(err) => {
                error!("Error finishing recording: {}", err);
                self.set_status("Error capturing audio. Please try again.");
            }
        }
    }

    /// Apply every load that has finished. Returns how many were applied.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Some(done) = self.loader.try_recv() {
            self.apply(done);
            applied += 1;
        }
        applied
    }

    /// Block until every submitted load has finished or `timeout` passes
    pub fn wait_for_loads(&mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut applied = self.poll();
        while self.loader.in_flight() > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let Some(done) = self.loader.recv_timeout(remaining) else { break };
            self.apply(done);
            applied += 1;
        }
        applied
    }

    fn apply(&mut self, done: LoadResult) {
        let LoadResult { ticket, label, result } = done;
        match self.resolver.complete_load(ticket, result) {
            LoadOutcome::Installed(buffer) => {
                info!(
                    kind = %ticket.kind,
                    label = %label,
                    frames = buffer.audio().len_frames(),
                    sample_rate = buffer.audio().sample_rate,
                    "Source ready"
                );
                match ticket.kind {
                    SourceKind::Uploaded => self.set_status(format!("File loaded: {label}")),
                    SourceKind::Recorded => self.set_status("Recording ready!"),
                    SourceKind::Default => {}
                }
            }
            LoadOutcome::Failed(err) => {
                error!(kind = %ticket.kind, label = %label, "Failed to load source: {}", err);
                match ticket.kind {
                    SourceKind::Uploaded => {
                        self.set_status("Error processing audio file. Please try a different file.")
                    }
                    SourceKind::Recorded => self.set_status("Error decoding audio. Please try again."),
                    SourceKind::Default => self.set_status(format!("Default sound unavailable: {err}")),
                }
            }
            LoadOutcome::Stale => {
                debug!(kind = %ticket.kind, label = %label, "Superseded load finished");
            }
        }
    }

    fn pick_source(&mut self) -> Option<Resolution> {
        self.poll();
        match self.resolver.resolve() {
            Ok(resolution) => Some(resolution),
            Err(err) => {
                error!("Cannot play: {}", err);
                self.set_status(match self.resolver.intent() {
                    SourceIntent::Upload => "Error: No audio file uploaded or processed.",
                    SourceIntent::Record => "Error: No recorded audio available or recording not processed.",
                    SourceIntent::None => "Error: No sound available. The default sound has not loaded.",
                });
                None
            }
        }
    }

    /// Play the current request with the resolved source on the session's output
    pub fn play(&mut self) -> Option<ScheduleReport> {
        let resolution = self.pick_source()?;

        let report = match play_arpeggio(&self.request, resolution.buffer(), &mut self.output) {
            Ok(report) => report,
            Err(err) => {
                error!("Cannot play: {}", err);
                self.set_status(format!("Error: {err}"));
                return None;
            }
        };

        let mut msg = match (&resolution, report.is_empty()) {
            (_, true) => String::from("Nothing to play: the arpeggio has no notes."),
            (Resolution::Fallback { requested, .. }, false) => {
                format!("Playing arpeggio with the default sound (no {requested} source ready)...")
            }
            (Resolution::Selected(_), false) => String::from("Playing arpeggio..."),
        };
        if !report.is_complete() {
            msg.push_str(&format!(" {} of {} notes failed to play.", report.failed.len(), report.len()));
        }
        self.set_status(msg);
        Some(report)
    }

    /// Render the current request offline and write it as a WAV file.
    /// Returns the number of frames written.
    pub fn export(&mut self, path: &Path, sample_rate: u32) -> Option<usize> {
        let resolution = self.pick_source()?;
        let mut offline = OfflineOutput::new(sample_rate);

        let written = play_arpeggio(&self.request, resolution.buffer(), &mut offline).and_then(|_| {
            let mix = offline.render();
            write_wav(path, &mix, sample_rate).map(|()| mix.len())
        });

        match written {
            Ok(frames) => {
                self.set_status(format!("Exported {frames} frames to {}", path.display()));
                Some(frames)
            }
            Err(err) => {
                error!(path = %path.display(), "Export failed: {}", err);
                self.set_status(format!("Error: {err}"));
                None
            }
        }
    }
}
