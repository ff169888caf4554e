//! arpeggio-services: Audio devices, codecs, loading and the session controller

pub mod audio_input;
pub mod audio_io;
pub mod fetch;
pub mod loader;
pub mod mixer;
pub mod render;
pub mod session;
#[cfg(test)]
mod testing;
pub mod wav_codec;

pub use audio_input::{AudioInputError, AudioInputService, MicrophoneCapture};
pub use audio_io::{AudioOutputError, AudioOutputService, DeviceOutput};
pub use fetch::ResourceFetcher;
pub use loader::{LoadJob, LoadResult, SourceLoader};
pub use mixer::{start_frame_for, Voice, VoiceBudget, VoiceMixer, MAX_SCHEDULE_AHEAD_SECS};
pub use render::OfflineOutput;
pub use session::ArpSession;
pub use wav_codec::{decode_wav, encode_wav, write_wav, WavDecoder};
