//! WAV decoding and encoding for in-memory audio

use std::io::Cursor;
use std::path::Path;

use arpeggio_core::{ArpError, AudioDecoder, DecodedBuffer, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

/// Decoder for RIFF/WAV bytes (integer PCM of any depth, or 32-bit float)
#[derive(Debug, Clone, Copy, Default)]
pub struct WavDecoder;

impl AudioDecoder for WavDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedBuffer> {
        decode_wav(bytes)
    }
}

fn decode_err(e: hound::Error) -> ArpError {
    ArpError::Decode(e.to_string())
}

fn encode_err(e: hound::Error) -> ArpError {
    match e {
        hound::Error::IoError(io) => ArpError::Io(io),
        other => ArpError::Output(other.to_string()),
    }
}

/// Decode WAV bytes into planar f32 channels
pub fn decode_wav(bytes: &[u8]) -> Result<DecodedBuffer> {
    let reader = WavReader::new(Cursor::new(bytes)).map_err(decode_err)?;
    let spec = reader.spec();

    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(ArpError::Decode(format!(
            "invalid format: {} channels at {} Hz",
            spec.channels, spec.sample_rate
        )));
    }

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(decode_err)?,
        SampleFormat::Int => {
            let max_val = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<_, _>>()
                .map_err(decode_err)?
        }
    };

    if samples.is_empty() {
        return Err(ArpError::Decode("no audio frames".into()));
    }

    Ok(DecodedBuffer::from_interleaved(&samples, spec.channels, spec.sample_rate))
}

fn float_spec(channels: u16, sample_rate: u32) -> WavSpec {
    WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    }
}

/// Encode interleaved f32 samples as 32-bit float WAV bytes
pub fn encode_wav(samples: &[f32], channels: u16, sample_rate: u32) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, float_spec(channels, sample_rate)).map_err(encode_err)?;
        for &s in samples {
            writer.write_sample(s).map_err(encode_err)?;
        }
        writer.finalize().map_err(encode_err)?;
    }
    Ok(cursor.into_inner())
}

/// Write mono f32 samples to a WAV file
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let mut writer = WavWriter::create(path, float_spec(1, sample_rate)).map_err(encode_err)?;
    for &s in samples {
        writer.write_sample(s).map_err(encode_err)?;
    }
    writer.finalize().map_err(encode_err)
}
