//! Error types for arpeggio

use thiserror::Error;

use crate::source::SourceIntent;

#[derive(Debug, Error)]
pub enum ArpError {
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Fetch error: {0}")]
    Fetch(String),
    #[error("Capture error: {0}")]
    Capture(String),
    #[error("Output error: {0}")]
    Output(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("No source available (intent: {0})")]
    NoSourceAvailable(SourceIntent),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ArpError>;
