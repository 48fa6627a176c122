//! ChopShop infrastructure: audio file I/O and an offline host
//!
//! The core engine only knows about blocks. This crate turns WAV files into
//! blocks, drives a [`chopshop_core::ChopShopProcessor`] over them the way a
//! plugin host would, and writes the result back out.

pub mod audio;

use chopshop_core::AudioError;
use thiserror::Error;

/// Errors from file I/O and offline rendering
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, RenderError>;

pub use audio::render::{OfflineRenderer, RenderOptions, RenderReport};
pub use audio::wav::{read_wav, write_wav, AudioClip};
