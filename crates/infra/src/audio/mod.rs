//! File-backed audio: WAV decoding/encoding and offline block rendering

pub mod render;
pub mod wav;

pub use render::{OfflineRenderer, RenderOptions, RenderReport};
pub use wav::{read_wav, write_wav, AudioClip};
