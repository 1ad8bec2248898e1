//! Stem audio: decoded buffers, sample conversion and decoding.

pub mod buffer;
pub mod convert;
pub mod decode;

pub use buffer::StemBuffer;
pub use decode::{spawn_decode, PendingStem, StemDecoder, SymphoniaDecoder};
