//! Stem decoding: in-memory bytes to a [`StemBuffer`].

use std::io::Cursor;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, warn};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::EngineError;

use super::buffer::StemBuffer;
use super::convert::append_interleaved;

/// Turns raw encoded audio into a decoded stem buffer.
///
/// Implementations must not return partially decoded stems on failure.
pub trait StemDecoder: Send + Sync {
    /// Decode `bytes`. `hint` is an optional file extension used for probing.
    fn decode(&self, bytes: Vec<u8>, hint: Option<&str>) -> Result<StemBuffer, EngineError>;
}

/// Symphonia-backed decoder for every enabled format (WAV, FLAC, Ogg
/// Vorbis, MP3, AAC/MP4, MKV).
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl StemDecoder for SymphoniaDecoder {
    fn decode(&self, bytes: Vec<u8>, hint: Option<&str>) -> Result<StemBuffer, EngineError> {
        if bytes.is_empty() {
            return Err(EngineError::Decode("empty input".to_string()));
        }

        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

        let mut probe_hint = Hint::new();
        if let Some(extension) = hint {
            probe_hint.with_extension(&extension.to_lowercase());
        }

        let meta_opts: MetadataOptions = Default::default();
        let fmt_opts: FormatOptions = Default::default();
        let probed = symphonia::default::get_probe().format(&probe_hint, mss, &fmt_opts, &meta_opts)?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| EngineError::Decode("no supported audio tracks".to_string()))?;
        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| EngineError::Decode("missing sample rate in codec params".to_string()))?;
        let mut channels = track
            .codec_params
            .channels
            .map(|channels| channels.count() as u16)
            .unwrap_or(0);

        let dec_opts: DecoderOptions = Default::default();
        let mut decoder = symphonia::default::get_codecs().make(&track.codec_params, &dec_opts)?;

        let mut samples = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(Error::IoError(err)) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(Error::ResetRequired) => break,
                Err(err) => return Err(err.into()),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let packet_channels = append_interleaved(decoded, &mut samples);
                    if channels == 0 {
                        channels = packet_channels;
                    }
                }
                Err(Error::DecodeError(err)) => {
                    warn!("skipping undecodable packet: {}", err);
                }
                Err(err) => return Err(err.into()),
            }
        }

        let buffer = StemBuffer::from_interleaved(samples, channels, sample_rate);
        if buffer.frames() == 0 {
            return Err(EngineError::Decode("stream contains no audio frames".to_string()));
        }

        debug!(
            "decoded {} frames ({} ch @ {} Hz, {:.3}s)",
            buffer.frames(),
            buffer.channels(),
            buffer.sample_rate(),
            buffer.duration()
        );

        Ok(buffer)
    }
}

/// A stem being decoded on a worker thread.
pub struct PendingStem {
    name: String,
    receiver: Receiver<Result<StemBuffer, EngineError>>,
    handle: Option<JoinHandle<()>>,
}

impl PendingStem {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the decode result if it is ready, without blocking.
    pub fn try_take(&mut self) -> Option<Result<StemBuffer, EngineError>> {
        match self.receiver.try_recv() {
            Ok(result) => {
                self.join();
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.join();
                Some(Err(EngineError::Decode(format!(
                    "decoder for {} exited without a result",
                    self.name
                ))))
            }
        }
    }

    /// Block until decoding finishes.
    pub fn wait(mut self) -> Result<StemBuffer, EngineError> {
        let result = self.receiver.recv().unwrap_or_else(|_| {
            Err(EngineError::Decode(format!(
                "decoder for {} exited without a result",
                self.name
            )))
        });
        self.join();
        result
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("decoder thread for {} panicked", self.name);
            }
        }
    }
}

/// Decode `bytes` on a background thread.
///
/// # Arguments
///
/// * `decoder` - Shared decoder implementation.
/// * `name` - Stem name, carried through for the caller.
/// * `bytes` - Encoded audio.
/// * `hint` - Optional file extension used for probing.
pub fn spawn_decode(
    decoder: Arc<dyn StemDecoder>,
    name: impl Into<String>,
    bytes: Vec<u8>,
    hint: Option<String>,
) -> PendingStem {
    let name = name.into();
    let (sender, receiver) = mpsc::channel();
    let handle = thread::spawn(move || {
        let result = decoder.decode(bytes, hint.as_deref());
        let _ = sender.send(result);
    });

    PendingStem {
        name,
        receiver,
        handle: Some(handle),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Encode a 16-bit PCM WAV ramp in memory.
    pub(crate) fn wav_bytes(channels: u16, sample_rate: u32, frames: usize) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
            for index in 0..frames * channels as usize {
                writer
                    .write_sample(((index % 100) as i16) * 100)
                    .expect("write sample");
            }
            writer.finalize().expect("finalize wav");
        }
        cursor.into_inner()
    }

    #[test]
    fn decodes_wav_duration_and_layout() {
        let bytes = wav_bytes(2, 8_000, 16_000);
        let buffer = SymphoniaDecoder::new()
            .decode(bytes, Some("wav"))
            .expect("decode wav");
        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.sample_rate(), 8_000);
        assert_eq!(buffer.frames(), 16_000);
        assert!((buffer.duration() - 2.0).abs() < 1e-9);
        assert_eq!(buffer.samples()[0], 0.0);
        assert!((buffer.samples()[1] - 100.0 / 32_768.0).abs() < 1e-6);
    }

    #[test]
    fn decodes_without_hint() {
        let bytes = wav_bytes(1, 4_000, 400);
        let buffer = SymphoniaDecoder::new().decode(bytes, None).expect("decode");
        assert_eq!(buffer.frames(), 400);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let result = SymphoniaDecoder::new().decode(b"definitely not audio".to_vec(), Some("wav"));
        assert!(matches!(result, Err(EngineError::Decode(_))));
    }

    #[test]
    fn empty_input_is_a_decode_error() {
        let result = SymphoniaDecoder::new().decode(Vec::new(), None);
        assert!(matches!(result, Err(EngineError::Decode(_))));
    }

    #[test]
    fn background_decode_delivers_result() {
        let decoder: Arc<dyn StemDecoder> = Arc::new(SymphoniaDecoder::new());
        let pending = spawn_decode(decoder, "bass", wav_bytes(1, 8_000, 8_000), Some("wav".into()));
        assert_eq!(pending.name(), "bass");
        let buffer = pending.wait().expect("decoded");
        assert!((buffer.duration() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn background_decode_reports_failure() {
        let decoder: Arc<dyn StemDecoder> = Arc::new(SymphoniaDecoder::new());
        let mut pending = spawn_decode(decoder, "vocals", b"junk".to_vec(), None);
        let result = loop {
            if let Some(result) = pending.try_take() {
                break result;
            }
            thread::sleep(std::time::Duration::from_millis(5));
        };
        assert!(result.is_err());
    }
}
