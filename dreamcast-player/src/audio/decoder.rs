//! Narration decoding using symphonia
//!
//! Narration arrives as an in-memory encoded payload (fetched or read from
//! disk). It is decoded whole into an [`AudioBuffer`]; seeking happens on the
//! decoded buffer, never in the compressed stream.

use super::types::AudioBuffer;
use crate::error::{Error, Result};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Decode an encoded payload into a planar buffer at its native rate
///
/// `extension` is only a probing hint (`"mp3"`, `"wav"`, ...).
pub fn decode_bytes(bytes: Vec<u8>, extension: Option<&str>) -> Result<AudioBuffer> {
    debug!("Decoding {} bytes (hint: {:?})", bytes.len(), extension);

    if bytes.is_empty() {
        return Err(Error::Decode("Empty audio payload".to_string()));
    }

    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::Decode(format!("Failed to probe format: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::Decode("No audio track found".to_string()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| Error::Decode("Sample rate not found".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::Decode(format!("Failed to create decoder: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut channels: Option<u16> = track.codec_params.channels.map(|c| c.count() as u16);
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                debug!("Reached end of stream");
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                warn!("Stream reset requested mid-decode, stopping");
                break;
            }
            Err(e) => {
                warn!("Error reading packet: {}", e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                channels.get_or_insert(spec.channels.count() as u16);

                let buf = sample_buf.get_or_insert_with(|| {
                    SampleBuffer::<f32>::new(decoded.capacity() as u64, spec)
                });
                if buf.capacity() < decoded.capacity() * spec.channels.count() {
                    *buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                }
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                // Corrupt frame; skip it
                warn!("Decode error: {}", e);
                continue;
            }
            Err(e) => return Err(Error::Decode(format!("Decoder failed: {}", e))),
        }
    }

    let channels = channels.ok_or_else(|| Error::Decode("Channel count not found".to_string()))?;
    if samples.is_empty() {
        return Err(Error::Decode("No audio frames decoded".to_string()));
    }

    let buffer = AudioBuffer::from_interleaved(&samples, channels, sample_rate);
    debug!(
        "Decoded {} frames, {} channels at {} Hz ({:.2}s)",
        buffer.frames(),
        channels,
        sample_rate,
        buffer.duration()
    );
    Ok(buffer)
}

/// File extension of a URL or path, used as a probe hint
pub fn extension_hint(location: &str) -> Option<&str> {
    let path = location.split(['?', '#']).next().unwrap_or(location);
    let name = path.rsplit('/').next()?;
    let (_, ext) = name.rsplit_once('.')?;
    (!ext.is_empty() && ext.len() <= 5).then_some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_payload_rejected() {
        assert!(matches!(decode_bytes(Vec::new(), None), Err(Error::Decode(_))));
    }

    #[test]
    fn test_garbage_payload_rejected() {
        let garbage = vec![0x13u8; 4096];
        assert!(decode_bytes(garbage, Some("mp3")).is_err());
    }

    #[test]
    fn test_extension_hint() {
        assert_eq!(extension_hint("https://cdn.example.com/a/story.mp3?sig=x"), Some("mp3"));
        assert_eq!(extension_hint("/tmp/narration.wav"), Some("wav"));
        assert_eq!(extension_hint("https://cdn.example.com/stream"), None);
    }
}
