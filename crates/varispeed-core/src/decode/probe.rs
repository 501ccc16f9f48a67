//! Symphonia-backed decoder
//!
//! Probes the byte stream for any container/codec symphonia was built with
//! (MP3, FLAC, WAV, Ogg Vorbis) and decodes every packet of the first audio
//! track into float PCM.

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::{DecodeError, DecodedBuffer, Decoder};

/// Decoder for compressed and PCM audio files using symphonia
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for SymphoniaDecoder {
    fn decode(&self, bytes: &[u8], hint_ext: Option<&str>) -> Result<DecodedBuffer, DecodeError> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = hint_ext {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| DecodeError::new(e.to_string()))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| DecodeError::new("No audio track found"))?;

        let track_id = track.id;

        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| DecodeError::new("Unknown sample rate"))?;

        let mut channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(2);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| DecodeError::new(e.to_string()))?;

        let mut samples: Vec<f32> = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => {
                    log::warn!("Error reading packet: {}", e);
                    break;
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    log::warn!("Skipping undecodable packet: {}", e);
                    continue;
                }
                Err(e) => return Err(DecodeError::new(e.to_string())),
            };

            if sample_buf.is_none() {
                let spec = *decoded.spec();
                channels = spec.channels.count();
                sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
            }

            if let Some(ref mut buf) = sample_buf {
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
        }

        if samples.is_empty() {
            return Err(DecodeError::new("No audio frames decoded"));
        }

        let buffer = DecodedBuffer::from_interleaved(sample_rate, channels, &samples);
        log::info!(
            "Decoded {} frames ({} ch source, {} Hz, {:.2}s)",
            buffer.frames(),
            channels,
            sample_rate,
            buffer.duration_seconds()
        );

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(channels: u16, sample_rate: u32, frames: usize) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut bytes = Vec::new();
        {
            let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
            for i in 0..frames {
                for ch in 0..channels {
                    let value = ((i as i32 * 37 + ch as i32 * 1000) % 16000) as i16;
                    writer.write_sample(value).unwrap();
                }
            }
            writer.finalize().unwrap();
        }
        bytes
    }

    #[test]
    fn test_decode_stereo_wav() {
        let bytes = wav_bytes(2, 44100, 4410);
        let buffer = SymphoniaDecoder::new().decode(&bytes, Some("wav")).unwrap();

        assert_eq!(buffer.sample_rate(), 44100);
        assert_eq!(buffer.frames(), 4410);
        assert!((buffer.duration_seconds() - 0.1).abs() < 1e-6);
        assert_ne!(buffer.left(), buffer.right());
    }

    #[test]
    fn test_decode_mono_wav_fills_both_channels() {
        let bytes = wav_bytes(1, 22050, 1000);
        let buffer = SymphoniaDecoder::new().decode(&bytes, None).unwrap();

        assert_eq!(buffer.frames(), 1000);
        assert_eq!(buffer.left(), buffer.right());
    }

    #[test]
    fn test_decode_malformed_bytes_fails() {
        let result = SymphoniaDecoder::new().decode(b"definitely not an audio file", Some("mp3"));
        let err = result.unwrap_err();
        assert_eq!(err.kind(), "Decoding error");
        assert!(!err.message.is_empty());
    }
}
