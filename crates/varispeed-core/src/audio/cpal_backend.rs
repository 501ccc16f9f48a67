//! cpal output stream driving the playback session
//!
//! ```text
//! ┌────────────────────┐  push()  ┌─────────────────────┐
//! │ PlaybackController │─────────►│   Command Queue     │
//! │  (control thread)  │          │  (lock-free SPSC)   │
//! └────────────────────┘          └──────────┬──────────┘
//!           ▲                                │ pop()
//!           │ Relaxed atomics                ▼
//! ┌────────────────────┐          ┌─────────────────────┐
//! │   SessionAtomics   │◄─────────│  cpal audio thread  │
//! │    (lock-free)     │  stores  │ (owns the adapter)  │
//! └────────────────────┘          └─────────────────────┘
//! ```
//!
//! The stream callback owns the [`OutputCallbackAdapter`] outright; there is
//! no mutex between the control thread and the device.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, SampleFormat, Stream, StreamConfig, SupportedStreamConfig};

use super::config::{AudioConfig, MAX_BUFFER_SIZE};
use super::device::{default_output_device, find_device_by_id};
use super::error::{AudioError, AudioResult};
use crate::config::EngineConfig;
use crate::decode::Decoder;
use crate::engine::{create_session, OutputCallbackAdapter, PlaybackController};
use crate::types::{Sample, DEFAULT_SAMPLE_RATE};

/// Keeps the output stream alive; drop it to stop audio
pub struct AudioHandle {
    _stream: Stream,
    sample_rate: u32,
    buffer_size: u32,
}

impl AudioHandle {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    /// One-way output latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        (self.buffer_size as f32 / self.sample_rate as f32) * 1000.0
    }
}

/// Everything the control thread needs once audio is running
pub struct AudioSystemResult {
    pub handle: AudioHandle,
    pub controller: PlaybackController,
    pub sample_rate: u32,
    pub buffer_size: u32,
    pub latency_ms: f32,
}

/// Open the output device and start a playback session on it
pub fn start_audio_system(
    config: &AudioConfig,
    engine_config: &EngineConfig,
    decoder: Box<dyn Decoder>,
) -> AudioResult<AudioSystemResult> {
    let device = match &config.device {
        Some(id) => find_device_by_id(id)?,
        None => default_output_device()?,
    };

    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    log::info!("Using audio device: {}", device_name);

    let supported = select_output_config(&device, config)?;
    let sample_rate = supported.sample_rate().0;
    let buffer_size = config.resolve_buffer_size(engine_config.batch_size);

    let stream_config = StreamConfig {
        channels: supported.channels(),
        sample_rate: supported.sample_rate(),
        buffer_size: CpalBufferSize::Fixed(buffer_size),
    };
    let latency_ms = (buffer_size as f32 / sample_rate as f32) * 1000.0;

    log::info!(
        "Audio config: {} channels, {}Hz, {} frames (~{:.1}ms latency)",
        stream_config.channels,
        sample_rate,
        buffer_size,
        latency_ms
    );

    let (controller, adapter) = create_session(sample_rate, engine_config, decoder)?;

    let stream = build_output_stream(&device, &stream_config, CallbackState::new(adapter))?;
    stream
        .play()
        .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;

    log::info!("Audio stream started");

    Ok(AudioSystemResult {
        handle: AudioHandle {
            _stream: stream,
            sample_rate,
            buffer_size,
        },
        controller,
        sample_rate,
        buffer_size,
        latency_ms,
    })
}

/// State moved into the stream callback
struct CallbackState {
    adapter: OutputCallbackAdapter,
    /// Pre-allocated channel buffers handed to the adapter
    left: Vec<Sample>,
    right: Vec<Sample>,
}

impl CallbackState {
    fn new(adapter: OutputCallbackAdapter) -> Self {
        Self {
            adapter,
            left: vec![0.0; MAX_BUFFER_SIZE],
            right: vec![0.0; MAX_BUFFER_SIZE],
        }
    }

    /// Run the adapter and interleave its output into `data`
    ///
    /// Channels beyond the second are zeroed; a mono device gets the mix.
    fn render(&mut self, data: &mut [f32], channels: usize) {
        for block in data.chunks_mut(MAX_BUFFER_SIZE * channels) {
            let n_frames = block.len() / channels;
            let left = &mut self.left[..n_frames];
            let right = &mut self.right[..n_frames];
            self.adapter.process(left, right);

            for (i, frame) in block.chunks_mut(channels).enumerate() {
                if i >= n_frames {
                    frame.fill(0.0);
                    continue;
                }
                if channels == 1 {
                    frame[0] = 0.5 * (left[i] + right[i]);
                    continue;
                }
                frame[0] = left[i];
                frame[1] = right[i];
                for ch in frame.iter_mut().skip(2) {
                    *ch = 0.0;
                }
            }
        }
    }
}

/// Pick a stereo f32 config at the requested rate, falling back gracefully
fn select_output_config(device: &cpal::Device, config: &AudioConfig) -> AudioResult<SupportedStreamConfig> {
    let supported: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .collect();

    let target_rate = config.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE);
    let supports_rate = |c: &cpal::SupportedStreamConfigRange| {
        (c.min_sample_rate().0..=c.max_sample_rate().0).contains(&target_rate)
    };

    let best = supported
        .iter()
        .find(|c| c.sample_format() == SampleFormat::F32 && c.channels() >= 2 && supports_rate(c))
        .or_else(|| {
            supported
                .iter()
                .find(|c| c.sample_format() == SampleFormat::F32 && c.channels() >= 2)
        })
        .or_else(|| supported.iter().find(|c| c.sample_format() == SampleFormat::F32))
        .ok_or_else(|| AudioError::ConfigError("No f32 output configuration".to_string()))?;

    let sample_rate = if supports_rate(best) {
        cpal::SampleRate(target_rate)
    } else {
        let fallback = best.max_sample_rate();
        log::warn!(
            "Audio device doesn't support {}Hz, falling back to {}Hz (buffers are resampled on load)",
            target_rate,
            fallback.0
        );
        fallback
    };

    Ok(best.clone().with_sample_rate(sample_rate))
}

fn build_output_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut state: CallbackState,
) -> AudioResult<Stream> {
    let channels = config.channels as usize;

    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                state.render(data, channels);
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))
}
