//! Background buffer loader
//!
//! Decoding a compressed file takes far longer than one control tick, so it
//! runs on its own thread. The controller hands over raw bytes and picks up
//! finished buffers with [`BufferLoader::try_recv`] on its next poll.
//!
//! Decoded audio is resampled to the output rate before it is handed back, so
//! frame offsets and output-clock seconds always agree.

use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::decode::{resample_to, DecodeError, DecodedBuffer, Decoder};

/// Request to decode a file's bytes
pub struct LoadRequest {
    /// Monotonic request id, used to drop superseded results
    pub id: u64,
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Result of a background load
#[derive(Debug)]
pub struct LoadResult {
    pub id: u64,
    pub name: String,
    pub result: Result<DecodedBuffer, DecodeError>,
}

/// Handle to the background loader thread
///
/// Dropping the handle closes the request channel and lets the thread exit.
pub struct BufferLoader {
    tx: Sender<LoadRequest>,
    rx: Receiver<LoadResult>,
    next_id: u64,
    _handle: JoinHandle<()>,
}

impl BufferLoader {
    /// Spawn the loader thread
    ///
    /// `target_sample_rate` of `None` keeps buffers at their native rate.
    pub fn spawn(decoder: Box<dyn Decoder>, target_sample_rate: Option<u32>) -> std::io::Result<Self> {
        let (request_tx, request_rx) = std::sync::mpsc::channel::<LoadRequest>();
        let (result_tx, result_rx) = std::sync::mpsc::channel::<LoadResult>();

        let handle = thread::Builder::new()
            .name("buffer-loader".to_string())
            .spawn(move || loader_thread(decoder, target_sample_rate, request_rx, result_tx))?;

        log::info!(
            "BufferLoader spawned (target sample rate: {})",
            target_sample_rate.map_or_else(|| "native".to_string(), |r| format!("{} Hz", r))
        );

        Ok(Self {
            tx: request_tx,
            rx: result_rx,
            next_id: 1,
            _handle: handle,
        })
    }

    /// Queue bytes for decoding (non-blocking)
    ///
    /// Returns the request id, or `None` if the loader thread has gone away.
    pub fn load(&mut self, bytes: Vec<u8>, name: impl Into<String>) -> Option<u64> {
        let id = self.next_id;
        let request = LoadRequest {
            id,
            name: name.into(),
            bytes,
        };

        match self.tx.send(request) {
            Ok(()) => {
                self.next_id += 1;
                Some(id)
            }
            Err(e) => {
                log::error!("Loader thread disconnected: {}", e);
                None
            }
        }
    }

    /// Try to receive a completed load (non-blocking)
    pub fn try_recv(&self) -> Option<LoadResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::error!("Loader thread disconnected unexpectedly");
                None
            }
        }
    }
}

fn loader_thread(
    decoder: Box<dyn Decoder>,
    target_sample_rate: Option<u32>,
    rx: Receiver<LoadRequest>,
    tx: Sender<LoadResult>,
) {
    log::info!("Buffer loader thread started");

    while let Ok(request) = rx.recv() {
        let start = Instant::now();
        let hint = extension_hint(&request.name);

        let result = decoder
            .decode(&request.bytes, hint)
            .and_then(|buffer| match target_sample_rate {
                Some(rate) => resample_to(buffer, rate),
                None => Ok(buffer),
            });

        match &result {
            Ok(buffer) => log::info!(
                "Loaded '{}': {} frames @ {} Hz in {:?}",
                request.name,
                buffer.frames(),
                buffer.sample_rate(),
                start.elapsed()
            ),
            Err(e) => log::warn!("Failed to load '{}': {}", request.name, e),
        }

        let sent = tx.send(LoadResult {
            id: request.id,
            name: request.name,
            result,
        });
        if sent.is_err() {
            break;
        }
    }

    log::info!("Buffer loader thread shutting down");
}

/// File extension of `name`, used as a format hint for the decoder
fn extension_hint(name: &str) -> Option<&str> {
    std::path::Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
}
