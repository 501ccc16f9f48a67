//! Sample rate conversion on load
//!
//! Buffers are converted to the output clock's rate once, before they reach
//! the engine, so the real-time path never resamples.

use rubato::{FftFixedIn, Resampler};

use super::{DecodeError, DecodedBuffer};

/// Input chunk size for the FFT resampler (frames)
const CHUNK_SIZE: usize = 1024;

/// Sub-chunks per chunk (trades latency for quality inside rubato)
const SUB_CHUNKS: usize = 2;

/// Resample a decoded buffer to `target_rate`
///
/// Returns the buffer untouched when the rates already match. The output is
/// trimmed so its length is `round(frames * target / source)`.
pub fn resample_to(buffer: DecodedBuffer, target_rate: u32) -> Result<DecodedBuffer, DecodeError> {
    let source_rate = buffer.sample_rate();
    if source_rate == target_rate || buffer.is_empty() || target_rate == 0 {
        return Ok(buffer);
    }

    let start = std::time::Instant::now();
    let total = buffer.frames();
    let expected = (total as f64 * target_rate as f64 / source_rate as f64).round() as usize;

    let mut resampler = FftFixedIn::<f32>::new(
        source_rate as usize,
        target_rate as usize,
        CHUNK_SIZE,
        SUB_CHUNKS,
        2,
    )
    .map_err(|e| DecodeError::new(format!("Resampler setup failed: {}", e)))?;

    let delay = resampler.output_delay();
    let mut left = Vec::with_capacity(expected + delay + CHUNK_SIZE);
    let mut right = Vec::with_capacity(expected + delay + CHUNK_SIZE);

    let mut pos = 0;
    while pos + CHUNK_SIZE <= total {
        let input = [
            &buffer.left()[pos..pos + CHUNK_SIZE],
            &buffer.right()[pos..pos + CHUNK_SIZE],
        ];
        let out = resampler
            .process(&input[..], None)
            .map_err(|e| DecodeError::new(format!("Resampling failed: {}", e)))?;
        append(&mut left, &mut right, out);
        pos += CHUNK_SIZE;
    }

    if pos < total {
        let input = [&buffer.left()[pos..], &buffer.right()[pos..]];
        let out = resampler
            .process_partial(Some(&input[..]), None)
            .map_err(|e| DecodeError::new(format!("Resampling failed: {}", e)))?;
        append(&mut left, &mut right, out);
    }

    // Drain the resampler's internal delay until the expected length is covered
    while left.len() < expected + delay {
        let out = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(|e| DecodeError::new(format!("Resampling failed: {}", e)))?;
        if out[0].is_empty() {
            break;
        }
        append(&mut left, &mut right, out);
    }

    let skip = delay.min(left.len());
    left.drain(..skip);
    right.drain(..skip);
    left.resize(expected, 0.0);
    right.resize(expected, 0.0);

    log::info!(
        "Resampled {} frames {} Hz -> {} frames {} Hz in {:?}",
        total,
        source_rate,
        expected,
        target_rate,
        start.elapsed()
    );

    Ok(DecodedBuffer::from_channels(target_rate, left, right))
}

fn append(left: &mut Vec<f32>, right: &mut Vec<f32>, out: Vec<Vec<f32>>) {
    left.extend_from_slice(&out[0]);
    right.extend_from_slice(&out[1]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_rate_is_untouched() {
        let buffer = DecodedBuffer::from_channels(44100, vec![0.5; 100], vec![-0.5; 100]);
        let out = resample_to(buffer.clone(), 44100).unwrap();
        assert_eq!(out, buffer);
    }

    #[test]
    fn test_resample_length_and_rate() {
        let frames = 48000;
        let left: Vec<f32> = (0..frames)
            .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / 48000.0).sin())
            .collect();
        let buffer = DecodedBuffer::from_channels(48000, left.clone(), left);

        let out = resample_to(buffer, 44100).unwrap();
        assert_eq!(out.sample_rate(), 44100);
        assert_eq!(out.frames(), 44100);
        assert!((out.duration_seconds() - 1.0).abs() < 1e-9);

        // A full-scale sine should survive with roughly the same amplitude
        let peak = out.left()[1000..43000]
            .iter()
            .fold(0.0f32, |acc, s| acc.max(s.abs()));
        assert!(peak > 0.8 && peak < 1.2, "peak was {}", peak);
    }
}
