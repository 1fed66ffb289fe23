use std::io::Cursor;

use audioadapter_buffers::direct::InterleavedSlice;
use rubato::{
    Async as AsyncResampler, FixedAsync, Resampler as RubatoResampler,
    SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Canonical sample rate every backend and the detector expect.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// One frame of raw capture audio: interleaved signed 16-bit PCM.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFrame {
    pub fn new(samples: Vec<i16>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }
}

/// Canonical utterance audio: mono 16-bit PCM at 16kHz plus its WAV encoding.
///
/// Immutable once produced. An utterance with zero usable samples is the
/// empty sentinel (`is_empty()`); callers short-circuit on it instead of
/// issuing network calls.
#[derive(Debug, Clone)]
pub struct NormalizedAudio {
    samples: Vec<i16>,
    wav: Vec<u8>,
}

impl NormalizedAudio {
    fn empty() -> Self {
        Self {
            samples: Vec::new(),
            wav: Vec::new(),
        }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// WAV payload sent to the detection and transcription services.
    pub fn wav_bytes(&self) -> &[u8] {
        &self.wav
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / TARGET_SAMPLE_RATE as f64
    }
}

/// Normalizes raw frames into mono 16kHz PCM and its WAV encoding.
///
/// Multi-channel frames are down-mixed by integer arithmetic mean across
/// channels. Frames already at 16kHz pass through untouched (no float round
/// trip), so normalizing canonical audio is byte-identical. Consecutive
/// frames sharing a sample rate are resampled as one run.
pub fn normalize(frames: &[AudioFrame]) -> anyhow::Result<NormalizedAudio> {
    // Down-mix each frame, grouping consecutive frames by sample rate.
    let mut runs: Vec<(u32, Vec<i16>)> = Vec::new();
    for frame in frames {
        let mono = downmix(&frame.samples, frame.channels);
        if mono.is_empty() {
            continue;
        }
        match runs.last_mut() {
            Some((rate, samples)) if *rate == frame.sample_rate => samples.extend(mono),
            _ => runs.push((frame.sample_rate, mono)),
        }
    }

    if runs.is_empty() {
        return Ok(NormalizedAudio::empty());
    }

    let mut samples: Vec<i16> = Vec::new();
    for (rate, mono) in runs {
        if rate == TARGET_SAMPLE_RATE {
            samples.extend(mono);
        } else {
            let as_f32: Vec<f32> = mono.iter().map(|&s| s as f32 / 32768.0).collect();
            let resampled = resample_to_16k(&as_f32, rate)?;
            samples.extend(resampled.iter().map(|&s| {
                let clamped = s.clamp(-1.0, 1.0);
                (clamped * 32767.0) as i16
            }));
        }
    }

    if samples.is_empty() {
        return Ok(NormalizedAudio::empty());
    }

    let wav = encode_wav(&samples)?;
    Ok(NormalizedAudio { samples, wav })
}

/// Down-mixes interleaved PCM to mono by arithmetic mean across channels.
///
/// Integer mean is order-independent for equal-weighted channels.
fn downmix(samples: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let channels = channels as usize;
    samples
        .chunks_exact(channels)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

/// Resamples mono audio from `src_rate` Hz to 16kHz using sinc interpolation.
///
/// The final partial chunk is zero-padded, and one extra silent chunk is
/// processed afterwards to flush the resampler tail so the last window is
/// not dropped. Output is truncated to `len * ratio`, preserving duration to
/// within one output sample.
fn resample_to_16k(audio: &[f32], src_rate: u32) -> anyhow::Result<Vec<f32>> {
    let ratio = TARGET_SAMPLE_RATE as f64 / src_rate as f64;
    let chunk_size = 1024;

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = AsyncResampler::<f32>::new_sinc(
        ratio,
        2.0,
        &params,
        chunk_size,
        1, // mono
        FixedAsync::Input,
    )
    .map_err(|e| anyhow::anyhow!("Failed to create resampler: {}", e))?;

    let mut output = Vec::with_capacity((audio.len() as f64 * ratio) as usize + 1024);

    for chunk in audio.chunks(chunk_size) {
        let input = if chunk.len() < chunk_size {
            let mut padded = chunk.to_vec();
            padded.resize(chunk_size, 0.0);
            padded
        } else {
            chunk.to_vec()
        };

        let frames = input.len();
        let input_adapter = InterleavedSlice::new(&input, 1, frames)
            .map_err(|e| anyhow::anyhow!("Input adapter error: {}", e))?;

        let result = resampler
            .process(&input_adapter, 0, None)
            .map_err(|e| anyhow::anyhow!("Resample error: {}", e))?;

        output.extend(result.take_data());
    }

    // Flush: push one silent chunk through so the tail of the last real
    // chunk clears the sinc filter delay.
    let silence = vec![0.0f32; chunk_size];
    let input_adapter = InterleavedSlice::new(&silence, 1, chunk_size)
        .map_err(|e| anyhow::anyhow!("Input adapter error: {}", e))?;
    let result = resampler
        .process(&input_adapter, 0, None)
        .map_err(|e| anyhow::anyhow!("Resample flush error: {}", e))?;
    output.extend(result.take_data());

    // Trim to expected length (remove padding and flush artifacts)
    let expected_len = (audio.len() as f64 * ratio) as usize;
    output.truncate(expected_len);

    Ok(output)
}

/// Encodes mono 16kHz PCM as a minimal WAV container (16-bit little-endian).
fn encode_wav(samples: &[i16]) -> anyhow::Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: TARGET_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| anyhow::anyhow!("Failed to create WAV writer: {}", e))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| anyhow::anyhow!("Failed to write WAV sample: {}", e))?;
        }
        writer
            .finalize()
            .map_err(|e| anyhow::anyhow!("Failed to finalize WAV: {}", e))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_yields_sentinel() {
        let normalized = normalize(&[]).unwrap();
        assert!(normalized.is_empty());
        assert!(normalized.wav_bytes().is_empty());

        let empty_frame = AudioFrame::new(Vec::new(), 16_000, 1);
        let normalized = normalize(&[empty_frame]).unwrap();
        assert!(normalized.is_empty());
    }

    #[test]
    fn test_mono_16k_passthrough() {
        let samples = vec![100i16, -200, 300, -400, 500];
        let frame = AudioFrame::new(samples.clone(), 16_000, 1);
        let normalized = normalize(&[frame]).unwrap();
        assert_eq!(normalized.samples(), samples.as_slice());
    }

    #[test]
    fn test_normalization_idempotence() {
        let samples = vec![0i16, 1000, -1000, 32767, -32768, 42];
        let first = normalize(&[AudioFrame::new(samples, 16_000, 1)]).unwrap();

        let again = AudioFrame::new(first.samples().to_vec(), 16_000, 1);
        let second = normalize(&[again]).unwrap();

        assert_eq!(first.samples(), second.samples());
        assert_eq!(first.wav_bytes(), second.wav_bytes());
    }

    #[test]
    fn test_stereo_downmix_mean() {
        let frame = AudioFrame::new(vec![10, 20, 30, 40], 16_000, 2);
        let normalized = normalize(&[frame]).unwrap();
        assert_eq!(normalized.samples(), &[15, 35]);
    }

    #[test]
    fn test_downmix_channel_order_independence() {
        let left_right = AudioFrame::new(vec![10, 20, -300, 500], 16_000, 2);
        let right_left = AudioFrame::new(vec![20, 10, 500, -300], 16_000, 2);
        let a = normalize(&[left_right]).unwrap();
        let b = normalize(&[right_left]).unwrap();
        assert_eq!(a.samples(), b.samples());
    }

    #[test]
    fn test_multiple_frames_concatenate() {
        let f1 = AudioFrame::new(vec![1, 2, 3], 16_000, 1);
        let f2 = AudioFrame::new(vec![4, 5], 16_000, 1);
        let normalized = normalize(&[f1, f2]).unwrap();
        assert_eq!(normalized.samples(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_downsample_preserves_duration() {
        // 0.5s of a 440Hz tone at 48kHz should resample to 0.5s at 16kHz.
        let src_rate = 48_000u32;
        let n = src_rate as usize / 2;
        let samples: Vec<i16> = (0..n)
            .map(|i| {
                let t = i as f32 / src_rate as f32;
                ((t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 8000.0) as i16
            })
            .collect();
        let frame = AudioFrame::new(samples, src_rate, 1);
        let normalized = normalize(&[frame]).unwrap();
        assert_eq!(normalized.samples().len(), 8_000);
        assert!((normalized.duration_secs() - 0.5).abs() < 1.0 / 16_000.0);
    }

    #[test]
    fn test_upsample_preserves_duration() {
        let samples = vec![1000i16; 800]; // 0.1s at 8kHz
        let frame = AudioFrame::new(samples, 8_000, 1);
        let normalized = normalize(&[frame]).unwrap();
        assert_eq!(normalized.samples().len(), 1_600);
    }

    #[test]
    fn test_wav_encoding_layout() {
        let frame = AudioFrame::new(vec![1, 2, 3, 4], 16_000, 1);
        let normalized = normalize(&[frame]).unwrap();
        let wav = normalized.wav_bytes();

        // Standard 44-byte header followed by 2 bytes per sample.
        assert_eq!(wav.len(), 44 + 4 * 2);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");

        // Re-read through hound to confirm the canonical spec round-trips.
        let reader = hound::WavReader::new(Cursor::new(wav.to_vec())).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16_000);
        assert_eq!(spec.bits_per_sample, 16);
        let decoded: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, vec![1, 2, 3, 4]);
    }
}
