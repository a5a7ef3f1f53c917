/// Sound engine: procedural audio cues via rodio.
///
/// Every cue is generated as an in-memory WAV buffer at init time.
/// Playback is fire-and-forget (non-blocking) via rodio's Sink; nothing in
/// the game waits on a sound.
///
/// Compile without the "sound" feature to disable audio entirely
/// (the stub SoundEngine does nothing).

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;
    use std::sync::Arc;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use crate::sim::event::Cue;

    const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = 2.0 * std::f32::consts::PI;

    /// Pre-generated WAV buffers, one per cue.
    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        whoosh: Arc<Vec<u8>>,
        hide: Arc<Vec<u8>>,
        beep: Arc<Vec<u8>>,
        tap: Arc<Vec<u8>>,
        tick: Arc<Vec<u8>>,
        success: Arc<Vec<u8>>,
        failure: Arc<Vec<u8>>,
        scream: Arc<Vec<u8>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(s) => s,
                Err(e) => {
                    log::warn!("no audio output: {e}");
                    return None;
                }
            };

            Some(SoundEngine {
                _stream: stream,
                handle,
                whoosh: Arc::new(make_wav(&gen_whoosh())),
                hide: Arc::new(make_wav(&gen_sweep(900.0, 300.0, 0.12, 0.2))),
                beep: Arc::new(make_wav(&gen_blip(880.0, 0.15, 0.3))),
                tap: Arc::new(make_wav(&gen_blip(1200.0, 0.03, 0.25))),
                tick: Arc::new(make_wav(&gen_blip(1600.0, 0.05, 0.2))),
                success: Arc::new(make_wav(&gen_bell())),
                failure: Arc::new(make_wav(&gen_buzzer())),
                scream: Arc::new(make_wav(&gen_scream())),
            })
        }

        pub fn play(&self, cue: Cue) {
            let buf = match cue {
                Cue::Whoosh => &self.whoosh,
                Cue::Hide => &self.hide,
                Cue::Beep => &self.beep,
                Cue::Tap => &self.tap,
                Cue::CountdownTick => &self.tick,
                Cue::Success => &self.success,
                Cue::Failure => &self.failure,
                Cue::Scream => &self.scream,
            };
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach(); // fire-and-forget
                }
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: all produce Vec<f32> mono samples
    // ════════════════════════════════════════════════════════════

    /// Simple sine blip at given frequency and duration
    fn gen_blip(freq: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32); // linear fade out
                (t * freq * TAU).sin() * env * volume
            })
            .collect()
    }

    /// Linear pitch glide from `from` to `to` Hz.
    fn gen_sweep(from: f32, to: f32, duration: f32, volume: f32) -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * duration) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = from + (to - from) * t;
                phase += freq / SAMPLE_RATE as f32;
                let env = (1.0 - t).powf(0.6);
                (phase * TAU).sin() * env * volume
            })
            .collect()
    }

    /// Round start: filtered noise swelling then fading.
    fn gen_whoosh() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.35) as usize;
        let mut rng: u32 = 12345;
        let mut smooth = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                // Simple LCG noise through a one-pole lowpass
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                smooth += (noise - smooth) * (0.05 + 0.25 * t);
                let env = (t * std::f32::consts::PI).sin();
                smooth * env * 0.6
            })
            .collect()
    }

    /// Level cleared: bell-like partials with a long decay.
    fn gen_bell() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.6) as usize;
        let base = 1047.0_f32; // C6
        (0..n)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = (-4.0 * t).exp();
                let wave = (t * base * TAU).sin() * 0.6
                    + (t * base * 2.76 * TAU).sin() * 0.25
                    + (t * base * 5.4 * TAU).sin() * 0.15;
                wave * env * 0.3
            })
            .collect()
    }

    /// Failure: low square buzz in two pulses.
    fn gen_buzzer() -> Vec<f32> {
        let pulse = (SAMPLE_RATE as f32 * 0.16) as usize;
        let gap = (SAMPLE_RATE as f32 * 0.05) as usize;
        let freq = 110.0_f32;
        let mut samples = Vec::with_capacity(pulse * 2 + gap);
        for p in 0..2 {
            for i in 0..pulse {
                let t = i as f32 / SAMPLE_RATE as f32;
                let square = if (t * freq).fract() < 0.5 { 1.0 } else { -1.0 };
                let env = 1.0 - (i as f32 / pulse as f32) * 0.4;
                samples.push(square * env * 0.18);
            }
            if p == 0 {
                samples.extend(std::iter::repeat(0.0).take(gap));
            }
        }
        samples
    }

    /// Switched into Extreme: falling shriek with vibrato.
    fn gen_scream() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.7) as usize;
        let mut phase = 0.0_f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let secs = i as f32 / SAMPLE_RATE as f32;
                let vibrato = (secs * 9.0 * TAU).sin() * 60.0;
                let freq = 1400.0 - t * 900.0 + vibrato;
                phase += freq / SAMPLE_RATE as f32;
                let wave = (phase * TAU).sin() * 0.7 + (phase * 2.0 * TAU).sin() * 0.3;
                let env = if t < 0.1 { t * 10.0 } else { (1.0 - t) / 0.9 };
                wave * env * 0.3
            })
            .collect()
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: wraps f32 samples into a valid WAV buffer
    // ════════════════════════════════════════════════════════════

    fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2; // 16-bit = 2 bytes per sample
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        // RIFF header
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        // fmt chunk
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        buf.extend_from_slice(&1u16.to_le_bytes());  // PCM format
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn wav_header_matches_payload() {
            let samples = gen_blip(440.0, 0.01, 0.5);
            let wav = make_wav(&samples);
            assert_eq!(&wav[0..4], b"RIFF");
            assert_eq!(&wav[8..12], b"WAVE");
            assert_eq!(wav.len(), 44 + samples.len() * 2);
        }

        #[test]
        fn generators_stay_in_range() {
            for s in [gen_whoosh(), gen_bell(), gen_buzzer(), gen_scream()] {
                assert!(!s.is_empty());
                assert!(s.iter().all(|x| x.abs() <= 1.0));
            }
        }
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _cue: crate::sim::event::Cue) {}
}
