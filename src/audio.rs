//! Pull-style host interface: rebuilds the engine on demand, mixes the
//! three channels, removes DC offset, and keeps the output gain-normalized
//! via a slewed peak-seeking auto-gain.

use crate::config::EngineConfig;
use crate::gen::LowPassFilter;

/// Owns an [`EngineConfig`] and produces stereo frames into a host-owned
/// buffer. Rebuilds the underlying engine lazily, the first time `fill` is
/// called after a config mutation.
pub struct AudioGenerator {
    pub config: EngineConfig,
    dc_lp: LowPassFilter,
    gain: f32,
    pub waveguides_dampened: bool,
}

impl AudioGenerator {
    pub fn new(config: EngineConfig) -> AudioGenerator {
        let sample_rate = config.sample_rate;
        AudioGenerator {
            config,
            dc_lp: LowPassFilter::new(4.0, sample_rate),
            gain: 1.0,
            waveguides_dampened: false,
        }
    }

    /// fills `out` (interleaved stereo, length `2 * n`) with up to
    /// `max_frames` frames, `n = min(out.len() / 2, max_frames)`. Returns the
    /// number of frames written; on an invalid config the buffer is zeroed
    /// and `0` is returned, matching the "silent buffer, no throw" policy.
    pub fn fill(&mut self, out: &mut [f32], max_frames: usize) -> usize {
        let n = (out.len() / 2).min(max_frames);
        if n == 0 {
            return 0;
        }

        let dc_freq = self.config.dc_filter_frequency;
        let sample_rate = self.config.sample_rate;
        self.dc_lp.modify(dc_freq, sample_rate);

        let rpm = self.config.rpm;
        let intake_volume = self.config.intake_volume;
        let vibrations_volume = self.config.vibrations_volume;
        let exhaust_volume = self.config.exhaust_volume;
        let master_volume = self.config.volume;

        let engine = match self.config.build_engine() {
            Ok(engine) => engine,
            Err(_) => {
                out[..2 * n].iter_mut().for_each(|s| *s = 0.0);
                return 0;
            }
        };

        self.waveguides_dampened = false;

        let mut mono = vec![0.0f32; n];
        for sample in mono.iter_mut() {
            engine.advance_crankshaft(rpm, sample_rate);
            let (intake_ch, vibration_ch, exhaust_ch, dampened) = engine.gen();
            self.waveguides_dampened |= dampened;

            let mixed = (intake_ch * intake_volume
                + vibration_ch * vibrations_volume
                + exhaust_ch * exhaust_volume)
                * master_volume;

            *sample = mixed - self.dc_lp.filter(mixed);
        }

        let peak = mono.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        let target_gain = if peak > 1.0 { 1.0 / peak } else { 1.0 };
        let max_step = 1.0 / sample_rate as f32;

        for (i, sample) in mono.iter().enumerate() {
            self.gain += (target_gain - self.gain).clamp(-max_step, max_step);
            out[2 * i] = sample * self.gain;
            out[2 * i + 1] = sample * self.gain;
        }

        n
    }
}
