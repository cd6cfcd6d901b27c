//! Offline multi-RPM sweep recorder: bakes an [`EngineConfig`] into three
//! [`crate::bank::Bank`] byte blobs (crankshaft, ignition, exhaust), one per
//! engine output channel. Returns bytes; writing them to disk is the host's
//! job (see `src/bin/bake.rs`).

use crate::bank::{Bank, Descriptor};
use crate::config::EngineConfig;

/// which of `EngineCore::gen`'s three channels a bank segment was recorded
/// from. `Crankshaft` is the vibration channel (crank-driven engine-block
/// shake), `Ignition` is the intake/combustion breathing channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Crankshaft,
    Ignition,
    Exhaust,
}

pub struct SweepParams {
    pub min_rpm: f32,
    pub top_rpm: f32,
    pub sample_count: usize,
    pub duration_per_sample: f32,
    pub preheat_time: f32,
    pub fade_time: f32,
    pub padding_frames: usize,
}

impl Default for SweepParams {
    fn default() -> Self {
        SweepParams {
            min_rpm: 1000.0,
            top_rpm: 7000.0,
            sample_count: 32,
            duration_per_sample: 1.0,
            preheat_time: 32.0 / 60.0,
            fade_time: 0.05,
            padding_frames: 4,
        }
    }
}

fn clamp_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}

struct Segment {
    rpm: f32,
    crankshaft: Vec<f32>,
    ignition: Vec<f32>,
    exhaust: Vec<f32>,
}

/// one baked byte blob per channel, ready to write to a sibling `.bank` file
pub struct BakedBanks {
    pub crankshaft: Vec<u8>,
    pub ignition: Vec<u8>,
    pub exhaust: Vec<u8>,
}

impl BakedBanks {
    pub fn get(&self, kind: ChannelKind) -> &[u8] {
        match kind {
            ChannelKind::Crankshaft => &self.crankshaft,
            ChannelKind::Ignition => &self.ignition,
            ChannelKind::Exhaust => &self.exhaust,
        }
    }
}

/// sweeps `rpm` from `params.min_rpm` to `params.top_rpm` and bakes three
/// banks, one per engine output channel.
pub fn bake(
    config: &mut EngineConfig,
    params: &SweepParams,
) -> Result<BakedBanks, crate::config::ConfigError> {
    let sample_rate = config.sample_rate;
    let engine = config.build_engine()?;

    let preheat_frames = (params.preheat_time * sample_rate as f32) as usize;
    for _ in 0..preheat_frames {
        engine.advance_crankshaft(params.min_rpm, sample_rate);
        engine.gen();
    }

    let mut segments = Vec::with_capacity(params.sample_count);

    for i in 0..params.sample_count {
        let splf = if params.sample_count > 1 {
            i as f32 / (params.sample_count - 1) as f32
        } else {
            0.0
        };
        let rpm = params.min_rpm + (params.top_rpm - params.min_rpm) * splf;
        let rps = rpm / 60.0;

        let cycles = (params.duration_per_sample * rps).ceil().max(1.0);
        let frames = ((cycles / rps) * sample_rate as f32).round() as usize;

        let fade_cycles = (params.fade_time * rps).round().max(1.0);
        let fade_frames = ((fade_cycles / rps) * sample_rate as f32).round() as usize;

        let total = frames + fade_frames;
        let mut crankshaft = Vec::with_capacity(total);
        let mut ignition = Vec::with_capacity(total);
        let mut exhaust = Vec::with_capacity(total);

        for _ in 0..total {
            engine.advance_crankshaft(rpm, sample_rate);
            let (intake_ch, vibration_ch, exhaust_ch, _dampened) = engine.gen();
            ignition.push(intake_ch);
            crankshaft.push(vibration_ch);
            exhaust.push(exhaust_ch);
        }

        segments.push(Segment {
            rpm,
            crankshaft: crossfade(&crankshaft, frames, fade_frames),
            ignition: crossfade(&ignition, frames, fade_frames),
            exhaust: crossfade(&exhaust, frames, fade_frames),
        });
    }

    let crankshaft = build_bank(&segments, params.padding_frames, |s| &s.crankshaft);
    let ignition = build_bank(&segments, params.padding_frames, |s| &s.ignition);
    let exhaust = build_bank(&segments, params.padding_frames, |s| &s.exhaust);

    Ok(BakedBanks {
        crankshaft: crankshaft.to_bytes(),
        ignition: ignition.to_bytes(),
        exhaust: exhaust.to_bytes(),
    })
}

/// crossfades the tail `fade_frames` samples of `raw` (beyond `frames`) into
/// the head, producing a `frames`-long loop with no wrap-around discontinuity
fn crossfade(raw: &[f32], frames: usize, fade_frames: usize) -> Vec<f32> {
    let mut out = vec![0.0f32; frames];
    for i in 0..fade_frames.min(frames) {
        let t = i as f32 / fade_frames as f32;
        out[i] = raw[i] * t + raw[frames + i] * (1.0 - t);
    }
    out[fade_frames.min(frames)..frames].copy_from_slice(&raw[fade_frames.min(frames)..frames]);
    out
}

fn build_bank(
    segments: &[Segment],
    padding_frames: usize,
    channel: impl Fn(&Segment) -> &Vec<f32>,
) -> Bank {
    let mut descriptors = Vec::with_capacity(segments.len());
    let mut pcm = Vec::new();
    let mut cursor = 0u32;

    for segment in segments {
        let samples = channel(segment);
        let start_frame = cursor;
        let end_frame = start_frame + samples.len() as u32;

        for &s in samples {
            let v = clamp_to_i16(s);
            pcm.push(v);
            pcm.push(v);
        }
        for _ in 0..padding_frames {
            pcm.push(0);
            pcm.push(0);
        }

        descriptors.push(Descriptor {
            rpm: segment.rpm,
            start_frame,
            end_frame,
        });
        cursor = end_frame;
    }

    Bank {
        padding_frames: padding_frames as u32,
        descriptors,
        pcm,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CylinderConfig, EngineConfig};

    fn test_config() -> EngineConfig {
        EngineConfig {
            sample_rate: 8000,
            cylinders: vec![CylinderConfig::default()],
            ..EngineConfig::default()
        }
    }

    #[test]
    fn bake_produces_parseable_banks_with_matching_descriptor_count() {
        let mut config = test_config();
        let params = SweepParams {
            sample_count: 3,
            duration_per_sample: 0.05,
            preheat_time: 0.01,
            ..SweepParams::default()
        };
        let banks = bake(&mut config, &params).unwrap();

        for bytes in [&banks.crankshaft, &banks.ignition, &banks.exhaust] {
            let bank = Bank::parse(bytes).unwrap();
            assert_eq!(bank.descriptors.len(), params.sample_count);
            for w in bank.descriptors.windows(2) {
                assert!(w[0].rpm < w[1].rpm);
                assert!(w[0].end_frame <= w[1].start_frame);
            }
        }
    }

    #[test]
    fn crossfade_head_and_tail_meet_continuously() {
        let raw: Vec<f32> = (0..20).map(|i| (i as f32 * 0.1).sin()).collect();
        let out = crossfade(&raw, 16, 4);
        assert_eq!(out.len(), 16);
        // at i=0, output is entirely the wrapped-in tail value
        assert!((out[0] - raw[16]).abs() < 1e-6);
    }
}
