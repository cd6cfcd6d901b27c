//! ## DSP core ##
//!
//! Basic working principle: every sample-output generating object (`Cylinder`,
//! `WaveGuide`, `LoopBuffer`, ..) must first be `pop`ped, its output worked
//! upon, and only then `push`ed with the next input. Skipping either call
//! desynchronises the waveguide network by one sample.
//!
//! pop-all-sources -> mix collectors -> push-all-sinks, every tick.

use rand_core::{RngCore, SeedableRng};
use rand_xorshift::XorShiftRng;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

pub const PI2F: f32 = 2.0 * std::f32::consts::PI;
pub const PI4F: f32 = 4.0 * std::f32::consts::PI;
/// at this amplitude, a soft-saturating clamp is applied to fight waveguide feedback blow-ups
pub const WAVEGUIDE_MAX_AMP: f32 = 20.0;

// https://www.researchgate.net/profile/Stefano_Delle_Monache/publication/280086598_Physically_informed_car_engine_sound_synthesis_for_virtual_and_augmented_environments

/// One-pole IIR low pass filter.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct LowPassFilter {
    #[serde(skip)]
    pub alpha: f32,
    #[serde(skip)]
    pub last: f32,
}

impl LowPassFilter {
    pub fn new(freq: f32, sample_rate: u32) -> LowPassFilter {
        let mut lp = LowPassFilter { alpha: 0.0, last: 0.0 };
        lp.modify(freq, sample_rate);
        lp
    }

    /// recomputes `alpha` for a new cutoff frequency / sample rate, preserving `last`
    pub fn modify(&mut self, freq: f32, sample_rate: u32) {
        let w = PI2F * (1.0 / sample_rate as f32) * freq;
        self.alpha = w / (w + 1.0);
    }

    #[inline]
    pub fn filter(&mut self, sample: f32) -> f32 {
        let ret = (sample - self.last).mul_add(self.alpha, self.last);
        self.last = ret;
        ret
    }

    pub fn clear(&mut self) {
        self.last = 0.0;
    }
}

/// Fixed-capacity circular sample buffer.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct LoopBuffer {
    #[serde(skip)]
    pub data: Vec<f32>,
    #[serde(skip)]
    pub pos: usize,
}

impl LoopBuffer {
    /// `len` must be >= 1; a length of zero would make `pos % len` undefined.
    pub fn new(len: usize, _sample_rate: u32) -> LoopBuffer {
        LoopBuffer {
            data: vec![0.0; len.max(1)],
            pos: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// in seconds, at the given sample rate
    pub fn delay(&self, sample_rate: u32) -> f32 {
        self.data.len() as f32 / sample_rate as f32
    }

    /// writes the value at the current head. Call order per tick: `pop`, `push`, `advance`.
    #[inline]
    pub fn push(&mut self, value: f32) {
        let len = self.data.len();
        self.data[self.pos % len] = value;
    }

    /// reads the value one sample ahead of the head.
    #[inline]
    pub fn pop(&mut self) -> f32 {
        let len = self.data.len();
        self.data[(self.pos + 1) % len]
    }

    #[inline]
    pub fn advance(&mut self) {
        self.pos = (self.pos + 1) % self.data.len();
    }

    /// Resizes in place, preserving the prefix of existing samples and
    /// linearly fading the remaining tail from the old last sample to the
    /// old first sample, so the resized ring has no step discontinuity.
    pub fn resize(&mut self, new_len: usize, _sample_rate: u32) {
        let new_len = new_len.max(1);
        if new_len == self.data.len() {
            return;
        }

        let mut new_data = vec![0.0; new_len];
        let min_len = self.data.len().min(new_len);
        new_data[..min_len].copy_from_slice(&self.data[..min_len]);

        if min_len < new_len {
            let a = *self.data.last().unwrap();
            let b = self.data[0];
            let span = (new_len - min_len) as f32;
            for (i, x) in new_data[min_len..].iter_mut().enumerate() {
                *x = a + (b - a) * i as f32 / span;
            }
        }

        self.data = new_data;
        self.pos %= self.data.len();
    }

    pub fn clear(&mut self) {
        self.data.iter_mut().for_each(|x| *x = 0.0);
        self.pos = 0;
    }
}

/// A symmetric bidirectional delay line modelling a pipe with two reflective
/// ends. `c0`/`c1` are the two chambers; `alpha` reflects end 1, `beta` end 0.
#[derive(Clone, Serialize, Deserialize)]
pub struct WaveGuide {
    // goes from x0 to x1
    pub c0: LoopBuffer,
    // goes from x1 to x0
    pub c1: LoopBuffer,
    /// reflection factor for the first value of the return tuple of `pop`
    pub alpha: f32,
    /// reflection factor for the second value of the return tuple of `pop`
    pub beta: f32,

    #[serde(skip)]
    c1_out: f32,
    #[serde(skip)]
    c0_out: f32,
}

impl WaveGuide {
    pub fn new(len: usize, alpha: f32, beta: f32, sample_rate: u32) -> WaveGuide {
        WaveGuide {
            c0: LoopBuffer::new(len, sample_rate),
            c1: LoopBuffer::new(len, sample_rate),
            alpha,
            beta,
            c1_out: 0.0,
            c0_out: 0.0,
        }
    }

    /// clamps `sample` with a smooth soft-saturator once `|sample|` exceeds
    /// `WAVEGUIDE_MAX_AMP`, returning whether dampening was applied.
    #[inline]
    pub fn dampen(sample: f32) -> (f32, bool) {
        let sample_abs = sample.abs();
        if sample_abs > WAVEGUIDE_MAX_AMP {
            (
                sample.signum() * (-1.0 / (sample_abs - WAVEGUIDE_MAX_AMP + 1.0) + 1.0 + WAVEGUIDE_MAX_AMP),
                true,
            )
        } else {
            (sample, false)
        }
    }

    /// returns `(c1_emission, c0_emission, dampened)`
    pub fn pop(&mut self) -> (f32, f32, bool) {
        let (c1_out, dampened_c1) = WaveGuide::dampen(self.c1.pop());
        let (c0_out, dampened_c0) = WaveGuide::dampen(self.c0.pop());
        self.c1_out = c1_out;
        self.c0_out = c0_out;

        (
            self.c1_out * (1.0 - self.alpha.abs()),
            self.c0_out * (1.0 - self.beta.abs()),
            dampened_c1 | dampened_c0,
        )
    }

    pub fn push(&mut self, x0_in: f32, x1_in: f32) {
        let c0_in = self.c1_out * self.alpha + x0_in;
        let c1_in = self.c0_out * self.beta + x1_in;

        self.c0.push(c0_in);
        self.c1.push(c1_in);
        self.c0.advance();
        self.c1.advance();
    }

    /// resizes both chambers in place, e.g. after a sample-rate or pipe-length change
    pub fn resize(&mut self, len: usize, sample_rate: u32) {
        self.c0.resize(len, sample_rate);
        self.c1.resize(len, sample_rate);
    }

    pub fn clear(&mut self) {
        self.c0.clear();
        self.c1.clear();
        self.c1_out = 0.0;
        self.c0_out = 0.0;
    }
}

/// Reproducible white noise source. Not shared across engines: each
/// `EngineCore` owns its own, seeded independently.
pub struct Noise {
    inner: XorShiftRng,
}

impl Default for Noise {
    fn default() -> Self {
        Noise::new_seeded(
            SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64 ^ (d.as_nanos() >> 64) as u64)
                .unwrap_or(0x2545F4914F6CDD1D),
        )
    }
}

impl Noise {
    pub fn new_seeded(seed: u64) -> Noise {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&seed.to_le_bytes());
        bytes[8..].copy_from_slice(&seed.rotate_left(32).to_le_bytes());
        Noise { inner: XorShiftRng::from_seed(bytes) }
    }

    #[inline]
    pub fn step(&mut self) -> f32 {
        self.inner.next_u32() as f32 / (std::u32::MAX as f32 / 2.0) - 1.0
    }
}

fn intake_valve(crank_pos: f32) -> f32 {
    if 0.0 < crank_pos && crank_pos < 0.25 {
        (crank_pos * PI4F).sin()
    } else {
        0.0
    }
}

fn exhaust_valve(crank_pos: f32) -> f32 {
    if 0.75 < crank_pos && crank_pos < 1.0 {
        -(crank_pos * PI4F).sin()
    } else {
        0.0
    }
}

fn piston_motion(crank_pos: f32) -> f32 {
    (crank_pos * PI4F).cos()
}

fn fuel_ignition(crank_pos: f32, ignition_time: f32) -> f32 {
    if 0.5 < crank_pos && crank_pos < ignition_time / 2.0 + 0.5 {
        (PI2F * ((crank_pos - 0.5) / ignition_time)).sin()
    } else {
        0.0
    }
}

/// One audio cylinder: three waveguides (intake, exhaust, extractor) plus
/// crank-position-driven valve modulation and combustion excitation.
/// ```text
/// Labels:                                                     \/ Extractor
///                    b      a            a      b           a    b
/// (Intake Collector) <==|IV|> (Cylinder) <|EV|==> (Exhaust) <====> (Exhaust collector)
///
/// a   b
/// <===>   - WaveGuide with alpha / beta sides, alpha controls the reflectiveness of that side
///
/// |IV|    - Intake valve modulation function for this side of the WaveGuide (alpha)
/// |EV|    - Exhaust valve modulation function for this side of the WaveGuide (alpha)
/// ```
#[derive(Serialize, Deserialize, Clone)]
pub struct Cylinder {
    /// offset of this cylinder's piston crank, in [0, 1)
    pub crank_offset: f32,
    pub intake_waveguide: WaveGuide,
    pub exhaust_waveguide: WaveGuide,
    /// waveguide from the far end of the exhaust waveguide to the exhaust collector
    pub extractor_waveguide: WaveGuide,

    pub intake_open_refl: f32,
    pub intake_closed_refl: f32,
    pub exhaust_open_refl: f32,
    pub exhaust_closed_refl: f32,

    pub piston_motion_factor: f32,
    pub ignition_factor: f32,
    /// time it takes for the fuel to ignite, in crank cycles (0.0 - 1.0)
    pub ignition_time: f32,

    #[serde(skip)]
    cyl_sound: f32,
    #[serde(skip)]
    extractor_exhaust: f32,
}

impl Cylinder {
    /// builds a cylinder from its waveguides and static excitation/reflection
    /// parameters, with all transient scratch state zeroed
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        crank_offset: f32,
        intake_waveguide: WaveGuide,
        exhaust_waveguide: WaveGuide,
        extractor_waveguide: WaveGuide,
        intake_open_refl: f32,
        intake_closed_refl: f32,
        exhaust_open_refl: f32,
        exhaust_closed_refl: f32,
        piston_motion_factor: f32,
        ignition_factor: f32,
        ignition_time: f32,
    ) -> Cylinder {
        Cylinder {
            crank_offset,
            intake_waveguide,
            exhaust_waveguide,
            extractor_waveguide,
            intake_open_refl,
            intake_closed_refl,
            exhaust_open_refl,
            exhaust_closed_refl,
            piston_motion_factor,
            ignition_factor,
            ignition_time,
            cyl_sound: 0.0,
            extractor_exhaust: 0.0,
        }
    }

    /// returns `(intake, exhaust, vibration, any waveguide dampened)`
    #[inline]
    pub(crate) fn pop(
        &mut self,
        crank_pos: f32,
        exhaust_manifold: f32,
        intake_valve_shift: f32,
        exhaust_valve_shift: f32,
    ) -> (f32, f32, f32, bool) {
        let crank = (crank_pos + self.crank_offset).rem_euclid(1.0);

        self.cyl_sound = piston_motion(crank) * self.piston_motion_factor
            + fuel_ignition(crank, self.ignition_time) * self.ignition_factor;

        let in_valve = intake_valve((crank + intake_valve_shift).rem_euclid(1.0));
        let ex_valve = exhaust_valve((crank + exhaust_valve_shift).rem_euclid(1.0));

        self.intake_waveguide.alpha =
            self.intake_closed_refl + (self.intake_open_refl - self.intake_closed_refl) * in_valve;
        self.exhaust_waveguide.alpha =
            self.exhaust_closed_refl + (self.exhaust_open_refl - self.exhaust_closed_refl) * ex_valve;

        let in_ret = self.intake_waveguide.pop();
        let ex_ret = self.exhaust_waveguide.pop();
        let extractor_ret = self.extractor_waveguide.pop();

        self.extractor_exhaust = extractor_ret.0;
        self.extractor_waveguide.push(ex_ret.1, exhaust_manifold);

        (
            in_ret.1,
            extractor_ret.1,
            self.cyl_sound,
            in_ret.2 | ex_ret.2 | extractor_ret.2,
        )
    }

    /// called after `pop` and after the core has summed its collectors
    pub(crate) fn push(&mut self, intake_manifold: f32) {
        let ex_in = (1.0 - self.exhaust_waveguide.alpha.abs()) * self.cyl_sound * 0.5;
        self.exhaust_waveguide.push(ex_in, self.extractor_exhaust);

        let in_in = (1.0 - self.intake_waveguide.alpha.abs()) * self.cyl_sound * 0.5;
        self.intake_waveguide.push(in_in, intake_manifold);
    }

    fn clear(&mut self) {
        self.intake_waveguide.clear();
        self.exhaust_waveguide.clear();
        self.extractor_waveguide.clear();
        self.cyl_sound = 0.0;
        self.extractor_exhaust = 0.0;
    }
}

/// One straight pipe waveguide plus a parallel bank of cavity waveguides.
/// Cavity order is stable but observationally irrelevant beyond ordering
/// within the sum.
#[derive(Serialize, Deserialize, Clone)]
pub struct Muffler {
    pub straight_pipe: WaveGuide,
    pub cavities: Vec<WaveGuide>,
}

impl Muffler {
    fn clear(&mut self) {
        self.straight_pipe.clear();
        self.cavities.iter_mut().for_each(WaveGuide::clear);
    }
}

/// Owns cylinders, muffler, noise sources, filters; advances crankshaft
/// phase and mixes intake / vibration / exhaust channels.
#[derive(Serialize, Deserialize)]
pub struct EngineCore {
    pub cylinders: Vec<Cylinder>,
    pub muffler: Muffler,

    #[serde(skip)]
    pub intake_noise: Noise,
    pub intake_noise_factor: f32,
    pub intake_noise_lp: LowPassFilter,

    pub engine_vibration_filter: LowPassFilter,

    /// valve timing shift, -0.5 - 0.5
    pub intake_valve_shift: f32,
    /// valve timing shift, -0.5 - 0.5
    pub exhaust_valve_shift: f32,

    pub crankshaft_fluctuation: f32,
    pub crankshaft_fluctuation_lp: LowPassFilter,
    #[serde(skip)]
    pub crankshaft_noise: Noise,

    /// crankshaft position, 0.0-1.0
    #[serde(skip)]
    pub crankshaft_pos: f32,
    #[serde(skip)]
    exhaust_collector: f32,
    #[serde(skip)]
    intake_collector: f32,
}

impl EngineCore {
    /// builds an engine core with no running history: zeroed collectors,
    /// fresh crankshaft position, default-seeded noise sources
    pub(crate) fn new(
        cylinders: Vec<Cylinder>,
        muffler: Muffler,
        intake_noise_factor: f32,
        intake_noise_lp: LowPassFilter,
        engine_vibration_filter: LowPassFilter,
        intake_valve_shift: f32,
        exhaust_valve_shift: f32,
        crankshaft_fluctuation: f32,
        crankshaft_fluctuation_lp: LowPassFilter,
    ) -> EngineCore {
        EngineCore {
            cylinders,
            muffler,
            intake_noise: Noise::default(),
            intake_noise_factor,
            intake_noise_lp,
            engine_vibration_filter,
            intake_valve_shift,
            exhaust_valve_shift,
            crankshaft_fluctuation,
            crankshaft_fluctuation_lp,
            crankshaft_noise: Noise::default(),
            crankshaft_pos: 0.0,
            exhaust_collector: 0.0,
            intake_collector: 0.0,
        }
    }

    /// advances the crankshaft phase by one sample at the given rpm / sample rate
    #[inline]
    pub fn advance_crankshaft(&mut self, rpm: f32, sample_rate: u32) {
        let inc = rpm / (sample_rate as f32 * 120.0);
        self.crankshaft_pos = (self.crankshaft_pos + inc).rem_euclid(1.0);
    }

    /// generates one sample's worth of audio.
    /// returns `(intake, vibration, exhaust, any waveguide dampened)`
    pub fn gen(&mut self) -> (f32, f32, f32, bool) {
        let intake_noise_sample =
            self.intake_noise_lp.filter(self.intake_noise.step()) * self.intake_noise_factor;

        let num_cyl = self.cylinders.len() as f32;

        let last_exhaust = self.exhaust_collector / num_cyl;
        self.exhaust_collector = 0.0;
        self.intake_collector = 0.0;

        let jitter = self.crankshaft_fluctuation_lp.filter(self.crankshaft_noise.step());

        let mut vibration = 0.0;
        let mut cylinder_dampened = false;

        for cylinder in self.cylinders.iter_mut() {
            let (cyl_intake, cyl_exhaust, cyl_vib, dampened) = cylinder.pop(
                self.crankshaft_pos + self.crankshaft_fluctuation * jitter,
                last_exhaust,
                self.intake_valve_shift,
                self.exhaust_valve_shift,
            );

            self.intake_collector += cyl_intake;
            self.exhaust_collector += cyl_exhaust;
            vibration += cyl_vib;
            cylinder_dampened |= dampened;
        }

        // parallel input to the exhaust straight pipe; alpha end is at the exhaust collector
        let straight_ret = self.muffler.straight_pipe.pop();

        // alpha end is at straight pipe end (beta)
        let mut cavity_c1 = 0.0;
        let mut cavity_c0 = 0.0;
        let mut cavity_dampened = false;

        for cavity in self.muffler.cavities.iter_mut() {
            let ret = cavity.pop();
            cavity_c1 += ret.0;
            cavity_c0 += ret.1;
            cavity_dampened |= ret.2;
        }

        // pop-all-sources above, push-all-sinks below

        for cylinder in self.cylinders.iter_mut() {
            cylinder.push(
                self.intake_collector / num_cyl
                    + intake_noise_sample * intake_valve((self.crankshaft_pos + cylinder.crank_offset).rem_euclid(1.0)),
            );
        }

        self.muffler.straight_pipe.push(self.exhaust_collector, cavity_c1);
        // the post-mix return tap for the next tick's manifold feedback, not recorder state
        self.exhaust_collector += straight_ret.0;

        let num_cavities = self.muffler.cavities.len() as f32;
        for cavity in self.muffler.cavities.iter_mut() {
            cavity.push(straight_ret.1 / num_cavities, 0.0);
        }

        vibration = self.engine_vibration_filter.filter(vibration);

        (
            self.intake_collector,
            vibration,
            cavity_c0,
            straight_ret.2 | cylinder_dampened | cavity_dampened,
        )
    }

    /// zeroes every waveguide, cylinder transient, collector and filter state
    pub fn clear(&mut self) {
        self.cylinders.iter_mut().for_each(Cylinder::clear);
        self.muffler.clear();
        self.intake_noise_lp.clear();
        self.engine_vibration_filter.clear();
        self.crankshaft_fluctuation_lp.clear();
        self.exhaust_collector = 0.0;
        self.intake_collector = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_buffer_round_trip() {
        let len = 4;
        let mut lb = LoopBuffer::new(len, 48000);
        let v = 1.0;

        // the value pushed in the first (pop, push, advance) round resurfaces
        // from `pop` exactly `len` rounds later
        let mut last_popped = 0.0;
        for i in 0..len {
            last_popped = lb.pop();
            lb.push(if i == 0 { v } else { 0.0 });
            lb.advance();
        }

        assert_eq!(last_popped, v);
    }

    #[test]
    fn waveguide_zero_reflection_is_one_sided_delay() {
        let len = 4;
        let mut wg = WaveGuide::new(len, 0.0, 0.0, 48000);
        wg.push(1.0, 0.0);

        // `len - 2` more full ticks close the gap, then the next pop sees the
        // value pushed `len` ticks ago
        for _ in 0..len - 2 {
            wg.pop();
            wg.push(0.0, 0.0);
        }
        let (_c1, c0, dampened) = wg.pop();
        assert_eq!(c0, 1.0);
        assert!(!dampened);
    }

    #[test]
    fn dampening_activates_past_threshold() {
        let (sample, dampened) = WaveGuide::dampen(WAVEGUIDE_MAX_AMP + 0.001);
        assert!(dampened);
        assert!(sample.is_finite());

        let (sample, dampened) = WaveGuide::dampen(WAVEGUIDE_MAX_AMP - 0.001);
        assert!(!dampened);
        assert_eq!(sample, WAVEGUIDE_MAX_AMP - 0.001);
    }

    #[test]
    fn dampening_clamp_is_continuous_at_boundary() {
        let (below, _) = WaveGuide::dampen(WAVEGUIDE_MAX_AMP - 1e-4);
        let (above, _) = WaveGuide::dampen(WAVEGUIDE_MAX_AMP + 1e-4);
        assert!((below - above).abs() < 1e-2);
    }

    // `closed_refl` near +-1 means a closed valve fully reflects (no transmission,
    // since push uses `1 - |alpha|`); `open_refl` is the reflection once the valve
    // curve opens the junction up.
    fn one_cylinder(sample_rate: u32, intake_noise_factor: f32, crankshaft_fluctuation: f32) -> EngineCore {
        let speed_of_sound = 343.0;
        let seconds_to_samples = |s: f32| ((s * sample_rate as f32).max(1.0)) as usize;

        EngineCore {
            cylinders: vec![Cylinder {
                crank_offset: 0.0,
                intake_waveguide: WaveGuide::new(seconds_to_samples(0.7 / speed_of_sound), 1.0, -0.5, sample_rate),
                exhaust_waveguide: WaveGuide::new(seconds_to_samples(0.7 / speed_of_sound), 1.0, 0.1, sample_rate),
                extractor_waveguide: WaveGuide::new(seconds_to_samples(1.0 / speed_of_sound), 0.0, 0.7, sample_rate),
                intake_open_refl: -0.2,
                intake_closed_refl: 1.0,
                exhaust_open_refl: -0.2,
                exhaust_closed_refl: 1.0,
                piston_motion_factor: 0.6,
                ignition_factor: 1.9,
                ignition_time: 0.2,
                cyl_sound: 0.0,
                extractor_exhaust: 0.0,
            }],
            muffler: Muffler {
                straight_pipe: WaveGuide::new(seconds_to_samples(2.0 / speed_of_sound), -0.2, -0.2, sample_rate),
                cavities: vec![WaveGuide::new(seconds_to_samples(0.3 / speed_of_sound), -0.5, -0.5, sample_rate)],
            },
            intake_noise: Noise::new_seeded(42),
            intake_noise_factor,
            intake_noise_lp: LowPassFilter::new(2000.0, sample_rate),
            engine_vibration_filter: LowPassFilter::new(300.0, sample_rate),
            intake_valve_shift: 0.0,
            exhaust_valve_shift: 0.0,
            crankshaft_fluctuation,
            crankshaft_fluctuation_lp: LowPassFilter::new(350.0, sample_rate),
            crankshaft_noise: Noise::new_seeded(1337),
            crankshaft_pos: 0.0,
            exhaust_collector: 0.0,
            intake_collector: 0.0,
        }
    }

    #[test]
    fn silent_init_at_zero_rpm() {
        // noise, crankshaft fluctuation and combustion excitation all off: a
        // fresh, unconfigured engine has nothing driving the (fully-reflecting,
        // hence silent) closed valves.
        let mut engine = one_cylinder(22050, 0.0, 0.0);
        engine.cylinders[0].piston_motion_factor = 0.0;
        engine.cylinders[0].ignition_factor = 0.0;
        for _ in 0..1024 {
            engine.advance_crankshaft(0.0, 22050);
            let (intake, vibration, exhaust, dampened) = engine.gen();
            assert!(intake.abs() < 1e-3);
            assert!(vibration.abs() < 1e-3);
            assert!(exhaust.abs() < 1e-3);
            assert!(!dampened);
        }
    }

    #[test]
    fn gen_never_produces_nan_or_infinity() {
        let mut engine = one_cylinder(22050, 0.6, 0.17);
        for _ in 0..22050 {
            engine.advance_crankshaft(3000.0, 22050);
            let (intake, vibration, exhaust, _) = engine.gen();
            assert!(intake.is_finite());
            assert!(vibration.is_finite());
            assert!(exhaust.is_finite());
        }
    }

    #[test]
    fn clear_then_gen_is_deterministic_given_fixed_seed() {
        let mut a = one_cylinder(22050, 0.6, 0.17);
        let mut b = one_cylinder(22050, 0.6, 0.17);
        a.clear();
        b.clear();
        // re-seed identically since `clear` does not touch the noise sources
        a.intake_noise = Noise::new_seeded(42);
        a.crankshaft_noise = Noise::new_seeded(1337);
        b.intake_noise = Noise::new_seeded(42);
        b.crankshaft_noise = Noise::new_seeded(1337);

        for _ in 0..256 {
            a.advance_crankshaft(1500.0, 22050);
            b.advance_crankshaft(1500.0, 22050);
            assert_eq!(a.gen(), b.gen());
        }
    }
}
