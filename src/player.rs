//! Real-time playback of baked sample banks: pitch-shifts between the
//! closest two rpm-bracketing descriptors per channel and cross-mixes the
//! three channels (crankshaft, ignition, exhaust) with independently
//! slewed volumes and a shared slewed playback rpm.

use crate::bank::{Bank, BankParseError, Descriptor};
use log::warn;

/// One loaded channel: its rpm-ordered descriptors, the PCM16 stereo
/// payload they index into, and one running phase per descriptor.
struct Channel {
    descriptors: Vec<Descriptor>,
    pcm: Vec<i16>,
    phases: Vec<f32>,
    gain: f32,
    target_gain: f32,
}

impl Channel {
    fn empty() -> Channel {
        Channel {
            descriptors: Vec::new(),
            pcm: Vec::new(),
            phases: Vec::new(),
            gain: 0.0,
            target_gain: 0.0,
        }
    }

    fn from_bank(bank: Bank) -> Channel {
        let n = bank.descriptors.len();
        Channel {
            descriptors: bank.descriptors,
            pcm: bank.pcm,
            phases: vec![0.0; n],
            gain: 0.0,
            target_gain: 0.0,
        }
    }

    fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// samples `descriptor` at normalized `phase ∈ [0,1)` via linear
    /// interpolation between the left channel of two adjacent frames
    fn sample(&self, descriptor: &Descriptor, phase: f32) -> f32 {
        let len = descriptor.len().max(1) as f32;
        let time = phase * len;
        let i = time as u32;
        let j = i + 1;
        let fract = time.fract();

        let len_u = descriptor.len().max(1);
        let a = self.pcm[(descriptor.start_frame + i % len_u) as usize * 2];
        let b = self.pcm[(descriptor.start_frame + j % len_u) as usize * 2];

        let a = a as f32 / 32768.0;
        let b = b as f32 / 32768.0;
        a * (1.0 - fract) + b * fract
    }

    /// advances every descriptor's phase, selects the rpm-bracketing pair
    /// and returns their blended sample
    fn step(&mut self, rpm: f32, sample_rate: u32, dt: f32) -> f32 {
        if self.is_empty() {
            return 0.0;
        }

        for (descriptor, phase) in self.descriptors.iter().zip(self.phases.iter_mut()) {
            let sample_rate_ratio = sample_rate as f32 / descriptor.len().max(1) as f32;
            *phase = (*phase + sample_rate_ratio * (rpm / descriptor.rpm.max(1.0)) * dt).fract();
        }

        let n = self.descriptors.len();
        if n == 1 {
            return self.sample(&self.descriptors[0], self.phases[0]);
        }

        let mut k = 0;
        while k + 1 < n && self.descriptors[k + 1].rpm < rpm {
            k += 1;
        }
        let k = k.min(n - 2);

        let lo = &self.descriptors[k];
        let hi = &self.descriptors[k + 1];
        let t = ((rpm - lo.rpm) / (hi.rpm - lo.rpm)).clamp(0.0, 1.0);

        let lo_sample = self.sample(lo, self.phases[k]);
        let hi_sample = self.sample(hi, self.phases[k + 1]);
        lo_sample * (1.0 - t) + hi_sample * t
    }

    /// slews `gain` toward `target_gain` at `rate` units/second; a negative
    /// rate snaps immediately
    fn slew_gain(&mut self, rate: f32, dt: f32) {
        if rate < 0.0 {
            self.gain = self.target_gain;
        } else {
            let max_step = rate * dt;
            self.gain += (self.target_gain - self.gain).clamp(-max_step, max_step);
        }
    }
}

/// Top-level playback state: three channels, current/target rpm (slewed),
/// per-channel and master gain.
pub struct SampleBankPlayer {
    sample_rate: u32,
    crankshaft: Channel,
    ignition: Channel,
    exhaust: Channel,

    rpm: f32,
    target_rpm: f32,
    pub rpm_blend: f32,
    pub volume_blend: f32,
    pub master_volume: f32,
}

impl SampleBankPlayer {
    pub fn new(sample_rate: u32) -> SampleBankPlayer {
        SampleBankPlayer {
            sample_rate,
            crankshaft: Channel::empty(),
            ignition: Channel::empty(),
            exhaust: Channel::empty(),
            rpm: 0.0,
            target_rpm: 0.0,
            rpm_blend: 4000.0,
            volume_blend: 8.0,
            master_volume: 1.0,
        }
    }

    /// parses and loads a bank into one of the three channels. On parse
    /// failure the error is logged and the channel is cleared, matching
    /// the "logged as a warning; affected channel cleared" policy.
    pub fn load_crankshaft(&mut self, bytes: &[u8]) {
        self.crankshaft = Self::load_channel(bytes, "crankshaft");
    }

    pub fn load_ignition(&mut self, bytes: &[u8]) {
        self.ignition = Self::load_channel(bytes, "ignition");
    }

    pub fn load_exhaust(&mut self, bytes: &[u8]) {
        self.exhaust = Self::load_channel(bytes, "exhaust");
    }

    fn load_channel(bytes: &[u8], name: &str) -> Channel {
        match Bank::parse(bytes) {
            Ok(bank) => Channel::from_bank(bank),
            Err(e) => {
                warn!("failed to parse {} bank: {}", name, e);
                Channel::empty()
            }
        }
    }

    pub fn try_load_crankshaft(&mut self, bytes: &[u8]) -> Result<(), BankParseError> {
        let bank = Bank::parse(bytes)?;
        self.crankshaft = Channel::from_bank(bank);
        Ok(())
    }

    pub fn set_rpm(&mut self, rpm: f32) {
        self.target_rpm = rpm;
    }

    pub fn set_crankshaft_volume(&mut self, volume: f32) {
        self.crankshaft.target_gain = volume;
    }

    pub fn set_ignition_volume(&mut self, volume: f32) {
        self.ignition.target_gain = volume;
    }

    pub fn set_exhaust_volume(&mut self, volume: f32) {
        self.exhaust.target_gain = volume;
    }

    /// fills `out` (interleaved stereo, `[-1, 1]`) with `out.len()/2` frames
    pub fn fill(&mut self, out: &mut [f32]) {
        let dt = 1.0 / self.sample_rate as f32;
        let rpm_blend = self.rpm_blend;
        let volume_blend = self.volume_blend;
        let sample_rate = self.sample_rate;

        for frame in out.chunks_exact_mut(2) {
            if rpm_blend < 0.0 {
                self.rpm = self.target_rpm;
            } else {
                let max_step = rpm_blend * dt;
                self.rpm += (self.target_rpm - self.rpm).clamp(-max_step, max_step);
            }

            self.crankshaft.slew_gain(volume_blend, dt);
            self.ignition.slew_gain(volume_blend, dt);
            self.exhaust.slew_gain(volume_blend, dt);

            let mixed = self.crankshaft.step(self.rpm, sample_rate, dt) * self.crankshaft.gain
                + self.ignition.step(self.rpm, sample_rate, dt) * self.ignition.gain
                + self.exhaust.step(self.rpm, sample_rate, dt) * self.exhaust.gain;

            let mixed = mixed * self.master_volume;
            frame[0] = mixed;
            frame[1] = mixed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::Bank;

    fn sine_bank(rpm: f32, len: usize) -> Bank {
        let pcm: Vec<i16> = (0..len)
            .flat_map(|i| {
                let s = ((i as f32 / len as f32) * std::f32::consts::TAU).sin();
                let v = (s * 32767.0) as i16;
                vec![v, v]
            })
            .collect();
        Bank {
            padding_frames: 0,
            descriptors: vec![Descriptor {
                rpm,
                start_frame: 0,
                end_frame: len as u32,
            }],
            pcm,
        }
    }

    fn two_point_bank() -> Bank {
        let low = sine_bank(1000.0, 100);
        let high = sine_bank(4000.0, 25);
        let mut pcm = low.pcm.clone();
        pcm.extend(high.pcm.iter());
        Bank {
            padding_frames: 0,
            descriptors: vec![
                Descriptor {
                    rpm: 1000.0,
                    start_frame: 0,
                    end_frame: 100,
                },
                Descriptor {
                    rpm: 4000.0,
                    start_frame: 100,
                    end_frame: 125,
                },
            ],
            pcm,
        }
    }

    #[test]
    fn missing_bank_is_silent() {
        let mut player = SampleBankPlayer::new(48000);
        player.set_rpm(2000.0);
        player.set_crankshaft_volume(1.0);
        let mut buf = vec![0.0f32; 200];
        player.fill(&mut buf);
        assert!(buf.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn bad_bank_bytes_are_logged_and_cleared() {
        let mut player = SampleBankPlayer::new(48000);
        player.load_crankshaft(&[0, 0, 0]);
        assert!(player.crankshaft.is_empty());
    }

    #[test]
    fn higher_rpm_selects_higher_pitched_descriptor() {
        let bank = two_point_bank();
        let mut player = SampleBankPlayer::new(48000);
        player.rpm_blend = -1.0; // snap
        player.try_load_crankshaft(&bank.to_bytes()).unwrap();
        player.set_crankshaft_volume(1.0);

        player.set_rpm(1000.0);
        let mut low_buf = vec![0.0f32; 4096 * 2];
        player.fill(&mut low_buf);
        let low_crossings = zero_crossings(&low_buf);

        player.set_rpm(4000.0);
        let mut high_buf = vec![0.0f32; 4096 * 2];
        player.fill(&mut high_buf);
        let high_crossings = zero_crossings(&high_buf);

        assert!(high_crossings > low_crossings);
    }

    fn zero_crossings(stereo: &[f32]) -> usize {
        stereo
            .chunks_exact(2)
            .map(|f| f[0])
            .collect::<Vec<_>>()
            .windows(2)
            .filter(|w| w[0].signum() != w[1].signum())
            .count()
    }
}
