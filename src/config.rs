//! ## Configuration surface ##
//!
//! `EngineConfig` is the all-parameter snapshot a host mutates freely;
//! mutation only ever sets a `dirty` flag. `build_engine` (called lazily by
//! `AudioGenerator::fill`) resizes/retunes an existing [`EngineCore`] in
//! place rather than discarding it, so waveguide contents and filter state
//! survive reconfiguration.

use crate::gen::{Cylinder, EngineCore, LowPassFilter, Muffler, WaveGuide};
use crate::utils::distance_to_samples;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("engine config has no cylinders")]
    NoCylinders,
    #[error("sample rate must be positive")]
    NonPositiveSampleRate,
}

/// One cylinder's static layout parameters (pipe lengths are distances in
/// meters; converted to waveguide sample lengths at build time).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CylinderConfig {
    pub crank_offset: f32,
    pub piston_motion_factor: f32,
    pub ignition_factor: f32,
    pub ignition_time: f32,
    pub intake_pipe_length: f32,
    pub exhaust_pipe_length: f32,
    pub extractor_pipe_length: f32,
}

impl Default for CylinderConfig {
    fn default() -> Self {
        CylinderConfig {
            crank_offset: 0.0,
            piston_motion_factor: 0.7,
            ignition_factor: 1.2,
            ignition_time: 0.2,
            intake_pipe_length: 1.0,
            exhaust_pipe_length: 1.5,
            extractor_pipe_length: 2.0,
        }
    }
}

/// One muffler cavity's static layout parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CavityConfig {
    pub cavity_length: f32,
}

/// All-parameter snapshot of an engine. Mutating any setter marks the
/// config dirty; [`EngineConfig::build_engine`] rebuilds the underlying
/// [`EngineCore`] on demand, reusing buffers where geometry is unchanged.
#[derive(Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    pub sample_rate: u32,
    pub rpm: f32,

    pub volume: f32,
    pub intake_volume: f32,
    pub exhaust_volume: f32,
    pub vibrations_volume: f32,
    pub dc_filter_frequency: f32,

    pub intake_noise_factor: f32,
    pub intake_noise_filter_frequency: f32,
    pub intake_valve_shift: f32,
    pub exhaust_valve_shift: f32,

    pub crankshaft_fluctuation: f32,
    pub crankshaft_fluctuation_filter_frequency: f32,
    pub vibrations_filter_frequency: f32,

    pub straight_pipe_length: f32,
    pub straight_pipe_extractor_side_refl: f32,
    pub straight_pipe_muffler_side_refl: f32,
    pub output_side_refl: f32,

    pub cylinder_intake_opened_refl: f32,
    pub cylinder_intake_closed_refl: f32,
    pub cylinder_exhaust_opened_refl: f32,
    pub cylinder_exhaust_closed_refl: f32,
    pub cylinder_intake_open_end_refl: f32,
    pub cylinder_extractor_open_end_refl: f32,

    pub cylinders: Vec<CylinderConfig>,
    pub muffler_elements: Vec<CavityConfig>,

    #[serde(skip)]
    dirty: bool,
    #[serde(skip)]
    engine: Option<EngineCore>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sample_rate: 44100,
            rpm: 800.0,

            volume: 1.0,
            intake_volume: 1.0,
            exhaust_volume: 1.0,
            vibrations_volume: 1.0,
            dc_filter_frequency: 4.0,

            intake_noise_factor: 0.2,
            intake_noise_filter_frequency: 600.0,
            intake_valve_shift: 0.0,
            exhaust_valve_shift: 0.0,

            crankshaft_fluctuation: 0.1,
            crankshaft_fluctuation_filter_frequency: 10.0,
            vibrations_filter_frequency: 400.0,

            straight_pipe_length: 2.0,
            straight_pipe_extractor_side_refl: 0.01,
            straight_pipe_muffler_side_refl: 0.5,
            output_side_refl: 0.7,

            cylinder_intake_opened_refl: -0.1,
            cylinder_intake_closed_refl: 0.98,
            cylinder_exhaust_opened_refl: -0.2,
            cylinder_exhaust_closed_refl: 0.98,
            cylinder_intake_open_end_refl: -0.2,
            cylinder_extractor_open_end_refl: -0.2,

            cylinders: vec![CylinderConfig::default()],
            muffler_elements: Vec::new(),

            dirty: true,
            engine: None,
        }
    }
}

impl EngineConfig {
    fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cylinders.is_empty() {
            return Err(ConfigError::NoCylinders);
        }
        if self.sample_rate == 0 {
            return Err(ConfigError::NonPositiveSampleRate);
        }
        Ok(())
    }

    /// Rebuilds the underlying engine in place if dirty, returning a
    /// reference to it. Resizes/retunes existing waveguides rather than
    /// discarding them, so running waveguide content survives a geometry
    /// change; cylinders/cavities beyond the new count are dropped, new
    /// ones are constructed fresh.
    pub fn build_engine(&mut self) -> Result<&mut EngineCore, ConfigError> {
        self.validate()?;

        if !self.dirty && self.engine.is_some() {
            return Ok(self.engine.as_mut().unwrap());
        }

        let sample_rate = self.sample_rate;

        let mut engine = self.engine.take().unwrap_or_else(|| {
            EngineCore::new(
                Vec::new(),
                Muffler {
                    straight_pipe: WaveGuide::new(1, 0.0, 0.0, sample_rate),
                    cavities: Vec::new(),
                },
                0.0,
                LowPassFilter::new(1.0, sample_rate),
                LowPassFilter::new(1.0, sample_rate),
                0.0,
                0.0,
                0.0,
                LowPassFilter::new(1.0, sample_rate),
            )
        });

        engine.intake_noise_factor = self.intake_noise_factor;
        engine
            .intake_noise_lp
            .modify(self.intake_noise_filter_frequency, sample_rate);
        engine
            .engine_vibration_filter
            .modify(self.vibrations_filter_frequency, sample_rate);
        engine.intake_valve_shift = self.intake_valve_shift;
        engine.exhaust_valve_shift = self.exhaust_valve_shift;
        engine.crankshaft_fluctuation = self.crankshaft_fluctuation;
        engine
            .crankshaft_fluctuation_lp
            .modify(self.crankshaft_fluctuation_filter_frequency, sample_rate);

        engine.cylinders.truncate(self.cylinders.len());
        while engine.cylinders.len() < self.cylinders.len() {
            let idx = engine.cylinders.len();
            let cyl_cfg = &self.cylinders[idx];
            engine.cylinders.push(Cylinder::new(
                cyl_cfg.crank_offset,
                WaveGuide::new(
                    distance_to_samples(cyl_cfg.intake_pipe_length, sample_rate),
                    1.0,
                    self.cylinder_intake_open_end_refl,
                    sample_rate,
                ),
                WaveGuide::new(
                    distance_to_samples(cyl_cfg.exhaust_pipe_length, sample_rate),
                    0.71,
                    0.06,
                    sample_rate,
                ),
                WaveGuide::new(
                    distance_to_samples(cyl_cfg.extractor_pipe_length, sample_rate),
                    0.0,
                    self.cylinder_extractor_open_end_refl,
                    sample_rate,
                ),
                self.cylinder_intake_opened_refl,
                self.cylinder_intake_closed_refl,
                self.cylinder_exhaust_opened_refl,
                self.cylinder_exhaust_closed_refl,
                cyl_cfg.piston_motion_factor,
                cyl_cfg.ignition_factor,
                cyl_cfg.ignition_time,
            ));
        }
        for (cylinder, cyl_cfg) in engine.cylinders.iter_mut().zip(self.cylinders.iter()) {
            cylinder.crank_offset = cyl_cfg.crank_offset;
            cylinder.piston_motion_factor = cyl_cfg.piston_motion_factor;
            cylinder.ignition_factor = cyl_cfg.ignition_factor;
            cylinder.ignition_time = cyl_cfg.ignition_time;
            cylinder.intake_open_refl = self.cylinder_intake_opened_refl;
            cylinder.intake_closed_refl = self.cylinder_intake_closed_refl;
            cylinder.exhaust_open_refl = self.cylinder_exhaust_opened_refl;
            cylinder.exhaust_closed_refl = self.cylinder_exhaust_closed_refl;
            cylinder.intake_waveguide.beta = self.cylinder_intake_open_end_refl;
            cylinder.exhaust_waveguide.alpha = 0.71;
            cylinder.exhaust_waveguide.beta = 0.06;
            cylinder.extractor_waveguide.beta = self.cylinder_extractor_open_end_refl;
            cylinder.intake_waveguide.resize(
                distance_to_samples(cyl_cfg.intake_pipe_length, sample_rate),
                sample_rate,
            );
            cylinder.exhaust_waveguide.resize(
                distance_to_samples(cyl_cfg.exhaust_pipe_length, sample_rate),
                sample_rate,
            );
            cylinder.extractor_waveguide.resize(
                distance_to_samples(cyl_cfg.extractor_pipe_length, sample_rate),
                sample_rate,
            );
        }

        engine.muffler.straight_pipe.alpha = self.straight_pipe_extractor_side_refl;
        engine.muffler.straight_pipe.beta = self.straight_pipe_muffler_side_refl;
        engine.muffler.straight_pipe.resize(
            distance_to_samples(self.straight_pipe_length, sample_rate),
            sample_rate,
        );

        engine.muffler.cavities.truncate(self.muffler_elements.len());
        while engine.muffler.cavities.len() < self.muffler_elements.len() {
            let idx = engine.muffler.cavities.len();
            engine.muffler.cavities.push(WaveGuide::new(
                distance_to_samples(self.muffler_elements[idx].cavity_length, sample_rate),
                0.0,
                self.output_side_refl,
                sample_rate,
            ));
        }
        for (cavity, cav_cfg) in engine
            .muffler
            .cavities
            .iter_mut()
            .zip(self.muffler_elements.iter())
        {
            cavity.beta = self.output_side_refl;
            cavity.resize(
                distance_to_samples(cav_cfg.cavity_length, sample_rate),
                sample_rate,
            );
        }

        self.engine = Some(engine);
        self.dirty = false;
        Ok(self.engine.as_mut().unwrap())
    }
}

macro_rules! dirty_setter {
    ($setter:ident, $field:ident, $ty:ty) => {
        impl EngineConfig {
            pub fn $setter(&mut self, value: $ty) {
                self.$field = value;
                self.mark_dirty();
            }
        }
    };
}

dirty_setter!(set_sample_rate, sample_rate, u32);
dirty_setter!(set_intake_noise_factor, intake_noise_factor, f32);
dirty_setter!(
    set_intake_noise_filter_frequency,
    intake_noise_filter_frequency,
    f32
);
dirty_setter!(set_intake_valve_shift, intake_valve_shift, f32);
dirty_setter!(set_exhaust_valve_shift, exhaust_valve_shift, f32);
dirty_setter!(set_crankshaft_fluctuation, crankshaft_fluctuation, f32);
dirty_setter!(
    set_crankshaft_fluctuation_filter_frequency,
    crankshaft_fluctuation_filter_frequency,
    f32
);
dirty_setter!(
    set_vibrations_filter_frequency,
    vibrations_filter_frequency,
    f32
);
dirty_setter!(set_straight_pipe_length, straight_pipe_length, f32);
dirty_setter!(
    set_straight_pipe_extractor_side_refl,
    straight_pipe_extractor_side_refl,
    f32
);
dirty_setter!(
    set_straight_pipe_muffler_side_refl,
    straight_pipe_muffler_side_refl,
    f32
);
dirty_setter!(set_output_side_refl, output_side_refl, f32);
dirty_setter!(set_cylinders, cylinders, Vec<CylinderConfig>);
dirty_setter!(set_muffler_elements, muffler_elements, Vec<CavityConfig>);

// `rpm`, mix volumes and `dc_filter_frequency` do not affect engine
// geometry; they're read directly by `AudioGenerator::fill` each tick and
// don't need to mark the engine dirty.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_no_cylinders() {
        let mut cfg = EngineConfig {
            cylinders: Vec::new(),
            ..EngineConfig::default()
        };
        assert_eq!(cfg.build_engine().unwrap_err(), ConfigError::NoCylinders);
    }

    #[test]
    fn rejects_zero_sample_rate() {
        let mut cfg = EngineConfig {
            sample_rate: 0,
            ..EngineConfig::default()
        };
        assert_eq!(
            cfg.build_engine().unwrap_err(),
            ConfigError::NonPositiveSampleRate
        );
    }

    #[test]
    fn build_engine_is_idempotent_when_clean() {
        let mut cfg = EngineConfig::default();
        cfg.build_engine().unwrap();
        assert!(!cfg.is_dirty());
        cfg.build_engine().unwrap();
        assert_eq!(cfg.engine.as_ref().unwrap().cylinders.len(), 1);
    }

    #[test]
    fn mutating_cylinders_marks_dirty_and_resizes() {
        let mut cfg = EngineConfig::default();
        cfg.build_engine().unwrap();
        cfg.set_cylinders(vec![CylinderConfig::default(), CylinderConfig::default()]);
        assert!(cfg.is_dirty());
        let engine = cfg.build_engine().unwrap();
        assert_eq!(engine.cylinders.len(), 2);
        assert!(!cfg.is_dirty());
    }
}
