//! Small conversions and RON/JSON persistence helpers for [`EngineConfig`].

use crate::config::EngineConfig;
use anyhow::{anyhow, Context};
use std::fs::File;
use std::path::Path;

pub const SPEED_OF_SOUND: f32 = 343.0; // m/s

/// converts a given amount of time into samples
pub fn seconds_to_samples(seconds: f32, sample_rate: u32) -> usize {
    (seconds * sample_rate as f32).round().max(1.0) as usize
}

/// converts a given distance into samples via the speed of sound
pub fn distance_to_samples(meters: f32, sample_rate: u32) -> usize {
    seconds_to_samples(meters / SPEED_OF_SOUND, sample_rate)
}

pub fn samples_to_seconds(samples: usize, sample_rate: u32) -> f32 {
    samples as f32 / sample_rate as f32
}

/// returns meters
pub fn samples_to_distance(samples: usize, sample_rate: u32) -> f32 {
    samples_to_seconds(samples, sample_rate) * SPEED_OF_SOUND
}

/// loads an [`EngineConfig`] from a RON file on disk
pub fn load_engine_config(path: impl AsRef<Path>) -> Result<EngineConfig, anyhow::Error> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("failed to open \"{}\"", path.display()))?;
    ron::de::from_reader(file).map_err(|e| anyhow!("failed to parse \"{}\": {}", path.display(), e))
}

/// writes an [`EngineConfig`] to a RON file on disk, pretty-printed
pub fn save_engine_config(config: &EngineConfig, path: impl AsRef<Path>) -> Result<(), anyhow::Error> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("failed to create \"{}\"", path.display()))?;
    ron::ser::to_writer_pretty(file, config, ron::ser::PrettyConfig::default())
        .with_context(|| format!("failed to write \"{}\"", path.display()))?;
    Ok(())
}

/// loads an [`EngineConfig`] from a JSON file on disk, the alternate
/// interchange format for tooling that doesn't speak RON
pub fn load_engine_config_json(path: impl AsRef<Path>) -> Result<EngineConfig, anyhow::Error> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("failed to open \"{}\"", path.display()))?;
    serde_json::from_reader(file).with_context(|| format!("failed to parse \"{}\"", path.display()))
}

/// writes an [`EngineConfig`] to a JSON file on disk, pretty-printed
pub fn save_engine_config_json(config: &EngineConfig, path: impl AsRef<Path>) -> Result<(), anyhow::Error> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("failed to create \"{}\"", path.display()))?;
    serde_json::to_writer_pretty(file, config)
        .with_context(|| format!("failed to write \"{}\"", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_round_trips_through_samples() {
        let sample_rate = 48000;
        let meters = 2.0;
        let samples = distance_to_samples(meters, sample_rate);
        let back = samples_to_distance(samples, sample_rate);
        assert!((back - meters).abs() < 0.05);
    }

    #[test]
    fn seconds_to_samples_is_at_least_one() {
        assert_eq!(seconds_to_samples(0.0, 48000), 1);
    }

    #[test]
    fn load_engine_config_reports_missing_file() {
        let err = load_engine_config("/nonexistent/path/to/engine.esc").unwrap_err();
        assert!(err.to_string().contains("failed to open"));
    }
}
