use crate::ecosystem::EcosystemConfig;
use crate::sandpile::SandpileConfig;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Engine constants loaded from a `key=value` file. Missing keys keep their defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tuning {
    pub sandpile: SandpileConfig,
    pub ecosystem: EcosystemConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TuningError {
    Io(String),
    Parse { line: usize, message: String },
}

impl fmt::Display for TuningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Parse { line, message } => write!(f, "parse error at line {line}: {message}"),
        }
    }
}

impl std::error::Error for TuningError {}

impl Tuning {
    pub fn load(path: Option<&Path>) -> Result<Self, TuningError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|e| TuningError::Io(e.to_string()))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, TuningError> {
        let mut tuning = Self::default();
        for (line_idx, raw) in text.lines().enumerate() {
            let line_no = line_idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(TuningError::Parse {
                    line: line_no,
                    message: "expected <key>=<value>".to_string(),
                });
            };
            tuning
                .apply(key.trim(), value.trim())
                .map_err(|message| TuningError::Parse {
                    line: line_no,
                    message,
                })?;
        }
        tuning.validate()?;
        Ok(tuning)
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<(), String> {
        let s = &mut self.sandpile;
        let e = &mut self.ecosystem;
        match key {
            "sandpile.max_waves" => s.max_waves = num(key, value)?,
            "sandpile.max_topples_per_wave" => s.max_topples_per_wave = num(key, value)?,
            "sandpile.bass_rise_threshold" => s.bass_rise_threshold = num(key, value)?,
            "sandpile.burst_scale" => s.burst_scale = num(key, value)?,
            "sandpile.drip_interval" => s.drip_interval = num(key, value)?,
            "sandpile.treble_jump_threshold" => s.treble_jump_threshold = num(key, value)?,
            "sandpile.treble_floor" => s.treble_floor = num(key, value)?,
            "sandpile.quake_radius_min" => s.quake_radius_min = num(key, value)?,
            "sandpile.quake_radius_max" => s.quake_radius_max = num(key, value)?,
            "sandpile.quake_scatter" => s.quake_scatter = num(key, value)?,
            "sandpile.initial_grains" => s.initial_grains = num(key, value)?,
            "sandpile.topple_fade_per_sec" => s.topple_fade_per_sec = num(key, value)?,

            "lenia.kernel_radius" => e.kernel_radius = num(key, value)?,
            "lenia.mu" => e.mu = num(key, value)?,
            "lenia.sigma" => e.sigma = num(key, value)?,
            "lenia.alpha" => e.alpha = num(key, value)?,
            "lenia.drift_amplitude" => e.drift_amplitude = num(key, value)?,
            "lenia.tile_size" => e.tile_size = num(key, value)?,
            "lenia.activation_threshold" => e.activation_threshold = num(key, value)?,
            "lenia.full_update_share" => e.full_update_share = num(key, value)?,

            "ecosystem.feeding_threshold" => e.feeding_threshold = num(key, value)?,
            "ecosystem.feeding_rate" => e.feeding_rate = num(key, value)?,
            "ecosystem.static_energy_drain" => e.static_energy_drain = num(key, value)?,
            "ecosystem.static_feeding_bonus" => e.static_feeding_bonus = num(key, value)?,
            "ecosystem.predation_factor" => e.predation_factor = num(key, value)?,
            "ecosystem.max_gliders" => e.max_gliders = num(key, value)?,
            "ecosystem.max_glider_age" => e.max_glider_age = num(key, value)?,
            "ecosystem.max_statics" => e.max_statics = num(key, value)?,
            "ecosystem.maintenance_interval" => e.maintenance_interval = num(key, value)?,
            "ecosystem.critical_mass_ratio" => e.critical_mass_ratio = num(key, value)?,
            "ecosystem.moderate_mass_ratio" => e.moderate_mass_ratio = num(key, value)?,
            "ecosystem.min_life_cells" => e.min_life_cells = num(key, value)?,
            "ecosystem.beat_spawn_threshold" => e.beat_spawn_threshold = num(key, value)?,
            _ => return Err(format!("unknown key '{key}'")),
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), TuningError> {
        let s = &self.sandpile;
        let e = &self.ecosystem;
        let invalid = |message: &str| -> Result<(), TuningError> {
            Err(TuningError::Parse {
                line: 0,
                message: message.to_string(),
            })
        };
        if s.max_waves == 0 || s.max_topples_per_wave == 0 {
            return invalid("sandpile wave limits must be positive");
        }
        if s.quake_radius_min == 0 || s.quake_radius_min > s.quake_radius_max {
            return invalid("sandpile.quake_radius_min must be in 1..=quake_radius_max");
        }
        if e.kernel_radius == 0 || e.tile_size == 0 {
            return invalid("lenia.kernel_radius and lenia.tile_size must be positive");
        }
        if !(e.sigma > 0.0) {
            return invalid("lenia.sigma must be > 0");
        }
        for (name, v) in [
            ("ecosystem.feeding_rate", e.feeding_rate),
            ("ecosystem.predation_factor", e.predation_factor),
            ("lenia.full_update_share", e.full_update_share),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return invalid(&format!("{name} must be within [0, 1]"));
            }
        }
        Ok(())
    }
}

fn num<T: FromStr>(key: &str, value: &str) -> Result<T, String> {
    value
        .parse::<T>()
        .map_err(|_| format!("invalid value '{value}' for {key}"))
}
