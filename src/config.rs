//! `judge.toml` loading.
//!
//! ```toml
//! [limits]
//! budget = 1000000
//! max_call_depth = 1000
//!
//! [scorer]
//! preset = "static"        # or spell out the terms below
//! bias = -0.3
//! normalize = true
//! [[scorer.signals]]
//! kind = "structural"
//! weight = 1.5
//! exponent = 2.0
//! [scorer.trace]
//! threshold = 20
//! metric = "edit-distance"
//! ```

use crate::analysis::scorer::{Preset, ScorerConfig, Signal, TraceSettings};
use crate::runtime::interpreter::{EvalOptions, DEFAULT_MAX_CALL_DEPTH};
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const DEFAULT_BUDGET: u64 = 1_000_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JudgeConfig {
    pub limits: Limits,
    pub scorer: ScorerSection,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    pub budget: u64,
    pub max_call_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            budget: DEFAULT_BUDGET,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// Scorer settings as written. Fields left out fall back to the preset.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScorerSection {
    pub preset: Option<Preset>,
    pub bias: Option<f64>,
    pub normalize: Option<bool>,
    pub signals: Option<Vec<Signal>>,
    pub trace: Option<TraceSettings>,
}

impl JudgeConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: JudgeConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: JudgeConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when given, otherwise the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn eval_options(&self) -> EvalOptions {
        EvalOptions {
            budget: Some(self.limits.budget),
            max_call_depth: self.limits.max_call_depth,
            record_trace: false,
        }
    }

    /// Resolves the scorer. A preset named on the command line replaces the
    /// configured one and any terms spelled out next to it.
    pub fn scorer_config(&self, preset_override: Option<Preset>) -> ScorerConfig {
        let section = &self.scorer;
        let mut config = match preset_override {
            Some(preset) => preset.config(),
            None => {
                let mut config = section.preset.unwrap_or_default().config();
                if let Some(bias) = section.bias {
                    config.bias = bias;
                }
                if let Some(normalize) = section.normalize {
                    config.normalize = normalize;
                }
                if let Some(signals) = &section.signals {
                    config.signals = signals.clone();
                }
                config
            }
        };
        if let Some(trace) = section.trace {
            config.trace = trace;
        }
        config.max_call_depth = self.limits.max_call_depth;
        config
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| {
            Err(ConfigError::Invalid {
                message: message.to_string(),
            })
        };
        if self.limits.budget == 0 {
            return invalid("limits.budget must be positive");
        }
        if self.limits.max_call_depth == 0 {
            return invalid("limits.max_call_depth must be positive");
        }
        if let Some(signals) = &self.scorer.signals {
            if signals.is_empty() {
                return invalid("scorer.signals must not be empty");
            }
            if signals
                .iter()
                .any(|s| !s.weight.is_finite() || !s.exponent.is_finite())
            {
                return invalid("signal weights and exponents must be finite");
            }
        }
        if let Some(trace) = &self.scorer.trace {
            if trace.threshold == 0 {
                return invalid("scorer.trace.threshold must be positive");
            }
            if trace.budget == 0 {
                return invalid("scorer.trace.budget must be positive");
            }
        }
        Ok(())
    }
}
