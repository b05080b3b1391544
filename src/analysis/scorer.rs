use crate::analysis::{
    cfg::Cfg,
    frequency::CallCounts,
    normalize::normalize_program,
    similarity::{
        bounded_edit_distance, compress, frequency_similarity, structural_similarity,
        thresholded_similarity,
    },
};
use crate::language::ast::Program;
use crate::runtime::{
    interpreter::{EvalOptions, Interpreter, DEFAULT_MAX_CALL_DEPTH},
    stack::with_deep_stack,
    trace::TraceEvent,
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::io::{self, Cursor};
use std::str::FromStr;
use tracing::{debug, info, info_span, warn};

pub const DEFAULT_DISTANCE_THRESHOLD: usize = 20;
pub const DEFAULT_TRACE_BUDGET: u64 = 1_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Structural,
    Frequency,
    Trace,
    Size,
}

impl SignalKind {
    pub fn name(self) -> &'static str {
        match self {
            SignalKind::Structural => "structural",
            SignalKind::Frequency => "frequency",
            SignalKind::Trace => "trace",
            SignalKind::Size => "size",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraceMetric {
    #[default]
    EditDistance,
    LengthDifference,
}

/// One weighted term of the final score: `weight * value^exponent`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    #[serde(default = "one")]
    pub weight: f64,
    #[serde(default = "one")]
    pub exponent: f64,
}

fn one() -> f64 {
    1.0
}

impl Signal {
    pub fn new(kind: SignalKind, weight: f64, exponent: f64) -> Self {
        Self {
            kind,
            weight,
            exponent,
        }
    }
}

/// Distance settings shared by the `trace` and `size` signals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceSettings {
    pub threshold: usize,
    pub metric: TraceMetric,
    pub budget: u64,
}

impl Default for TraceSettings {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_DISTANCE_THRESHOLD,
            metric: TraceMetric::EditDistance,
            budget: DEFAULT_TRACE_BUDGET,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScorerConfig {
    pub bias: f64,
    /// Run the dead-code normalizer on both programs first.
    pub normalize: bool,
    pub signals: Vec<Signal>,
    pub trace: TraceSettings,
    pub max_call_depth: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Structural,
    #[default]
    Static,
    Trace,
    Size,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::Structural,
        Preset::Static,
        Preset::Trace,
        Preset::Size,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Structural => "structural",
            Preset::Static => "static",
            Preset::Trace => "trace",
            Preset::Size => "size",
        }
    }

    pub fn config(self) -> ScorerConfig {
        let (bias, normalize, signals) = match self {
            Preset::Structural => (
                0.0,
                false,
                vec![Signal::new(SignalKind::Structural, 1.0, 2.0)],
            ),
            Preset::Static => (
                -0.3,
                true,
                vec![
                    Signal::new(SignalKind::Structural, 1.5, 2.0),
                    Signal::new(SignalKind::Frequency, 0.4, 1.0),
                ],
            ),
            Preset::Trace => (0.0, false, vec![Signal::new(SignalKind::Trace, 1.0, 1.0)]),
            Preset::Size => (0.0, false, vec![Signal::new(SignalKind::Size, 1.0, 1.0)]),
        };
        ScorerConfig {
            bias,
            normalize,
            signals,
            trace: TraceSettings::default(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|preset| preset.name() == s)
            .ok_or_else(|| {
                let names: Vec<_> = Preset::ALL.iter().map(|preset| preset.name()).collect();
                let known = names.join(", ");
                format!("unknown preset `{s}` (expected one of: {known})")
            })
    }
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Preset::default().config()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SignalScore {
    pub kind: SignalKind,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Score {
    /// Final combined score in `[0, 1]`.
    pub value: f64,
    pub signals: Vec<SignalScore>,
}

impl Score {
    pub fn signal(&self, kind: SignalKind) -> Option<f64> {
        self.signals
            .iter()
            .find(|signal| signal.kind == kind)
            .map(|signal| signal.value)
    }
}

pub struct Scorer {
    config: ScorerConfig,
}

impl Scorer {
    pub fn new(config: ScorerConfig) -> Self {
        Self { config }
    }

    pub fn from_preset(preset: Preset) -> Self {
        Self::new(preset.config())
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Compares two programs. `input` feeds both runs of the trace signal.
    pub fn score(&self, first: &Program, second: &Program, input: &str) -> Score {
        let compare = || self.compare(first, second, input);
        with_deep_stack(&compare).unwrap_or_else(|err| {
            warn!(error = %err, "no worker thread, scoring on the caller's stack");
            compare()
        })
    }

    fn compare(&self, first: &Program, second: &Program, input: &str) -> Score {
        let normalize = self.config.normalize;
        let _span = info_span!("score", normalize).entered();
        let (first, second) = if normalize {
            let _stage = info_span!("normalize").entered();
            (
                Cow::Owned(normalize_program(first)),
                Cow::Owned(normalize_program(second)),
            )
        } else {
            (Cow::Borrowed(first), Cow::Borrowed(second))
        };

        let mut total = self.config.bias;
        let mut signals = Vec::with_capacity(self.config.signals.len());
        for signal in &self.config.signals {
            let value = match signals
                .iter()
                .find(|scored: &&SignalScore| scored.kind == signal.kind)
            {
                Some(scored) => scored.value,
                None => {
                    let value = self.signal(signal.kind, &first, &second, input);
                    signals.push(SignalScore {
                        kind: signal.kind,
                        value,
                    });
                    value
                }
            };
            total += signal.weight * value.powf(signal.exponent);
        }

        let value = compress(total.clamp(0.0, 1.0));
        info!(score = value, "similarity computed");
        Score { value, signals }
    }

    fn signal(&self, kind: SignalKind, first: &Program, second: &Program, input: &str) -> f64 {
        let _stage = info_span!("signal", kind = kind.name()).entered();
        let value = match kind {
            SignalKind::Structural => {
                let a = Cfg::build(first).edge_stats();
                let b = Cfg::build(second).edge_stats();
                debug!(?a, ?b, "edge statistics");
                structural_similarity(&a, &b)
            }
            SignalKind::Frequency => {
                let a = CallCounts::from_program(first);
                let b = CallCounts::from_program(second);
                debug!(%a, %b, "array call counts");
                frequency_similarity(&a, &b)
            }
            SignalKind::Trace => {
                let a = self.trace(first, input);
                let b = self.trace(second, input);
                let distance = self.distance(&a, &b);
                debug!(
                    first = a.len(),
                    second = b.len(),
                    distance,
                    "trace distance"
                );
                thresholded_similarity(distance, self.config.trace.threshold)
            }
            SignalKind::Size => {
                let distance = first.length().abs_diff(second.length());
                thresholded_similarity(distance, self.config.trace.threshold)
            }
        };
        debug!(value, "signal computed");
        value
    }

    fn distance(&self, a: &[TraceEvent], b: &[TraceEvent]) -> usize {
        match self.config.trace.metric {
            TraceMetric::EditDistance => bounded_edit_distance(a, b, self.config.trace.threshold),
            TraceMetric::LengthDifference => a.len().abs_diff(b.len()),
        }
    }

    /// Runs `program` with tracing on. A failed run keeps the events recorded
    /// before the failure.
    fn trace(&self, program: &Program, input: &str) -> Vec<TraceEvent> {
        let options = EvalOptions {
            budget: Some(self.config.trace.budget),
            max_call_depth: self.config.max_call_depth,
            record_trace: true,
        };
        let mut interpreter =
            Interpreter::new(program, options, Cursor::new(input.as_bytes()), io::sink());
        if let Err(err) = interpreter.run() {
            warn!(error = %err, "traced run failed");
        }
        interpreter.into_trace()
    }
}
