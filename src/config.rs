//! Run options: which engine, which bottleneck direction, and how the model is shaped.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ConfigurationError;
use crate::solver::Engine;

/// Which bottleneck the objective targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Bottleneck {
    /// Minimize the heaviest bin load.
    #[default]
    Minimax,
    /// Maximize the lightest bin load.
    Maximin,
}

impl Bottleneck {
    pub fn as_str(self) -> &'static str {
        match self {
            Bottleneck::Minimax => "minimax",
            Bottleneck::Maximin => "maximin",
        }
    }
}

impl std::fmt::Display for Bottleneck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Bottleneck {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minimax" => Ok(Bottleneck::Minimax),
            "maximin" => Ok(Bottleneck::Maximin),
            _ => Err(ConfigurationError::UnknownObjective(s.to_string())),
        }
    }
}

/// Options read from the `options:` section of a problem document.
///
/// Every field is optional in the document; command line flags override it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    pub engine: Engine,
    pub objective: Bottleneck,
    /// Add `load <= capacity` for every bin that declares a capacity.
    pub enforce_capacities: bool,
    /// Bound the bottleneck variable by the average and heaviest item.
    pub tighten_bounds: bool,
    /// Time limit in seconds. `None` means no limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<f64>,
    /// Let the engine write its own log.
    pub verbose: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            engine: Engine::default(),
            objective: Bottleneck::default(),
            enforce_capacities: false,
            tighten_bounds: true,
            time_limit: None,
            verbose: false,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_engine(mut self, engine: Engine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_objective(mut self, objective: Bottleneck) -> Self {
        self.objective = objective;
        self
    }

    pub fn with_enforced_capacities(mut self, enabled: bool) -> Self {
        self.enforce_capacities = enabled;
        self
    }

    pub fn with_tightened_bounds(mut self, enabled: bool) -> Self {
        self.tighten_bounds = enabled;
        self
    }

    pub fn with_time_limit(mut self, seconds: f64) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    pub fn with_verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match self.time_limit {
            Some(seconds) if !seconds.is_finite() || seconds <= 0.0 => {
                Err(ConfigurationError::InvalidTimeLimit(seconds))
            }
            _ => Ok(()),
        }
    }

    /// The subset of options the engine adapter cares about.
    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            time_limit: self.time_limit,
            verbose: self.verbose,
        }
    }
}

/// Engine parameters passed to [`crate::solver::solve`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolverConfig {
    /// Time limit in seconds. `None` means no limit.
    pub time_limit: Option<f64>,
    pub verbose: bool,
}
