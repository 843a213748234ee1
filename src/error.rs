//! Error types.

use crate::model::VarId;
use crate::solver::{Engine, SolveStatus};

/// Problems with the input data or the run options.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// The problem has no items.
    NoItems,
    /// The problem has no bins.
    NoBins,
    /// An item or bin has an empty identifier.
    EmptyIdentifier,
    /// Two items share an identifier.
    DuplicateItem(String),
    /// Two bins share an identifier.
    DuplicateBin(String),
    /// An item weight is negative or not finite.
    InvalidWeight { item: String, weight: f64 },
    /// A bin capacity is negative or not finite.
    InvalidCapacity { bin: String, capacity: f64 },
    /// Unknown engine name.
    UnknownEngine(String),
    /// Unknown objective direction.
    UnknownObjective(String),
    /// Time limit is not a positive finite number of seconds.
    InvalidTimeLimit(f64),
    /// The problem document could not be read.
    Unreadable { path: String, reason: String },
    /// The problem document could not be parsed.
    Malformed { reason: String },
    /// Bad command line usage.
    InvalidArgument(String),
}

impl ConfigurationError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            ConfigurationError::NoItems => "CONFIG_NO_ITEMS",
            ConfigurationError::NoBins => "CONFIG_NO_BINS",
            ConfigurationError::EmptyIdentifier => "CONFIG_EMPTY_ID",
            ConfigurationError::DuplicateItem(_) => "CONFIG_DUPLICATE_ITEM",
            ConfigurationError::DuplicateBin(_) => "CONFIG_DUPLICATE_BIN",
            ConfigurationError::InvalidWeight { .. } => "CONFIG_INVALID_WEIGHT",
            ConfigurationError::InvalidCapacity { .. } => "CONFIG_INVALID_CAPACITY",
            ConfigurationError::UnknownEngine(_) => "CONFIG_UNKNOWN_ENGINE",
            ConfigurationError::UnknownObjective(_) => "CONFIG_UNKNOWN_OBJECTIVE",
            ConfigurationError::InvalidTimeLimit(_) => "CONFIG_INVALID_TIME_LIMIT",
            ConfigurationError::Unreadable { .. } => "CONFIG_UNREADABLE",
            ConfigurationError::Malformed { .. } => "CONFIG_MALFORMED",
            ConfigurationError::InvalidArgument(_) => "CONFIG_INVALID_ARGUMENT",
        }
    }
}

impl std::fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigurationError::NoItems => write!(f, "[{}] Problem has no items", self.code()),
            ConfigurationError::NoBins => write!(f, "[{}] Problem has no bins", self.code()),
            ConfigurationError::EmptyIdentifier => {
                write!(f, "[{}] Identifiers must not be empty", self.code())
            }
            ConfigurationError::DuplicateItem(id) => {
                write!(f, "[{}] Item '{}' is declared twice", self.code(), id)
            }
            ConfigurationError::DuplicateBin(id) => {
                write!(f, "[{}] Bin '{}' is declared twice", self.code(), id)
            }
            ConfigurationError::InvalidWeight { item, weight } => write!(
                f,
                "[{}] Item '{}' has invalid weight {} (must be finite and >= 0)",
                self.code(),
                item,
                weight
            ),
            ConfigurationError::InvalidCapacity { bin, capacity } => write!(
                f,
                "[{}] Bin '{}' has invalid capacity {} (must be finite and >= 0)",
                self.code(),
                bin,
                capacity
            ),
            ConfigurationError::UnknownEngine(name) => write!(
                f,
                "[{}] Unknown engine '{}' (expected microlp, highs, cbc or glpk)",
                self.code(),
                name
            ),
            ConfigurationError::UnknownObjective(name) => write!(
                f,
                "[{}] Unknown objective '{}' (expected minimax or maximin)",
                self.code(),
                name
            ),
            ConfigurationError::InvalidTimeLimit(seconds) => write!(
                f,
                "[{}] Time limit {} is not a positive number of seconds",
                self.code(),
                seconds
            ),
            ConfigurationError::Unreadable { path, reason } => {
                write!(f, "[{}] Cannot read {}: {}", self.code(), path, reason)
            }
            ConfigurationError::Malformed { reason } => {
                write!(f, "[{}] Malformed problem document: {}", self.code(), reason)
            }
            ConfigurationError::InvalidArgument(msg) => write!(f, "[{}] {}", self.code(), msg),
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// Errors raised while assembling a [`crate::model::Model`].
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Model has no variables.
    EmptyModel,
    /// A term references a variable the model does not own.
    InvalidVariableId(VarId),
    /// Variable bounds are NaN or crossed.
    InvalidBounds { name: String, lower: f64, upper: f64 },
    /// A coefficient or right-hand side is not finite.
    InvalidCoefficient { name: String, value: f64 },
}

impl ModelError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            ModelError::EmptyModel => "MODEL_EMPTY",
            ModelError::InvalidVariableId(_) => "VARIABLE_INVALID_ID",
            ModelError::InvalidBounds { .. } => "VARIABLE_INVALID_BOUNDS",
            ModelError::InvalidCoefficient { .. } => "COEFFICIENT_INVALID",
        }
    }
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::EmptyModel => write!(f, "[{}] Model has no variables", self.code()),
            ModelError::InvalidVariableId(id) => write!(
                f,
                "[{}] Variable ID {} does not exist",
                self.code(),
                id.index()
            ),
            ModelError::InvalidBounds { name, lower, upper } => write!(
                f,
                "[{}] Variable '{}' bounds invalid: lower ({}) > upper ({})",
                self.code(),
                name,
                lower,
                upper
            ),
            ModelError::InvalidCoefficient { name, value } => write!(
                f,
                "[{}] '{}' has non-finite coefficient {}",
                self.code(),
                name,
                value
            ),
        }
    }
}

impl std::error::Error for ModelError {}

/// Internal consistency violations found while decoding a solve result.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The result does not carry an optimal solution.
    NotOptimal { status: SolveStatus },
    /// A variable value is missing from the result.
    MissingValue(VarId),
    /// An item has no non-zero indicator.
    Unassigned { item: String },
    /// An item has more than one non-zero indicator.
    MultipleBins { item: String, bins: Vec<String> },
    /// The engine's bottleneck variable disagrees with the realized loads.
    BottleneckMismatch { reported: f64, realized: f64 },
}

impl DecodeError {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            DecodeError::NotOptimal { .. } => "DECODE_NOT_OPTIMAL",
            DecodeError::MissingValue(_) => "DECODE_MISSING_VALUE",
            DecodeError::Unassigned { .. } => "DECODE_UNASSIGNED",
            DecodeError::MultipleBins { .. } => "DECODE_MULTIPLE_BINS",
            DecodeError::BottleneckMismatch { .. } => "DECODE_BOTTLENECK_MISMATCH",
        }
    }
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::NotOptimal { status } => write!(
                f,
                "[{}] Cannot decode a result with status {}",
                self.code(),
                status
            ),
            DecodeError::MissingValue(id) => write!(
                f,
                "[{}] No value for variable {}",
                self.code(),
                id.index()
            ),
            DecodeError::Unassigned { item } => {
                write!(f, "[{}] Item '{}' is not in any bin", self.code(), item)
            }
            DecodeError::MultipleBins { item, bins } => write!(
                f,
                "[{}] Item '{}' is in several bins: {}",
                self.code(),
                item,
                bins.join(", ")
            ),
            DecodeError::BottleneckMismatch { reported, realized } => write!(
                f,
                "[{}] Engine reported bottleneck {} but loads give {}",
                self.code(),
                reported,
                realized
            ),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Top-level error for the build → solve → decode pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Configuration(ConfigurationError),
    Model(ModelError),
    /// The engine is not compiled in, or it crashed.
    SolverUnavailable { engine: Engine, reason: String },
    /// No assignment satisfies the constraints.
    Infeasible,
    /// The engine stopped without proving optimality.
    NotSolved { status: SolveStatus },
    Decode(DecodeError),
    /// A report or model export could not be produced or written.
    Output { target: String, reason: String },
}

impl Error {
    /// Returns a semantic error code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Configuration(err) => err.code(),
            Error::Model(err) => err.code(),
            Error::SolverUnavailable { .. } => "SOLVER_UNAVAILABLE",
            Error::Infeasible => "SOLVER_INFEASIBLE",
            Error::NotSolved { status } => match status {
                SolveStatus::Unbounded => "SOLVER_UNBOUNDED",
                SolveStatus::TimeLimitReached => "SOLVER_TIME_LIMIT",
                _ => "SOLVER_NOT_SOLVED",
            },
            Error::Decode(err) => err.code(),
            Error::Output { .. } => "OUTPUT_WRITE_FAILED",
        }
    }

    /// Retrying with the same input cannot succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_) | Error::Model(_) | Error::Decode(_)
        )
    }

    /// The caller may retry with a different engine selection.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::SolverUnavailable { .. })
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Configuration(err) => err.fmt(f),
            Error::Model(err) => err.fmt(f),
            Error::SolverUnavailable { engine, reason } => write!(
                f,
                "[{}] Engine '{}' is unavailable: {}",
                self.code(),
                engine,
                reason
            ),
            Error::Infeasible => write!(f, "[{}] Problem is infeasible", self.code()),
            Error::NotSolved { status } => write!(
                f,
                "[{}] Engine stopped with status {}",
                self.code(),
                status
            ),
            Error::Decode(err) => err.fmt(f),
            Error::Output { target, reason } => {
                write!(f, "[{}] Cannot write {}: {}", self.code(), target, reason)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Configuration(err) => Some(err),
            Error::Model(err) => Some(err),
            Error::Decode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ConfigurationError> for Error {
    fn from(err: ConfigurationError) -> Self {
        Error::Configuration(err)
    }
}

impl From<ModelError> for Error {
    fn from(err: ModelError) -> Self {
        Error::Model(err)
    }
}

impl From<DecodeError> for Error {
    fn from(err: DecodeError) -> Self {
        Error::Decode(err)
    }
}
