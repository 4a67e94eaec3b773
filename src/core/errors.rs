// src/core/errors.rs

use crate::core::coerce::CoerceError;
use crate::core::config_loader::ConfigError;
use thiserror::Error;

/// Errors raised while resolving and dispatching a command line.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A word did not name any subcommand and unmatched words are errors.
    #[error("Unknown command '{token}' under '{parent}'.")]
    UnmatchedCommand {
        /// The word typed.
        token: String,
        /// Dotted path of the command it was looked up under.
        parent: String,
    },
    /// A flag token matched nothing in the command chain.
    #[error("Unknown flag '{token}'.")]
    UnmatchedFlag {
        /// The token as typed, prefix included.
        token: String,
    },
    /// A required flag was never hit.
    #[error("Required flag '--{flag}' of '{command}' was not given.")]
    RequiredFlagMissing {
        /// Long title of the flag.
        flag: String,
        /// Dotted path of its owner.
        command: String,
    },
    /// A just-once flag was hit more than once.
    #[error("Flag '--{flag}' can only be given once.")]
    JustOnceViolated {
        /// Long title of the flag.
        flag: String,
    },
    /// A flag was given without one of its prerequisites.
    #[error("Flag '--{flag}' requires '--{missing}' to be given first.")]
    PrerequisiteMissing {
        /// Long title of the flag.
        flag: String,
        /// Long title of the missing prerequisite.
        missing: String,
    },
    /// A value-carrying flag ran out of input.
    #[error("Flag '--{flag}' expects a value.")]
    MissingValue {
        /// Long title of the flag.
        flag: String,
    },
    /// The text could not be coerced into the flag's shape.
    #[error("Invalid value for '--{flag}': {source}")]
    InvalidValue {
        /// Long title of the flag.
        flag: String,
        /// Coercion failure.
        #[source]
        source: CoerceError,
    },
    /// The value is not among the flag's valid arguments.
    #[error("Invalid choice '{value}' for '--{flag}' (expected one of: {choices}).")]
    InvalidChoice {
        /// Long title of the flag.
        flag: String,
        /// The rejected value.
        value: String,
        /// Comma-separated valid arguments.
        choices: String,
    },
    /// A numeric value fell outside the flag's range.
    #[error("Value {value} for '--{flag}' is outside {min}..={max}.")]
    OutOfRange {
        /// Long title of the flag.
        flag: String,
        /// The rejected value.
        value: String,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
    /// A command redirects to a path that does not exist.
    #[error("Command '{from}' redirects to unknown command '{to}'.")]
    BrokenRedirect {
        /// Dotted path of the redirecting command.
        from: String,
        /// The configured target.
        to: String,
    },
    /// A user hook failed.
    #[error("Hook failed: {0}")]
    Hook(String),
    /// A user handler or action failed.
    #[error(transparent)]
    Handler(anyhow::Error),
    /// The interactive editor or password prompt failed.
    #[error("Interactive input failed: {0}")]
    Input(String),
    /// Loading or applying configuration failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// More than one real error was collected.
    #[error("{} errors occurred:\n{}", .0.len(), render_list(.0))]
    Aggregate(Vec<EngineError>),
    /// Signal: stop processing quietly.
    #[error("stop requested")]
    ShouldStop,
    /// Signal: let the engine apply its default behavior.
    #[error("fallback requested")]
    ShouldFallback,
}

/// Result alias used across the engine.
pub type EngineResult<T> = Result<T, EngineError>;

fn render_list(errors: &[EngineError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl EngineError {
    /// True for control-flow signals that are not failures.
    pub fn is_signal(&self) -> bool {
        matches!(self, Self::ShouldStop | Self::ShouldFallback)
    }

    /// Unwraps an `EngineError` carried inside a handler's `anyhow::Error`.
    pub fn from_handler(err: anyhow::Error) -> Self {
        match err.downcast::<Self>() {
            Ok(engine) => engine,
            Err(other) => Self::Handler(other),
        }
    }
}

/// Collects errors from several stages, dropping signals.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: Vec<EngineError>,
}

impl ErrorCollector {
    /// Records `err` unless it is a signal.
    pub fn push(&mut self, err: EngineError) {
        if err.is_signal() {
            log::debug!("Dropping control signal: {}", err);
            return;
        }
        self.errors.push(err);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Surfaces nothing, the single error, or an aggregate.
    pub fn into_result(mut self) -> EngineResult<()> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(EngineError::Aggregate(self.errors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_filters_signals() {
        let mut c = ErrorCollector::default();
        c.push(EngineError::ShouldStop);
        c.push(EngineError::ShouldFallback);
        assert!(c.is_empty());
        assert!(c.into_result().is_ok());
    }

    #[test]
    fn test_collector_aggregates_multiple_errors() {
        let mut c = ErrorCollector::default();
        c.push(EngineError::Hook("first".into()));
        c.push(EngineError::Hook("second".into()));
        let err = c.into_result().unwrap_err();
        assert!(matches!(&err, EngineError::Aggregate(v) if v.len() == 2));
        assert!(err.to_string().contains("second"));
    }

    #[test]
    fn test_from_handler_recovers_engine_errors() {
        let wrapped = anyhow::Error::new(EngineError::ShouldStop);
        assert!(EngineError::from_handler(wrapped).is_signal());

        let plain = anyhow::anyhow!("disk full");
        assert!(matches!(
            EngineError::from_handler(plain),
            EngineError::Handler(_)
        ));
    }
}
