use crate::{
    bind::BindError, config::ConfigError, convert::ConversionError, schedule::ScheduleError,
    schema::Column, strategy::StrategyError,
};
use std::fmt;
use thiserror::Error as ThisError;

/// Error type returned by user callbacks: constructors, setters, dictionary
/// add functions and cursors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

///
/// ErrorClass
///
/// Stable classification of a mapping failure. Compile-time classes are
/// never retried automatically; execution classes are per row.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorClass {
    Resolution,
    Binding,
    Conversion,
    Execution,
    Config,
    Internal,
}

impl ErrorClass {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Resolution => "resolution",
            Self::Binding => "binding",
            Self::Conversion => "conversion",
            Self::Execution => "execution",
            Self::Config => "config",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

///
/// MappingError
///

#[derive(Debug, ThisError)]
pub enum MappingError {
    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error(transparent)]
    Unmappable(#[from] UnmappableTypeError),

    #[error(transparent)]
    Bind(#[from] BindError),

    #[error(transparent)]
    UnboundColumns(#[from] UnboundColumnsError),

    #[error(transparent)]
    Column(#[from] ColumnMappingError),

    #[error(transparent)]
    Type(#[from] TypeMappingError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error("routine produces {actual}, which cannot be read as {expected}")]
    DestinationMismatch { expected: String, actual: String },

    #[error("mapping plan invariant violated: {0}")]
    Invariant(String),
}

impl MappingError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Strategy(_) | Self::Unmappable(_) => ErrorClass::Resolution,
            Self::Bind(_) | Self::UnboundColumns(_) => ErrorClass::Binding,
            Self::Column(err) => match err.cause {
                MappingCause::Conversion(_) => ErrorClass::Conversion,
                _ => ErrorClass::Execution,
            },
            Self::Type(_) => ErrorClass::Execution,
            Self::Config(_) => ErrorClass::Config,
            Self::Schedule(_) | Self::DestinationMismatch { .. } | Self::Invariant(_) => {
                ErrorClass::Internal
            }
        }
    }

    /// Index of the column that was in flight, if the failure is column-scoped.
    #[must_use]
    pub const fn column_index(&self) -> Option<usize> {
        match self {
            Self::Column(err) => Some(err.column.index),
            _ => None,
        }
    }

    /// The conversion failure behind a column-scoped error, if any.
    #[must_use]
    pub const fn conversion(&self) -> Option<&ConversionError> {
        match self {
            Self::Column(ColumnMappingError {
                cause: MappingCause::Conversion(err),
                ..
            })
            | Self::Type(TypeMappingError {
                cause: MappingCause::Conversion(err),
                ..
            }) => Some(err),
            _ => None,
        }
    }
}

///
/// UnmappableTypeError
///
/// Neither strategy accepted the destination; both diagnostics are kept.
///

#[derive(Debug, ThisError)]
#[error("{dictionary}\n{poco}")]
pub struct UnmappableTypeError {
    pub destination: String,
    pub dictionary: StrategyError,
    pub poco: StrategyError,
}

///
/// UnboundColumnsError
///
/// A POCO mapping left source columns unclaimed.
///

#[derive(Debug, ThisError)]
pub struct UnboundColumnsError {
    pub destination: String,
    pub unbound: Vec<Column>,
    pub bound: Vec<(Column, String)>,
}

impl fmt::Display for UnboundColumnsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unbound = self
            .unbound
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");

        writeln!(
            f,
            "Failed to map result set to {} because not all columns were bound.",
            self.destination
        )?;
        writeln!(f, "The following columns were not bound: {unbound}")?;
        write!(f, "The following columns were bound:")?;
        for (column, target) in &self.bound {
            write!(f, "\n\t{column} -> {target}")?;
        }

        Ok(())
    }
}

///
/// MappingCause
///
/// What actually failed while a routine was running.
///

#[derive(Debug, ThisError)]
pub enum MappingCause {
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("cursor read failed: {0}")]
    Cursor(#[source] BoxError),

    #[error("{0}")]
    Destination(#[source] BoxError),
}

///
/// ColumnMappingError
///

#[derive(Debug, ThisError)]
#[error("Could not map column {column} to {target}: {cause}")]
pub struct ColumnMappingError {
    pub column: Column,
    pub target: String,
    #[source]
    pub cause: MappingCause,
}

///
/// TypeMappingError
///
/// Failure with no column in flight, e.g. a constructor returned an error.
///

#[derive(Debug, ThisError)]
#[error("Could not map to type {destination}: {cause}")]
pub struct TypeMappingError {
    pub destination: String,
    #[source]
    pub cause: MappingCause,
}
