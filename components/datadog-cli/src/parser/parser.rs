// Local crates
use crate::helpers::clock::{Clock, SystemClock};
use crate::parser::models::{DataPoint, Metric, MetricType};

// External crates
use std::num::ParseFloatError;
use tracing::instrument;

/// Parser error handling
/// - Every way the command line can fail to describe a metric. None of these
/// are recoverable; they are reported once and the process exits.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("not enough arguments. usage: datadog TYPE METRIC VALUE(S)...")]
    NotEnoughArguments,
    #[error("'{0}' is not a valid metric type. must be one of 'counter', or 'gauge'.")]
    InvalidType(String),
    #[error("invalid metric value {value:?}: {source}")]
    InvalidValue {
        value: String,
        source: ParseFloatError,
    },
    #[error("invalid metric value {value:?}: value is not a finite number")]
    NonFinite { value: String },
    #[error("no value(s)")]
    NoValues,
}

/// Turns `TYPE METRIC VALUE...` positional arguments into a [`Metric`].
///
/// Every value is stamped with the parser's clock at the moment it is
/// converted, so points produced by one invocation share (almost always) the
/// same second.
#[derive(Debug, Default)]
pub struct MetricParser<C: Clock = SystemClock> {
    clock: C,
}

impl<C: Clock> MetricParser<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// Map a metric type token to its submission semantics.
    ///
    /// Matching is case-sensitive:
    /// - `increment`, `incr`, `i`, `c`, `counter` -> [`MetricType::Counter`]
    /// - `gauge`, `g` -> [`MetricType::Gauge`]
    pub fn validate_type(token: &str) -> Result<MetricType, ValidationError> {
        match token {
            "increment" | "incr" | "i" | "c" | "counter" => Ok(MetricType::Counter),
            "gauge" | "g" => Ok(MetricType::Gauge),
            other => {
                tracing::error!(metric_type = %other, "Unsupported metric type token");
                Err(ValidationError::InvalidType(other.to_string()))
            }
        }
    }

    /// Convert a single value token into a timestamped point.
    ///
    /// `NaN`, infinities and literals outside the `f64` range are refused.
    pub fn create_data_point(&self, token: &str) -> Result<DataPoint, ValidationError> {
        let value = token.parse::<f64>().map_err(|source| {
            tracing::error!(value = %token, error = %source, "Metric value is not a number");
            ValidationError::InvalidValue {
                value: token.to_string(),
                source,
            }
        })?;
        if !value.is_finite() {
            tracing::error!(value = %token, "Metric value is not a finite number");
            return Err(ValidationError::NonFinite {
                value: token.to_string(),
            });
        }

        Ok(DataPoint {
            timestamp: self.clock.now_epoch_seconds(),
            value,
        })
    }

    /// Convert every value token, failing on the first one that is not a number.
    pub fn validate_and_convert_points<S: AsRef<str>>(
        &self,
        tokens: &[S],
    ) -> Result<Vec<DataPoint>, ValidationError> {
        if tokens.is_empty() {
            return Err(ValidationError::NoValues);
        }

        tokens
            .iter()
            .map(|token| self.create_data_point(token.as_ref()))
            .collect()
    }

    /// Validate positional arguments and build the metric to submit.
    #[instrument(
        name = "datadog_parser::parse",
        target = "parser::parser::MetricParser",
        skip_all,
        level = "debug"
    )]
    pub fn parse<S: AsRef<str>>(&self, args: &[S], tags: &str) -> Result<Metric, ValidationError> {
        tracing::debug!(
            positional_args = args.len(),
            tags = %tags,
            "Parsing metric submission from positional arguments"
        );

        let (metric_type, name, values) = match args {
            [metric_type, name, values @ ..] if !values.is_empty() => (metric_type, name, values),
            _ => {
                tracing::error!(positional_args = args.len(), "Not enough positional arguments");
                return Err(ValidationError::NotEnoughArguments);
            }
        };

        let metric = Metric {
            metric_type: Self::validate_type(metric_type.as_ref())?,
            name: name.as_ref().to_string(),
            points: self.validate_and_convert_points(values)?,
            tags: split_tags(tags),
        };

        tracing::debug!(
            metric_name = %metric.name,
            metric_type = %metric.metric_type,
            points = metric.points.len(),
            "Metric submission parsed"
        );
        Ok(metric)
    }
}

/// Split a `key:value,key2:value2` tag list on commas.
///
/// An empty list still produces one (empty) tag, mirroring a plain string split.
#[must_use]
pub fn split_tags(tags: &str) -> Vec<String> {
    tags.split(',').map(str::to_string).collect()
}
