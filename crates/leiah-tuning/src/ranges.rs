//! Hyperparameter range definitions and their resolution from descriptor data.

use leiah_types::{display_value, value_kind, ParameterRangeError, Parameters};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// How the backend should sample a numeric range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScalingType {
    #[default]
    Auto,
    Linear,
    Logarithmic,
    ReverseLogarithmic,
}

impl FromStr for ScalingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Auto" => Ok(Self::Auto),
            "Linear" => Ok(Self::Linear),
            "Logarithmic" => Ok(Self::Logarithmic),
            "ReverseLogarithmic" => Ok(Self::ReverseLogarithmic),
            other => Err(format!(
                "unknown scaling type \"{other}\", expected one of Auto, Linear, Logarithmic, ReverseLogarithmic"
            )),
        }
    }
}

impl fmt::Display for ScalingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Auto => "Auto",
            Self::Linear => "Linear",
            Self::Logarithmic => "Logarithmic",
            Self::ReverseLogarithmic => "ReverseLogarithmic",
        };
        f.write_str(name)
    }
}

/// The search space of a single hyperparameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterRange {
    /// A fixed set of choices. Values are carried as strings, the way the
    /// tuning backend expects them.
    Categorical { values: Vec<String> },
    /// Integer range [min_value, max_value] inclusive.
    Integer {
        min_value: i64,
        max_value: i64,
        scaling_type: ScalingType,
    },
    /// Continuous range [min_value, max_value].
    Continuous {
        min_value: f64,
        max_value: f64,
        scaling_type: ScalingType,
    },
}

impl ParameterRange {
    /// The descriptor spelling of this range's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Categorical { .. } => "categorical",
            Self::Integer { .. } => "integer",
            Self::Continuous { .. } => "continuous",
        }
    }

    pub fn scaling_type(&self) -> Option<ScalingType> {
        match self {
            Self::Categorical { .. } => None,
            Self::Integer { scaling_type, .. } | Self::Continuous { scaling_type, .. } => {
                Some(*scaling_type)
            }
        }
    }

    /// Number of distinct values, or `None` for continuous ranges.
    pub fn cardinality(&self) -> Option<usize> {
        match self {
            Self::Categorical { values } => Some(values.len()),
            Self::Integer {
                min_value,
                max_value,
                ..
            } => max_value
                .checked_sub(*min_value)
                .and_then(|span| span.checked_add(1))
                .and_then(|count| usize::try_from(count).ok()),
            Self::Continuous { .. } => None,
        }
    }
}

/// A named parameter range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDef {
    pub name: String,
    pub range: ParameterRange,
}

/// The ranges of a tuning job, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterRanges {
    pub parameters: Vec<ParameterDef>,
}

impl ParameterRanges {
    pub fn new() -> Self {
        Self {
            parameters: Vec::new(),
        }
    }

    pub fn add_categorical<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameters.push(ParameterDef {
            name: name.into(),
            range: ParameterRange::Categorical {
                values: values.into_iter().map(Into::into).collect(),
            },
        });
        self
    }

    pub fn add_integer(
        mut self,
        name: impl Into<String>,
        min_value: i64,
        max_value: i64,
        scaling_type: ScalingType,
    ) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            range: ParameterRange::Integer {
                min_value,
                max_value,
                scaling_type,
            },
        });
        self
    }

    pub fn add_continuous(
        mut self,
        name: impl Into<String>,
        min_value: f64,
        max_value: f64,
        scaling_type: ScalingType,
    ) -> Self {
        self.parameters.push(ParameterDef {
            name: name.into(),
            range: ParameterRange::Continuous {
                min_value,
                max_value,
                scaling_type,
            },
        });
        self
    }

    /// Resolve the `hyperparameter_ranges` mapping of a tuning job.
    ///
    /// Entries are resolved in declaration order and the first invalid one
    /// aborts resolution.
    pub fn resolve(spec: &Parameters) -> Result<Self, ParameterRangeError> {
        let mut ranges = Self::new();
        for (name, entry) in spec {
            let range = resolve_range(name, entry)?;
            debug!("Resolved {} range for \"{}\"", range.type_name(), name);
            ranges.parameters.push(ParameterDef {
                name: name.clone(),
                range,
            });
        }
        Ok(ranges)
    }

    pub fn get(&self, name: &str) -> Option<&ParameterRange> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.range)
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterDef> {
        self.parameters.iter()
    }

    /// Total number of distinct combinations (returns `None` if any range is
    /// continuous).
    pub fn grid_size(&self) -> Option<usize> {
        let mut total: usize = 1;
        for param in &self.parameters {
            total = total.checked_mul(param.range.cardinality()?)?;
        }
        Some(total)
    }
}

fn resolve_range(name: &str, entry: &Value) -> Result<ParameterRange, ParameterRangeError> {
    let spec = match entry {
        Value::Object(map) => map,
        _ => {
            return Err(ParameterRangeError::MissingType {
                parameter: name.to_string(),
            })
        }
    };

    let parameter_type = match spec.get("type") {
        None | Some(Value::Null) => {
            return Err(ParameterRangeError::MissingType {
                parameter: name.to_string(),
            })
        }
        Some(value) => display_value(value),
    };

    match parameter_type.as_str() {
        "categorical" => {
            let values = required(name, "categorical", spec, "values")?;
            let values = match values {
                Value::Array(items) if !items.is_empty() => {
                    items.iter().map(display_value).collect()
                }
                Value::Array(_) => {
                    return Err(invalid(name, "values", "at least one value is required"))
                }
                other => {
                    return Err(invalid(
                        name,
                        "values",
                        &format!("expected a sequence, found {}", value_kind(other)),
                    ))
                }
            };
            Ok(ParameterRange::Categorical { values })
        }
        "integer" => {
            let min_value = integer_bound(name, spec, "min_value")?;
            let max_value = integer_bound(name, spec, "max_value")?;
            check_order(name, min_value as f64, max_value as f64)?;
            Ok(ParameterRange::Integer {
                min_value,
                max_value,
                scaling_type: scaling_type(name, spec)?,
            })
        }
        "continuous" => {
            let min_value = continuous_bound(name, spec, "min_value")?;
            let max_value = continuous_bound(name, spec, "max_value")?;
            check_order(name, min_value, max_value)?;
            Ok(ParameterRange::Continuous {
                min_value,
                max_value,
                scaling_type: scaling_type(name, spec)?,
            })
        }
        _ => Err(ParameterRangeError::UnsupportedType {
            parameter: name.to_string(),
            parameter_type,
        }),
    }
}

fn required<'a>(
    name: &str,
    parameter_type: &str,
    spec: &'a Parameters,
    attribute: &str,
) -> Result<&'a Value, ParameterRangeError> {
    spec.get(attribute)
        .filter(|v| !v.is_null())
        .ok_or_else(|| ParameterRangeError::MissingAttribute {
            parameter: name.to_string(),
            parameter_type: parameter_type.to_string(),
            attribute: attribute.to_string(),
        })
}

fn integer_bound(
    name: &str,
    spec: &Parameters,
    attribute: &str,
) -> Result<i64, ParameterRangeError> {
    let value = required(name, "integer", spec, attribute)?;
    if let Some(n) = value.as_i64() {
        return Ok(n);
    }
    // Whole floats such as `1.0` are accepted as integer bounds.
    match value.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 => {
            // i64::MAX as f64 rounds up to 2^63, which is already out of range.
            if f >= i64::MIN as f64 && f < i64::MAX as f64 {
                Ok(f as i64)
            } else {
                Err(invalid(name, attribute, &format!("{f} is out of the integer range")))
            }
        }
        Some(f) => Err(invalid(name, attribute, &format!("{f} is not a whole number"))),
        None => Err(invalid(
            name,
            attribute,
            &format!("expected a number, found {}", value_kind(value)),
        )),
    }
}

fn continuous_bound(
    name: &str,
    spec: &Parameters,
    attribute: &str,
) -> Result<f64, ParameterRangeError> {
    let value = required(name, "continuous", spec, attribute)?;
    match value.as_f64() {
        Some(f) if f.is_finite() => Ok(f),
        _ => Err(invalid(
            name,
            attribute,
            &format!("expected a finite number, found {}", display_value(value)),
        )),
    }
}

fn scaling_type(name: &str, spec: &Parameters) -> Result<ScalingType, ParameterRangeError> {
    match spec.get("scaling_type") {
        None | Some(Value::Null) => Ok(ScalingType::Auto),
        Some(value) => display_value(value)
            .parse()
            .map_err(|message: String| invalid(name, "scaling_type", &message)),
    }
}

fn check_order(name: &str, min_value: f64, max_value: f64) -> Result<(), ParameterRangeError> {
    if min_value > max_value {
        return Err(invalid(
            name,
            "min_value",
            &format!("{min_value} is greater than max_value {max_value}"),
        ));
    }
    Ok(())
}

fn invalid(name: &str, attribute: &str, message: &str) -> ParameterRangeError {
    ParameterRangeError::InvalidAttribute {
        parameter: name.to_string(),
        attribute: attribute.to_string(),
        message: message.to_string(),
    }
}
