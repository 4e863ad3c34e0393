use serde::{Deserialize, Serialize};

use super::distribution::Distribution;
use crate::error::AssignmentError;

/// Declared type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Float,
    Integer,
    Bool,
    /// One of a fixed list of string options
    Enum,
}

impl ParamKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ParamKind::Float => "float",
            ParamKind::Integer => "integer",
            ParamKind::Bool => "bool",
            ParamKind::Enum => "enum",
        }
    }
}

/// A single parameter value.
///
/// Untagged so documents and assignments can write plain scalars. After
/// [`Parameter::coerce`] the variant always matches the parameter's kind:
/// `Float` for float, `Integer` for integer, `Bool` for bool and `Text` for
/// enum parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    fn describe(&self) -> String {
        match self {
            ParamValue::Bool(b) => format!("bool {b}"),
            ParamValue::Integer(i) => format!("integer {i}"),
            ParamValue::Float(f) => format!("float {f}"),
            ParamValue::Text(s) => format!("string \"{s}\""),
        }
    }

    /// Numeric view of a float, integer or bool value
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(f) => Some(*f),
            ParamValue::Integer(i) => Some(*i as f64),
            ParamValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            ParamValue::Text(_) => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Integer(i) => write!(f, "{i}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

/// A declared model parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParamKind,
    pub default: ParamValue,
    /// Allowed values of an enum parameter, in declaration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Present when the parameter is stochastic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution: Option<Distribution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Parameter {
    pub fn float(name: impl Into<String>, default: f64) -> Self {
        Self::new(name, ParamKind::Float, ParamValue::Float(default))
    }

    pub fn integer(name: impl Into<String>, default: i64) -> Self {
        Self::new(name, ParamKind::Integer, ParamValue::Integer(default))
    }

    pub fn boolean(name: impl Into<String>, default: bool) -> Self {
        Self::new(name, ParamKind::Bool, ParamValue::Bool(default))
    }

    pub fn enumeration(
        name: impl Into<String>,
        options: impl IntoIterator<Item = impl Into<String>>,
        default: impl Into<String>,
    ) -> Self {
        let mut parameter = Self::new(name, ParamKind::Enum, ParamValue::Text(default.into()));
        parameter.options = options.into_iter().map(Into::into).collect();
        parameter
    }

    fn new(name: impl Into<String>, kind: ParamKind, default: ParamValue) -> Self {
        Self {
            name: name.into(),
            kind,
            default,
            options: Vec::new(),
            distribution: None,
            description: None,
        }
    }

    #[must_use]
    pub fn with_distribution(mut self, distribution: Distribution) -> Self {
        self.distribution = Some(distribution);
        self
    }

    #[must_use]
    pub fn is_stochastic(&self) -> bool {
        self.distribution.is_some()
    }

    /// Human readable description of the accepted values
    #[must_use]
    pub fn expected(&self) -> String {
        match self.kind {
            ParamKind::Float => "a float".to_string(),
            ParamKind::Integer => "an integer".to_string(),
            ParamKind::Bool => "a bool".to_string(),
            ParamKind::Enum => format!("one of [{}]", self.options.join(", ")),
        }
    }

    /// Check `value` against the declared kind and normalize its variant.
    ///
    /// Integers are accepted for float parameters and integral floats for
    /// integer parameters; everything else must match exactly.
    pub fn coerce(&self, value: &ParamValue) -> Result<ParamValue, AssignmentError> {
        let coerced = match (self.kind, value) {
            (ParamKind::Float, ParamValue::Float(f)) if f.is_finite() => Some(ParamValue::Float(*f)),
            (ParamKind::Float, ParamValue::Integer(i)) => Some(ParamValue::Float(*i as f64)),
            (ParamKind::Integer, ParamValue::Integer(i)) => Some(ParamValue::Integer(*i)),
            (ParamKind::Integer, ParamValue::Float(f))
                if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 =>
            {
                Some(ParamValue::Integer(*f as i64))
            }
            (ParamKind::Bool, ParamValue::Bool(b)) => Some(ParamValue::Bool(*b)),
            (ParamKind::Enum, ParamValue::Text(s)) if self.options.iter().any(|o| o == s) => {
                Some(ParamValue::Text(s.clone()))
            }
            _ => None,
        };
        coerced.ok_or_else(|| AssignmentError::TypeMismatch {
            parameter: self.name.clone(),
            expected: self.expected(),
            found: value.describe(),
        })
    }

    /// Number of numeric symbols this parameter contributes
    #[must_use]
    pub fn symbol_count(&self) -> usize {
        match self.kind {
            ParamKind::Enum => self.options.len(),
            _ => 1,
        }
    }

    /// Names of the numeric symbols this parameter contributes.
    ///
    /// Enum parameters expand into one indicator per option, named
    /// `<parameter>_<option>`.
    #[must_use]
    pub fn symbol_names(&self) -> Vec<String> {
        match self.kind {
            ParamKind::Enum => self
                .options
                .iter()
                .map(|option| format!("{}_{}", self.name, option))
                .collect(),
            _ => vec![self.name.clone()],
        }
    }

    /// Append the numeric symbol values for an already coerced value
    pub(crate) fn push_symbols(&self, value: &ParamValue, out: &mut Vec<f64>) {
        match (self.kind, value) {
            (ParamKind::Enum, ParamValue::Text(selected)) => out.extend(
                self.options
                    .iter()
                    .map(|option| if option == selected { 1.0 } else { 0.0 }),
            ),
            _ => out.push(value.as_f64().unwrap_or(f64::NAN)),
        }
    }

    /// Check the declaration itself: options, default and distribution
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("parameter name is empty".to_string());
        }
        match self.kind {
            ParamKind::Enum => {
                if self.options.is_empty() {
                    return Err("enum parameter declares no options".to_string());
                }
                for (i, option) in self.options.iter().enumerate() {
                    if self.options[..i].contains(option) {
                        return Err(format!("duplicate option `{option}`"));
                    }
                }
            }
            _ => {
                if !self.options.is_empty() {
                    return Err(format!("options are only allowed on enum parameters, not {}", self.kind.name()));
                }
            }
        }
        self.coerce(&self.default)
            .map_err(|_| format!("default {} is not {}", self.default, self.expected()))?;
        if let Some(distribution) = &self.distribution {
            distribution.validate(self.kind, &self.options)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_accepts_integers() {
        let p = Parameter::float("x", 1.0);
        assert_eq!(p.coerce(&ParamValue::Integer(3)), Ok(ParamValue::Float(3.0)));
        assert_eq!(p.coerce(&ParamValue::Float(0.5)), Ok(ParamValue::Float(0.5)));
        assert!(p.coerce(&ParamValue::Bool(true)).is_err());
        assert!(p.coerce(&ParamValue::Float(f64::NAN)).is_err());
    }

    #[test]
    fn test_integer_accepts_integral_floats_only() {
        let p = Parameter::integer("n", 1);
        assert_eq!(p.coerce(&ParamValue::Float(4.0)), Ok(ParamValue::Integer(4)));
        let err = p.coerce(&ParamValue::Float(4.5)).unwrap_err();
        assert_eq!(
            err,
            AssignmentError::TypeMismatch {
                parameter: "n".to_string(),
                expected: "an integer".to_string(),
                found: "float 4.5".to_string(),
            }
        );
    }

    #[test]
    fn test_enum_checks_options() {
        let p = Parameter::enumeration("region", ["FR", "EU"], "FR");
        assert_eq!(p.coerce(&"EU".into()), Ok(ParamValue::Text("EU".to_string())));
        let err = p.coerce(&"US".into()).unwrap_err();
        assert!(err.to_string().contains("one of [FR, EU]"));
    }

    #[test]
    fn test_enum_symbols_are_one_hot() {
        let p = Parameter::enumeration("region", ["FR", "EU", "US"], "FR");
        assert_eq!(p.symbol_names(), vec!["region_FR", "region_EU", "region_US"]);
        let mut out = Vec::new();
        p.push_symbols(&ParamValue::Text("EU".to_string()), &mut out);
        assert_eq!(out, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_validate_rejects_bad_default() {
        let mut p = Parameter::enumeration("region", ["FR"], "FR");
        p.default = ParamValue::Text("DE".to_string());
        assert!(p.validate().is_err());

        let mut q = Parameter::boolean("flag", true);
        q.options = vec!["a".to_string()];
        assert!(q.validate().is_err());
    }
}
