//! Flat, serializable rule configuration.
//!
//! The configuration maps field names to loosely typed constraint sets, in
//! declaration order:
//!
//! ```json
//! {
//!   "price": {"kind": "money", "min": 0, "precision": 2, "default": "0"},
//!   "SKU":   {"kind": "text", "mask": "\\D\\D-\\d\\d\\d\\d"}
//! }
//! ```
//!
//! [`RuleConfig::into_model`] checks it and produces a compiled [`RuleModel`].

use std::fmt;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use chrono::format::{Item, StrftimeItems};
use feed_model::{DEFAULT_DATE_FORMAT, FieldKind, Rule, RuleKind, TextPattern};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::rules::RuleModel;

/// Number or text as written in the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl ConfigValue {
    fn as_integer(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(value) => Some(*value),
            // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
            ConfigValue::Real(value)
                if value.fract() == 0.0
                    && *value >= i64::MIN as f64
                    && *value < i64::MAX as f64 =>
            {
                Some(*value as i64)
            }
            ConfigValue::Real(_) => None,
            ConfigValue::Text(text) => feed_model::coerce::parse_integer(text),
        }
    }

    fn as_real(&self) -> Option<f64> {
        match self {
            ConfigValue::Integer(value) => Some(*value as f64),
            ConfigValue::Real(value) => Some(*value),
            ConfigValue::Text(text) => feed_model::coerce::parse_real(text),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Integer(value) => write!(f, "{value}"),
            ConfigValue::Real(value) => write!(f, "{value}"),
            ConfigValue::Text(text) => f.write_str(text),
        }
    }
}

/// Constraints for one field, as written in the configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldRuleConfig {
    #[serde(default, alias = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<ConfigValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<ConfigValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_characters: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
    /// Regular expression the whole value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Input mask the whole value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ConfigValue>,
}

/// Field name to constraint set, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleConfig {
    fields: Vec<(String, FieldRuleConfig)>,
}

impl RuleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>, config: FieldRuleConfig) -> Self {
        self.fields.push((field.into(), config));
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldRuleConfig)> {
        self.fields
            .iter()
            .map(|(name, config)| (name.as_str(), config))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|error| ConfigError::Syntax {
            message: error.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.display().to_string(),
            message: error.to_string(),
        })?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|error| ConfigError::Syntax {
            message: error.to_string(),
        })
    }

    /// Check every field's constraints and compile the rule model.
    pub fn into_model(self) -> Result<RuleModel, ConfigError> {
        let rules = self
            .fields
            .into_iter()
            .map(|(field, config)| build_rule(field, config))
            .collect::<Result<Vec<_>, _>>()?;
        RuleModel::new(rules)
    }
}

impl Serialize for RuleConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.fields.iter().map(|(name, config)| (name, config)))
    }
}

impl<'de> Deserialize<'de> for RuleConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RuleConfigVisitor;

        impl<'de> Visitor<'de> for RuleConfigVisitor {
            type Value = RuleConfig;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of field names to rule settings")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut fields = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, config)) = map.next_entry::<String, FieldRuleConfig>()? {
                    fields.push((name, config));
                }
                Ok(RuleConfig { fields })
            }
        }

        deserializer.deserialize_map(RuleConfigVisitor)
    }
}

/// Resolve a kind name, including the aliases used by feed tooling.
pub fn parse_kind(name: &str) -> Option<FieldKind> {
    match name.trim().to_ascii_lowercase().as_str() {
        "integer" | "int" => Some(FieldKind::Integer),
        "real" | "float" | "money" | "number" | "decimal" => Some(FieldKind::Real),
        "string" | "text" | "str" => Some(FieldKind::String),
        "date" => Some(FieldKind::Date),
        _ => None,
    }
}

fn build_rule(field: String, config: FieldRuleConfig) -> Result<Rule, ConfigError> {
    let kind = match config.kind.as_deref() {
        None => FieldKind::String,
        Some(name) => parse_kind(name).ok_or_else(|| ConfigError::UnknownKind {
            field: field.clone(),
            kind: name.to_string(),
        })?,
    };
    let not_applicable = |constraint: &'static str| ConfigError::ConstraintNotApplicable {
        field: field.clone(),
        constraint,
        kind,
    };
    let reject = |present: bool, constraint: &'static str| {
        if present {
            Err(not_applicable(constraint))
        } else {
            Ok(())
        }
    };

    let numeric = matches!(kind, FieldKind::Integer | FieldKind::Real);
    reject(
        !numeric && kind != FieldKind::Date && config.min.is_some(),
        "min",
    )?;
    reject(
        !numeric && kind != FieldKind::Date && config.max.is_some(),
        "max",
    )?;
    reject(kind != FieldKind::String && config.min_length.is_some(), "min_length")?;
    reject(kind != FieldKind::String && config.max_length.is_some(), "max_length")?;
    reject(
        kind != FieldKind::String && config.allowed_characters.is_some(),
        "allowed_characters",
    )?;
    reject(
        kind != FieldKind::String && config.allowed_values.is_some(),
        "allowed_values",
    )?;
    reject(kind != FieldKind::String && config.pattern.is_some(), "pattern")?;
    reject(kind != FieldKind::String && config.mask.is_some(), "mask")?;
    reject(kind != FieldKind::Date && config.date_format.is_some(), "date_format")?;
    reject(kind != FieldKind::Real && config.precision.is_some(), "precision")?;
    reject(kind != FieldKind::Integer && config.multiple_of.is_some(), "multiple_of")?;

    let bound = |value: &ConfigValue, constraint: &'static str| ConfigError::InvalidBound {
        field: field.clone(),
        constraint,
        value: value.to_string(),
    };

    let rule_kind = match kind {
        FieldKind::Integer => {
            let min = config
                .min
                .as_ref()
                .map(|value| value.as_integer().ok_or_else(|| bound(value, "min")))
                .transpose()?;
            let max = config
                .max
                .as_ref()
                .map(|value| value.as_integer().ok_or_else(|| bound(value, "max")))
                .transpose()?;
            if let (Some(min), Some(max)) = (min, max)
                && min > max
            {
                return Err(inconsistent(&field, min, max));
            }
            if config.multiple_of == Some(0) {
                return Err(ConfigError::InvalidBound {
                    field: field.clone(),
                    constraint: "multiple_of",
                    value: "0".to_string(),
                });
            }
            RuleKind::Integer {
                min,
                max,
                multiple_of: config.multiple_of,
            }
        }
        FieldKind::Real => {
            let min = config
                .min
                .as_ref()
                .map(|value| value.as_real().ok_or_else(|| bound(value, "min")))
                .transpose()?;
            let max = config
                .max
                .as_ref()
                .map(|value| value.as_real().ok_or_else(|| bound(value, "max")))
                .transpose()?;
            if let (Some(min), Some(max)) = (min, max)
                && min > max
            {
                return Err(inconsistent(&field, min, max));
            }
            RuleKind::Real {
                min,
                max,
                precision: config.precision,
            }
        }
        FieldKind::String => {
            if let (Some(min), Some(max)) = (config.min_length, config.max_length)
                && min > max
            {
                return Err(inconsistent(&field, min, max));
            }
            let pattern = match (config.pattern, config.mask) {
                (Some(_), Some(_)) => {
                    return Err(ConfigError::ConstraintNotApplicable {
                        field: field.clone(),
                        constraint: "mask together with pattern",
                        kind,
                    });
                }
                (Some(regex), None) => Some(TextPattern::Regex(regex)),
                (None, Some(mask)) => Some(TextPattern::Mask(mask)),
                (None, None) => None,
            };
            RuleKind::String {
                min_length: config.min_length,
                max_length: config.max_length,
                allowed_characters: config.allowed_characters,
                allowed_values: config.allowed_values,
                pattern,
            }
        }
        FieldKind::Date => {
            let format = config
                .date_format
                .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string());
            check_date_format(&field, &format)?;
            let parse_bound = |value: &ConfigValue, constraint: &'static str| {
                let text = value.to_string();
                NaiveDate::parse_from_str(&text, &format)
                    .or_else(|_| NaiveDate::parse_from_str(&text, DEFAULT_DATE_FORMAT))
                    .map_err(|_| ConfigError::InvalidDateBound {
                        field: field.clone(),
                        constraint,
                        value: text.clone(),
                    })
            };
            let min = config
                .min
                .as_ref()
                .map(|value| parse_bound(value, "min"))
                .transpose()?;
            let max = config
                .max
                .as_ref()
                .map(|value| parse_bound(value, "max"))
                .transpose()?;
            if let (Some(min), Some(max)) = (min, max)
                && min > max
            {
                return Err(inconsistent(&field, min, max));
            }
            RuleKind::Date { format, min, max }
        }
    };

    Ok(Rule {
        field,
        kind: rule_kind,
        default: config.default.map(|value| value.to_string()),
    })
}

fn inconsistent(field: &str, min: impl fmt::Display, max: impl fmt::Display) -> ConfigError {
    ConfigError::InconsistentBounds {
        field: field.to_string(),
        min: min.to_string(),
        max: max.to_string(),
    }
}

fn check_date_format(field: &str, format: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidDateFormat {
        field: field.to_string(),
        format: format.to_string(),
    };
    if format.trim().is_empty() {
        return Err(invalid());
    }
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(invalid());
    }
    Ok(())
}

/// Render a compiled rule back into its configuration form.
pub(crate) fn rule_to_config(rule: &Rule) -> FieldRuleConfig {
    let mut config = FieldRuleConfig {
        kind: Some(rule.field_kind().as_str().to_string()),
        default: rule.default.clone().map(ConfigValue::Text),
        ..FieldRuleConfig::default()
    };
    match &rule.kind {
        RuleKind::Integer {
            min,
            max,
            multiple_of,
        } => {
            config.min = min.map(ConfigValue::Integer);
            config.max = max.map(ConfigValue::Integer);
            config.multiple_of = *multiple_of;
        }
        RuleKind::Real {
            min,
            max,
            precision,
        } => {
            config.min = min.map(ConfigValue::Real);
            config.max = max.map(ConfigValue::Real);
            config.precision = *precision;
        }
        RuleKind::String {
            min_length,
            max_length,
            allowed_characters,
            allowed_values,
            pattern,
        } => {
            config.min_length = *min_length;
            config.max_length = *max_length;
            config.allowed_characters = allowed_characters.clone();
            config.allowed_values = allowed_values.clone();
            match pattern {
                Some(TextPattern::Regex(source)) => config.pattern = Some(source.clone()),
                Some(TextPattern::Mask(source)) => config.mask = Some(source.clone()),
                None => {}
            }
        }
        RuleKind::Date { format, min, max } => {
            config.date_format = Some(format.clone());
            config.min = min.map(|date| ConfigValue::Text(date.format(format).to_string()));
            config.max = max.map(|date| ConfigValue::Text(date.format(format).to_string()));
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(kind: &str) -> FieldRuleConfig {
        FieldRuleConfig {
            kind: Some(kind.to_string()),
            ..FieldRuleConfig::default()
        }
    }

    #[test]
    fn declaration_order_is_preserved() {
        let config = RuleConfig::from_json(
            r#"{"zeta": {"kind": "int"}, "alpha": {"type": "text"}, "mid": {}}"#,
        )
        .expect("parse config");
        let names: Vec<_> = config.fields().map(|(name, _)| name).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
        let model = config.into_model().expect("compile");
        let kinds: Vec<_> = model.rules().iter().map(Rule::field_kind).collect();
        assert_eq!(kinds, [FieldKind::Integer, FieldKind::String, FieldKind::String]);
    }

    #[test]
    fn aliases_resolve() {
        assert_eq!(parse_kind("money"), Some(FieldKind::Real));
        assert_eq!(parse_kind("Number"), Some(FieldKind::Real));
        assert_eq!(parse_kind("text"), Some(FieldKind::String));
        assert_eq!(parse_kind("blob"), None);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let error = RuleConfig::new()
            .with_field("price", field("currency"))
            .into_model()
            .expect_err("unknown kind");
        assert_eq!(
            error,
            ConfigError::UnknownKind {
                field: "price".into(),
                kind: "currency".into()
            }
        );
    }

    #[test]
    fn min_above_max_is_rejected() {
        let config = FieldRuleConfig {
            min: Some(ConfigValue::Integer(10)),
            max: Some(ConfigValue::Integer(1)),
            ..field("integer")
        };
        assert!(matches!(
            RuleConfig::new().with_field("stock", config).into_model(),
            Err(ConfigError::InconsistentBounds { .. })
        ));
    }

    #[test]
    fn integer_bounds_outside_i64_are_rejected() {
        let config = RuleConfig::from_json(r#"{"stock": {"kind": "int", "min": 1e30}}"#)
            .expect("parse config");
        assert_eq!(
            config.into_model(),
            Err(ConfigError::InvalidBound {
                field: "stock".into(),
                constraint: "min",
                value: ConfigValue::Real(1e30).to_string(),
            })
        );

        let config = RuleConfig::from_json(r#"{"stock": {"kind": "int", "max": -1e19}}"#)
            .expect("parse config");
        assert!(matches!(
            config.into_model(),
            Err(ConfigError::InvalidBound { constraint: "max", .. })
        ));

        let config = RuleConfig::from_json(r#"{"stock": {"kind": "int", "max": 4096.0}}"#)
            .expect("parse config");
        assert!(config.into_model().is_ok());
    }

    #[test]
    fn constraints_must_fit_the_kind() {
        let config = FieldRuleConfig {
            max_length: Some(4),
            ..field("integer")
        };
        assert_eq!(
            RuleConfig::new().with_field("stock", config).into_model(),
            Err(ConfigError::ConstraintNotApplicable {
                field: "stock".into(),
                constraint: "max_length",
                kind: FieldKind::Integer
            })
        );
    }

    #[test]
    fn unknown_settings_fail_to_parse() {
        assert!(matches!(
            RuleConfig::from_json(r#"{"price": {"kind": "real", "maximum": 3}}"#),
            Err(ConfigError::Syntax { .. })
        ));
    }

    #[test]
    fn bad_regex_is_rejected() {
        let config = FieldRuleConfig {
            pattern: Some("([a-z".to_string()),
            ..field("string")
        };
        assert!(matches!(
            RuleConfig::new().with_field("code", config).into_model(),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn date_bounds_and_format_are_checked() {
        let bad_bound = FieldRuleConfig {
            min: Some(ConfigValue::Text("yesterday".into())),
            ..field("date")
        };
        assert!(matches!(
            RuleConfig::new().with_field("updated", bad_bound).into_model(),
            Err(ConfigError::InvalidDateBound { .. })
        ));

        let bad_format = FieldRuleConfig {
            date_format: Some("%Y-%Q".into()),
            ..field("date")
        };
        assert!(matches!(
            RuleConfig::new().with_field("updated", bad_format).into_model(),
            Err(ConfigError::InvalidDateFormat { .. })
        ));
    }

    #[test]
    fn duplicate_fields_are_rejected() {
        let config = RuleConfig::from_json(r#"{"price": {"kind": "real"}, "price": {}}"#)
            .expect("parse config");
        assert_eq!(
            config.into_model(),
            Err(ConfigError::DuplicateField {
                field: "price".into()
            })
        );
    }

    #[test]
    fn model_serializes_back_to_config() {
        let text = r#"{"price": {"kind": "money", "min": 0, "max": 1000, "precision": 2, "default": "0"},
                      "SKU": {"kind": "text", "mask": "\\D\\D-\\d\\d\\d\\d"},
                      "updated": {"kind": "date", "date_format": "%d.%m.%Y", "min": "01.01.2020"}}"#;
        let model = RuleConfig::from_json(text)
            .expect("parse")
            .into_model()
            .expect("compile");
        let again = model
            .to_config()
            .into_model()
            .expect("recompile saved config");
        assert_eq!(again.rules(), model.rules());
        insta::assert_snapshot!(model.to_config().to_json().expect("json"), @r#"
        {
          "price": {
            "kind": "real",
            "min": 0.0,
            "max": 1000.0,
            "precision": 2,
            "default": "0"
          },
          "SKU": {
            "kind": "string",
            "mask": "\\D\\D-\\d\\d\\d\\d"
          },
          "updated": {
            "kind": "date",
            "min": "01.01.2020",
            "date_format": "%d.%m.%Y"
          }
        }
        "#);
    }
}
