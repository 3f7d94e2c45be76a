//! Rule configuration, per-field validation and set-level integrity checks.

pub mod config;
pub mod error;
pub mod integrity;
pub mod rules;
pub mod validator;

pub use config::{ConfigValue, FieldRuleConfig, RuleConfig, parse_kind};
pub use error::ConfigError;
pub use integrity::{
    DEFAULT_CATEGORY_FIELD, DEFAULT_DUPLICATE_KEY, DEFAULT_MANDATORY_FIELDS, IntegrityConfig,
    check_blank_mandatory_values, check_duplicate_keys, check_empty_categories,
    check_mandatory_fields,
};
pub use rules::{CompiledRule, RuleModel, mask_to_regex};
pub use validator::{check_rule, check_value, validate};
