//! Compiled rule model.

use std::collections::HashSet;

use feed_model::{Rule, RuleKind, TextPattern};
use regex::Regex;

use crate::config::{RuleConfig, rule_to_config};
use crate::error::ConfigError;

/// A rule with its text pattern compiled once.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: Rule,
    pub(crate) pattern: Option<Regex>,
}

/// Ordered, read-only set of rules; at most one rule per field.
#[derive(Debug, Clone, Default)]
pub struct RuleModel {
    compiled: Vec<CompiledRule>,
    rules: Vec<Rule>,
}

/// Models are equal when they declare the same rules in the same order.
impl PartialEq for RuleModel {
    fn eq(&self, other: &Self) -> bool {
        self.rules == other.rules
    }
}

impl RuleModel {
    /// Compile `rules`, keeping their order.
    pub fn new(rules: Vec<Rule>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in &rules {
            if !seen.insert(rule.field.as_str()) {
                return Err(ConfigError::DuplicateField {
                    field: rule.field.clone(),
                });
            }
            compiled.push(CompiledRule {
                rule: rule.clone(),
                pattern: compile_pattern(rule)?,
            });
        }
        Ok(Self { compiled, rules })
    }

    pub fn from_config_json(text: &str) -> Result<Self, ConfigError> {
        RuleConfig::from_json(text)?.into_model()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn compiled(&self) -> &[CompiledRule] {
        &self.compiled
    }

    pub fn rule_for(&self, field: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.field == field)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Configuration that compiles back into an equivalent model.
    pub fn to_config(&self) -> RuleConfig {
        self.rules.iter().fold(RuleConfig::new(), |config, rule| {
            config.with_field(rule.field.clone(), rule_to_config(rule))
        })
    }
}

impl CompiledRule {
    /// Whole-value match against the rule's mask or regex; no pattern always matches.
    pub fn matches_pattern(&self, value: &str) -> bool {
        self.pattern
            .as_ref()
            .is_none_or(|pattern| pattern.is_match(value))
    }
}

fn compile_pattern(rule: &Rule) -> Result<Option<Regex>, ConfigError> {
    let RuleKind::String {
        pattern: Some(pattern),
        ..
    } = &rule.kind
    else {
        return Ok(None);
    };
    let source = match pattern {
        TextPattern::Regex(source) => format!("^(?:{source})$"),
        TextPattern::Mask(mask) => format!("^{}$", mask_to_regex(mask)),
    };
    Regex::new(&source)
        .map(Some)
        .map_err(|error| ConfigError::InvalidPattern {
            field: rule.field.clone(),
            pattern: pattern.source().to_string(),
            message: error.to_string(),
        })
}

/// Translate an input mask into an unanchored regular expression.
///
/// `\d` digit, `\D` letter, `\w` letter or digit, `\s` space, `[...]` set;
/// every other character, including an escaped one, is literal.
pub fn mask_to_regex(mask: &str) -> String {
    let mut regex = String::new();
    let mut chars = mask.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some('d') => regex.push_str("[0-9]"),
                Some('D') => regex.push_str(r"\p{L}"),
                Some('w') => regex.push_str(r"[\p{L}0-9]"),
                Some('s') => regex.push(' '),
                Some(other) => regex.push_str(&regex::escape(&other.to_string())),
                None => regex.push_str(r"\\"),
            },
            '[' => {
                let mut set = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == ']' {
                        closed = true;
                        break;
                    }
                    set.push(inner);
                }
                if closed && !set.is_empty() {
                    regex.push('[');
                    for inner in set.chars() {
                        if matches!(inner, '\\' | '[' | ']' | '^' | '&' | '~') {
                            regex.push('\\');
                        }
                        regex.push(inner);
                    }
                    regex.push(']');
                } else {
                    regex.push_str(&regex::escape(&format!("[{set}")));
                    if closed {
                        regex.push_str(r"\]");
                    }
                }
            }
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex
}
