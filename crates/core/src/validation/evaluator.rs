//! Rule evaluator: pure logic over a field value and its siblings.
//!
//! Per field, rules run in a fixed precedence:
//! 1. `nullable` with an empty value makes the field valid outright;
//! 2. `required` with an empty value fails immediately;
//! 3. a non-empty value is checked against `regex` before anything else;
//! 4. every other rule runs in declaration order, first failure wins.

use chrono::{Local, NaiveDateTime};
use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};
use serde_json::Value;
use validator::{ValidateEmail, ValidateUrl};

use super::dates::{parse_date, resolve_operand};
use super::files::{DimensionBounds, SelectedFile};
use super::rules::{RuleDescriptor, RuleKind, RuleMap};
use crate::error::RuleError;

/// Field name → message of the first failing rule. Built fresh per pass.
pub type ValidationErrorMap = IndexMap<String, String>;

// ---------------------------------------------------------------------------
// Field access
// ---------------------------------------------------------------------------

/// Read access to the current values of a form's fields.
pub trait FieldAccessor {
    /// Current text value of `field`, or `None` if there is no such field.
    fn text(&self, field: &str) -> Option<String>;

    /// File selection bound to `field`. `None` means no selection context
    /// is available (not a file input, or the host cannot tell).
    fn files(&self, _field: &str) -> Option<Vec<SelectedFile>> {
        None
    }
}

impl FieldAccessor for IndexMap<String, String> {
    fn text(&self, field: &str) -> Option<String> {
        self.get(field).cloned()
    }
}

impl FieldAccessor for serde_json::Map<String, Value> {
    fn text(&self, field: &str) -> Option<String> {
        self.get(field).and_then(crate::path::value_to_field_string)
    }
}

/// The value under test for one field.
#[derive(Debug, Clone, Default)]
pub struct FieldInput {
    pub text: String,
    pub files: Option<Vec<SelectedFile>>,
}

impl FieldInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            files: None,
        }
    }

    pub fn read(accessor: &dyn FieldAccessor, field: &str) -> Self {
        Self {
            text: accessor.text(field).unwrap_or_default(),
            files: accessor.files(field),
        }
    }

    /// Blank text and no selected files.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.files.as_ref().is_none_or(|f| f.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOutcome {
    Valid,
    Invalid { rule: String, message: String },
}

impl FieldOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Valid => None,
            Self::Invalid { message, .. } => Some(message),
        }
    }

    fn failed(rule: &RuleDescriptor) -> Self {
        Self::Invalid {
            rule: rule.rule_type.clone(),
            message: rule.message.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// Evaluates compiled rules. Holds the notion of "now" used by date rules.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    fixed_now: Option<NaiveDateTime>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A validator whose date rules see `now` instead of the wall clock.
    pub fn with_now(now: NaiveDateTime) -> Self {
        Self {
            fixed_now: Some(now),
        }
    }

    fn now(&self) -> NaiveDateTime {
        self.fixed_now.unwrap_or_else(|| Local::now().naive_local())
    }

    /// Validate one field against its rules.
    pub fn evaluate_field(
        &self,
        field: &str,
        rules: &[RuleDescriptor],
        input: &FieldInput,
        siblings: &dyn FieldAccessor,
    ) -> FieldOutcome {
        let empty = input.is_empty();
        let kinds: Vec<RuleKind> = rules.iter().map(RuleDescriptor::kind).collect();

        if empty && kinds.contains(&RuleKind::Nullable) {
            return FieldOutcome::Valid;
        }

        if empty {
            if let Some(required) = rules.iter().find(|r| r.kind() == RuleKind::Required) {
                return FieldOutcome::failed(required);
            }
        }

        if !empty {
            for rule in rules.iter().filter(|r| r.kind() == RuleKind::Regex) {
                if !self.passes(field, rule, RuleKind::Regex, input, false, siblings) {
                    return FieldOutcome::failed(rule);
                }
            }
        }

        let numeric = kinds.iter().any(|k| k.is_numeric_marker());
        for (rule, kind) in rules.iter().zip(kinds.iter().copied()) {
            if matches!(kind, RuleKind::Required | RuleKind::Nullable | RuleKind::Regex) {
                continue;
            }
            if !self.passes(field, rule, kind, input, numeric, siblings) {
                return FieldOutcome::failed(rule);
            }
        }

        FieldOutcome::Valid
    }

    /// Validate every field in `rules`. Returns `None` when all pass.
    pub fn evaluate_form(
        &self,
        rules: &RuleMap,
        fields: &dyn FieldAccessor,
    ) -> Option<ValidationErrorMap> {
        let errors: ValidationErrorMap = rules
            .iter()
            .filter_map(|(field, field_rules)| {
                let input = FieldInput::read(fields, field);
                match self.evaluate_field(field, field_rules, &input, fields) {
                    FieldOutcome::Valid => None,
                    FieldOutcome::Invalid { message, .. } => Some((field.clone(), message)),
                }
            })
            .collect();

        if errors.is_empty() {
            None
        } else {
            tracing::debug!(failed = errors.len(), "Form validation failed");
            Some(errors)
        }
    }

    /// Evaluate a single rule, logging and failing on evaluation errors.
    fn passes(
        &self,
        field: &str,
        rule: &RuleDescriptor,
        kind: RuleKind,
        input: &FieldInput,
        numeric: bool,
        siblings: &dyn FieldAccessor,
    ) -> bool {
        match self.check(field, rule, kind, input, numeric, siblings) {
            Ok(passed) => passed,
            Err(err) => {
                tracing::warn!(field, rule = %rule.rule_type, error = %err, "Rule evaluation failed");
                false
            }
        }
    }

    fn check(
        &self,
        field: &str,
        rule: &RuleDescriptor,
        kind: RuleKind,
        input: &FieldInput,
        numeric: bool,
        siblings: &dyn FieldAccessor,
    ) -> Result<bool, RuleError> {
        let value = input.text.as_str();
        let operand = rule.operand();

        if kind.is_file_bound() {
            return check_files(kind, operand, input.files.as_deref());
        }

        Ok(match kind {
            RuleKind::Required | RuleKind::Nullable => true,
            RuleKind::Regex => compile_regex_literal(operand)?.is_match(value),
            RuleKind::Email => value.to_string().validate_email(),
            RuleKind::Url => value.to_string().validate_url(),
            RuleKind::Numeric => parse_number(value).is_some(),
            RuleKind::Integer => value.trim().parse::<i64>().is_ok(),
            RuleKind::Alpha => !value.is_empty() && value.chars().all(char::is_alphabetic),
            RuleKind::AlphaNum => !value.is_empty() && value.chars().all(char::is_alphanumeric),
            RuleKind::Min => measure(value, numeric) >= bound(rule, operand)?,
            RuleKind::Max => measure(value, numeric) <= bound(rule, operand)?,
            RuleKind::Between => {
                let (low, high) = operand.split_once(',').ok_or_else(|| invalid_operand(rule))?;
                let low = parse_number(low).ok_or_else(|| invalid_operand(rule))?;
                let high = parse_number(high).ok_or_else(|| invalid_operand(rule))?;
                let measured = measure(value, numeric);
                measured >= low && measured <= high
            }
            RuleKind::Size => {
                let expected = operand
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| invalid_operand(rule))?;
                value.chars().count() == expected
            }
            RuleKind::MinLength => value.chars().count() as f64 >= bound(rule, operand)?,
            RuleKind::MaxLength => value.chars().count() as f64 <= bound(rule, operand)?,
            RuleKind::In => list(operand).any(|item| item == value),
            RuleKind::NotIn => !list(operand).any(|item| item == value),
            RuleKind::Same => siblings.text(operand.trim()).unwrap_or_default() == value,
            RuleKind::Confirmed => {
                let other = if operand.trim().is_empty() {
                    format!("{field}_confirmation")
                } else {
                    operand.trim().to_string()
                };
                siblings.text(&other).unwrap_or_default() == value
            }
            RuleKind::Date => parse_date(value).is_some(),
            RuleKind::Before | RuleKind::After => {
                let Some(date) = parse_date(value) else {
                    return Ok(false);
                };
                let reference = resolve_operand(operand, self.now(), |name| siblings.text(name))?;
                if kind == RuleKind::Before {
                    date < reference
                } else {
                    date > reference
                }
            }
            RuleKind::File | RuleKind::Image | RuleKind::Mimes | RuleKind::Dimensions => true,
            RuleKind::Other => true,
        })
    }
}

fn invalid_operand(rule: &RuleDescriptor) -> RuleError {
    RuleError::InvalidOperand {
        rule: rule.rule_type.clone(),
        operand: rule.operand().to_string(),
    }
}

fn bound(rule: &RuleDescriptor, operand: &str) -> Result<f64, RuleError> {
    parse_number(operand).ok_or_else(|| invalid_operand(rule))
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Character count, or the numeric value when the field is numeric.
/// A non-numeric value on a numeric field fails the comparison.
fn measure(value: &str, numeric: bool) -> f64 {
    if numeric {
        parse_number(value).unwrap_or(f64::NAN)
    } else {
        value.chars().count() as f64
    }
}

fn list(operand: &str) -> impl Iterator<Item = &str> {
    operand.split(',').map(str::trim)
}

/// Compile a `/pattern/flags` literal. A string without delimiters is
/// taken as the bare pattern. Supported flags: `i`, `m`, `s`, `x`, `u`;
/// `g` and `y` are accepted and ignored.
pub fn compile_regex_literal(literal: &str) -> Result<Regex, RuleError> {
    let error = |reason: String| RuleError::InvalidRegex {
        literal: literal.to_string(),
        reason,
    };

    let (pattern, flags) = match literal.strip_prefix('/').and_then(|rest| rest.rsplit_once('/')) {
        Some((pattern, flags)) => (pattern, flags),
        None => (literal, ""),
    };

    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            'u' => builder.unicode(true),
            'g' | 'y' => &mut builder,
            other => return Err(error(format!("unsupported flag '{other}'"))),
        };
    }
    builder.build().map_err(|e| error(e.to_string()))
}

fn check_files(
    kind: RuleKind,
    operand: &str,
    files: Option<&[SelectedFile]>,
) -> Result<bool, RuleError> {
    let Some(files) = files else {
        return Ok(true);
    };
    Ok(match kind {
        RuleKind::File => true,
        RuleKind::Image => files.iter().all(SelectedFile::is_image),
        RuleKind::Mimes => {
            let allowed: Vec<String> = list(operand)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            files.iter().all(|f| f.matches_mimes(&allowed))
        }
        RuleKind::Dimensions => {
            let bounds = DimensionBounds::parse(operand)?;
            files
                .iter()
                .all(|f| f.pixel_dimensions().is_none_or(|dims| bounds.accepts(dims)))
        }
        _ => true,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
