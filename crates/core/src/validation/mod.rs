//! Validation engine.
//!
//! Rule tokens are compiled once per form by [`rules::compile_rules`] and
//! evaluated by [`evaluator::Validator`] on every field interaction and on
//! submit. Pure logic, no DOM or transport access.

pub mod dates;
pub mod evaluator;
pub mod files;
pub mod messages;
pub mod rules;

pub use evaluator::{FieldAccessor, FieldInput, FieldOutcome, ValidationErrorMap, Validator};
pub use files::SelectedFile;
pub use messages::{MessageCatalog, MessageTemplate};
pub use rules::{compile_rules, parse_rule, FieldRuleSet, RuleDescriptor, RuleKind, RuleMap};
