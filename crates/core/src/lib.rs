//! Configuration, deep-merge and the validation-rule engine.
//!
//! This crate contains no DOM or network dependencies; controllers and the
//! submit pipeline live in `formbind-forms`, the transport in
//! `formbind-transport`.

pub mod config;
pub mod data;
pub mod error;
pub mod merge;
pub mod path;
pub mod validation;

pub use config::{AppConfig, FormConfig};
pub use data::{FormData, FormPart, PartValue};
pub use error::{ConfigError, RuleError};
