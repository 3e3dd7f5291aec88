//! [`FormManager`]: binds every registered form present in a document.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::dom::DocumentAdapter;
use crate::factory::{FormFactory, FormSpec};
use crate::pipeline::SubmitPipeline;

/// Registry of bound forms, keyed case-insensitively by form key.
#[derive(Default)]
pub struct FormManager {
    forms: HashMap<String, Arc<SubmitPipeline>>,
}

impl FormManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pipeline for every registered form whose selector matches
    /// in `document`. Returns the number of forms bound.
    pub fn initialize(&mut self, factory: &FormFactory, document: Arc<dyn DocumentAdapter>) -> usize {
        let mut bound = 0;
        for (form_key, template) in &factory.app().forms {
            let Some(selector) = template.get("selector").and_then(Value::as_str) else {
                continue;
            };
            if document.query_form(selector).is_none() {
                continue;
            }
            match factory.create(form_key, FormSpec::default(), Arc::clone(&document)) {
                Ok(pipeline) => {
                    self.forms
                        .insert(form_key.to_lowercase(), Arc::new(pipeline));
                    bound += 1;
                }
                Err(err) => {
                    tracing::warn!(form = %form_key, error = %err, "Could not bind form");
                }
            }
        }
        tracing::info!(bound, "Forms initialized");
        bound
    }

    pub fn get_form(&self, form_key: &str) -> Option<Arc<SubmitPipeline>> {
        self.forms.get(&form_key.to_lowercase()).cloned()
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}
