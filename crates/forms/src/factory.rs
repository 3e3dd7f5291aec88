//! [`FormFactory`]: builds submit pipelines from form keys.

use std::borrow::Cow;
use std::sync::Arc;

use formbind_core::{AppConfig, ConfigError, FormConfig};
use serde_json::{json, Value};

use crate::actions::FormActions;
use crate::controller::FormController;
use crate::dom::DocumentAdapter;
use crate::error::FormError;
use crate::pipeline::{Collaborators, SubmitPipeline};

/// Caller-supplied layers for one form.
#[derive(Debug, Clone, Default)]
pub struct FormSpec {
    /// Deep-merged over the API defaults for this form only.
    pub api: Value,
    /// Deep-merged over the registered template for the form key.
    pub config: Value,
    pub actions: FormActions,
}

impl FormSpec {
    pub fn new(config: Value) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_api(mut self, api: Value) -> Self {
        self.api = api;
        self
    }

    pub fn with_actions(mut self, actions: FormActions) -> Self {
        self.actions = actions;
        self
    }
}

pub struct FormFactory {
    app: Arc<AppConfig>,
    collaborators: Collaborators,
}

impl FormFactory {
    pub fn new(app: Arc<AppConfig>, collaborators: Collaborators) -> Self {
        Self { app, collaborators }
    }

    pub fn app(&self) -> &AppConfig {
        &self.app
    }

    /// The registered template for `form_key` with `custom` merged on top.
    pub fn form_config(&self, form_key: &str, custom: &Value) -> Result<FormConfig, ConfigError> {
        FormConfig::from_layers(form_key, self.app.form_template(form_key), custom)
    }

    /// Build the pipeline for `form_key` and bind it in `document`.
    ///
    /// API overrides in `spec.api` affect outcome policy and notifications;
    /// the shared transport keeps its own configuration.
    pub fn create(
        &self,
        form_key: &str,
        spec: FormSpec,
        document: Arc<dyn DocumentAdapter>,
    ) -> Result<SubmitPipeline, FormError> {
        let config = self.form_config(form_key, &spec.config)?;

        let app: Cow<'_, AppConfig> = match &spec.api {
            Value::Object(map) if !map.is_empty() => {
                Cow::Owned(self.app.with_overrides(&json!({ "api": spec.api }))?)
            }
            _ => Cow::Borrowed(self.app.as_ref()),
        };

        let controller = FormController::bind(form_key, config, &app, document)?;
        tracing::debug!(form = %form_key, remote = controller.config().submits_remotely(), "Form created");
        Ok(SubmitPipeline::new(
            controller,
            &app,
            self.collaborators.clone(),
            spec.actions,
        ))
    }
}
