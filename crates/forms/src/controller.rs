//! [`FormController`]: binds one form element to its merged config.
//!
//! The controller compiles the field rules once, keeps a [`FieldState`] per
//! bound field, validates on field events (skipping fields whose value still
//! equals the recorded baseline), collects form data and optionally prefills
//! the form from a remote data source.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use formbind_core::config::{MappingEntry, ValidationOptions};
use formbind_core::data::push_value;
use formbind_core::path::{resolve, value_to_field_string};
use formbind_core::validation::{
    compile_rules, FieldAccessor, FieldInput, FieldOutcome, RuleMap, ValidationErrorMap, Validator,
};
use formbind_core::{AppConfig, FormConfig, FormData, FormPart, PartValue};
use formbind_transport::{RequestConfig, Transport, TransportError};
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::dom::{DocumentAdapter, FormElement, InputKind};
use crate::error::FormError;
use crate::feedback::{Classification, FeedbackRenderer, FieldState};

pub struct FormController {
    form_key: String,
    config: Arc<FormConfig>,
    rules: RuleMap,
    options: ValidationOptions,
    validator: Validator,
    document: Arc<dyn DocumentAdapter>,
    form: Arc<dyn FormElement>,
    states: Mutex<IndexMap<String, FieldState>>,
}

impl fmt::Debug for FormController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormController")
            .field("form_key", &self.form_key)
            .field("selector", &self.config.selector)
            .field("fields", &self.rules.len())
            .finish()
    }
}

/// What the dirty check compares for `field`: its text, or a signature of
/// the selected files for a file input with a selection.
fn baseline_value(data: &FormData, field: &str) -> String {
    match data.files(field) {
        Some(files) => files
            .iter()
            .map(|file| {
                format!(
                    "{}:{}:{}",
                    file.name,
                    file.size,
                    file.mime.as_deref().unwrap_or_default()
                )
            })
            .collect::<Vec<_>>()
            .join("|"),
        None => data.text(field).unwrap_or_default(),
    }
}

impl FormController {
    /// Bind `config` to the form its selector matches in `document`.
    pub fn bind(
        form_key: &str,
        config: FormConfig,
        app: &AppConfig,
        document: Arc<dyn DocumentAdapter>,
    ) -> Result<Self, FormError> {
        let form = document
            .query_form(&config.selector)
            .ok_or_else(|| FormError::FormNotFound {
                form_key: form_key.to_string(),
                selector: config.selector.clone(),
            })?;
        let rules = compile_rules(&config.fields, &app.messages);
        let options = ValidationOptions::resolve(&app.ui.validation, &config.validation_options)?;

        let controller = Self {
            form_key: form_key.to_string(),
            config: Arc::new(config),
            rules,
            options,
            validator: Validator::new(),
            document,
            form,
            states: Mutex::new(IndexMap::new()),
        };
        controller.rebaseline();
        tracing::debug!(
            form = %controller.form_key,
            fields = controller.rules.len(),
            "Form bound"
        );
        Ok(controller)
    }

    /// Replace the validator (e.g. one with a fixed clock).
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn form_key(&self) -> &str {
        &self.form_key
    }

    pub fn config(&self) -> &Arc<FormConfig> {
        &self.config
    }

    pub fn rules(&self) -> &RuleMap {
        &self.rules
    }

    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    pub fn form(&self) -> &Arc<dyn FormElement> {
        &self.form
    }

    pub fn field_state(&self, field: &str) -> Option<FieldState> {
        self.states().get(field).cloned()
    }

    fn states(&self) -> MutexGuard<'_, IndexMap<String, FieldState>> {
        self.states.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn renderer(&self) -> FeedbackRenderer<'_> {
        FeedbackRenderer::new(self.form.as_ref(), &self.options)
    }

    // -----------------------------------------------------------------------
    // Data collection
    // -----------------------------------------------------------------------

    /// Collect the form's data.
    ///
    /// The multipart shape is chosen when any file input has a selection or
    /// when `use_structured` is set. Checkboxes and radios contribute only
    /// when checked; other values are trimmed.
    pub fn get_data(&self, use_structured: bool) -> FormData {
        let inputs = self.form.inputs();
        let has_files = inputs
            .iter()
            .any(|i| i.kind == InputKind::File && !i.files.is_empty());

        if has_files || use_structured {
            let parts = inputs
                .into_iter()
                .filter(|i| i.contributes())
                .flat_map(|input| {
                    if input.kind == InputKind::File {
                        input
                            .files
                            .into_iter()
                            .map(|file| FormPart {
                                name: input.name.clone(),
                                value: PartValue::File(file),
                            })
                            .collect::<Vec<_>>()
                    } else {
                        vec![FormPart {
                            value: PartValue::Text(input.value.trim().to_string()),
                            name: input.name,
                        }]
                    }
                })
                .collect();
            return FormData::Multipart(parts);
        }

        let mut map = Map::new();
        for input in inputs.iter().filter(|i| i.contributes()) {
            push_value(&mut map, &input.name, Value::String(input.value.trim().to_string()));
        }
        FormData::Plain(map)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// React to an input/change/blur event on `field`.
    ///
    /// Returns `None` when the field has no rules or its value still equals
    /// the baseline; such fields are neither re-validated nor re-classified.
    pub fn handle_event(&self, field: &str) -> Option<FieldOutcome> {
        let rules = self.rules.get(field)?;
        let data = self.get_data(false);
        let current = baseline_value(&data, field);

        let dirty = self
            .states()
            .get(field)
            .is_none_or(|state| state.is_dirty(&current));
        if !dirty {
            return None;
        }

        let input = FieldInput::read(&data, field);
        let outcome = self.validator.evaluate_field(field, rules, &input, &data);
        self.classify(field, &outcome);
        Some(outcome)
    }

    /// Validate every field with rules, classify and render feedback.
    /// Returns `None` when everything passes.
    pub fn validate(&self) -> Option<ValidationErrorMap> {
        let data = self.get_data(false);
        self.validate_data(&data)
    }

    /// Validate already collected `data` against the compiled rules.
    pub fn validate_data(&self, data: &FormData) -> Option<ValidationErrorMap> {
        let errors = self.validator.evaluate_form(&self.rules, data);
        for field in self.rules.keys() {
            let outcome = match errors.as_ref().and_then(|e| e.get(field)) {
                Some(message) => FieldOutcome::Invalid {
                    rule: String::new(),
                    message: message.clone(),
                },
                None => FieldOutcome::Valid,
            };
            self.classify(field, &outcome);
        }
        errors
    }

    /// Mark fields invalid with messages that came from elsewhere, e.g. a
    /// server-side validation failure.
    pub fn show_errors(&self, errors: &ValidationErrorMap) {
        for (field, message) in errors {
            self.classify(
                field,
                &FieldOutcome::Invalid {
                    rule: String::new(),
                    message: message.clone(),
                },
            );
        }
    }

    fn classify(&self, field: &str, outcome: &FieldOutcome) {
        let mut states = self.states();
        let state = states.entry(field.to_string()).or_default();
        match outcome {
            FieldOutcome::Valid => {
                state.classification = Classification::Valid;
                state.last_error = None;
                self.renderer().valid(field);
            }
            FieldOutcome::Invalid { message, .. } => {
                state.classification = Classification::Invalid;
                state.last_error = Some(message.clone());
                self.renderer().invalid(field, message);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Reset and baseline
    // -----------------------------------------------------------------------

    /// Reset the form element and forget all classifications.
    pub fn reset(&self) {
        self.form.reset();
        let renderer = self.renderer();
        for field in self.states().keys() {
            renderer.clear(field);
        }
        self.rebaseline();
    }

    /// Record the current values as the originals and clear classifications.
    fn rebaseline(&self) {
        let data = self.get_data(false);
        let mut names: Vec<String> = self.form.inputs().into_iter().map(|i| i.name).collect();
        names.extend(self.rules.keys().cloned());

        let mut states = self.states();
        states.clear();
        for name in names {
            if !states.contains_key(&name) {
                let original = baseline_value(&data, &name);
                states.insert(name, FieldState::new(original));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Remote prefill
    // -----------------------------------------------------------------------

    /// Load initial values from the configured data source, if any.
    ///
    /// Later user edits made before the response arrives are overwritten.
    pub async fn prefill(&self, transport: &dyn Transport) -> Result<(), TransportError> {
        let Some(source) = &self.config.data_source else {
            return Ok(());
        };
        let request = RequestConfig::new(source.method.clone(), source.endpoint.clone())
            .with_form(Arc::clone(&self.config));
        let response = match transport.request(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(form = %self.form_key, error = %err, "Prefill request failed");
                return Err(err);
            }
        };

        let mut applied = 0usize;
        for (key, entry) in &source.mapping {
            match entry {
                MappingEntry::Field(field) => {
                    let Some(value) = resolve(&response.data, key) else {
                        continue;
                    };
                    let text = value_to_field_string(value).unwrap_or_default();
                    if self.form.set_value(field, &text) {
                        applied += 1;
                    }
                }
                MappingEntry::Element(target) => {
                    let path = target.path.as_deref().unwrap_or(key);
                    let Some(value) = resolve(&response.data, path) else {
                        continue;
                    };
                    let text = match target.transform {
                        Some(transform) => transform.apply(value),
                        None => value_to_field_string(value).unwrap_or_default(),
                    };
                    if self
                        .document
                        .set_element(&target.selector, target.attribute.as_deref(), &text)
                    {
                        applied += 1;
                    }
                }
            }
        }

        self.rebaseline();
        tracing::debug!(form = %self.form_key, applied, "Form prefilled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Feedback, MemoryDocument, MemoryForm};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use formbind_core::validation::SelectedFile;
    use formbind_transport::Response;
    use serde_json::json;

    fn config(value: Value) -> FormConfig {
        serde_json::from_value(value).unwrap()
    }

    fn bind(form: Arc<MemoryForm>, cfg: Value) -> FormController {
        let document = Arc::new(MemoryDocument::new().with_form("#form", form));
        FormController::bind("TEST", config(cfg), &AppConfig::default(), document).unwrap()
    }

    fn login_config() -> Value {
        json!({
            "selector": "#form",
            "fields": {
                "email": {"rules": ["required", "email"]},
                "password": {"rules": ["required", "min:6"]}
            }
        })
    }

    #[test]
    fn missing_form_is_an_error() {
        let document = Arc::new(MemoryDocument::new());
        let result = FormController::bind(
            "LOGIN",
            config(json!({"selector": "#nope"})),
            &AppConfig::default(),
            document,
        );
        assert_matches!(result, Err(FormError::FormNotFound { selector, .. }) if selector == "#nope");
    }

    #[test]
    fn plain_data_trims_and_skips_unchecked() {
        let form = Arc::new(
            MemoryForm::new()
                .text("name", "  Ada  ")
                .checkbox("terms", "yes", false)
                .checkbox("tags[]", "a", true)
                .checkbox("tags[]", "b", true)
                .radio("plan", "free", false)
                .radio("plan", "pro", true),
        );
        let controller = bind(form, json!({"selector": "#form"}));
        assert_eq!(
            controller.get_data(false),
            FormData::Plain(
                json!({"name": "Ada", "tags[]": ["a", "b"], "plan": "pro"})
                    .as_object()
                    .unwrap()
                    .clone()
            )
        );
    }

    #[test]
    fn file_selection_switches_to_multipart() {
        let form = Arc::new(MemoryForm::new().text("title", "Hi").file("upload"));
        let controller = bind(Arc::clone(&form), json!({"selector": "#form"}));
        assert!(!controller.get_data(false).is_multipart());
        assert!(controller.get_data(true).is_multipart());

        form.select_files("upload", vec![SelectedFile::new("a.png")]);
        let data = controller.get_data(false);
        assert!(data.is_multipart());
        assert_eq!(data.files("upload").map(|f| f.len()), Some(1));
    }

    #[test]
    fn validate_reports_and_renders_errors() {
        let form = Arc::new(MemoryForm::new().text("email", "not-an-email").text("password", ""));
        let controller = bind(Arc::clone(&form), login_config());

        let errors = controller.validate().unwrap();
        assert_eq!(errors["email"], "Please enter a valid email address");
        assert_eq!(errors["password"], "Password is required");
        assert!(form.has_class("email", "is-invalid"));
        assert_matches!(form.feedback("password"), Some(Feedback::Inline { .. }));
        assert_eq!(
            controller.field_state("email").unwrap().classification,
            Classification::Invalid
        );
    }

    #[test]
    fn unchanged_fields_are_not_revalidated() {
        let form = Arc::new(MemoryForm::new().text("email", "").text("password", ""));
        let controller = bind(Arc::clone(&form), login_config());

        assert_eq!(controller.handle_event("email"), None);
        assert_eq!(
            controller.field_state("email").unwrap().classification,
            Classification::Neutral
        );

        form.type_value("email", "ada@example.com");
        assert_eq!(controller.handle_event("email"), Some(FieldOutcome::Valid));
        assert!(form.has_class("email", "is-valid"));

        form.type_value("email", "nope");
        assert_matches!(
            controller.handle_event("email"),
            Some(FieldOutcome::Invalid { rule, .. }) if rule == "email"
        );
    }

    #[test]
    fn changing_a_file_selection_revalidates() {
        let form = Arc::new(MemoryForm::new().file("avatar"));
        let controller = bind(
            Arc::clone(&form),
            json!({"selector": "#form", "fields": {"avatar": {"rules": ["image", "mimes:png"]}}}),
        );
        assert_eq!(controller.handle_event("avatar"), None);

        form.select_files(
            "avatar",
            vec![SelectedFile::new("cv.pdf").with_mime("application/pdf")],
        );
        assert_matches!(
            controller.handle_event("avatar"),
            Some(FieldOutcome::Invalid { message, .. }) if message == "The avatar field must be an image"
        );
        assert!(form.has_class("avatar", "is-invalid"));

        form.select_files(
            "avatar",
            vec![SelectedFile::new("me.png").with_mime("image/png")],
        );
        assert_eq!(controller.handle_event("avatar"), Some(FieldOutcome::Valid));

        form.select_files("avatar", Vec::new());
        assert_eq!(controller.handle_event("avatar"), None);
    }

    #[test]
    fn fields_without_rules_ignore_events() {
        let form = Arc::new(MemoryForm::new().text("note", ""));
        let controller = bind(Arc::clone(&form), json!({"selector": "#form"}));
        form.type_value("note", "hello");
        assert_eq!(controller.handle_event("note"), None);
    }

    #[test]
    fn collected_data_of_a_valid_form_revalidates_cleanly() {
        let form = Arc::new(
            MemoryForm::new()
                .text("email", " ada@example.com ")
                .text("password", "hunter22")
                .checkbox("tags[]", "a", true),
        );
        let controller = bind(form, login_config());
        assert_eq!(controller.validate(), None);
        let data = controller.get_data(false);
        assert_eq!(controller.validate_data(&data), None);
    }

    #[test]
    fn reset_clears_classification_and_rebaselines() {
        let form = Arc::new(MemoryForm::new().text("email", "").text("password", ""));
        let controller = bind(Arc::clone(&form), login_config());
        form.type_value("email", "bad");
        controller.validate();
        controller.reset();

        assert_eq!(form.value("email").as_deref(), Some(""));
        assert!(form.classes("email").is_empty());
        assert_eq!(form.feedback("email"), None);
        assert_eq!(controller.field_state("email"), Some(FieldState::new(String::new())));
    }

    #[test]
    fn server_errors_mark_fields() {
        let form = Arc::new(MemoryForm::new().text("email", "taken@example.com"));
        let controller = bind(Arc::clone(&form), json!({"selector": "#form"}));
        let mut errors = ValidationErrorMap::new();
        errors.insert("email".into(), "Email already taken".into());
        controller.show_errors(&errors);
        assert!(form.has_class("email", "is-invalid"));
        assert_eq!(
            controller.field_state("email").unwrap().last_error.as_deref(),
            Some("Email already taken")
        );
    }

    struct FixedResponse(Value);

    #[async_trait]
    impl Transport for FixedResponse {
        async fn request(&self, config: RequestConfig) -> Result<Response, TransportError> {
            assert_eq!(config.method, "GET");
            Ok(Response::new(200, self.0.clone(), config))
        }
    }

    #[tokio::test]
    async fn prefill_maps_fields_and_elements_then_rebaselines() {
        let form = Arc::new(MemoryForm::new().text("name", "").text("email", ""));
        let document = Arc::new(
            MemoryDocument::new()
                .with_form("#form", Arc::clone(&form))
                .with_element("#avatar")
                .with_element("#role"),
        );
        let cfg = config(json!({
            "selector": "#form",
            "fields": {"email": {"rules": ["required", "email"]}},
            "dataSource": {
                "endpoint": "/profile",
                "mapping": {
                    "user.name": "name",
                    "user.contacts[0].email": "email",
                    "avatar": {"selector": "#avatar", "attribute": "src", "path": "user.avatar"},
                    "role": {"selector": "#role", "transform": "uppercase", "path": "user.role"}
                }
            }
        }));
        let controller =
            FormController::bind("PROFILE", cfg, &AppConfig::default(), document.clone()).unwrap();

        let transport = FixedResponse(json!({
            "user": {
                "name": "Ada",
                "avatar": "/img/ada.png",
                "role": "admin",
                "contacts": [{"email": "ada@example.com"}]
            }
        }));
        controller.prefill(&transport).await.unwrap();

        assert_eq!(form.value("name").as_deref(), Some("Ada"));
        assert_eq!(form.value("email").as_deref(), Some("ada@example.com"));
        assert_eq!(
            document.element_attribute("#avatar", "src").as_deref(),
            Some("/img/ada.png")
        );
        assert_eq!(document.element_text("#role").as_deref(), Some("ADMIN"));
        // freshly loaded values are the new baseline
        assert_eq!(controller.handle_event("email"), None);
    }

    #[tokio::test]
    async fn prefill_without_data_source_is_a_no_op() {
        let form = Arc::new(MemoryForm::new().text("name", ""));
        let controller = bind(form, json!({"selector": "#form"}));
        controller
            .prefill(&FixedResponse(Value::Null))
            .await
            .unwrap();
    }
}
