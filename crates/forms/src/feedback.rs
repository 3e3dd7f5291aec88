//! Field classification and feedback rendering.

use formbind_core::config::{ErrorDisplayMode, ValidationOptions};

use crate::dom::{Feedback, FormElement};

/// Visual classification of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Classification {
    #[default]
    Neutral,
    Valid,
    Invalid,
}

/// Per-field bookkeeping owned by a controller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FieldState {
    /// Value recorded at bind time or the last load/reset.
    pub original: String,
    pub classification: Classification,
    pub last_error: Option<String>,
}

impl FieldState {
    pub fn new(original: String) -> Self {
        Self {
            original,
            ..Self::default()
        }
    }

    pub fn is_dirty(&self, current: &str) -> bool {
        self.original != current
    }
}

/// Applies validation results to the DOM according to the display options.
pub struct FeedbackRenderer<'a> {
    form: &'a dyn FormElement,
    options: &'a ValidationOptions,
}

impl<'a> FeedbackRenderer<'a> {
    pub fn new(form: &'a dyn FormElement, options: &'a ValidationOptions) -> Self {
        Self { form, options }
    }

    pub fn valid(&self, field: &str) {
        if !self.options.show_errors {
            return;
        }
        self.form.remove_class(field, &self.options.error_class);
        self.form.add_class(field, &self.options.success_class);
        self.form.set_feedback(field, None);
    }

    pub fn invalid(&self, field: &str, message: &str) {
        if !self.options.show_errors {
            return;
        }
        self.form.remove_class(field, &self.options.success_class);
        self.form.add_class(field, &self.options.error_class);
        let message = message.to_string();
        let color = self.options.error_color.clone();
        let feedback = match self.options.error_display_mode {
            ErrorDisplayMode::Inline => Feedback::Inline { message, color },
            ErrorDisplayMode::Popup => Feedback::Popup { message, color },
        };
        self.form.set_feedback(field, Some(feedback));
    }

    pub fn clear(&self, field: &str) {
        self.form.remove_class(field, &self.options.error_class);
        self.form.remove_class(field, &self.options.success_class);
        self.form.set_feedback(field, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryForm;
    use formbind_core::config::ValidationUiConfig;
    use serde_json::{json, Value};

    fn options(overrides: Value) -> ValidationOptions {
        ValidationOptions::resolve(&ValidationUiConfig::default(), &overrides).unwrap()
    }

    #[test]
    fn invalid_then_valid_swaps_classes() {
        let form = MemoryForm::new().text("email", "");
        let opts = options(Value::Null);
        let renderer = FeedbackRenderer::new(&form, &opts);

        renderer.invalid("email", "Bad email");
        assert!(form.has_class("email", "is-invalid"));
        assert_eq!(
            form.feedback("email"),
            Some(Feedback::Inline {
                message: "Bad email".into(),
                color: "#dc3545".into()
            })
        );

        renderer.valid("email");
        assert!(!form.has_class("email", "is-invalid"));
        assert!(form.has_class("email", "is-valid"));
        assert_eq!(form.feedback("email"), None);
    }

    #[test]
    fn popup_mode_is_exclusive_with_inline() {
        let form = MemoryForm::new().text("name", "");
        let opts = options(json!({"errorDisplayMode": "popup", "errorColor": "red"}));
        FeedbackRenderer::new(&form, &opts).invalid("name", "Required");
        assert_eq!(
            form.feedback("name"),
            Some(Feedback::Popup {
                message: "Required".into(),
                color: "red".into()
            })
        );
    }

    #[test]
    fn hidden_errors_leave_dom_untouched() {
        let form = MemoryForm::new().text("name", "");
        let opts = options(json!({"showErrors": false}));
        FeedbackRenderer::new(&form, &opts).invalid("name", "Required");
        assert!(form.classes("name").is_empty());
        assert_eq!(form.feedback("name"), None);
    }

    #[test]
    fn dirty_check_compares_with_original() {
        let state = FieldState::new("a".into());
        assert!(!state.is_dirty("a"));
        assert!(state.is_dirty("b"));
    }
}
