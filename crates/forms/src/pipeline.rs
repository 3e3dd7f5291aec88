//! The submit lifecycle.
//!
//! `Idle → Validating → (Invalid → Idle) | Submitting → (Success | Failure) → Idle`
//!
//! 1. Collect the form data.
//! 2. Validate when enabled; on errors render them, show one aggregate
//!    notification and stop without calling the transport.
//! 3. Run the pre-submit hook, which may replace the payload.
//! 4. Send the request when both endpoint and method are configured.
//! 5. Apply the success or error outcome policy unless the hook suppresses it.
//!
//! Transport errors are returned to the caller after local handling.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use formbind_core::config::{ApiConfig, NotificationOptions};
use formbind_core::validation::ValidationErrorMap;
use formbind_core::{AppConfig, FormData};
use formbind_transport::{RequestConfig, Response, TokenManager, Transport, TransportError};
use serde_json::Value;

use crate::actions::{FormActions, HookOutcome};
use crate::controller::FormController;
use crate::error::SubmitError;
use crate::notify::{Navigator, Notification, NotificationBody, Notifier, NotifyKind};
use crate::outcome::{
    fallback_notice, first_messages, resolve_error, resolve_success, server_field_errors,
    FallbackNotice,
};

/// The services a pipeline talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub transport: Arc<dyn Transport>,
    pub notifier: Arc<dyn Notifier>,
    pub navigator: Arc<dyn Navigator>,
    pub tokens: TokenManager,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmitState {
    #[default]
    Idle,
    Validating,
    Submitting,
}

/// How a submission ended when it did not fail in the transport.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Client-side validation failed; nothing was sent.
    Invalid(ValidationErrorMap),
    /// The request succeeded.
    Sent(Response),
    /// No endpoint/method configured; the collected payload is returned.
    Local(FormData),
}

/// A bound form plus everything needed to submit it.
pub struct SubmitPipeline {
    controller: FormController,
    api: ApiConfig,
    notification_options: NotificationOptions,
    collaborators: Collaborators,
    actions: FormActions,
    state: Mutex<SubmitState>,
}

/// Returns the pipeline to `Idle` when the submission ends, however it ends.
struct InFlight<'a> {
    state: &'a Mutex<SubmitState>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *lock(self.state) = SubmitState::Idle;
    }
}

fn lock(state: &Mutex<SubmitState>) -> MutexGuard<'_, SubmitState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SubmitPipeline {
    pub fn new(
        controller: FormController,
        app: &AppConfig,
        collaborators: Collaborators,
        actions: FormActions,
    ) -> Self {
        Self {
            controller,
            api: app.api.clone(),
            notification_options: app.ui.notifications.clone(),
            collaborators,
            actions,
            state: Mutex::new(SubmitState::Idle),
        }
    }

    pub fn controller(&self) -> &FormController {
        &self.controller
    }

    pub fn api(&self) -> &ApiConfig {
        &self.api
    }

    pub fn state(&self) -> SubmitState {
        *lock(&self.state)
    }

    /// Load initial values from the form's data source, if configured.
    pub async fn prefill(&self) -> Result<(), TransportError> {
        self.controller
            .prefill(self.collaborators.transport.as_ref())
            .await
    }

    fn begin(&self) -> Result<InFlight<'_>, SubmitError> {
        let mut state = lock(&self.state);
        if *state != SubmitState::Idle {
            tracing::warn!(form = %self.controller.form_key(), "Submission already in flight");
            return Err(SubmitError::InFlight);
        }
        *state = SubmitState::Validating;
        Ok(InFlight { state: &self.state })
    }

    fn enter(&self, next: SubmitState) {
        *lock(&self.state) = next;
    }

    /// Run one submission.
    pub async fn submit(&self) -> Result<SubmitOutcome, SubmitError> {
        let _in_flight = self.begin()?;
        let config = Arc::clone(self.controller.config());
        let form_key = self.controller.form_key();

        let data = self.controller.get_data(false);
        if config.validation {
            if let Some(errors) = self.controller.validate_data(&data) {
                tracing::debug!(form = %form_key, errors = errors.len(), "Submission blocked by validation");
                self.announce(Notification {
                    kind: NotifyKind::Error,
                    title: "Form errors".to_string(),
                    body: NotificationBody::html_list(errors.values()),
                    options: self.notification_options.clone(),
                });
                return Ok(SubmitOutcome::Invalid(errors));
            }
        }

        let data = self.actions.before_submit(data);
        if !config.submits_remotely() {
            return Ok(SubmitOutcome::Local(data));
        }
        let endpoint = config.endpoint.clone().unwrap_or_default();
        let method = config.method.clone().unwrap_or_default();

        self.enter(SubmitState::Submitting);
        tracing::info!(form = %form_key, %method, %endpoint, "Submitting form");
        let request = RequestConfig::new(method, endpoint)
            .with_data(data)
            .with_form(Arc::clone(&config));

        match self.collaborators.transport.request(request).await {
            Ok(response) => {
                self.apply_success(&response);
                Ok(SubmitOutcome::Sent(response))
            }
            Err(err) => {
                tracing::warn!(form = %form_key, status = ?err.status(), error = %err, "Submission failed");
                self.apply_error(&err);
                Err(SubmitError::Transport(err))
            }
        }
    }

    fn notifications_enabled(&self) -> bool {
        self.controller
            .config()
            .notifications
            .unwrap_or(self.api.notifications)
    }

    fn announce(&self, notification: Notification) {
        if self.notifications_enabled() {
            self.collaborators.notifier.notify(notification);
        } else {
            tracing::info!(
                kind = ?notification.kind,
                title = %notification.title,
                body = notification.body.as_str(),
                "Notification (notifier disabled)"
            );
        }
    }

    fn redirect(&self, target: &str) {
        let delay = Duration::from_millis(self.notification_options.timer);
        self.collaborators.navigator.schedule_redirect(target, delay);
    }

    fn apply_success(&self, response: &Response) {
        if self.actions.after_success(response) == HookOutcome::Suppress {
            tracing::debug!(form = %self.controller.form_key(), "Default success handling suppressed");
            return;
        }
        let config = self.controller.config();
        let outcome = resolve_success(config, &self.api, &response.data);

        self.collaborators
            .tokens
            .process_token_response(Some(config.as_ref()), outcome.clear_token, &response.data);

        if let Some(message) = &outcome.message {
            self.announce(Notification {
                kind: NotifyKind::Success,
                title: "Success!".to_string(),
                body: NotificationBody::Text(message.clone()),
                options: self.notification_options.clone(),
            });
        }
        if let Some(target) = outcome.redirect_target() {
            self.redirect(target);
        }
    }

    fn apply_error(&self, error: &TransportError) {
        if self.actions.after_error(error) == HookOutcome::Suppress {
            tracing::debug!(form = %self.controller.form_key(), "Default error handling suppressed");
            return;
        }
        let config = self.controller.config();
        let status = error.status();
        let body = error.data();
        let outcome = resolve_error(config, &self.api, status);

        self.collaborators.tokens.process_token_response(
            Some(config.as_ref()),
            outcome.clear_token,
            body.unwrap_or(&Value::Null),
        );

        if status == Some(422) {
            if let Some(body) = body {
                let field_errors = first_messages(&server_field_errors(body));
                if !field_errors.is_empty() {
                    self.controller.show_errors(&field_errors);
                }
            }
        }

        let notification = match &outcome.message {
            Some(message) => Notification {
                kind: NotifyKind::Error,
                title: status.map_or_else(|| "Error!".to_string(), |s| s.to_string()),
                body: NotificationBody::Text(message.clone()),
                options: self.notification_options.clone(),
            },
            None => self.fallback_notification(status, body),
        };
        self.announce(notification);

        if let Some(target) = outcome.redirect_target() {
            self.redirect(target);
        }
    }

    fn fallback_notification(&self, status: Option<u16>, body: Option<&Value>) -> Notification {
        let (kind, title, body) = match fallback_notice(status, body) {
            FallbackNotice::Message { kind, text } => {
                let title = match kind {
                    NotifyKind::Warning => "Warning!",
                    _ => "Error!",
                };
                (kind, title, NotificationBody::Text(text))
            }
            FallbackNotice::FieldErrors(errors) => (
                NotifyKind::Error,
                "Validation error",
                NotificationBody::html_list(errors.values().flatten()),
            ),
        };
        Notification {
            kind,
            title: title.to_string(),
            body,
            options: self.notification_options.clone(),
        }
    }
}
