//! Caller-supplied submission hooks.

use std::fmt;
use std::sync::Arc;

use formbind_core::FormData;
use formbind_transport::{Response, TransportError};

/// Whether the default outcome handling should still run after a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HookOutcome {
    #[default]
    Continue,
    Suppress,
}

type SubmitHook = dyn Fn(&FormData) -> Option<FormData> + Send + Sync;
type SuccessHook = dyn Fn(&Response) -> HookOutcome + Send + Sync;
type ErrorHook = dyn Fn(&TransportError) -> HookOutcome + Send + Sync;

/// Hooks around a submission. All optional.
#[derive(Clone, Default)]
pub struct FormActions {
    on_submit: Option<Arc<SubmitHook>>,
    on_success: Option<Arc<SuccessHook>>,
    on_error: Option<Arc<ErrorHook>>,
}

impl FormActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs after validation; returning `Some` replaces the payload.
    pub fn on_submit(
        mut self,
        hook: impl Fn(&FormData) -> Option<FormData> + Send + Sync + 'static,
    ) -> Self {
        self.on_submit = Some(Arc::new(hook));
        self
    }

    pub fn on_success(
        mut self,
        hook: impl Fn(&Response) -> HookOutcome + Send + Sync + 'static,
    ) -> Self {
        self.on_success = Some(Arc::new(hook));
        self
    }

    pub fn on_error(
        mut self,
        hook: impl Fn(&TransportError) -> HookOutcome + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Arc::new(hook));
        self
    }

    pub(crate) fn before_submit(&self, data: FormData) -> FormData {
        match &self.on_submit {
            Some(hook) => hook(&data).unwrap_or(data),
            None => data,
        }
    }

    pub(crate) fn after_success(&self, response: &Response) -> HookOutcome {
        self.on_success
            .as_ref()
            .map_or(HookOutcome::Continue, |hook| hook(response))
    }

    pub(crate) fn after_error(&self, error: &TransportError) -> HookOutcome {
        self.on_error
            .as_ref()
            .map_or(HookOutcome::Continue, |hook| hook(error))
    }
}

impl fmt::Debug for FormActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormActions")
            .field("on_submit", &self.on_submit.is_some())
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
