use formbind_core::ConfigError;
use formbind_transport::TransportError;

/// Errors raised while building or binding a form.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    /// The merged form config is unusable (e.g. no selector).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The selector matched nothing in the document.
    #[error("Form '{form_key}' not found: no element matches '{selector}'")]
    FormNotFound { form_key: String, selector: String },
}

/// Errors returned from a submission.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The transport failed; outcome policy has already been applied.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Another submission on the same form is still running.
    #[error("A submission is already in progress for this form")]
    InFlight,
}
