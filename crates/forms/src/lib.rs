//! Form binding: controllers, the submit pipeline, outcome policy and the
//! collaborators they talk to.
//!
//! A [`FormFactory`] turns a form key into a [`SubmitPipeline`] bound to a
//! form found through a [`DocumentAdapter`]; a [`FormManager`] does that for
//! every registered form present in a document.

pub mod actions;
pub mod controller;
pub mod dom;
pub mod error;
pub mod factory;
pub mod feedback;
pub mod manager;
pub mod notify;
pub mod outcome;
pub mod pipeline;

pub use actions::{FormActions, HookOutcome};
pub use controller::FormController;
pub use dom::{DocumentAdapter, FormElement, MemoryDocument, MemoryForm};
pub use error::{FormError, SubmitError};
pub use factory::{FormFactory, FormSpec};
pub use feedback::{Classification, FieldState};
pub use manager::FormManager;
pub use notify::{
    DeferredNavigator, Navigator, Notification, NotificationBody, Notifier, NotifyKind,
    PendingRedirect, TracingNotifier,
};
pub use pipeline::{Collaborators, SubmitOutcome, SubmitPipeline, SubmitState};
