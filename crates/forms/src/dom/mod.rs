//! DOM adapter: the small surface the controller needs from a host page.
//!
//! A browser binding implements these traits over real elements; the
//! [`memory`] module provides an in-process document for headless use and
//! tests.

pub mod memory;

use std::sync::Arc;

use formbind_core::validation::SelectedFile;

pub use memory::{MemoryDocument, MemoryForm};

/// Kind of a bound input, as far as data collection cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Text-like inputs, selects and textareas.
    Text,
    Checkbox,
    Radio,
    File,
}

/// Point-in-time view of one input element.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSnapshot {
    pub name: String,
    pub kind: InputKind,
    pub value: String,
    pub checked: bool,
    pub files: Vec<SelectedFile>,
}

impl InputSnapshot {
    /// Checkbox and radio inputs only contribute when checked.
    pub fn contributes(&self) -> bool {
        match self.kind {
            InputKind::Checkbox | InputKind::Radio => self.checked,
            InputKind::Text | InputKind::File => true,
        }
    }
}

/// How a field message is shown next to its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    /// A feedback node rendered as the input's sibling.
    Inline { message: String, color: String },
    /// A transient positioned popup anchored to the input.
    Popup { message: String, color: String },
}

/// One bound form element.
pub trait FormElement: Send + Sync {
    /// Every named input, in document order.
    fn inputs(&self) -> Vec<InputSnapshot>;

    /// Set the value of the input(s) named `name`. For checkboxes and
    /// radios this checks the element whose value matches.
    fn set_value(&self, name: &str, value: &str) -> bool;

    fn add_class(&self, name: &str, class: &str);

    fn remove_class(&self, name: &str, class: &str);

    /// Show `feedback` for `name`, replacing any previous one; `None` clears.
    fn set_feedback(&self, name: &str, feedback: Option<Feedback>);

    /// Restore every input to its initial value.
    fn reset(&self);
}

/// The host document.
pub trait DocumentAdapter: Send + Sync {
    fn query_form(&self, selector: &str) -> Option<Arc<dyn FormElement>>;

    /// Set an attribute (or the text content when `attribute` is `None`) on
    /// the element matching `selector`. Returns `false` when nothing matched.
    fn set_element(&self, selector: &str, attribute: Option<&str>, value: &str) -> bool;
}
