//! In-memory [`DocumentAdapter`] and [`FormElement`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use formbind_core::path::value_to_field_string;
use formbind_core::validation::SelectedFile;
use serde_json::{Map, Value};

use super::{DocumentAdapter, Feedback, FormElement, InputKind, InputSnapshot};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone)]
struct MemoryInput {
    current: InputSnapshot,
    initial_value: String,
    initial_checked: bool,
    classes: BTreeSet<String>,
    feedback: Option<Feedback>,
}

/// A form held in memory. Built with the chaining constructors, then
/// shared behind an `Arc`.
#[derive(Debug, Default)]
pub struct MemoryForm {
    inputs: Mutex<Vec<MemoryInput>>,
}

impl MemoryForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// One text input per record key. Booleans become a checkbox, arrays
    /// one checked checkbox per item.
    pub fn from_record(record: &Map<String, Value>) -> Self {
        record.iter().fold(Self::new(), |form, (name, value)| match value {
            Value::Bool(checked) => form.checkbox(name, "on", *checked),
            Value::Array(items) => items.iter().fold(form, |form, item| {
                let item = value_to_field_string(item).unwrap_or_default();
                form.checkbox(name, &item, true)
            }),
            other => form.text(name, &value_to_field_string(other).unwrap_or_default()),
        })
    }

    fn push(self, name: &str, kind: InputKind, value: &str, checked: bool) -> Self {
        lock(&self.inputs).push(MemoryInput {
            current: InputSnapshot {
                name: name.to_string(),
                kind,
                value: value.to_string(),
                checked,
                files: Vec::new(),
            },
            initial_value: value.to_string(),
            initial_checked: checked,
            classes: BTreeSet::new(),
            feedback: None,
        });
        self
    }

    pub fn text(self, name: &str, value: &str) -> Self {
        self.push(name, InputKind::Text, value, false)
    }

    pub fn checkbox(self, name: &str, value: &str, checked: bool) -> Self {
        self.push(name, InputKind::Checkbox, value, checked)
    }

    pub fn radio(self, name: &str, value: &str, checked: bool) -> Self {
        self.push(name, InputKind::Radio, value, checked)
    }

    pub fn file(self, name: &str) -> Self {
        self.push(name, InputKind::File, "", false)
    }

    pub fn has_input(&self, name: &str) -> bool {
        lock(&self.inputs).iter().any(|i| i.current.name == name)
    }

    /// Simulate the user typing into a text input.
    pub fn type_value(&self, name: &str, value: &str) {
        for input in lock(&self.inputs).iter_mut() {
            if input.current.name == name && input.current.kind == InputKind::Text {
                input.current.value = value.to_string();
            }
        }
    }

    /// Simulate the user toggling the checkbox/radio `name=value`.
    pub fn set_checked(&self, name: &str, value: &str, checked: bool) {
        let mut inputs = lock(&self.inputs);
        let is_radio = inputs
            .iter()
            .any(|i| i.current.name == name && i.current.kind == InputKind::Radio);
        for input in inputs.iter_mut().filter(|i| i.current.name == name) {
            if input.current.value == value {
                input.current.checked = checked;
            } else if is_radio && checked {
                input.current.checked = false;
            }
        }
    }

    /// Simulate the user picking files.
    pub fn select_files(&self, name: &str, files: Vec<SelectedFile>) {
        for input in lock(&self.inputs).iter_mut() {
            if input.current.name == name && input.current.kind == InputKind::File {
                input.current.value = files.first().map(|f| f.name.clone()).unwrap_or_default();
                input.current.files = files.clone();
            }
        }
    }

    /// Current value of the first input named `name`.
    pub fn value(&self, name: &str) -> Option<String> {
        lock(&self.inputs)
            .iter()
            .find(|i| i.current.name == name)
            .map(|i| i.current.value.clone())
    }

    pub fn classes(&self, name: &str) -> Vec<String> {
        lock(&self.inputs)
            .iter()
            .find(|i| i.current.name == name)
            .map(|i| i.classes.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, name: &str, class: &str) -> bool {
        self.classes(name).iter().any(|c| c == class)
    }

    pub fn feedback(&self, name: &str) -> Option<Feedback> {
        lock(&self.inputs)
            .iter()
            .find(|i| i.current.name == name)
            .and_then(|i| i.feedback.clone())
    }
}

impl FormElement for MemoryForm {
    fn inputs(&self) -> Vec<InputSnapshot> {
        lock(&self.inputs).iter().map(|i| i.current.clone()).collect()
    }

    fn set_value(&self, name: &str, value: &str) -> bool {
        let mut matched = false;
        let mut inputs = lock(&self.inputs);
        for input in inputs.iter_mut().filter(|i| i.current.name == name) {
            match input.current.kind {
                InputKind::Text => {
                    input.current.value = value.to_string();
                    matched = true;
                }
                InputKind::Checkbox | InputKind::Radio => {
                    input.current.checked = input.current.value == value;
                    matched = true;
                }
                InputKind::File => {}
            }
        }
        matched
    }

    fn add_class(&self, name: &str, class: &str) {
        for input in lock(&self.inputs).iter_mut().filter(|i| i.current.name == name) {
            input.classes.insert(class.to_string());
        }
    }

    fn remove_class(&self, name: &str, class: &str) {
        for input in lock(&self.inputs).iter_mut().filter(|i| i.current.name == name) {
            input.classes.remove(class);
        }
    }

    fn set_feedback(&self, name: &str, feedback: Option<Feedback>) {
        if let Some(input) = lock(&self.inputs).iter_mut().find(|i| i.current.name == name) {
            input.feedback = feedback;
        }
    }

    fn reset(&self) {
        for input in lock(&self.inputs).iter_mut() {
            input.current.value = input.initial_value.clone();
            input.current.checked = input.initial_checked;
            input.current.files.clear();
        }
    }
}

#[derive(Debug, Default, Clone)]
struct MemoryElement {
    text: String,
    attributes: BTreeMap<String, String>,
}

/// A document holding forms and plain elements, addressed by selector.
#[derive(Default)]
pub struct MemoryDocument {
    forms: Mutex<HashMap<String, Arc<MemoryForm>>>,
    elements: Mutex<HashMap<String, MemoryElement>>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_form(self, selector: &str, form: Arc<MemoryForm>) -> Self {
        lock(&self.forms).insert(selector.to_string(), form);
        self
    }

    pub fn with_element(self, selector: &str) -> Self {
        lock(&self.elements).insert(selector.to_string(), MemoryElement::default());
        self
    }

    pub fn element_text(&self, selector: &str) -> Option<String> {
        lock(&self.elements).get(selector).map(|e| e.text.clone())
    }

    pub fn element_attribute(&self, selector: &str, attribute: &str) -> Option<String> {
        lock(&self.elements)
            .get(selector)
            .and_then(|e| e.attributes.get(attribute).cloned())
    }
}

impl DocumentAdapter for MemoryDocument {
    fn query_form(&self, selector: &str) -> Option<Arc<dyn FormElement>> {
        lock(&self.forms)
            .get(selector)
            .map(|form| Arc::clone(form) as Arc<dyn FormElement>)
    }

    fn set_element(&self, selector: &str, attribute: Option<&str>, value: &str) -> bool {
        let mut elements = lock(&self.elements);
        let Some(element) = elements.get_mut(selector) else {
            return false;
        };
        match attribute {
            Some(attribute) => {
                element
                    .attributes
                    .insert(attribute.to_string(), value.to_string());
            }
            None => element.text = value.to_string(),
        }
        true
    }
}
