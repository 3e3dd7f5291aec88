//! Form discovery, factory layering and prefill.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use common::{document_with, Harness, Reply, ScriptedTransport};
use formbind_core::{AppConfig, ConfigError};
use formbind_forms::{FormError, FormManager, FormSpec, MemoryDocument, MemoryForm};
use serde_json::json;

fn app() -> AppConfig {
    AppConfig::from_value(&json!({
        "forms": {
            "LOGIN": { "selector": "#login", "endpoint": "/login", "method": "POST" },
            "CONTACT": { "selector": "#contact" },
            "BROKEN": { "endpoint": "/nowhere" }
        }
    }))
    .unwrap()
}

// ---------------------------------------------------------------------------
// Test: only forms present in the document are bound
// ---------------------------------------------------------------------------

#[tokio::test]
async fn initialize_binds_present_forms() {
    let harness = Harness::new(app(), ScriptedTransport::default());
    let document = Arc::new(
        MemoryDocument::new().with_form("#login", Arc::new(MemoryForm::new().text("email", ""))),
    );

    let mut manager = FormManager::new();
    let bound = manager.initialize(&harness.factory, document);

    assert_eq!(bound, 1);
    assert_eq!(manager.len(), 1);
    assert!(manager.get_form("login").is_some());
    assert!(manager.get_form("LOGIN").is_some());
    assert!(manager.get_form("contact").is_none());
}

#[tokio::test]
async fn initialize_on_empty_document_binds_nothing() {
    let harness = Harness::new(app(), ScriptedTransport::default());
    let mut manager = FormManager::new();

    assert_eq!(manager.initialize(&harness.factory, Arc::new(MemoryDocument::new())), 0);
    assert!(manager.is_empty());
}

// ---------------------------------------------------------------------------
// Test: factory errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_without_selector_fails() {
    let harness = Harness::new(app(), ScriptedTransport::default());
    let document = document_with(Arc::new(MemoryForm::new()));

    let err = harness
        .factory
        .create("BROKEN", FormSpec::default(), document.clone())
        .err()
        .unwrap();
    assert_matches!(err, FormError::Config(ConfigError::MissingSelector { ref form_key }) if form_key == "BROKEN");

    let err = harness
        .factory
        .create("UNKNOWN", FormSpec::default(), document)
        .err()
        .unwrap();
    assert_matches!(err, FormError::Config(ConfigError::MissingSelector { .. }));
}

#[tokio::test]
async fn create_with_unmatched_selector_fails() {
    let harness = Harness::new(app(), ScriptedTransport::default());
    let err = harness
        .factory
        .create("CONTACT", FormSpec::default(), Arc::new(MemoryDocument::new()))
        .err()
        .unwrap();
    assert_matches!(err, FormError::FormNotFound { ref selector, .. } if selector == "#contact");
}

// ---------------------------------------------------------------------------
// Test: caller layers merge over the template
// ---------------------------------------------------------------------------

#[tokio::test]
async fn custom_config_overrides_template() {
    let harness = Harness::new(app(), ScriptedTransport::default());
    let document = Arc::new(MemoryDocument::new().with_form("#other", Arc::new(MemoryForm::new())));
    let pipeline = harness
        .factory
        .create(
            "LOGIN",
            FormSpec::new(json!({ "selector": "#other", "method": "PUT" })),
            document,
        )
        .unwrap();

    let config = pipeline.controller().config();
    assert_eq!(config.selector, "#other");
    assert_eq!(config.method.as_deref(), Some("PUT"));
    assert_eq!(config.endpoint.as_deref(), Some("/login"));
}

#[tokio::test]
async fn api_overrides_stay_local_to_the_form() {
    let harness = Harness::new(app(), ScriptedTransport::default());
    let document = Arc::new(
        MemoryDocument::new().with_form("#login", Arc::new(MemoryForm::new())),
    );
    let pipeline = harness
        .factory
        .create(
            "LOGIN",
            FormSpec::default().with_api(json!({ "notifications": false })),
            document,
        )
        .unwrap();

    assert!(!pipeline.api().notifications);
    assert!(harness.factory.app().api.notifications);
}

// ---------------------------------------------------------------------------
// Test: prefill maps remote data into the form
// ---------------------------------------------------------------------------

#[tokio::test]
async fn prefill_populates_fields_and_elements() {
    let app = AppConfig::from_value(&json!({
        "forms": {
            "PROFILE": {
                "selector": "#form",
                "dataSource": {
                    "endpoint": "/me",
                    "mapping": {
                        "user.name": "name",
                        "avatar": { "selector": "#avatar", "attribute": "src", "path": "user.avatar" }
                    }
                }
            }
        }
    }))
    .unwrap();
    let harness = Harness::new(
        app,
        ScriptedTransport::new(vec![Reply::Ok(
            200,
            json!({ "user": { "name": "Ada", "avatar": "/a.png" } }),
        )]),
    );
    let form = Arc::new(MemoryForm::new().text("name", ""));
    let document = Arc::new(
        MemoryDocument::new()
            .with_form("#form", Arc::clone(&form))
            .with_element("#avatar"),
    );
    let pipeline = harness
        .factory
        .create("PROFILE", FormSpec::default(), document.clone())
        .unwrap();

    pipeline.prefill().await.unwrap();

    assert_eq!(form.value("name").as_deref(), Some("Ada"));
    assert_eq!(document.element_attribute("#avatar", "src").as_deref(), Some("/a.png"));

    let requests = harness.transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, "/me");
    assert_eq!(requests[0].method, "GET");
}
