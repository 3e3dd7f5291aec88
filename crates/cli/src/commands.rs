//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use formbind_core::validation::ValidationErrorMap;
use formbind_core::{AppConfig, FormConfig};
use formbind_forms::{
    Collaborators, DeferredNavigator, FormController, FormFactory, FormSpec, MemoryDocument,
    MemoryForm, SubmitError, SubmitOutcome, TracingNotifier,
};
use formbind_transport::{CookieJar, HttpTransport, InMemoryTokenStore, TokenManager, TokenStore};
use serde_json::{json, Map, Value};

use crate::cli::{RecordArgs, SubmitArgs};

/// Load the configuration file, if any, and apply environment overrides.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let mut app = match path {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    app.api.apply_env();
    Ok(app)
}

pub fn parse_record(raw: &str) -> anyhow::Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw).context("--data is not valid JSON")? {
        Value::Object(record) => Ok(record),
        other => bail!("--data must be a JSON object, got {other}"),
    }
}

fn form_config(app: &AppConfig, form_key: &str) -> anyhow::Result<FormConfig> {
    Ok(FormConfig::from_layers(
        form_key,
        app.form_template(form_key),
        &Value::Null,
    )?)
}

/// A document holding one in-memory form built from `record` at the form's
/// selector. Configured fields missing from the record become empty inputs.
pub fn record_document(
    config: &FormConfig,
    record: &Map<String, Value>,
) -> Arc<MemoryDocument> {
    let form = config
        .fields
        .keys()
        .fold(MemoryForm::from_record(record), |form, field| {
            if form.has_input(field) {
                form
            } else {
                form.text(field, "")
            }
        });
    Arc::new(MemoryDocument::new().with_form(&config.selector, Arc::new(form)))
}

pub fn run_forms(app: &AppConfig) {
    for (key, template) in &app.forms {
        let selector = template
            .get("selector")
            .and_then(Value::as_str)
            .unwrap_or("-");
        println!("{key}\t{selector}");
    }
}

/// Validate `record` against the form's rules.
pub fn validate_record(
    app: &AppConfig,
    form_key: &str,
    record: &Map<String, Value>,
) -> anyhow::Result<Option<ValidationErrorMap>> {
    let config = form_config(app, form_key)?;
    let document = record_document(&config, record);
    let controller = FormController::bind(form_key, config, app, document)?;
    Ok(controller.validate())
}

/// Returns `true` when the record is valid.
pub fn run_validate(app: &AppConfig, args: &RecordArgs) -> anyhow::Result<bool> {
    let record = parse_record(&args.data)?;
    match validate_record(app, &args.form, &record)? {
        None => {
            println!("{}", json!({ "valid": true }));
            Ok(true)
        }
        Some(errors) => {
            println!("{}", json!({ "valid": false, "errors": errors }));
            Ok(false)
        }
    }
}

/// Returns `true` when the submission succeeded or stayed local.
pub async fn run_submit(app: AppConfig, args: &SubmitArgs) -> anyhow::Result<bool> {
    let record = parse_record(&args.record.data)?;
    let document = record_document(&form_config(&app, &args.record.form)?, &record);

    let store = Arc::new(InMemoryTokenStore::new());
    let tokens = TokenManager::new(store.clone() as Arc<dyn TokenStore>, &app.api);
    if let (Some(token), Some(name)) = (&args.token, tokens.token_name(None)) {
        store.set(&name, token);
    }
    let cookies = Arc::new(CookieJar::parse(&args.cookie));
    let transport = HttpTransport::standard(&app.api, tokens.clone(), cookies)?;

    let redirect_wait = Duration::from_millis(app.ui.notifications.timer);
    let collaborators = Collaborators {
        transport: Arc::new(transport),
        notifier: Arc::new(TracingNotifier),
        navigator: Arc::new(DeferredNavigator::new(|url| {
            tracing::info!(%url, "Redirect");
        })),
        tokens,
    };
    let factory = FormFactory::new(Arc::new(app), collaborators);
    let pipeline = factory.create(&args.record.form, FormSpec::default(), document)?;

    let succeeded = match pipeline.submit().await {
        Ok(SubmitOutcome::Sent(response)) => {
            println!("{}", json!({ "status": response.status, "data": response.data }));
            true
        }
        Ok(SubmitOutcome::Local(data)) => {
            println!("{}", json!({ "local": true, "data": data.to_json() }));
            true
        }
        Ok(SubmitOutcome::Invalid(errors)) => {
            println!("{}", json!({ "valid": false, "errors": errors }));
            false
        }
        Err(SubmitError::Transport(err)) => {
            println!(
                "{}",
                json!({ "status": err.status(), "error": err.to_string(), "data": err.data() })
            );
            false
        }
        Err(err) => return Err(err.into()),
    };

    if args.follow_redirects {
        tokio::time::sleep(redirect_wait + Duration::from_millis(50)).await;
    }
    Ok(succeeded)
}
