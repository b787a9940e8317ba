//! Command handlers for CLI operations

use anyhow::{Result, bail};
use forge_agent::{Orchestrator, PipelineUpdate, RuleValidator, ValidationContext, Validator as _};
use forge_core::{
    ForgeConfig, GenerationRequest, MemoryPublisher, MemoryStore, ModelProvider, Session,
    SessionLog, SessionStatus, ValidationVerdict,
};
use forge_providers::{MockProvider, OpenRouterProvider, TimeoutProvider};
use futures::StreamExt as _;
use std::io::{Write, stderr, stdout};
use std::path::Path;
use std::sync::Arc;
use tokio::fs as async_fs;
use tracing::{debug, info, warn};
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

use crate::cli::GenerateArgs;

const DEMO_CLASSIFICATION: &str = r#"{"intent":"utility","complexity":"simple",
"key_features":["counter display","increment and reset buttons"],
"suggested_dependencies":["react","lucide-react"],"estimated_lines":30}"#;

const DEMO_COMPONENT: &str = r#"Here is the component.

```tsx
import React, { useState } from 'react';
import { Plus, RotateCcw } from 'lucide-react';

export default function Counter() {
  const [count, setCount] = useState(0);

  return (
    <div className="flex items-center gap-3 rounded-lg border p-4">
      <span className="text-2xl font-semibold tabular-nums">{count}</span>
      <button className="rounded bg-blue-600 p-2 text-white" onClick={() => setCount(count + 1)}>
        <Plus className="h-4 w-4" />
      </button>
      <button className="rounded border p-2" onClick={() => setCount(0)}>
        <RotateCcw className="h-4 w-4" />
      </button>
    </div>
  );
}
```"#;

/// Installs the stderr tracing subscriber; `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    Registry::default()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "forge=info".into()))
        .with(
            fmt::layer()
                .with_writer(stderr)
                .with_target(false)
                .with_level(true),
        )
        .init();
}

fn load_config() -> ForgeConfig {
    ForgeConfig::load_or_create().unwrap_or_else(|error| {
        warn!("Failed to load config from ~/.forge/config.toml: {error}");
        warn!("Using default configuration");
        ForgeConfig::default()
    })
}

/// Scripted provider for offline runs.
fn demo_provider() -> MockProvider {
    MockProvider::new()
        .with_response("You classify requests", DEMO_CLASSIFICATION)
        .with_response("You write a single self-contained", DEMO_COMPONENT)
}

fn provider_for(config: &ForgeConfig, mock: bool) -> Result<Arc<dyn ModelProvider>> {
    if mock {
        info!("Using the scripted offline model");
        return Ok(Arc::new(demo_provider()));
    }
    let remote = Arc::new(OpenRouterProvider::from_config(config)?);
    Ok(Arc::new(TimeoutProvider::from_secs(
        remote,
        config.models.timeout_seconds,
    )))
}

/// Handle the generate command
///
/// # Errors
/// Returns an error if the provider cannot be built, or if the session does not complete
pub async fn handle_generate(args: GenerateArgs) -> Result<()> {
    let config = load_config();
    let provider = provider_for(&config, args.mock)?;
    let orchestrator = Orchestrator::from_config(
        provider,
        Arc::new(MemoryStore::with_policy(config.validation.max_lines)),
        Arc::new(MemoryPublisher::new()),
        &config,
    )?;
    let request =
        GenerationRequest::new(args.tenant, args.user, args.prompt).with_mood(args.mood);

    let session = if args.stream {
        stream_session(&orchestrator, request).await?
    } else {
        let report = orchestrator.execute(&request).await?;
        for entry in &report.logs {
            trace_log(entry);
        }
        report.session
    };

    print_summary(&session);
    emit_component(&session, &mut stdout())
}

/// Writes the accepted component to `out`. Sessions that did not complete write nothing.
fn emit_component<W: Write>(session: &Session, out: &mut W) -> Result<()> {
    match session.status() {
        SessionStatus::Completed => {
            if let Some(code) = session.final_code() {
                out.write_all(code.as_bytes())?;
                out.write_all(b"\n")?;
            }
            Ok(())
        }
        SessionStatus::Failed => bail!(
            "Generation failed: {}",
            session.error.as_deref().unwrap_or("unknown error")
        ),
        status => {
            warn!("Withholding the {status} component, it does not pass validation");
            bail!("Session ended {status}")
        }
    }
}

async fn stream_session(
    orchestrator: &Orchestrator,
    request: GenerationRequest,
) -> Result<Session> {
    let mut updates = orchestrator.execute_streaming(request);

    while let Some(update) = updates.next().await {
        match update {
            PipelineUpdate::Log(entry) => trace_log(&entry),
            PipelineUpdate::Chunk(chunk) => {
                debug!(
                    "chunk {} (~{} tokens): {}",
                    chunk.index, chunk.tokens_so_far, chunk.content
                );
            }
            PipelineUpdate::Finished(session) => return Ok(*session),
        }
    }
    bail!("Stream ended without a final session")
}

fn trace_log(entry: &SessionLog) {
    info!("[{}] {}", entry.phase, entry.message);
}

fn print_summary(session: &Session) {
    info!(
        "Session {} {} after {} repair attempt(s), {} tokens, ${:.4}",
        session.id,
        session.status(),
        session.reflexion_attempts(),
        session.tokens_used.total(),
        session.estimated_cost
    );
    if let Some(artifact_id) = &session.artifact_id {
        info!("Published as {artifact_id}");
    }
    if let Some(verdict) = session.verdict() {
        report_issues(verdict);
    }
}

fn report_issues(verdict: &ValidationVerdict) {
    for issue in &verdict.errors {
        warn!("error {issue}");
    }
    for issue in &verdict.warnings {
        warn!("warning {issue}");
    }
}

/// Handle the validate command
///
/// # Errors
/// Returns an error if the file cannot be read or the component has blocking issues
pub async fn handle_validate(file: &Path, tenant: &str) -> Result<()> {
    validate_file(&load_config(), file, tenant).await
}

async fn validate_file(config: &ForgeConfig, file: &Path, tenant: &str) -> Result<()> {
    let code = async_fs::read_to_string(file).await?;
    let verdict = validate_source(config, &code, tenant).await?;

    report_issues(&verdict);
    info!(
        "{}: {} passed, {} failed, score {:.2}",
        file.display(),
        verdict.passed_rules.len(),
        verdict.failed_rules.len(),
        verdict.security_score
    );
    if !verdict.is_valid {
        bail!("{} blocking issue(s) found", verdict.errors.len());
    }
    Ok(())
}

async fn validate_source(
    config: &ForgeConfig,
    code: &str,
    tenant: &str,
) -> Result<ValidationVerdict> {
    let store = Arc::new(MemoryStore::with_policy(config.validation.max_lines));
    let validator = RuleValidator::new(store, &config.validation);
    Ok(validator
        .validate(code, &ValidationContext::default(), tenant)
        .await?)
}
