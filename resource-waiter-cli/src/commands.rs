use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info};
use resource_waiter::{
    CancelSignal, LogFacade, ReplayFactory, TerminalState, WaiterDelay, WaitersDescription,
};

/// Exit status of `replay` when the attempt budget runs out.
const EXIT_NOT_READY: u8 = 2;

/// Exit status of `replay` when interrupted.
const EXIT_CANCELED: u8 = 130;

pub struct ReplayArgs {
    pub model: PathBuf,
    pub waiter: String,
    pub responses: PathBuf,
    pub max_attempts: Option<u32>,
    pub delay_ms: Option<u64>,
}

fn load_model(path: &Path) -> Result<WaitersDescription> {
    let file = fs::File::open(path)
        .with_context(|| format!("failed to open model {}", path.display()))?;
    let model = WaitersDescription::from_reader(file)
        .with_context(|| format!("failed to load model {}", path.display()))?;
    debug!("loaded {} waiters from {}", model.waiters.len(), path.display());
    Ok(model)
}

pub fn list(model: &Path) -> Result<ExitCode> {
    let model = load_model(model)?;
    for (name, waiter) in &model.waiters {
        println!(
            "{name}\t{}\tmaxAttempts={}\tdelay={}s",
            waiter.operation, waiter.max_attempts, waiter.delay
        );
    }
    Ok(ExitCode::SUCCESS)
}

pub fn validate(model: &Path) -> Result<ExitCode> {
    let model = load_model(model)?;
    let errors = model.validate();
    if errors.is_empty() {
        println!("{} waiters valid", model.waiters.len());
        return Ok(ExitCode::SUCCESS);
    }
    for error in &errors {
        eprintln!("{error}");
    }
    eprintln!("{} of {} waiters invalid", errors.len(), model.waiters.len());
    Ok(ExitCode::FAILURE)
}

pub async fn replay(args: ReplayArgs) -> Result<ExitCode> {
    let model = load_model(&args.model)?;
    let responses = fs::read_to_string(&args.responses)
        .with_context(|| format!("failed to read responses {}", args.responses.display()))?;
    let factory = ReplayFactory::from_json(&responses)
        .with_context(|| format!("invalid responses {}", args.responses.display()))?;
    info!("replaying {} recorded outcomes", factory.len());

    let definition = model.get(&args.waiter)?;
    let mut waiter = definition
        .build(&args.waiter, factory)?
        .with_logger(Arc::new(LogFacade));
    if let Some(max) = args.max_attempts {
        waiter = waiter.with_max_attempts(max);
    }
    if let Some(ms) = args.delay_ms {
        waiter = waiter.with_delay(WaiterDelay::constant(Duration::from_millis(ms)));
    }

    let cancel = CancelSignal::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel_with_cause("interrupted");
        }
    });

    match waiter.wait_with_cancel(&cancel).await {
        Ok(done) => {
            println!("{}: succeeded after {} attempts", waiter.name(), done.attempts);
            if let Some(body) = done.outcome.body() {
                debug!("final response: {}", serde_json::to_string(body)?);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!(
                "{}: {} after {} attempts ({}: {e})",
                waiter.name(),
                e.terminal_state(),
                e.attempts(),
                e.code()
            );
            Ok(match e.terminal_state() {
                TerminalState::ResourceNotReady => ExitCode::from(EXIT_NOT_READY),
                TerminalState::Canceled => ExitCode::from(EXIT_CANCELED),
                TerminalState::Succeeded | TerminalState::Failed => ExitCode::FAILURE,
            })
        }
    }
}
