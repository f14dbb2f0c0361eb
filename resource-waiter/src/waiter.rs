//! The attempt loop.
//!
//! A [`Waiter`] builds one probe per attempt, evaluates its acceptors in
//! declared order against the outcome and either stops or sleeps until the
//! next attempt. Both the in-flight probe and the sleep race the caller's
//! [`CancelSignal`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::Level;

use crate::acceptor::{first_match, Acceptor, AcceptorState};
use crate::cancel::CancelSignal;
use crate::delay::WaiterDelay;
use crate::error::WaiterError;
use crate::logger::WaitLogger;
use crate::probe::{Probe, ProbeFactory, ProbeOptions, ProbeOutcome};

/// Attempt budget used when none is configured.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Delay used when none is configured.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(5);

/// A configuration change applied through [`Waiter::apply_options`].
#[derive(Clone)]
pub enum WaiterOption {
    MaxAttempts(u32),
    Delay(WaiterDelay),
    Logger(Arc<dyn WaitLogger>),
    ProbeOptions(ProbeOptions),
}

/// A successful wait.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitOutput {
    /// Probes performed, including the one that matched.
    pub attempts: u32,
    /// The outcome the success acceptor matched.
    pub outcome: ProbeOutcome,
}

/// Polls a resource through a [`ProbeFactory`] until an acceptor decides the wait.
pub struct Waiter<F> {
    name: String,
    max_attempts: u32,
    delay: WaiterDelay,
    acceptors: Vec<Acceptor>,
    factory: F,
    probe_options: ProbeOptions,
    logger: Option<Arc<dyn WaitLogger>>,
}

impl<F: ProbeFactory> Waiter<F> {
    pub fn new(name: impl Into<String>, factory: F) -> Self {
        Self {
            name: name.into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: WaiterDelay::default(),
            acceptors: Vec::new(),
            factory,
            probe_options: ProbeOptions::default(),
            logger: None,
        }
    }

    /// Apply options in order; later options override earlier ones.
    pub fn apply_options(&mut self, options: impl IntoIterator<Item = WaiterOption>) {
        for option in options {
            match option {
                WaiterOption::MaxAttempts(max) => self.max_attempts = max,
                WaiterOption::Delay(delay) => self.delay = delay,
                WaiterOption::Logger(logger) => self.logger = Some(logger),
                WaiterOption::ProbeOptions(options) => self.probe_options = options,
            }
        }
    }

    #[must_use]
    pub fn with_acceptors(mut self, acceptors: impl IntoIterator<Item = Acceptor>) -> Self {
        self.acceptors = acceptors.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_delay(mut self, delay: WaiterDelay) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn WaitLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    #[must_use]
    pub fn with_probe_options(mut self, options: ProbeOptions) -> Self {
        self.probe_options = options;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> &WaiterDelay {
        &self.delay
    }

    pub fn acceptors(&self) -> &[Acceptor] {
        &self.acceptors
    }

    pub fn probe_options(&self) -> &ProbeOptions {
        &self.probe_options
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Wait without an external cancellation signal.
    pub async fn wait(&self) -> Result<WaitOutput, WaiterError> {
        self.wait_with_cancel(&CancelSignal::new()).await
    }

    /// Wait until an acceptor succeeds or fails, the attempt budget runs out,
    /// or `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns the terminal [`WaiterError`]; [`WaiterError::attempts`] is the
    /// exact number of probes built.
    pub async fn wait_with_cancel(&self, cancel: &CancelSignal) -> Result<WaitOutput, WaiterError> {
        if self.max_attempts == 0 {
            return Err(WaiterError::InvalidConfig(format!(
                "{}: max attempts must be at least 1",
                self.name
            )));
        }
        let acceptors = self
            .acceptors
            .iter()
            .map(Acceptor::compile)
            .collect::<Result<Vec<_>, _>>()?;

        let mut attempts = 0u32;
        loop {
            if cancel.is_cancelled() {
                return Err(self.canceled(attempts, cancel));
            }

            let mut probe = self
                .factory
                .new_probe(&self.probe_options)
                .map_err(|source| {
                    self.log(Level::Warn, || {
                        format!("{}: failed to build probe: {source}", self.name)
                    });
                    WaiterError::ProbeConstruction { attempts, source }
                })?;
            attempts += 1;
            self.log(Level::Debug, || {
                format!("{}: attempt {attempts}/{}", self.name, self.max_attempts)
            });

            // A probe that completes in the same poll as cancellation keeps its outcome.
            let outcome = tokio::select! {
                biased;
                outcome = probe.send() => outcome,
                () = cancel.cancelled() => return Err(self.canceled(attempts, cancel)),
            };

            match first_match(&acceptors, &outcome) {
                Some(acceptor) => match acceptor.state {
                    AcceptorState::Success => {
                        self.log(Level::Info, || {
                            format!("{}: succeeded after {attempts} attempts", self.name)
                        });
                        return Ok(WaitOutput { attempts, outcome });
                    }
                    AcceptorState::Failure => {
                        self.log(Level::Warn, || {
                            format!("{}: failure acceptor matched: {acceptor}", self.name)
                        });
                        return Err(WaiterError::FailureState {
                            attempts,
                            acceptor: acceptor.clone(),
                            cause: outcome.service_error().cloned(),
                        });
                    }
                    AcceptorState::Retry => {
                        self.log(Level::Debug, || {
                            format!("{}: retry acceptor matched: {acceptor}", self.name)
                        });
                    }
                },
                None => {
                    if let Err(source) = outcome.into_result() {
                        self.log(Level::Warn, || {
                            format!("{}: unmatched error on attempt {attempts}: {source}", self.name)
                        });
                        return Err(WaiterError::Service { attempts, source });
                    }
                }
            }

            if attempts >= self.max_attempts {
                self.log(Level::Warn, || {
                    format!("{}: exceeded {attempts} wait attempts", self.name)
                });
                return Err(WaiterError::ResourceNotReady { attempts });
            }

            let delay = self.delay.delay_for(attempts - 1);
            if delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                self.log(Level::Debug, || format!("{}: sleeping {delay:?}", self.name));
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return Err(self.canceled(attempts, cancel)),
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    fn canceled(&self, attempts: u32, cancel: &CancelSignal) -> WaiterError {
        let cause = cancel.cause().map(str::to_string);
        self.log(Level::Info, || {
            format!("{}: canceled after {attempts} attempts", self.name)
        });
        WaiterError::Canceled { attempts, cause }
    }

    fn log(&self, level: Level, message: impl FnOnce() -> String) {
        if let Some(logger) = &self.logger {
            logger.log(level, &message());
        }
    }
}

impl<F> fmt::Debug for Waiter<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waiter")
            .field("name", &self.name)
            .field("max_attempts", &self.max_attempts)
            .field("delay", &self.delay)
            .field("acceptors", &self.acceptors)
            .field("probe_options", &self.probe_options)
            .field("has_logger", &self.logger.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{BoxError, ServiceError};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct Ready(ProbeOutcome);

    #[async_trait]
    impl Probe for Ready {
        async fn send(&mut self) -> ProbeOutcome {
            self.0.clone()
        }
    }

    fn always(outcome: ProbeOutcome, built: Arc<AtomicU32>) -> impl ProbeFactory<Attempt = Ready> {
        move |_: &ProbeOptions| -> Result<Ready, BoxError> {
            built.fetch_add(1, Ordering::SeqCst);
            Ok(Ready(outcome.clone()))
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(Level, String)>>);

    impl WaitLogger for Recorder {
        fn log(&self, level: Level, message: &str) {
            self.0.lock().unwrap().push((level, message.to_string()));
        }
    }

    #[tokio::test]
    async fn test_single_attempt_budget_does_not_sleep() {
        let built = Arc::new(AtomicU32::new(0));
        let waiter = Waiter::new("Single", always(ProbeOutcome::response(200, json!({})), built.clone()))
            .with_max_attempts(1)
            .with_delay(WaiterDelay::constant(Duration::from_secs(3600)));

        let started = std::time::Instant::now();
        let err = waiter.wait().await.unwrap_err();
        assert!(matches!(err, WaiterError::ResourceNotReady { attempts: 1 }));
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_zero_max_attempts_is_rejected() {
        let built = Arc::new(AtomicU32::new(0));
        let waiter = Waiter::new("Zero", always(ProbeOutcome::response(200, json!({})), built.clone()))
            .with_max_attempts(0);
        let err = waiter.wait().await.unwrap_err();
        assert!(matches!(err, WaiterError::InvalidConfig(_)));
        assert_eq!(built.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bad_acceptor_path_is_rejected_before_probing() {
        let built = Arc::new(AtomicU32::new(0));
        let waiter = Waiter::new("BadPath", always(ProbeOutcome::response(200, json!({})), built.clone()))
            .with_acceptors([Acceptor::path_all(AcceptorState::Success, "length(States)", 2)]);
        let err = waiter.wait().await.unwrap_err();
        assert_eq!(err.code(), crate::error::INVALID_PARAMETER_CODE);
        assert_eq!(built.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unmatched_error_is_fatal() {
        let built = Arc::new(AtomicU32::new(0));
        let outcome = ProbeOutcome::error(Some(400), ServiceError::new("ValidationException", "bad"));
        let waiter = Waiter::new("Fatal", always(outcome, built.clone()))
            .with_delay(WaiterDelay::constant(Duration::ZERO))
            .with_acceptors([Acceptor::status(AcceptorState::Success, 200)]);

        let err = waiter.wait().await.unwrap_err();
        assert_eq!(err.code(), "ValidationException");
        assert_eq!(err.attempts(), 1);
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_factory_error_is_not_counted() {
        let factory = |_: &ProbeOptions| -> Result<Ready, BoxError> { Err("no credentials".into()) };
        let waiter = Waiter::new("NoBuild", factory);
        let err = waiter.wait().await.unwrap_err();
        assert_eq!(err.code(), crate::error::PROBE_CONSTRUCTION_CODE);
        assert_eq!(err.attempts(), 0);
        assert_eq!(err.to_string(), "failed to build probe: no credentials");
    }

    #[tokio::test]
    async fn test_already_cancelled_signal_sends_nothing() {
        let built = Arc::new(AtomicU32::new(0));
        let waiter = Waiter::new("Cancelled", always(ProbeOutcome::response(200, json!({})), built.clone()));
        let cancel = CancelSignal::new();
        cancel.cancel_with_cause("shutting down");

        let err = waiter.wait_with_cancel(&cancel).await.unwrap_err();
        match err {
            WaiterError::Canceled { attempts, cause } => {
                assert_eq!(attempts, 0);
                assert_eq!(cause.as_deref(), Some("shutting down"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(built.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_delay() {
        let built = Arc::new(AtomicU32::new(0));
        let waiter = Waiter::new("Sleepy", always(ProbeOutcome::response(200, json!({})), built.clone()))
            .with_delay(WaiterDelay::constant(Duration::from_secs(30)));

        let cancel = CancelSignal::new();
        let remote = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(45)).await;
            remote.cancel();
        });

        let err = waiter.wait_with_cancel(&cancel).await.unwrap_err();
        assert_eq!(err.terminal_state(), crate::TerminalState::Canceled);
        // Probes at t=0 and t=30, cancelled during the second sleep.
        assert_eq!(err.attempts(), 2);
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_receives_completed_attempt_index() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = seen.clone();
        let built = Arc::new(AtomicU32::new(0));
        let waiter = Waiter::new("Indexes", always(ProbeOutcome::response(200, json!({})), built))
            .with_max_attempts(4)
            .with_delay(WaiterDelay::from_fn(move |attempt| {
                record.lock().unwrap().push(attempt);
                Duration::from_millis(10)
            }));

        let err = waiter.wait().await.unwrap_err();
        assert_eq!(err.attempts(), 4);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_retry_on_response_continues() {
        let built = Arc::new(AtomicU32::new(0));
        let waiter = Waiter::new("Retry", always(ProbeOutcome::response(503, json!({})), built.clone()))
            .with_max_attempts(3)
            .with_delay(WaiterDelay::constant(Duration::ZERO))
            .with_acceptors([Acceptor::status(AcceptorState::Retry, 503)]);

        let err = waiter.wait().await.unwrap_err();
        assert!(matches!(err, WaiterError::ResourceNotReady { attempts: 3 }));
    }

    #[tokio::test]
    async fn test_logger_receives_diagnostics() {
        let recorder = Arc::new(Recorder::default());
        let built = Arc::new(AtomicU32::new(0));
        let mut waiter = Waiter::new("Logged", always(ProbeOutcome::response(200, json!({})), built));
        waiter.apply_options([
            WaiterOption::Logger(recorder.clone()),
            WaiterOption::Delay(WaiterDelay::constant(Duration::ZERO)),
            WaiterOption::MaxAttempts(2),
        ]);

        waiter.wait().await.unwrap_err();
        let lines = recorder.0.lock().unwrap();
        assert!(lines.iter().any(|(level, msg)| *level == Level::Debug && msg == "Logged: attempt 1/2"));
        assert!(lines
            .iter()
            .any(|(level, msg)| *level == Level::Warn && msg == "Logged: exceeded 2 wait attempts"));
    }

    #[test]
    fn test_apply_options_last_wins() {
        let built = Arc::new(AtomicU32::new(0));
        let mut waiter = Waiter::new("Opts", always(ProbeOutcome::response(200, json!({})), built));
        waiter.apply_options([
            WaiterOption::MaxAttempts(2),
            WaiterOption::MaxAttempts(7),
            WaiterOption::ProbeOptions(ProbeOptions::default().with_log_level(log::LevelFilter::Debug)),
            WaiterOption::Delay(WaiterDelay::constant(Duration::from_secs(5))),
        ]);
        assert_eq!(waiter.max_attempts(), 7);
        assert_eq!(waiter.delay().delay_for(0), Duration::from_secs(5));
        assert_eq!(waiter.probe_options().log_level, Some(log::LevelFilter::Debug));
        assert!(format!("{waiter:?}").contains("Opts"));
    }
}
