//! The conversion orchestrator.
//!
//! A [`Converter`] walks an ordered chain of strategies for each request and
//! stops at the first one whose artifact passes the success predicate
//! (exists and is non-empty). Everything that can go wrong inside a strategy
//! (missing tools, crashes, timeouts, empty output, even a panic) becomes one
//! [`AttemptRecord`] and the walk continues. The caller always gets a
//! [`ConversionOutcome`] back, never an error.

use crate::artifact;
use crate::config::PressConfig;
use crate::error::{AttemptError, PressError};
use crate::output::{AttemptRecord, AttemptStatus, ConversionOutcome, ToolAvailability};
use crate::probe::{self, SystemLocator, Tool, ToolLocator};
use crate::request::ConversionRequest;
use crate::strategy::{self, Attempt, AttemptContext, ConverterStrategy, SkipReason};
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs requests through a fixed strategy chain.
///
/// Cheap to share: strategies and the locator are behind `Arc`s and the
/// converter holds no per-request state, so one instance can serve
/// concurrent requests.
#[derive(Clone)]
pub struct Converter {
    config: PressConfig,
    strategies: Vec<Arc<dyn ConverterStrategy>>,
    locator: Arc<dyn ToolLocator>,
}

impl Converter {
    /// The default chain, with tools found on this machine.
    pub fn new(config: PressConfig) -> Self {
        let locator = Arc::new(SystemLocator::new(config.tool_overrides.clone()));
        Self::with_parts(config, strategy::default_chain(), locator)
    }

    /// A converter with an explicit chain and locator.
    pub fn with_parts(
        config: PressConfig,
        strategies: Vec<Arc<dyn ConverterStrategy>>,
        locator: Arc<dyn ToolLocator>,
    ) -> Self {
        Self {
            config,
            strategies,
            locator,
        }
    }

    pub fn config(&self) -> &PressConfig {
        &self.config
    }

    /// Strategy names in chain order.
    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Convert one request.
    ///
    /// Never fails: a request no strategy could serve yields an outcome with
    /// `succeeded == false` and the list of missing tools.
    pub async fn convert(&self, request: &ConversionRequest) -> ConversionOutcome {
        let total_start = Instant::now();
        let source = request.source();
        info!(
            "Converting {} → {} ({} strategies)",
            source.display(),
            request.target().display(),
            self.strategies.len()
        );
        if let Some(ref cb) = self.config.observer {
            cb.on_request_start(source, self.strategies.len());
        }

        let ctx = AttemptContext::new(request, &self.config, self.locator.as_ref());
        let mut attempts = Vec::with_capacity(self.strategies.len());
        let mut missing_tools: Vec<String> = Vec::new();
        let mut winner: Option<String> = None;

        for strategy in &self.strategies {
            let name = strategy.name().to_string();

            let record = if winner.is_some() {
                AttemptRecord {
                    strategy: name,
                    status: AttemptStatus::NotReached,
                    detail: "an earlier strategy succeeded".to_string(),
                    duration_ms: 0,
                }
            } else {
                if let Some(ref cb) = self.config.observer {
                    cb.on_attempt_start(source, &name);
                }
                let record = self.run_one(strategy.as_ref(), &ctx, &mut missing_tools).await;
                match record.status {
                    AttemptStatus::Succeeded => {
                        info!("{} produced {}", name, request.target().display());
                        winner = Some(name);
                    }
                    AttemptStatus::Failed => warn!("{} failed: {}", record.strategy, record.detail),
                    _ => debug!("{} skipped: {}", record.strategy, record.detail),
                }
                record
            };

            if let Some(ref cb) = self.config.observer {
                cb.on_attempt_finished(source, &record);
            }
            attempts.push(record);
        }

        let succeeded = winner.is_some();
        if !succeeded {
            warn!(
                "No strategy produced {}; missing tools: {}",
                request.target().display(),
                if missing_tools.is_empty() {
                    "none".to_string()
                } else {
                    missing_tools.join(", ")
                }
            );
        }

        let outcome = ConversionOutcome {
            succeeded,
            artifact_path: succeeded.then(|| request.target().to_path_buf()),
            winner,
            attempts,
            missing_tools,
            total_duration_ms: total_start.elapsed().as_millis() as u64,
        };

        if let Some(ref cb) = self.config.observer {
            cb.on_request_complete(source, &outcome);
        }
        outcome
    }

    /// Convert several requests, at most `config.concurrency` at a time.
    ///
    /// Requests that share a working directory share its intermediates
    /// (`<stem>.html`, `<stem>.docx`) and an office-suite profile, so they
    /// run one after another; only distinct working directories run in
    /// parallel. Outcomes come back in input order.
    pub async fn convert_batch(&self, requests: &[ConversionRequest]) -> Vec<ConversionOutcome> {
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for (i, req) in requests.iter().enumerate() {
            match groups
                .iter_mut()
                .find(|g| requests[g[0]].workdir() == req.workdir())
            {
                Some(group) => group.push(i),
                None => groups.push(vec![i]),
            }
        }
        debug!(
            "Batch of {} request(s) in {} working director(ies)",
            requests.len(),
            groups.len()
        );

        let mut slots: Vec<Option<ConversionOutcome>> = requests.iter().map(|_| None).collect();
        let mut finished = stream::iter(groups.into_iter().map(|group| async move {
            let mut done = Vec::with_capacity(group.len());
            for i in group {
                done.push((i, self.convert(&requests[i]).await));
            }
            done
        }))
        .buffer_unordered(self.config.concurrency.max(1));

        while let Some(done) = finished.next().await {
            for (i, outcome) in done {
                slots[i] = Some(outcome);
            }
        }
        slots.into_iter().flatten().collect()
    }

    /// One attempt, reduced to a record. Skipped tools are appended to
    /// `missing` (deduplicated).
    async fn run_one(
        &self,
        strategy: &dyn ConverterStrategy,
        ctx: &AttemptContext<'_>,
        missing: &mut Vec<String>,
    ) -> AttemptRecord {
        let name = strategy.name().to_string();
        let target = ctx.request.target();
        let start = Instant::now();
        let failed = |e: AttemptError, start: Instant| AttemptRecord {
            strategy: name.clone(),
            status: AttemptStatus::Failed,
            detail: e.to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
        };

        // Only an artifact written by this attempt may count.
        if let Err(e) = artifact::clear_stale(target) {
            return failed(e, start);
        }

        let result = AssertUnwindSafe(strategy.attempt(ctx)).catch_unwind().await;
        match result {
            Err(panic) => failed(AttemptError::Panicked(panic_message(&*panic)), start),
            Ok(Err(e)) => failed(e, start),
            Ok(Ok(Attempt::Skipped(reason))) => {
                if let SkipReason::ToolsMissing(ref tools) = reason {
                    for t in tools {
                        if !missing.contains(t) {
                            missing.push(t.clone());
                        }
                    }
                }
                AttemptRecord {
                    strategy: name.clone(),
                    status: AttemptStatus::Skipped,
                    detail: reason.to_string(),
                    duration_ms: 0,
                }
            }
            Ok(Ok(Attempt::Ran)) => match artifact::verify(target) {
                Ok(bytes) => AttemptRecord {
                    strategy: name.clone(),
                    status: AttemptStatus::Succeeded,
                    detail: format!("{bytes} bytes"),
                    duration_ms: start.elapsed().as_millis() as u64,
                },
                Err(e) => failed(e, start),
            },
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Convert one request with the default chain.
///
/// This is the primary entry point for the library.
///
/// # Example
/// ```rust,no_run
/// use docpress::{convert, ConversionRequest, PressConfig, TargetKind};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let request = ConversionRequest::beside_source("paper.tex", TargetKind::Pdf)?;
/// let outcome = convert(&request, &PressConfig::default()).await;
/// if !outcome.succeeded {
///     eprintln!("install one of: {}", outcome.missing_tools.join(", "));
/// }
/// # Ok(())
/// # }
/// ```
pub async fn convert(request: &ConversionRequest, config: &PressConfig) -> ConversionOutcome {
    Converter::new(config.clone()).convert(request).await
}

/// Convert several requests with the default chain; outcomes in input order.
pub async fn convert_batch(
    requests: &[ConversionRequest],
    config: &PressConfig,
) -> Vec<ConversionOutcome> {
    Converter::new(config.clone()).convert_batch(requests).await
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    request: &ConversionRequest,
    config: &PressConfig,
) -> Result<ConversionOutcome, PressError> {
    Ok(tokio::runtime::Runtime::new()
        .map_err(|e| PressError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(request, config)))
}

/// Locate every tool the default chain may use, without running any.
pub fn tool_report(config: &PressConfig) -> Vec<ToolAvailability> {
    let locator = SystemLocator::new(config.tool_overrides.clone());
    let mut report: Vec<ToolAvailability> = probe::ALL_TOOLS
        .iter()
        .map(|tool| ToolAvailability {
            tool: tool.name.to_string(),
            path: locator.locate(tool),
        })
        .collect();

    for engine in &config.pdf_engines {
        if report.iter().any(|r| &r.tool == engine) {
            continue;
        }
        let name = engine.as_str();
        report.push(ToolAvailability {
            tool: engine.clone(),
            path: locator.locate(&Tool::single(&name)),
        });
    }
    report
}
