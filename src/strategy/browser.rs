//! Headless Chromium-family print-to-PDF.
//!
//! Every discovered browser is tried with the current headless syntax and
//! then the legacy one; older builds reject `--headless=new`, newer ones
//! silently do nothing with plain `--headless`. The first non-empty PDF
//! wins. Each run is bounded by the browser timeout, and the virtual-time
//! budget keeps math-heavy pages from waiting forever for an idle network.

use super::{skip_unless, Attempt, AttemptContext, ConverterStrategy};
use crate::artifact;
use crate::error::AttemptError;
use crate::html;
use crate::probe::{BROWSER, PANDOC};
use crate::process::{self, Invocation};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

const HEADLESS_SYNTAXES: [&str; 2] = ["--headless=new", "--headless"];

#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserPrint;

impl BrowserPrint {
    fn invocation(
        ctx: &AttemptContext<'_>,
        browser: &Path,
        headless: &str,
        pdf: &Path,
        preview: &Path,
    ) -> Invocation {
        let mut print_to = OsString::from("--print-to-pdf=");
        print_to.push(pdf);
        Invocation::new(
            browser,
            ctx.request.workdir(),
            Duration::from_secs(ctx.config.browser_timeout_secs),
        )
        .args([
            headless,
            "--disable-gpu",
            "--no-sandbox",
            "--no-pdf-header-footer",
        ])
        .arg(format!(
            "--virtual-time-budget={}",
            ctx.config.virtual_time_budget_ms
        ))
        .arg(print_to)
        .arg(html::file_url(preview))
    }
}

#[async_trait]
impl ConverterStrategy for BrowserPrint {
    fn name(&self) -> &str {
        "browser"
    }

    async fn attempt(&self, ctx: &AttemptContext<'_>) -> Result<Attempt, AttemptError> {
        skip_unless!(ctx.pdf_only());
        let browsers = ctx.locator.locate_all(&BROWSER);
        if browsers.is_empty() {
            return Ok(Attempt::Skipped(super::SkipReason::ToolsMissing(vec![
                BROWSER.name.to_string(),
            ])));
        }

        let pandoc = ctx.locator.locate(&PANDOC);
        let preview = html::write_preview(ctx.request, pandoc.as_deref(), ctx.tool_timeout()).await?;

        // The browser resolves a relative --print-to-pdf against its own cwd.
        let target = ctx.request.target();
        let pdf = std::path::absolute(target).map_err(|e| AttemptError::io(target, e))?;

        let mut last_error = None;
        for browser in &browsers {
            for headless in HEADLESS_SYNTAXES {
                artifact::clear_stale(&pdf)?;
                let inv = Self::invocation(ctx, browser, headless, &pdf, &preview);
                match process::run(&inv).await {
                    Ok(_) => match artifact::verify(&pdf) {
                        Ok(bytes) => {
                            debug!("{} {} printed {} bytes", browser.display(), headless, bytes);
                            return Ok(Attempt::Ran);
                        }
                        Err(e) => {
                            debug!("{} {}: {}", browser.display(), headless, e);
                            last_error = Some(e);
                        }
                    },
                    Err(e) => {
                        warn!("{} {}: {}", browser.display(), headless, e);
                        last_error = Some(e);
                    }
                }
            }
        }

        Err(last_error.unwrap_or(AttemptError::OutputMissing { path: pdf }))
    }
}
