//! `wkhtmltopdf`: last resort, renders the HTML preview with its bundled
//! WebKit.

use super::{skip_unless, Attempt, AttemptContext, ConverterStrategy};
use crate::error::AttemptError;
use crate::html;
use crate::probe::{PANDOC, WKHTMLTOPDF};
use crate::process::{self, Invocation};
use async_trait::async_trait;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default)]
pub struct Wkhtmltopdf;

impl Wkhtmltopdf {
    fn invocation(ctx: &AttemptContext<'_>, exe: &Path, preview: &Path) -> Invocation {
        ctx.invocation(exe)
            .args(["--quiet", "--enable-local-file-access"])
            .arg(preview)
            .arg(ctx.request.target())
    }
}

#[async_trait]
impl ConverterStrategy for Wkhtmltopdf {
    fn name(&self) -> &str {
        "wkhtmltopdf"
    }

    async fn attempt(&self, ctx: &AttemptContext<'_>) -> Result<Attempt, AttemptError> {
        skip_unless!(ctx.pdf_only());
        let exe = match ctx.require(&[WKHTMLTOPDF]) {
            Ok(mut found) => found.remove(0),
            Err(reason) => return Ok(Attempt::Skipped(reason)),
        };

        let pandoc = ctx.locator.locate(&PANDOC);
        let preview = html::write_preview(ctx.request, pandoc.as_deref(), ctx.tool_timeout()).await?;
        process::run(&Self::invocation(ctx, &exe, &preview)).await?;
        Ok(Attempt::Ran)
    }
}
