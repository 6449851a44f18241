//! Microsoft Word automation (Windows only).
//!
//! PowerShell drives Word over COM: open the intermediate DOCX, save it as
//! PDF (`wdFormatPDF` = 17), quit. A DOCX left behind by the LibreOffice
//! strategy is reused when it is newer than the source; otherwise Pandoc
//! produces one.

use super::{skip_unless, Attempt, AttemptContext, ConverterStrategy, SkipReason};
use crate::artifact;
use crate::error::AttemptError;
use crate::probe::{PANDOC, POWERSHELL};
use crate::process::{self, Invocation};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// `WdSaveFormat.wdFormatPDF`.
const WD_FORMAT_PDF: u32 = 17;

#[derive(Debug, Clone, Copy, Default)]
pub struct WordAutomation;

impl WordAutomation {
    fn platform_supported() -> Result<(), SkipReason> {
        if cfg!(windows) {
            Ok(())
        } else {
            Err(SkipReason::UnsupportedPlatform)
        }
    }

    /// PowerShell script that converts `docx` into `pdf` through Word.
    fn script(docx: &Path, pdf: &Path) -> String {
        format!(
            "$ErrorActionPreference = 'Stop'; \
             $word = New-Object -ComObject Word.Application; \
             $word.Visible = $false; \
             try {{ \
             $doc = $word.Documents.Open({docx}, $false, $true); \
             $doc.SaveAs2({pdf}, {fmt}); \
             $doc.Close($false) \
             }} finally {{ $word.Quit() }}",
            docx = ps_quote(docx),
            pdf = ps_quote(pdf),
            fmt = WD_FORMAT_PDF,
        )
    }

    fn invocation(ctx: &AttemptContext<'_>, powershell: &Path, docx: &Path, pdf: &Path) -> Invocation {
        ctx.invocation(powershell)
            .args([
                "-NoProfile",
                "-NonInteractive",
                "-ExecutionPolicy",
                "Bypass",
                "-Command",
            ])
            .arg(Self::script(docx, pdf))
    }

    /// Reuse an intermediate DOCX written since the source last changed, or
    /// have Pandoc write a new one.
    async fn intermediate(ctx: &AttemptContext<'_>, pandoc: Option<PathBuf>) -> Result<PathBuf, AttemptError> {
        let docx = ctx.request.workdir_output("docx");
        if artifact::is_fresh(&docx, ctx.request.source()) {
            debug!("Reusing intermediate {}", docx.display());
            return Ok(docx);
        }
        let Some(pandoc) = pandoc else {
            return Err(AttemptError::OutputMissing { path: docx });
        };
        artifact::clear_stale(&docx)?;
        let req = ctx.request;
        let inv = ctx
            .invocation(&pandoc)
            .arg(req.source())
            .args(["-f", req.source_format().pandoc_reader()])
            .arg("-o")
            .arg(&docx);
        process::run(&inv).await?;
        artifact::verify(&docx)?;
        Ok(docx)
    }
}

/// Single-quoted PowerShell string literal.
fn ps_quote(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', "''"))
}

#[async_trait]
impl ConverterStrategy for WordAutomation {
    fn name(&self) -> &str {
        "word"
    }

    async fn attempt(&self, ctx: &AttemptContext<'_>) -> Result<Attempt, AttemptError> {
        skip_unless!(Self::platform_supported());
        skip_unless!(ctx.pdf_only());
        let powershell = match ctx.require(&[POWERSHELL]) {
            Ok(mut found) => found.remove(0),
            Err(reason) => return Ok(Attempt::Skipped(reason)),
        };

        // Without a DOCX to open there is nothing for Word to do.
        let pandoc = ctx.locator.locate(&PANDOC);
        let reusable = artifact::is_fresh(&ctx.request.workdir_output("docx"), ctx.request.source());
        if pandoc.is_none() && !reusable {
            return Ok(Attempt::Skipped(SkipReason::ToolsMissing(vec![
                PANDOC.name.to_string(),
            ])));
        }

        let docx = Self::intermediate(ctx, pandoc).await?;
        // COM resolves relative paths against Word's own working directory.
        let docx = std::path::absolute(&docx).map_err(|e| AttemptError::io(&docx, e))?;
        let target = ctx.request.target();
        let pdf = std::path::absolute(target).map_err(|e| AttemptError::io(target, e))?;

        process::run(&Self::invocation(ctx, &powershell, &docx, &pdf)).await?;
        Ok(Attempt::Ran)
    }
}
