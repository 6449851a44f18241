//! LibreOffice via an intermediate DOCX.
//!
//! The office suite cannot read LaTeX or Markdown, so the source is first
//! turned into `<workdir>/<stem>.docx`: by Pandoc when it is installed,
//! otherwise by letting `soffice` import the HTML preview. The DOCX is then
//! exported to PDF headlessly. For DOCX targets the intermediate is already
//! the product. The intermediate is left in the working directory.

use super::{Attempt, AttemptContext, ConverterStrategy};
use crate::artifact;
use crate::error::AttemptError;
use crate::html;
use crate::probe::{PANDOC, SOFFICE};
use crate::process::{self, Invocation};
use crate::request::TargetKind;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// `--convert-to` filter for Word 2007+ output.
const DOCX_FILTER: &str = "docx:MS Word 2007 XML";

#[derive(Debug, Clone, Copy, Default)]
pub struct LibreOffice;

impl LibreOffice {
    fn convert_to(ctx: &AttemptContext<'_>, soffice: &Path, filter: &str, input: &Path) -> Invocation {
        ctx.invocation(soffice)
            .args(["--headless", "--convert-to", filter, "--outdir"])
            .arg(ctx.request.workdir())
            .arg(input)
    }

    fn pandoc_to_docx(ctx: &AttemptContext<'_>, pandoc: &Path, docx: &Path) -> Invocation {
        let req = ctx.request;
        let inv = ctx
            .invocation(pandoc)
            .arg(req.source())
            .args(["-f", req.source_format().pandoc_reader()])
            .arg("-o")
            .arg(docx);
        if ctx.config.citeproc {
            inv.arg("--citeproc")
        } else {
            inv
        }
    }

    /// Produce the intermediate DOCX and return its path.
    async fn intermediate(ctx: &AttemptContext<'_>, soffice: &Path) -> Result<PathBuf, AttemptError> {
        let docx = ctx.request.workdir_output("docx");
        artifact::clear_stale(&docx)?;

        let pandoc = ctx.locator.locate(&PANDOC);
        if let Some(pandoc) = &pandoc {
            match process::run(&Self::pandoc_to_docx(ctx, pandoc, &docx)).await {
                Ok(_) if artifact::is_valid(&docx) => return Ok(docx),
                Ok(_) => warn!("pandoc left no intermediate DOCX; trying the office import"),
                Err(e) => warn!("pandoc could not produce the intermediate DOCX: {}", e),
            }
        }

        // The preview's stem is the request's stem, so soffice writes
        // exactly `docx`.
        let preview = html::write_preview(ctx.request, None, ctx.tool_timeout()).await?;
        debug!("Importing {} into the office suite", preview.display());
        process::run(&Self::convert_to(ctx, soffice, DOCX_FILTER, &preview)).await?;
        artifact::verify(&docx)?;
        Ok(docx)
    }
}

#[async_trait]
impl ConverterStrategy for LibreOffice {
    fn name(&self) -> &str {
        "libreoffice"
    }

    async fn attempt(&self, ctx: &AttemptContext<'_>) -> Result<Attempt, AttemptError> {
        let soffice = match ctx.require(&[SOFFICE]) {
            Ok(mut found) => found.remove(0),
            Err(reason) => return Ok(Attempt::Skipped(reason)),
        };

        let docx = Self::intermediate(ctx, &soffice).await?;
        let target = ctx.request.target();

        match ctx.request.kind() {
            TargetKind::Docx => {
                if docx != target {
                    std::fs::copy(&docx, target).map_err(|e| AttemptError::io(target, e))?;
                }
            }
            TargetKind::Pdf => {
                let produced = ctx.request.workdir_output("pdf");
                if produced != target {
                    artifact::clear_stale(&produced)?;
                }
                process::run(&Self::convert_to(ctx, &soffice, "pdf", &docx)).await?;
                artifact::settle(&produced, target)?;
            }
        }
        Ok(Attempt::Ran)
    }
}
