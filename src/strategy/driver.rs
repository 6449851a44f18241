//! `latexmk`: the build driver that works out how many LaTeX, BibTeX and
//! makeindex runs a document needs.

use super::{skip_unless, Attempt, AttemptContext, ConverterStrategy};
use crate::artifact;
use crate::error::AttemptError;
use crate::probe::LATEXMK;
use crate::process::{self, Invocation};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default)]
pub struct Latexmk;

impl Latexmk {
    fn invocation(ctx: &AttemptContext<'_>, exe: &Path) -> Invocation {
        let mut outdir = OsString::from("-outdir=");
        outdir.push(ctx.request.workdir());
        ctx.invocation(exe)
            .args(["-pdf", "-interaction=nonstopmode", "-halt-on-error"])
            .arg(outdir)
            .arg(ctx.request.source())
    }
}

#[async_trait]
impl ConverterStrategy for Latexmk {
    fn name(&self) -> &str {
        "latexmk"
    }

    async fn attempt(&self, ctx: &AttemptContext<'_>) -> Result<Attempt, AttemptError> {
        skip_unless!(ctx.latex_only());
        skip_unless!(ctx.pdf_only());
        let exe = match ctx.require(&[LATEXMK]) {
            Ok(mut found) => found.remove(0),
            Err(reason) => return Ok(Attempt::Skipped(reason)),
        };

        let produced = ctx.request.workdir_output("pdf");
        if produced != ctx.request.target() {
            artifact::clear_stale(&produced)?;
        }
        process::run(&Self::invocation(ctx, &exe)).await?;
        artifact::settle(&produced, ctx.request.target())?;
        Ok(Attempt::Ran)
    }
}
