//! Pandoc: reads every supported source format and writes both PDF (through
//! a LaTeX engine) and DOCX.

use super::{Attempt, AttemptContext, ConverterStrategy};
use crate::error::AttemptError;
use crate::probe::{Tool, PANDOC};
use crate::process::{self, Invocation};
use crate::request::TargetKind;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct Pandoc;

impl Pandoc {
    /// First configured PDF engine that is installed.
    fn pdf_engine(ctx: &AttemptContext<'_>) -> Option<PathBuf> {
        ctx.config.pdf_engines.iter().find_map(|engine| {
            let name = engine.as_str();
            ctx.locator.locate(&Tool::single(&name))
        })
    }

    fn invocation(ctx: &AttemptContext<'_>, exe: &Path, engine: Option<&Path>) -> Invocation {
        let req = ctx.request;
        let mut inv = ctx
            .invocation(exe)
            .arg(req.source())
            .args(["-f", req.source_format().pandoc_reader()])
            .arg("-o")
            .arg(req.target());
        match req.kind() {
            TargetKind::Pdf => {
                if let Some(engine) = engine {
                    let mut flag = OsString::from("--pdf-engine=");
                    flag.push(engine);
                    inv = inv.arg(flag);
                }
            }
            TargetKind::Docx => {
                if ctx.config.citeproc {
                    inv = inv.arg("--citeproc");
                }
            }
        }
        inv
    }
}

#[async_trait]
impl ConverterStrategy for Pandoc {
    fn name(&self) -> &str {
        "pandoc"
    }

    async fn attempt(&self, ctx: &AttemptContext<'_>) -> Result<Attempt, AttemptError> {
        let exe = match ctx.require(&[PANDOC]) {
            Ok(mut found) => found.remove(0),
            Err(reason) => return Ok(Attempt::Skipped(reason)),
        };

        let engine = match ctx.request.kind() {
            TargetKind::Pdf => Self::pdf_engine(ctx),
            TargetKind::Docx => None,
        };
        if ctx.request.kind() == TargetKind::Pdf && engine.is_none() {
            debug!("No configured PDF engine installed; letting pandoc choose");
        }

        process::run(&Self::invocation(ctx, &exe, engine.as_deref())).await?;
        Ok(Attempt::Ran)
    }
}
