//! Native LaTeX compilers: `tectonic` and `pdflatex`.
//!
//! Both read the `.tex` source directly and write `<workdir>/<stem>.pdf`,
//! which is then moved onto the target. They differ in how many passes they
//! need: tectonic reruns itself internally until references settle, pdflatex
//! needs to be run again by hand.

use super::{skip_unless, Attempt, AttemptContext, ConverterStrategy};
use crate::artifact;
use crate::error::AttemptError;
use crate::probe::{Tool, PDFLATEX, TECTONIC};
use crate::process::{self, Invocation};
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    Tectonic,
    Pdflatex,
}

/// A self-contained LaTeX → PDF compiler.
#[derive(Debug, Clone, Copy)]
pub struct NativeCompiler {
    flavor: Flavor,
}

impl NativeCompiler {
    pub fn tectonic() -> Self {
        Self {
            flavor: Flavor::Tectonic,
        }
    }

    pub fn pdflatex() -> Self {
        Self {
            flavor: Flavor::Pdflatex,
        }
    }

    fn tool(&self) -> Tool<'static> {
        match self.flavor {
            Flavor::Tectonic => TECTONIC,
            Flavor::Pdflatex => PDFLATEX,
        }
    }

    fn passes(&self, ctx: &AttemptContext<'_>) -> u32 {
        match self.flavor {
            Flavor::Tectonic => 1,
            Flavor::Pdflatex => ctx.config.latex_passes.max(1),
        }
    }

    fn invocation(&self, ctx: &AttemptContext<'_>, exe: &Path) -> Invocation {
        let workdir = ctx.request.workdir();
        match self.flavor {
            Flavor::Tectonic => ctx
                .invocation(exe)
                .arg("--outdir")
                .arg(workdir)
                .arg(ctx.request.source()),
            Flavor::Pdflatex => {
                let mut outdir = std::ffi::OsString::from("-output-directory=");
                outdir.push(workdir);
                ctx.invocation(exe)
                    .args(["-interaction=nonstopmode", "-halt-on-error"])
                    .arg(outdir)
                    .arg(ctx.request.source())
            }
        }
    }
}

#[async_trait]
impl ConverterStrategy for NativeCompiler {
    fn name(&self) -> &str {
        self.tool().name
    }

    async fn attempt(&self, ctx: &AttemptContext<'_>) -> Result<Attempt, AttemptError> {
        skip_unless!(ctx.latex_only());
        skip_unless!(ctx.pdf_only());
        let exe = match ctx.require(&[self.tool()]) {
            Ok(mut found) => found.remove(0),
            Err(reason) => return Ok(Attempt::Skipped(reason)),
        };

        let produced = ctx.request.workdir_output("pdf");
        if produced != ctx.request.target() {
            artifact::clear_stale(&produced)?;
        }

        let inv = self.invocation(ctx, &exe);
        let passes = self.passes(ctx);
        for pass in 1..=passes {
            debug!("{} pass {}/{}", self.name(), pass, passes);
            process::run(&inv).await?;
        }

        artifact::settle(&produced, ctx.request.target())?;
        Ok(Attempt::Ran)
    }
}
