use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use colored::Colorize;
use tempfile::TempDir;

use libhmmplot::structs::hmm::{parse_hmm, parse_hmm_file};
use libhmmplot::structs::Hmm;
use libhmmplot::viz;

use crate::args::Cli;
use crate::util::{CommandExt, LatexCompiler};

/// Runs the whole pipeline: parse the HMM, render the TikZ source into a
/// temporary directory, compile it, and copy the PDF to the output sink.
pub fn plot(args: &Cli, compiler: LatexCompiler) -> Result<()> {
    status("reading HMM file");
    let hmm = match &args.hmm_path {
        Some(path) => parse_hmm_file(path)?,
        None => parse_hmm(io::stdin().lock()).context("failed to parse hmm from stdin")?,
    };

    if let Some(path) = &args.model_path {
        write_model_json(&hmm, path)?;
    }

    status("rendering TikZ");
    let temp_dir = TempDir::new().context("failed to create temporary directory")?;
    let tex_path = temp_dir.path().join("hmm.tex");

    let mut tex_out = BufWriter::new(
        File::create(&tex_path).context("failed to create TeX file in temporary directory")?,
    );
    viz::write_document(&mut tex_out, &hmm)?;
    tex_out.flush()?;

    if let Some(path) = &args.tex_path {
        std::fs::copy(&tex_path, path)
            .with_context(|| format!("failed to write TeX output: {}", path.to_string_lossy()))?;
    }

    status("compiling");
    let compile_result = Command::new(compiler.executable())
        .args(["--interaction", "batchmode", "hmm"])
        .current_dir(temp_dir.path())
        .run();

    if compile_result.is_err() {
        // keep the temporary files around for diagnosis
        let dir = temp_dir.keep();
        return compile_result.with_context(|| {
            format!(
                "{compiler} failed; the .tex and .log files were kept in {}",
                dir.to_string_lossy()
            )
        });
    }

    let pdf_path = temp_dir.path().join("hmm.pdf");
    let mut pdf = File::open(&pdf_path).context("the LaTeX compiler produced no PDF")?;

    match &args.pdf_path {
        Some(path) => {
            let mut out = BufWriter::new(File::create(path).with_context(|| {
                format!("failed to create output file: {}", path.to_string_lossy())
            })?);
            io::copy(&mut pdf, &mut out)?;
        }
        None => {
            io::copy(&mut pdf, &mut io::stdout().lock())?;
        }
    }

    Ok(())
}

fn write_model_json(hmm: &Hmm, path: &Path) -> Result<()> {
    let out = BufWriter::new(File::create(path).with_context(|| {
        format!(
            "failed to create model output file: {}",
            path.to_string_lossy()
        )
    })?);

    serde_json::to_writer_pretty(out, hmm).context("failed to serialize model")?;
    Ok(())
}

fn status(message: &str) {
    eprintln!("{} {message}", "hmmplot:".dimmed());
}
