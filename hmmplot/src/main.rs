mod args;
mod pipeline;
mod util;

use args::Cli;
use util::{check_latex_installed, LatexCompiler};

use clap::Parser;
use colored::Colorize;

fn main() -> anyhow::Result<()> {
    color_backtrace::install();

    let args = Cli::parse();

    let compiler = match args.pdflatex {
        true => LatexCompiler::Pdflatex,
        false => LatexCompiler::Lualatex,
    };

    if args.pdflatex {
        eprintln!(
            "{} pdflatex will only work on small HMMs",
            "warning:".yellow().bold()
        );
    }

    check_latex_installed(compiler)?;
    pipeline::plot(&args, compiler)?;

    Ok(())
}
