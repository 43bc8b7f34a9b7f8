use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "hmmplot")]
#[command(about = "Draw a HMMER3 profile HMM as a TikZ state diagram compiled to PDF")]
pub struct Cli {
    /// The input HMM file to read. Reads stdin when absent
    #[arg(value_name = "INPUT.hmm")]
    pub hmm_path: Option<PathBuf>,

    /// The output PDF file to write. Writes stdout when absent
    #[arg(value_name = "OUTPUT.pdf")]
    pub pdf_path: Option<PathBuf>,

    /// Compile with pdflatex instead of lualatex. pdflatex will fail on
    /// larger models due to memory limits
    #[arg(long = "pdflatex", default_value_t = false)]
    pub pdflatex: bool,

    /// Also write the generated TikZ source to this path
    #[arg(long = "tex-output", value_name = "path")]
    pub tex_path: Option<PathBuf>,

    /// Also write the parsed model and its derived statistics as JSON
    #[arg(long = "model-output", value_name = "path")]
    pub model_path: Option<PathBuf>,
}
