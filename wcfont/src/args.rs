//! Command line arguments

use std::path::PathBuf;

use clap::Parser;
use wcfont::css::DEFAULT_URL_PREFIX;

/// Subset a font to the text you need, once.
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct Args {
    /// YAML config; wcfont.yml in the working directory is used if present
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding <family>.ttf, overrides the config
    #[arg(short, long)]
    pub input_dir: Option<PathBuf>,

    /// Directory receiving subsets, overrides the config
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Font family, the input file name without .ttf
    #[arg(short, long, required_unless_present = "batch", conflicts_with = "batch")]
    pub family: Option<String>,

    /// Text the subset must be able to render
    #[arg(short, long, conflicts_with = "content_file")]
    pub content: Option<String>,

    /// Read the text from a file instead
    #[arg(long, conflicts_with = "batch")]
    pub content_file: Option<PathBuf>,

    /// Print an @font-face rule instead of the file name
    #[arg(long)]
    pub css: bool,

    /// Prefix for the url in --css output
    #[arg(long)]
    #[clap(default_value = DEFAULT_URL_PREFIX)]
    pub url_prefix: String,

    /// Print a script that loads the subset for the text of elements matching
    /// this CSS selector, instead of subsetting anything
    #[arg(long, conflicts_with_all = ["batch", "css", "content", "content_file"])]
    pub loader: Option<String>,

    /// File of family<TAB>content lines, processed in parallel
    #[arg(short, long)]
    pub batch: Option<PathBuf>,
}

/// Split batch input into requests; a line without a tab is a family with no text.
pub fn parse_batch(input: &str) -> Vec<(String, String)> {
    input
        .lines()
        .map(|line| match line.split_once('\t') {
            Some((family, content)) => (family.to_string(), content.to_string()),
            None => (line.to_string(), String::new()),
        })
        .collect()
}
