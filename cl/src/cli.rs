//! CLI argument parsing for cwb-cl

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cwb-cl")]
#[command(author, version, about = "Inspect CWB corpus data", long_about = None)]
pub struct Cli {
    /// Registry directory (default: $CORPUS_REGISTRY or /usr/local/share/cwb/registry)
    #[arg(short, long)]
    pub registry: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Registry directory from the flag, the environment, or the default
    pub fn registry_dir(&self) -> PathBuf {
        self.registry
            .clone()
            .or_else(|| std::env::var_os("CORPUS_REGISTRY").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(crate::DEFAULT_REGISTRY))
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List corpora in the registry
    List,

    /// Show a corpus registry entry and its size
    Info {
        /// Corpus id
        #[arg(required = true)]
        corpus: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print positional attribute values for a range of positions
    Decode {
        /// Corpus id
        #[arg(required = true)]
        corpus: String,

        /// Positional attribute name
        #[arg(required = true)]
        attribute: String,

        /// First position
        #[arg(required = true)]
        start: usize,

        /// Position after the last one printed
        #[arg(required = true)]
        end: usize,
    },

    /// Show the structural region enclosing a position
    Region {
        /// Corpus id
        #[arg(required = true)]
        corpus: String,

        /// Structural attribute name
        #[arg(required = true)]
        attribute: String,

        /// Corpus position
        #[arg(required = true)]
        position: usize,
    },
}
