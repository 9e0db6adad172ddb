//! cwb-cl - read-only access to CWB corpus data
//!
//! Reads the files the IMS Open Corpus Workbench leaves in a corpus data
//! directory, without linking against the C corpus library.
//!
//! # Layout
//!
//! ```text
//! registry/
//! └── bbs                     # registry entry, points HOME at the data dir
//! data/bbs/
//! ├── word.corpus             # token stream (lexicon ids)
//! ├── word.huf                # or: Huffman-coded stream (+ .huf.syn, .hcd)
//! ├── word.lexicon            # distinct word forms
//! ├── word.lexicon.idx        # offsets into word.lexicon
//! ├── text_board.rng          # region boundaries
//! ├── text_board.avs          # region values
//! └── text_board.avx          # region -> value offset
//! ```
//!
//! # Example
//!
//! ```ignore
//! use cwb_cl::Corpus;
//!
//! let corpus = Corpus::open("bbs", "/usr/local/share/cwb/registry")?;
//! let words = corpus.positional("word")?;
//! let boards = corpus.structural("text_board")?;
//! let board = boards.find_pos(1234)?.and_then(|span| span.value);
//! println!("{:?} {:?}", words.values(1230..1238)?, board);
//! ```

pub mod cli;
mod corpus;
pub mod encode;
mod error;
mod format;
mod huffman;
mod positional;
mod registry;
mod structural;

pub use corpus::{Corpus, WORD_ATTRIBUTE};
pub use encode::CorpusWriter;
pub use error::CorpusError;
pub use format::Charset;
pub use positional::PositionalAttribute;
pub use registry::{AttributeDecl, Registry, RegistryEntry};
pub use structural::{Span, StructuralAttribute};

/// Registry directory used when neither a flag nor `CORPUS_REGISTRY` names one
pub const DEFAULT_REGISTRY: &str = "/usr/local/share/cwb/registry";
