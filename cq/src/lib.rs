//! cqpconc - KWIC concordances over CQP and CWB corpora
//!
//! Runs one word query through a `cqp` child process, cuts a page out of the
//! match list, and decorates each hit with its left/right context, optional
//! part-of-speech tags, and the board and timestamp of the text it occurs in.
//! Token and region values are read straight from the CWB data files.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use cqpconc::{AttributeNames, ConcordanceBuilder, ConcordanceOptions};
//!
//! let mut conc = ConcordanceBuilder::connect(
//!     Path::new("/usr/local/bin/cqp"),
//!     "BBS",
//!     Path::new("/usr/local/share/cwb/registry"),
//!     AttributeNames::default(),
//! )?;
//! let page = conc.make_concordance(
//!     "cat",
//!     &ConcordanceOptions {
//!         boards: vec!["sports".to_string()],
//!         ..Default::default()
//!     },
//! )?;
//! conc.close();
//! ```

pub mod cli;
pub mod concordance;
pub mod config;
pub mod cqp;
pub mod engine;
mod error;
pub mod filter;
pub mod store;

pub use concordance::{
    AttributeNames, ConcordanceBuilder, ConcordanceLine, ConcordanceOptions, CqpConcordancer, PageResult, PageWindow,
    Segment,
};
pub use cqp::CqpProcess;
pub use engine::{EngineError, Match, QueryEngine};
pub use error::ConcordanceError;
pub use filter::{BoardFilter, TimeFilter};
pub use store::{AttributeStore, PositionalLookup, SpanLookup};
