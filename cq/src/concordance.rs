//! Paginated, filtered concordances
//!
//! One call runs one word query, cuts the requested page out of the match
//! list, and decorates every hit with its context window, board and time.
//! Filters apply after paging: a rejected hit leaves a gap in the page instead
//! of pulling in the next match.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

use cwb_cl::Corpus;

use crate::cqp::CqpProcess;
use crate::engine::{LAST, QueryEngine, word_query};
use crate::error::ConcordanceError;
use crate::filter::{BoardFilter, TimeFilter};
use crate::store::{AttributeStore, PositionalLookup, SpanLookup};

type Result<T> = std::result::Result<T, ConcordanceError>;

/// Default hits per page
pub const DEFAULT_NUM_PER_PAGE: usize = 50;

/// Default context tokens on each side of a hit
pub const DEFAULT_WINDOW_SIZE: usize = 6;

/// Names of the corpus attributes a concordance reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeNames {
    /// Positional attribute holding word forms
    pub word: String,
    /// Positional attribute holding part-of-speech tags
    pub pos: String,
    /// Structural attribute holding the board (category) of each text
    pub board: String,
    /// Structural attribute holding the timestamp of each text
    pub time: String,
}

impl Default for AttributeNames {
    fn default() -> Self {
        Self {
            word: "word".to_string(),
            pos: "pos".to_string(),
            board: "text_board".to_string(),
            time: "text_time".to_string(),
        }
    }
}

/// Paging, filtering and display options for one concordance page
#[derive(Debug, Clone)]
pub struct ConcordanceOptions {
    /// 1-based page number
    pub page_num: usize,
    /// Page size
    pub num_per_page: usize,
    /// Render tokens as `word/pos`
    pub show_pos: bool,
    /// Inclusive lower time bound
    pub begin_time: Option<i64>,
    /// Inclusive upper time bound
    pub end_time: Option<i64>,
    /// Allowed boards; empty disables board filtering
    pub boards: Vec<String>,
    /// Context tokens on each side
    pub window_size: usize,
}

impl Default for ConcordanceOptions {
    fn default() -> Self {
        Self {
            page_num: 1,
            num_per_page: DEFAULT_NUM_PER_PAGE,
            show_pos: false,
            begin_time: None,
            end_time: None,
            boards: Vec::new(),
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

/// Zero-based, inclusive range of match numbers covered by a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub first: u64,
    pub last: u64,
}

impl PageWindow {
    pub fn new(page_num: usize, num_per_page: usize) -> Result<Self> {
        if page_num == 0 {
            return Err(ConcordanceError::invalid("page_num", page_num));
        }
        if num_per_page == 0 {
            return Err(ConcordanceError::invalid("num_per_page", num_per_page));
        }
        let last = (num_per_page as u64)
            .checked_mul(page_num as u64)
            .map(|n| n - 1)
            .ok_or_else(|| ConcordanceError::invalid("page_num", page_num))?;
        Ok(Self {
            first: last + 1 - num_per_page as u64,
            last,
        })
    }
}

/// One third of a concordance line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Segment {
    /// Words joined by single spaces
    Plain(String),
    /// `word/pos` pairs
    Tagged(Vec<String>),
}

impl Segment {
    pub fn plain(words: &[String]) -> Self {
        Segment::Plain(words.join(" "))
    }

    /// Pair words with tags index by index; the shorter list wins
    pub fn tagged(words: &[String], tags: &[String]) -> Self {
        Segment::Tagged(words.iter().zip(tags).map(|(w, p)| format!("{}/{}", w, p)).collect())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Segment::Plain(s) => s.is_empty(),
            Segment::Tagged(v) => v.is_empty(),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Plain(s) => f.write_str(s),
            Segment::Tagged(v) => f.write_str(&v.join(" ")),
        }
    }
}

/// A formatted hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConcordanceLine {
    /// Left context, match, right context
    pub conc: (Segment, Segment, Segment),
    pub board: Option<String>,
    pub time: Option<String>,
    /// First matched position
    pub start: usize,
    /// Position after the last matched token
    pub end: usize,
}

/// One page of a concordance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageResult {
    /// Matches for the whole query, not just this page
    pub total: u64,
    pub num_per_page: usize,
    pub conclist: Vec<ConcordanceLine>,
}

/// Builds concordance pages from one engine connection and one corpus
///
/// Each query replaces the engine's `Last` result set, so calls must not
/// interleave on one connection. `make_concordance` takes `&mut self` for that
/// reason; share a builder between threads behind a `Mutex`, or give each
/// thread its own builder.
///
/// The engine is terminated exactly once, by [`ConcordanceBuilder::close`] or
/// on drop. A failure to terminate is logged, never returned.
pub struct ConcordanceBuilder<E: QueryEngine, S: AttributeStore> {
    engine: E,
    store: S,
    attributes: AttributeNames,
    handles: Option<AttributeHandles<S>>,
    released: bool,
}

/// Attributes opened on first use and kept for the builder's lifetime
struct AttributeHandles<S: AttributeStore> {
    words: S::Positional,
    boards: S::Structural,
    times: S::Structural,
    /// Opened only once a page asks for tags
    postags: Option<S::Positional>,
}

impl<S: AttributeStore> AttributeHandles<S> {
    fn open(store: &S, names: &AttributeNames) -> Result<Self> {
        debug!(?names, "AttributeHandles::open: called");
        Ok(Self {
            words: store.positional(&names.word)?,
            boards: store.structural(&names.board)?,
            times: store.structural(&names.time)?,
            postags: None,
        })
    }
}

/// Builder backed by a `cqp` child process and CWB data files
pub type CqpConcordancer = ConcordanceBuilder<CqpProcess, Corpus>;

impl ConcordanceBuilder<CqpProcess, Corpus> {
    /// Open `corpus` from `registry_dir` and start `cqp_bin` on it
    pub fn connect(cqp_bin: &Path, corpus: &str, registry_dir: &Path, attributes: AttributeNames) -> Result<Self> {
        debug!(?cqp_bin, %corpus, ?registry_dir, "ConcordanceBuilder::connect: called");
        let store = Corpus::open(corpus, registry_dir)?;
        let engine = CqpProcess::spawn(cqp_bin, registry_dir, corpus)?;
        info!(%corpus, version = %engine.version(), "Connected to cqp");
        Ok(Self::new(engine, store, attributes))
    }
}

impl<E: QueryEngine, S: AttributeStore> ConcordanceBuilder<E, S> {
    pub fn new(engine: E, store: S, attributes: AttributeNames) -> Self {
        Self {
            engine,
            store,
            attributes,
            handles: None,
            released: false,
        }
    }

    /// Build one page of the concordance for `query`
    ///
    /// Returns `Ok(None)` when the query has no matches at all. A page past
    /// the last match, or a page whose hits were all filtered out, is a
    /// `PageResult` with an empty `conclist`.
    pub fn make_concordance(&mut self, query: &str, options: &ConcordanceOptions) -> Result<Option<PageResult>> {
        debug!(%query, ?options, "ConcordanceBuilder::make_concordance: called");
        if query.is_empty() {
            return Err(ConcordanceError::invalid("query", "\"\""));
        }
        if query.chars().any(char::is_control) {
            return Err(ConcordanceError::invalid("query", format!("{:?}", query)));
        }
        let window = PageWindow::new(options.page_num, options.num_per_page)?;
        let time_filter = TimeFilter::new(options.begin_time, options.end_time);
        let board_filter = BoardFilter::new(&options.boards);

        self.engine.execute(&word_query(&self.attributes.word, query))?;
        let total = self.engine.size(LAST)?;
        if total == 0 {
            debug!(%query, "ConcordanceBuilder::make_concordance: no matches");
            return Ok(None);
        }

        let matches = if window.first >= total {
            debug!(first = window.first, total, "ConcordanceBuilder::make_concordance: page past last match");
            Vec::new()
        } else {
            self.engine.dump(LAST, window.first, window.last.min(total - 1))?
        };

        let handles = match &mut self.handles {
            Some(handles) => handles,
            slot @ None => slot.insert(AttributeHandles::open(&self.store, &self.attributes)?),
        };
        if options.show_pos && handles.postags.is_none() {
            handles.postags = Some(self.store.positional(&self.attributes.pos)?);
        }
        let words = &handles.words;
        let boards = &handles.boards;
        let times = &handles.times;
        let postags = if options.show_pos { handles.postags.as_ref() } else { None };

        let mut conclist = Vec::with_capacity(matches.len());
        for m in matches {
            let start = m.start;
            let end = m.matchend + 1;

            let time = times.find_pos(start)?.and_then(|span| span.value);
            let in_range = time_filter
                .accepts(time.as_deref())
                .map_err(|_| ConcordanceError::InvalidTimestamp {
                    value: time.clone().unwrap_or_default(),
                    position: start,
                })?;
            if !in_range {
                continue;
            }

            let board = boards.find_pos(start)?.and_then(|span| span.value);
            if !board_filter.accepts(board.as_deref()) {
                continue;
            }

            let left = start.saturating_sub(options.window_size)..start;
            let mid = start..end;
            let right = end..end.saturating_add(options.window_size);

            let conc = match postags {
                None => (
                    Segment::plain(&words.values(left)?),
                    Segment::plain(&words.values(mid)?),
                    Segment::plain(&words.values(right)?),
                ),
                Some(tags) => (
                    Segment::tagged(&words.values(left.clone())?, &tags.values(left)?),
                    Segment::tagged(&words.values(mid.clone())?, &tags.values(mid)?),
                    Segment::tagged(&words.values(right.clone())?, &tags.values(right)?),
                ),
            };

            conclist.push(ConcordanceLine {
                conc,
                board,
                time,
                start,
                end,
            });
        }

        debug!(total, rows = conclist.len(), "ConcordanceBuilder::make_concordance: done");
        Ok(Some(PageResult {
            total,
            num_per_page: options.num_per_page,
            conclist,
        }))
    }

    /// Terminate the engine now instead of on drop
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        debug!("ConcordanceBuilder::release: terminating engine");
        if let Err(e) = self.engine.terminate() {
            warn!(%e, "Failed to terminate query engine");
        }
    }
}

impl<E: QueryEngine, S: AttributeStore> Drop for ConcordanceBuilder<E, S> {
    fn drop(&mut self) {
        self.release();
    }
}
