//! Positional attributes (one value per token)
//!
//! A positional attribute `word` keeps its distinct values in two files in
//! the corpus data directory:
//!
//! - `word.lexicon`: NUL-terminated distinct values
//! - `word.lexicon.idx`: byte offset of each lexicon id in `word.lexicon`
//!
//! The token stream is either `word.corpus` (one lexicon id per token) or,
//! after `cwb-huffcode`, the compressed `word.huf` with its sync table and
//! code descriptor. The lexicon is held in memory; token ids are read from
//! disk on demand.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::CorpusError;
use crate::format::{Charset, decode_ints, read_file, string_at};
use crate::huffman::{HuffmanCode, SYNC_INTERVAL};

type Result<T> = std::result::Result<T, CorpusError>;

/// A file read piecewise with seek + read
#[derive(Debug)]
struct DataFile {
    path: PathBuf,
    file: File,
    len: u64,
}

impl DataFile {
    fn open(path: PathBuf) -> Result<Self> {
        let file = File::open(&path).map_err(|e| CorpusError::io(&path, e))?;
        let len = file.metadata().map_err(|e| CorpusError::io(&path, e))?.len();
        Ok(Self { path, file, len })
    }

    fn read_at(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        let mut file = &self.file;
        let mut buf = vec![0u8; len];
        file.seek(SeekFrom::Start(offset))
            .and_then(|_| file.read_exact(&mut buf))
            .map_err(|e| CorpusError::io(&self.path, e))?;
        Ok(buf)
    }
}

#[derive(Debug)]
enum TokenStream {
    /// `.corpus`: a flat table of ids
    Plain(DataFile),
    /// `.huf` + `.huf.syn` + `.hcd`
    Compressed {
        huf: DataFile,
        sync: Vec<u32>,
        code: HuffmanCode,
    },
}

impl TokenStream {
    fn open(name: &str, dir: &Path) -> Result<Self> {
        let corpus_path = dir.join(format!("{}.corpus", name));
        let huf_path = dir.join(format!("{}.huf", name));
        if corpus_path.exists() || !huf_path.exists() {
            let data = DataFile::open(corpus_path)?;
            if data.len % 4 != 0 {
                return Err(CorpusError::corrupt(
                    &data.path,
                    format!("length {} is not a multiple of 4", data.len),
                ));
            }
            return Ok(TokenStream::Plain(data));
        }

        debug!(%name, "TokenStream::open: reading compressed stream");
        let hcd_path = dir.join(format!("{}.hcd", name));
        let code = HuffmanCode::parse(&hcd_path, &read_file(&hcd_path)?)?;
        let syn_path = dir.join(format!("{}.huf.syn", name));
        let sync = decode_ints(&syn_path, &read_file(&syn_path)?)?;
        if sync.len() != code.block_count() {
            return Err(CorpusError::corrupt(
                &syn_path,
                format!("{} sync entries for {} blocks", sync.len(), code.block_count()),
            ));
        }
        Ok(TokenStream::Compressed {
            huf: DataFile::open(huf_path)?,
            sync,
            code,
        })
    }

    fn size(&self) -> usize {
        match self {
            TokenStream::Plain(data) => (data.len / 4) as usize,
            TokenStream::Compressed { code, .. } => code.size(),
        }
    }

    fn path(&self) -> &Path {
        match self {
            TokenStream::Plain(data) => &data.path,
            TokenStream::Compressed { huf, .. } => &huf.path,
        }
    }

    /// Ids for `start..start + count`; the range must lie inside the stream
    fn read_ids(&self, start: usize, count: usize) -> Result<Vec<u32>> {
        match self {
            TokenStream::Plain(data) => decode_ints(&data.path, &data.read_at(start as u64 * 4, count * 4)?),
            TokenStream::Compressed { huf, sync, code } => {
                let end = start + count;
                let mut ids = Vec::with_capacity(count);
                let mut pos = start;
                while pos < end {
                    let block = pos / SYNC_INTERVAL;
                    let block_start = block * SYNC_INTERVAL;
                    let wanted = (end - block_start).min(SYNC_INTERVAL);

                    let from = sync[block] as u64;
                    let to = sync.get(block + 1).map_or(huf.len, |&o| o as u64);
                    if to < from || to > huf.len {
                        return Err(CorpusError::corrupt(&huf.path, format!("bad offsets for block {}", block)));
                    }
                    let bytes = huf.read_at(from, (to - from) as usize)?;
                    let decoded = code
                        .decode_block(&bytes, wanted)
                        .ok_or_else(|| CorpusError::corrupt(&huf.path, format!("undecodable block {}", block)))?;
                    ids.extend_from_slice(&decoded[pos - block_start..]);
                    pos = block_start + wanted;
                }
                Ok(ids)
            }
        }
    }
}

pub struct PositionalAttribute {
    name: String,
    stream: TokenStream,
    lexicon_path: PathBuf,
    lexicon: Vec<u8>,
    lexicon_idx: Vec<u32>,
    charset: Charset,
}

impl std::fmt::Debug for PositionalAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionalAttribute")
            .field("name", &self.name)
            .field("size", &self.size())
            .field("lexicon_size", &self.lexicon_idx.len())
            .field("compressed", &matches!(self.stream, TokenStream::Compressed { .. }))
            .finish()
    }
}

impl PositionalAttribute {
    /// Open the attribute `name` stored in `dir`
    pub fn open(name: &str, dir: &Path, charset: Charset) -> Result<Self> {
        debug!(%name, ?dir, "PositionalAttribute::open: called");
        let stream = TokenStream::open(name, dir)?;

        let lexicon_path = dir.join(format!("{}.lexicon", name));
        let lexicon = read_file(&lexicon_path)?;
        let idx_path = dir.join(format!("{}.lexicon.idx", name));
        let lexicon_idx = decode_ints(&idx_path, &read_file(&idx_path)?)?;

        debug!(%name, size = stream.size(), lexicon_size = lexicon_idx.len(), "PositionalAttribute::open: loaded");
        Ok(Self {
            name: name.to_string(),
            stream,
            lexicon_path,
            lexicon,
            lexicon_idx,
            charset,
        })
    }

    /// Token count of the attribute `name` in `dir`, read from file metadata
    /// without loading the lexicon
    pub fn token_count(name: &str, dir: &Path) -> Result<usize> {
        let corpus_path = dir.join(format!("{}.corpus", name));
        let hcd_path = dir.join(format!("{}.hcd", name));
        if corpus_path.exists() || !hcd_path.exists() {
            let len = std::fs::metadata(&corpus_path)
                .map_err(|e| CorpusError::io(&corpus_path, e))?
                .len();
            return Ok((len / 4) as usize);
        }
        let header = read_file(&hcd_path)?;
        let size = decode_ints(&hcd_path, header.get(..4).unwrap_or_default())?
            .first()
            .copied()
            .ok_or_else(|| CorpusError::corrupt(&hcd_path, "code descriptor is truncated"))?;
        Ok(size as usize)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of tokens in the corpus
    pub fn size(&self) -> usize {
        self.stream.size()
    }

    /// Whether the token stream is Huffman-compressed
    pub fn is_compressed(&self) -> bool {
        matches!(self.stream, TokenStream::Compressed { .. })
    }

    /// Number of distinct values
    pub fn lexicon_size(&self) -> usize {
        self.lexicon_idx.len()
    }

    /// Lexicon id of the token at `pos`
    pub fn id_at(&self, pos: usize) -> Result<u32> {
        if pos >= self.size() {
            return Err(self.out_of_range(pos));
        }
        self.stream
            .read_ids(pos, 1)?
            .first()
            .copied()
            .ok_or_else(|| CorpusError::corrupt(self.stream.path(), format!("no token at {}", pos)))
    }

    /// String value of the token at `pos`
    pub fn value_at(&self, pos: usize) -> Result<String> {
        let id = self.id_at(pos)?;
        self.lexicon_value(id)
    }

    /// String values for a range of positions, clamped to the corpus size
    pub fn values(&self, range: Range<usize>) -> Result<Vec<String>> {
        let end = range.end.min(self.size());
        if range.start >= end {
            return Ok(Vec::new());
        }
        self.stream
            .read_ids(range.start, end - range.start)?
            .into_iter()
            .map(|id| self.lexicon_value(id))
            .collect()
    }

    /// String for a lexicon id
    pub fn lexicon_value(&self, id: u32) -> Result<String> {
        let offset = *self.lexicon_idx.get(id as usize).ok_or_else(|| {
            CorpusError::corrupt(&self.lexicon_path, format!("lexicon id {} out of range", id))
        })?;
        let bytes = string_at(&self.lexicon_path, &self.lexicon, offset as usize)?;
        Ok(self.charset.decode(bytes))
    }

    /// Lexicon id of a string value, if it occurs in the corpus
    pub fn str_to_id(&self, value: &str) -> Option<u32> {
        (0..self.lexicon_idx.len() as u32).find(|&id| self.lexicon_value(id).is_ok_and(|v| v == value))
    }

    fn out_of_range(&self, position: usize) -> CorpusError {
        CorpusError::PositionOutOfRange {
            name: self.name.clone(),
            position,
            size: self.size(),
        }
    }
}
