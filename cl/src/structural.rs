//! Structural attributes (regions of tokens, optionally with a value)
//!
//! `text_board.rng` holds one `(start, end)` pair per region, `end` inclusive.
//! Attributes with annotations add `text_board.avs` (NUL-terminated values)
//! and `text_board.avx` (`(region, offset)` pairs into the `.avs` file).

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::CorpusError;
use crate::format::{Charset, decode_pairs, read_file, string_at};

type Result<T> = std::result::Result<T, CorpusError>;

/// A region enclosing some corpus position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    /// Last position inside the region
    pub end: usize,
    pub value: Option<String>,
}

#[derive(Debug)]
struct RegionValues {
    avs_path: PathBuf,
    avs: Vec<u8>,
    avx: Vec<(u32, u32)>,
}

#[derive(Debug)]
pub struct StructuralAttribute {
    name: String,
    regions: Vec<(u32, u32)>,
    values: Option<RegionValues>,
    charset: Charset,
}

impl StructuralAttribute {
    /// Open the structural attribute `name` stored in `dir`
    pub fn open(name: &str, dir: &Path, charset: Charset) -> Result<Self> {
        debug!(%name, ?dir, "StructuralAttribute::open: called");
        let rng_path = dir.join(format!("{}.rng", name));
        let regions = decode_pairs(&rng_path, &read_file(&rng_path)?)?;

        let avs_path = dir.join(format!("{}.avs", name));
        let avx_path = dir.join(format!("{}.avx", name));
        let values = if avs_path.exists() && avx_path.exists() {
            let avx = decode_pairs(&avx_path, &read_file(&avx_path)?)?;
            let avs = read_file(&avs_path)?;
            Some(RegionValues { avs_path, avs, avx })
        } else {
            debug!(%name, "StructuralAttribute::open: no annotations");
            None
        };

        Ok(Self {
            name: name.to_string(),
            regions,
            values,
            charset,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Whether regions carry values
    pub fn has_values(&self) -> bool {
        self.values.is_some()
    }

    /// Boundaries of region `n`, end inclusive
    pub fn region(&self, n: usize) -> Option<(usize, usize)> {
        self.regions.get(n).map(|&(s, e)| (s as usize, e as usize))
    }

    /// Value of region `n`; `None` when the attribute has no annotations
    pub fn value(&self, n: usize) -> Result<Option<String>> {
        let Some(values) = &self.values else {
            return Ok(None);
        };
        let Ok(idx) = values.avx.binary_search_by_key(&(n as u32), |&(region, _)| region) else {
            return Ok(None);
        };
        let offset = values.avx[idx].1 as usize;
        let bytes = string_at(&values.avs_path, &values.avs, offset)?;
        Ok(Some(self.charset.decode(bytes)))
    }

    /// Index of the region enclosing `pos`
    pub fn find_region(&self, pos: usize) -> Option<usize> {
        let after = self.regions.partition_point(|&(start, _)| start as usize <= pos);
        let idx = after.checked_sub(1)?;
        let (_, end) = self.regions[idx];
        (pos <= end as usize).then_some(idx)
    }

    /// Region (with value) enclosing `pos`, if any
    pub fn find_pos(&self, pos: usize) -> Result<Option<Span>> {
        let Some(idx) = self.find_region(pos) else {
            return Ok(None);
        };
        let (start, end) = self.regions[idx];
        Ok(Some(Span {
            start: start as usize,
            end: end as usize,
            value: self.value(idx)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::CorpusWriter;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, StructuralAttribute, StructuralAttribute) {
        let temp = TempDir::new().unwrap();
        let data = temp.path().join("data");
        let mut writer = CorpusWriter::new("mini", &data);
        writer.positional("word", &["a", "b", "c", "d", "e", "f", "g", "h"]);
        writer.structural("text_board", &[(0, 2, Some("sports")), (3, 5, Some("news"))]);
        writer.structural("s", &[(0, 3, None), (6, 7, None)]);
        writer.write(&temp.path().join("registry")).unwrap();

        let board = StructuralAttribute::open("text_board", &data, Charset::Utf8).unwrap();
        let s = StructuralAttribute::open("s", &data, Charset::Utf8).unwrap();
        (temp, board, s)
    }

    #[test]
    fn test_find_pos_with_values() {
        let (_temp, board, _) = fixture();
        assert_eq!(board.region_count(), 2);
        assert!(board.has_values());

        let span = board.find_pos(4).unwrap().unwrap();
        assert_eq!(span.start, 3);
        assert_eq!(span.end, 5);
        assert_eq!(span.value.as_deref(), Some("news"));

        assert_eq!(board.find_pos(0).unwrap().unwrap().value.as_deref(), Some("sports"));
        assert_eq!(board.find_pos(2).unwrap().unwrap().value.as_deref(), Some("sports"));
    }

    #[test]
    fn test_find_pos_outside_regions() {
        let (_temp, board, s) = fixture();
        assert!(board.find_pos(6).unwrap().is_none());
        assert!(s.find_pos(4).unwrap().is_none());
        assert!(s.find_pos(100).unwrap().is_none());
    }

    #[test]
    fn test_regions_without_values() {
        let (_temp, _, s) = fixture();
        assert!(!s.has_values());
        assert_eq!(s.region(1), Some((6, 7)));
        assert_eq!(s.region(2), None);

        let span = s.find_pos(7).unwrap().unwrap();
        assert_eq!(span.value, None);
    }

    #[test]
    fn test_missing_rng_is_error() {
        let temp = TempDir::new().unwrap();
        let result = StructuralAttribute::open("text", temp.path(), Charset::Utf8);
        assert!(matches!(result, Err(CorpusError::Io { .. })));
    }
}
