//! Writer for small corpora
//!
//! Produces the same file layout `cwb-encode` + `cwb-makeall` leave behind,
//! minus the reverse index, and optionally the Huffman-compressed token
//! streams of `cwb-huffcode`. Useful for fixtures and for shipping tiny
//! corpora alongside an application.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::CorpusError;
use crate::format::encode_ints;
use crate::huffman::HuffmanCode;

type Result<T> = std::result::Result<T, CorpusError>;

/// A region to be written: `(start, end inclusive, value)`
pub type RegionSpec<'a> = (usize, usize, Option<&'a str>);

#[derive(Debug, Clone)]
pub struct CorpusWriter {
    id: String,
    home: PathBuf,
    charset: String,
    compressed: bool,
    positional: Vec<(String, Vec<String>)>,
    structural: Vec<(String, Vec<(usize, usize, Option<String>)>)>,
}

impl CorpusWriter {
    /// Start a corpus `id` whose data files go to `home`
    pub fn new(id: &str, home: impl Into<PathBuf>) -> Self {
        Self {
            id: id.to_lowercase(),
            home: home.into(),
            charset: "utf8".to_string(),
            compressed: false,
            positional: Vec::new(),
            structural: Vec::new(),
        }
    }

    /// Write token streams Huffman-compressed (`.huf`, `.huf.syn`, `.hcd`)
    /// instead of as plain `.corpus` files
    pub fn compressed(&mut self, enabled: bool) -> &mut Self {
        self.compressed = enabled;
        self
    }

    /// Add a positional attribute; all positional attributes must be the same length
    pub fn positional<S: AsRef<str>>(&mut self, name: &str, tokens: &[S]) -> &mut Self {
        let tokens = tokens.iter().map(|t| t.as_ref().to_string()).collect();
        self.positional.push((name.to_string(), tokens));
        self
    }

    /// Add a structural attribute from sorted, non-overlapping regions
    pub fn structural(&mut self, name: &str, regions: &[RegionSpec<'_>]) -> &mut Self {
        let regions = regions
            .iter()
            .map(|&(s, e, v)| (s, e, v.map(str::to_string)))
            .collect();
        self.structural.push((name.to_string(), regions));
        self
    }

    /// Write data files and the registry entry; returns the registry file path
    pub fn write(&self, registry_dir: &Path) -> Result<PathBuf> {
        debug!(id = %self.id, ?self.home, ?registry_dir, "CorpusWriter::write: called");
        let size = self.validate()?;

        fs::create_dir_all(&self.home).map_err(|e| CorpusError::io(&self.home, e))?;
        fs::create_dir_all(registry_dir).map_err(|e| CorpusError::io(registry_dir, e))?;

        for (name, tokens) in &self.positional {
            self.write_positional(name, tokens)?;
        }
        for (name, regions) in &self.structural {
            self.write_structural(name, regions)?;
        }

        let registry_path = registry_dir.join(&self.id);
        write_file(&registry_path, self.registry_text().as_bytes())?;

        info!(id = %self.id, size, "Wrote corpus");
        Ok(registry_path)
    }

    fn validate(&self) -> Result<usize> {
        let size = self.positional.first().map(|(_, t)| t.len()).unwrap_or(0);
        for (name, tokens) in &self.positional {
            if tokens.len() != size {
                return Err(self.invalid(format!(
                    "attribute {} has {} tokens, expected {}",
                    name,
                    tokens.len(),
                    size
                )));
            }
        }
        for (name, regions) in &self.structural {
            let mut next_free = 0usize;
            for &(start, end, _) in regions {
                if start < next_free || end < start || end >= size {
                    return Err(self.invalid(format!("attribute {} has invalid region [{}, {}]", name, start, end)));
                }
                next_free = end + 1;
            }
        }
        Ok(size)
    }

    fn write_positional(&self, name: &str, tokens: &[String]) -> Result<()> {
        let mut ids: HashMap<&str, u32> = HashMap::new();
        let mut lexicon = Vec::new();
        let mut offsets = Vec::new();
        let mut stream = Vec::with_capacity(tokens.len());

        for token in tokens {
            let id = *ids.entry(token.as_str()).or_insert_with(|| {
                offsets.push(lexicon.len() as u32);
                lexicon.extend_from_slice(token.as_bytes());
                lexicon.push(0);
                (offsets.len() - 1) as u32
            });
            stream.push(id);
        }

        if self.compressed {
            let code = HuffmanCode::build(&stream, offsets.len())?;
            let (huf, sync) = code.encode(&stream)?;
            write_file(&self.home.join(format!("{}.hcd", name)), &code.to_bytes())?;
            write_file(&self.home.join(format!("{}.huf", name)), &huf)?;
            write_file(&self.home.join(format!("{}.huf.syn", name)), &encode_ints(&sync))?;
        } else {
            write_file(&self.home.join(format!("{}.corpus", name)), &encode_ints(&stream))?;
        }
        write_file(&self.home.join(format!("{}.lexicon", name)), &lexicon)?;
        write_file(&self.home.join(format!("{}.lexicon.idx", name)), &encode_ints(&offsets))
    }

    fn write_structural(&self, name: &str, regions: &[(usize, usize, Option<String>)]) -> Result<()> {
        let rng: Vec<u32> = regions.iter().flat_map(|&(s, e, _)| [s as u32, e as u32]).collect();
        write_file(&self.home.join(format!("{}.rng", name)), &encode_ints(&rng))?;

        if regions.iter().all(|(_, _, v)| v.is_none()) {
            return Ok(());
        }

        let mut offsets: HashMap<&str, u32> = HashMap::new();
        let mut avs = Vec::new();
        let mut avx = Vec::with_capacity(regions.len() * 2);
        for (n, (_, _, value)) in regions.iter().enumerate() {
            // regions without a value get no avx entry and read back as None
            let Some(value) = value.as_deref() else {
                continue;
            };
            let offset = *offsets.entry(value).or_insert_with(|| {
                let offset = avs.len() as u32;
                avs.extend_from_slice(value.as_bytes());
                avs.push(0);
                offset
            });
            avx.extend([n as u32, offset]);
        }

        write_file(&self.home.join(format!("{}.avs", name)), &avs)?;
        write_file(&self.home.join(format!("{}.avx", name)), &encode_ints(&avx))
    }

    fn registry_text(&self) -> String {
        let mut text = format!(
            "NAME \"{}\"\nID   {}\nHOME \"{}\"\n\n##:: charset = \"{}\"\n\n",
            self.id,
            self.id,
            self.home.display(),
            self.charset
        );
        for (name, _) in &self.positional {
            text.push_str(&format!("ATTRIBUTE {}\n", name));
        }
        for (name, _) in &self.structural {
            text.push_str(&format!("STRUCTURE {}\n", name));
        }
        text
    }

    fn invalid(&self, reason: String) -> CorpusError {
        CorpusError::corrupt(&self.home, reason)
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).map_err(|e| CorpusError::io(path, e))
}
