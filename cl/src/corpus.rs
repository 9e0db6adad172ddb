//! Corpus handle tying a registry entry to its attribute files

use std::path::Path;
use tracing::debug;

use crate::error::CorpusError;
use crate::format::Charset;
use crate::positional::PositionalAttribute;
use crate::registry::{Registry, RegistryEntry};
use crate::structural::StructuralAttribute;

type Result<T> = std::result::Result<T, CorpusError>;

/// Positional attribute every CWB corpus carries
pub const WORD_ATTRIBUTE: &str = "word";

/// An opened corpus
#[derive(Debug, Clone)]
pub struct Corpus {
    entry: RegistryEntry,
    charset: Charset,
}

impl Corpus {
    /// Look up `name` in the registry at `registry_dir`
    pub fn open(name: &str, registry_dir: impl AsRef<Path>) -> Result<Self> {
        debug!(%name, registry_dir = ?registry_dir.as_ref(), "Corpus::open: called");
        let entry = Registry::open(registry_dir)?.entry(name)?;
        Self::from_entry(entry)
    }

    /// Fails when the entry names a charset there is no decoder for
    pub fn from_entry(entry: RegistryEntry) -> Result<Self> {
        let charset = Charset::from_name(entry.charset())?;
        Ok(Self { entry, charset })
    }

    pub fn id(&self) -> &str {
        &self.entry.id
    }

    pub fn entry(&self) -> &RegistryEntry {
        &self.entry
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// Number of tokens, taken from the `word` attribute's token stream
    pub fn size(&self) -> Result<usize> {
        let decl = self
            .entry
            .positional_decl(WORD_ATTRIBUTE)
            .or_else(|| self.entry.positional.first())
            .ok_or_else(|| self.not_found(WORD_ATTRIBUTE))?;
        PositionalAttribute::token_count(&decl.name, decl.data_dir(&self.entry.home))
    }

    /// Open a positional attribute declared in the registry
    pub fn positional(&self, name: &str) -> Result<PositionalAttribute> {
        let decl = self.entry.positional_decl(name).ok_or_else(|| self.not_found(name))?;
        PositionalAttribute::open(name, decl.data_dir(&self.entry.home), self.charset)
    }

    /// Open a structural attribute declared in the registry
    pub fn structural(&self, name: &str) -> Result<StructuralAttribute> {
        let decl = self.entry.structural_decl(name).ok_or_else(|| self.not_found(name))?;
        StructuralAttribute::open(name, decl.data_dir(&self.entry.home), self.charset)
    }

    fn not_found(&self, name: &str) -> CorpusError {
        CorpusError::AttributeNotFound {
            corpus: self.entry.id.clone(),
            name: name.to_string(),
        }
    }
}
