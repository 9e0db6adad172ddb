//! CWB registry files
//!
//! A registry directory holds one plain-text file per corpus, named after the
//! lowercase corpus id. Each file declares where the corpus data lives and
//! which attributes it carries:
//!
//! ```text
//! NAME "Bulletin board corpus"
//! ID   bbs
//! HOME /corpora/data/bbs
//! ##:: charset = "utf8"
//! ATTRIBUTE word
//! ATTRIBUTE pos
//! STRUCTURE text_board   # [annotations]
//! STRUCTURE text_time    # [annotations]
//! ```

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::CorpusError;

type Result<T> = std::result::Result<T, CorpusError>;

/// A declared attribute, optionally stored outside the corpus home directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeDecl {
    pub name: String,
    pub path: Option<PathBuf>,
}

impl AttributeDecl {
    /// Directory holding this attribute's data files
    pub fn data_dir<'a>(&'a self, home: &'a Path) -> &'a Path {
        self.path.as_deref().unwrap_or(home)
    }
}

/// Parsed contents of one registry file
#[derive(Debug, Clone, Serialize)]
pub struct RegistryEntry {
    /// Corpus id (the registry file name)
    pub id: String,
    /// Long descriptive name
    pub name: Option<String>,
    /// Data directory
    pub home: PathBuf,
    /// Info file path
    pub info: Option<PathBuf>,
    /// Positional attributes in declaration order
    pub positional: Vec<AttributeDecl>,
    /// Structural attributes in declaration order
    pub structural: Vec<AttributeDecl>,
    /// Aligned corpus ids
    pub aligned: Vec<String>,
    /// `##::` properties
    pub properties: BTreeMap<String, String>,
}

impl RegistryEntry {
    /// Parse a registry file body
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        debug!(?path, "RegistryEntry::parse: called");
        let err = |line: usize, message: String| CorpusError::Registry {
            path: path.to_path_buf(),
            line,
            message,
        };

        let mut id = None;
        let mut name = None;
        let mut home = None;
        let mut info = None;
        let mut positional = Vec::new();
        let mut structural = Vec::new();
        let mut aligned = Vec::new();
        let mut properties = BTreeMap::new();

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = raw.trim();

            if let Some(prop) = trimmed.strip_prefix("##::") {
                let (key, value) = prop
                    .split_once('=')
                    .ok_or_else(|| err(line_no, format!("malformed property: {}", prop.trim())))?;
                let value = tokenize(value).into_iter().next().unwrap_or_default();
                properties.insert(key.trim().to_string(), value);
                continue;
            }

            let tokens = tokenize(trimmed);
            let Some((keyword, args)) = tokens.split_first() else {
                continue;
            };

            let first_arg = || {
                args.first()
                    .cloned()
                    .ok_or_else(|| err(line_no, format!("{} requires an argument", keyword)))
            };

            match keyword.as_str() {
                "NAME" => name = Some(first_arg()?),
                "ID" => id = Some(first_arg()?),
                "HOME" => home = Some(PathBuf::from(first_arg()?)),
                "INFO" => info = Some(PathBuf::from(first_arg()?)),
                "ATTRIBUTE" => positional.push(AttributeDecl {
                    name: first_arg()?,
                    path: args.get(1).map(PathBuf::from),
                }),
                "STRUCTURE" => structural.push(AttributeDecl {
                    name: first_arg()?,
                    path: args.get(1).map(PathBuf::from),
                }),
                "ALIGNED" => aligned.push(first_arg()?),
                other => {
                    debug!(keyword = %other, line_no, "RegistryEntry::parse: ignoring unknown declaration");
                }
            }
        }

        let home = home.ok_or_else(|| err(0, "missing HOME declaration".to_string()))?;
        let id = match id {
            Some(id) => id,
            None => path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .ok_or_else(|| err(0, "missing ID declaration".to_string()))?,
        };

        Ok(Self {
            id,
            name,
            home,
            info,
            positional,
            structural,
            aligned,
            properties,
        })
    }

    /// Character set declared by the `charset` property
    pub fn charset(&self) -> &str {
        self.properties.get("charset").map(String::as_str).unwrap_or("latin1")
    }

    /// Find a positional attribute declaration by name
    pub fn positional_decl(&self, name: &str) -> Option<&AttributeDecl> {
        self.positional.iter().find(|a| a.name == name)
    }

    /// Find a structural attribute declaration by name
    pub fn structural_decl(&self, name: &str) -> Option<&AttributeDecl> {
        self.structural.iter().find(|a| a.name == name)
    }
}

/// A registry directory
#[derive(Debug, Clone)]
pub struct Registry {
    dir: PathBuf,
}

impl Registry {
    /// Open a registry directory
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(CorpusError::RegistryNotFound(dir));
        }
        debug!(?dir, "Registry::open: opened");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load the registry entry for a corpus (case-insensitive)
    pub fn entry(&self, corpus: &str) -> Result<RegistryEntry> {
        let path = self.dir.join(corpus.to_lowercase());
        if !path.is_file() {
            return Err(CorpusError::CorpusNotFound {
                name: corpus.to_string(),
                registry: self.dir.clone(),
            });
        }
        let content = fs::read_to_string(&path).map_err(|e| CorpusError::io(&path, e))?;
        RegistryEntry::parse(&path, &content)
    }

    /// List corpus ids declared in this registry
    pub fn list(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(|e| CorpusError::io(&self.dir, e))? {
            let entry = entry.map_err(|e| CorpusError::io(&self.dir, e))?;
            if entry.path().is_file()
                && let Some(name) = entry.file_name().to_str()
                && !name.starts_with('.')
            {
                ids.push(name.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Split a registry line into whitespace-separated tokens, honouring double
/// quotes and stopping at an unquoted `#`
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in line.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            '#' if !in_quotes => break,
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        tokens.push(current);
    }
    tokens
}
