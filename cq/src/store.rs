//! Attribute store abstraction over corpus data
//!
//! The concordance builder only needs two kinds of lookups: token strings for
//! a range of positions, and the span enclosing a position. [`cwb_cl::Corpus`]
//! provides both from the files on disk.

use std::ops::Range;

use cwb_cl::{Corpus, CorpusError, PositionalAttribute, Span, StructuralAttribute};

/// Token values addressable by corpus position
pub trait PositionalLookup {
    /// Values for `range`, clamped to the corpus size
    fn values(&self, range: Range<usize>) -> Result<Vec<String>, CorpusError>;
}

/// Regions addressable by any position inside them
pub trait SpanLookup {
    /// Span enclosing `position`, or `None` outside every region
    fn find_pos(&self, position: usize) -> Result<Option<Span>, CorpusError>;
}

/// Source of named positional and structural attributes
pub trait AttributeStore {
    type Positional: PositionalLookup;
    type Structural: SpanLookup;

    fn positional(&self, name: &str) -> Result<Self::Positional, CorpusError>;

    fn structural(&self, name: &str) -> Result<Self::Structural, CorpusError>;
}

impl PositionalLookup for PositionalAttribute {
    fn values(&self, range: Range<usize>) -> Result<Vec<String>, CorpusError> {
        PositionalAttribute::values(self, range)
    }
}

impl SpanLookup for StructuralAttribute {
    fn find_pos(&self, position: usize) -> Result<Option<Span>, CorpusError> {
        StructuralAttribute::find_pos(self, position)
    }
}

impl AttributeStore for Corpus {
    type Positional = PositionalAttribute;
    type Structural = StructuralAttribute;

    fn positional(&self, name: &str) -> Result<PositionalAttribute, CorpusError> {
        Corpus::positional(self, name)
    }

    fn structural(&self, name: &str) -> Result<StructuralAttribute, CorpusError> {
        Corpus::structural(self, name)
    }
}
