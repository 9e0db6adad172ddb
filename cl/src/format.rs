//! Low-level helpers for CWB data files
//!
//! Every integer in a CWB data file is a 32-bit big-endian value. Strings
//! (lexicon entries, structure values) are stored NUL-terminated back to back
//! and addressed by byte offset.

use encoding_rs::{
    Encoding, ISO_8859_2, ISO_8859_3, ISO_8859_4, ISO_8859_5, ISO_8859_6, ISO_8859_7, ISO_8859_8, ISO_8859_10,
    ISO_8859_13, ISO_8859_14, ISO_8859_15, WINDOWS_1254,
};
use std::fs;
use std::path::Path;

use crate::error::CorpusError;

/// Character set of the strings stored in a corpus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    /// ISO-8859-1, decoded byte-for-byte
    Latin1,
    /// Another single-byte set from the CWB charset list
    Legacy(&'static Encoding),
}

impl Charset {
    /// Map a registry `charset` property to a decoder
    pub fn from_name(name: &str) -> Result<Self, CorpusError> {
        let charset = match name.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" | "ascii" => Charset::Utf8,
            "latin1" | "iso-8859-1" => Charset::Latin1,
            "latin2" => Charset::Legacy(ISO_8859_2),
            "latin3" => Charset::Legacy(ISO_8859_3),
            "latin4" => Charset::Legacy(ISO_8859_4),
            "cyrillic" => Charset::Legacy(ISO_8859_5),
            "arabic" => Charset::Legacy(ISO_8859_6),
            "greek" => Charset::Legacy(ISO_8859_7),
            "hebrew" => Charset::Legacy(ISO_8859_8),
            // ISO-8859-9 is not in the WHATWG set; windows-1254 is its superset
            "latin5" => Charset::Legacy(WINDOWS_1254),
            "latin6" => Charset::Legacy(ISO_8859_10),
            "latin7" => Charset::Legacy(ISO_8859_13),
            "latin8" => Charset::Legacy(ISO_8859_14),
            "latin9" => Charset::Legacy(ISO_8859_15),
            _ => return Err(CorpusError::UnknownCharset(name.to_string())),
        };
        Ok(charset)
    }

    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Charset::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Charset::Latin1 => bytes.iter().map(|&b| b as char).collect(),
            Charset::Legacy(encoding) => encoding.decode_without_bom_handling(bytes).0.into_owned(),
        }
    }
}

/// Read a whole file, attributing failures to its path
pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>, CorpusError> {
    fs::read(path).map_err(|e| CorpusError::io(path, e))
}

/// Decode a buffer of big-endian 32-bit integers
pub(crate) fn decode_ints(path: &Path, bytes: &[u8]) -> Result<Vec<u32>, CorpusError> {
    if bytes.len() % 4 != 0 {
        return Err(CorpusError::corrupt(
            path,
            format!("length {} is not a multiple of 4", bytes.len()),
        ));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Encode integers as a big-endian table
pub(crate) fn encode_ints(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

/// Decode a buffer of big-endian integer pairs
pub(crate) fn decode_pairs(path: &Path, bytes: &[u8]) -> Result<Vec<(u32, u32)>, CorpusError> {
    let ints = decode_ints(path, bytes)?;
    if ints.len() % 2 != 0 {
        return Err(CorpusError::corrupt(path, "odd number of integers in pair table"));
    }
    Ok(ints.chunks_exact(2).map(|p| (p[0], p[1])).collect())
}

/// Fetch the NUL-terminated string starting at `offset`
pub(crate) fn string_at<'a>(path: &Path, data: &'a [u8], offset: usize) -> Result<&'a [u8], CorpusError> {
    let tail = data
        .get(offset..)
        .ok_or_else(|| CorpusError::corrupt(path, format!("string offset {} past end of file", offset)))?;
    let len = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
    Ok(&tail[..len])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ints_big_endian() {
        let bytes = [0, 0, 0, 1, 0, 0, 1, 0];
        assert_eq!(decode_ints(Path::new("x"), &bytes).unwrap(), vec![1, 256]);
    }

    #[test]
    fn test_decode_ints_rejects_truncated() {
        let result = decode_ints(Path::new("x.corpus"), &[0, 0, 1]);
        assert!(matches!(result, Err(CorpusError::Corrupt { .. })));
    }

    #[test]
    fn test_decode_pairs() {
        let bytes = [0, 0, 0, 2, 0, 0, 0, 5];
        assert_eq!(decode_pairs(Path::new("x.rng"), &bytes).unwrap(), vec![(2, 5)]);
        assert!(decode_pairs(Path::new("x.rng"), &bytes[..4]).is_err());
    }

    #[test]
    fn test_string_at() {
        let data = b"cat\0dog\0tail";
        assert_eq!(string_at(Path::new("x"), data, 0).unwrap(), b"cat");
        assert_eq!(string_at(Path::new("x"), data, 4).unwrap(), b"dog");
        assert_eq!(string_at(Path::new("x"), data, 8).unwrap(), b"tail");
        assert!(string_at(Path::new("x"), data, 99).is_err());
    }

    #[test]
    fn test_charset_decode() {
        assert_eq!(Charset::from_name("UTF8").unwrap(), Charset::Utf8);
        assert_eq!(Charset::from_name("latin1").unwrap(), Charset::Latin1);
        assert_eq!(Charset::Latin1.decode(&[0x63, 0xe9]), "cé");
        assert_eq!(Charset::Utf8.decode("貓".as_bytes()), "貓");
    }

    #[test]
    fn test_legacy_charsets_use_their_own_tables() {
        assert_eq!(Charset::from_name("latin2").unwrap().decode(&[0xb1]), "ą");
        assert_eq!(Charset::from_name("latin9").unwrap().decode(&[0xa4]), "€");
        assert_eq!(Charset::from_name("cyrillic").unwrap().decode(&[0xd4]), "д");
        assert_eq!(Charset::from_name("Greek").unwrap().decode(&[0xe1]), "α");
        // same byte, three different characters
        assert_eq!(Charset::Latin1.decode(&[0xa4]), "¤");
    }

    #[test]
    fn test_unknown_charset_is_error() {
        let result = Charset::from_name("ebcdic");
        assert!(matches!(result, Err(CorpusError::UnknownCharset(name)) if name == "ebcdic"));
    }
}
