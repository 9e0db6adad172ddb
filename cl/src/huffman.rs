//! Huffman-compressed token streams, as left behind by `cwb-huffcode`
//!
//! A compressed positional attribute `word` replaces `word.corpus` with:
//!
//! - `word.hcd`: the code descriptor. Token count, lexicon size, shortest and
//!   longest code length, three tables of `MAX_CODE_LEN` entries (number of
//!   codes per length, index of the first symbol per length, first code per
//!   length), then the lexicon ids ordered by code.
//! - `word.huf`: the codes as an MSB-first bit stream. The stream is padded to
//!   a byte boundary every `SYNC_INTERVAL` tokens.
//! - `word.huf.syn`: byte offset into `word.huf` of each padded block.
//!
//! The code is canonical: codes of one length are consecutive integers
//! starting at that length's first code, and a prefix of a longer code always
//! compares below the first code of the prefix length.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::path::Path;

use crate::error::CorpusError;
use crate::format::{decode_ints, encode_ints};

type Result<T> = std::result::Result<T, CorpusError>;

/// Tokens per independently decodable block
pub const SYNC_INTERVAL: usize = 128;

/// Size of the per-length tables in a code descriptor
pub const MAX_CODE_LEN: usize = 32;

const HEADER_INTS: usize = 4 + 3 * MAX_CODE_LEN;

/// A canonical Huffman code over lexicon ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanCode {
    /// Number of tokens in the compressed stream
    size: usize,
    min_len: usize,
    max_len: usize,
    lcount: [u32; MAX_CODE_LEN],
    symindex: [u32; MAX_CODE_LEN],
    min_code: [u32; MAX_CODE_LEN],
    symbols: Vec<u32>,
}

impl HuffmanCode {
    /// Parse a `.hcd` file
    pub fn parse(path: &Path, bytes: &[u8]) -> Result<Self> {
        let ints = decode_ints(path, bytes)?;
        if ints.len() < HEADER_INTS {
            return Err(CorpusError::corrupt(path, "code descriptor is truncated"));
        }
        let length = ints[1] as usize;
        let min_len = ints[2] as usize;
        let max_len = ints[3] as usize;
        if ints.len() != HEADER_INTS + length {
            return Err(CorpusError::corrupt(
                path,
                format!("expected {} symbols, found {}", length, ints.len() - HEADER_INTS),
            ));
        }
        if min_len > max_len || max_len >= MAX_CODE_LEN {
            return Err(CorpusError::corrupt(
                path,
                format!("bad code lengths {}..{}", min_len, max_len),
            ));
        }

        let table = |n: usize| {
            let mut t = [0u32; MAX_CODE_LEN];
            t.copy_from_slice(&ints[4 + n * MAX_CODE_LEN..4 + (n + 1) * MAX_CODE_LEN]);
            t
        };
        Ok(Self {
            size: ints[0] as usize,
            min_len,
            max_len,
            lcount: table(0),
            symindex: table(1),
            min_code: table(2),
            symbols: ints[HEADER_INTS..].to_vec(),
        })
    }

    /// Build a code for a token stream of lexicon ids `0..lexicon_size`
    pub fn build(ids: &[u32], lexicon_size: usize) -> Result<Self> {
        let mut freqs = vec![0u64; lexicon_size];
        for &id in ids {
            let slot = freqs
                .get_mut(id as usize)
                .ok_or_else(|| CorpusError::corrupt("<stream>", format!("lexicon id {} out of range", id)))?;
            *slot += 1;
        }

        let lengths = code_lengths(&freqs);
        let max_len = lengths.iter().copied().max().unwrap_or(0);
        if max_len >= MAX_CODE_LEN {
            return Err(CorpusError::corrupt(
                "<stream>",
                format!("code length {} exceeds {}", max_len, MAX_CODE_LEN - 1),
            ));
        }
        let min_len = lengths.iter().copied().filter(|&l| l > 0).min().unwrap_or(0);

        let mut lcount = [0u32; MAX_CODE_LEN];
        for &len in lengths.iter().filter(|&&l| l > 0) {
            lcount[len] += 1;
        }

        let mut min_code = [0u32; MAX_CODE_LEN];
        for len in (0..max_len).rev() {
            min_code[len] = (min_code[len + 1] + lcount[len + 1]).div_ceil(2);
        }

        let mut symindex = [0u32; MAX_CODE_LEN];
        let mut next = 0u32;
        for len in 0..MAX_CODE_LEN {
            symindex[len] = next;
            next += lcount[len];
        }

        let mut symbols: Vec<u32> = (0..lexicon_size as u32).filter(|&id| lengths[id as usize] > 0).collect();
        symbols.sort_by_key(|&id| (lengths[id as usize], id));

        Ok(Self {
            size: ids.len(),
            min_len,
            max_len,
            lcount,
            symindex,
            min_code,
            symbols,
        })
    }

    /// Number of tokens in the stream this code describes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of blocks in the sync table
    pub fn block_count(&self) -> usize {
        self.size.div_ceil(SYNC_INTERVAL)
    }

    /// Serialize as a `.hcd` file
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut ints = vec![
            self.size as u32,
            self.symbols.len() as u32,
            self.min_len as u32,
            self.max_len as u32,
        ];
        ints.extend_from_slice(&self.lcount);
        ints.extend_from_slice(&self.symindex);
        ints.extend_from_slice(&self.min_code);
        ints.extend_from_slice(&self.symbols);
        encode_ints(&ints)
    }

    /// Decode the first `count` ids of a block whose bits start at `data[0]`
    pub fn decode_block(&self, data: &[u8], count: usize) -> Option<Vec<u32>> {
        let mut bits = BitReader::new(data);
        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            let mut len = self.min_len;
            let mut v = bits.read(len)?;
            while v < self.min_code[len] {
                len += 1;
                if len > self.max_len {
                    return None;
                }
                v = (v << 1) | bits.read(1)?;
            }
            let rank = v - self.min_code[len];
            if rank >= self.lcount[len] {
                return None;
            }
            ids.push(*self.symbols.get((self.symindex[len] + rank) as usize)?);
        }
        Some(ids)
    }

    /// Encode a token stream; returns the `.huf` bytes and the block offsets
    pub fn encode(&self, ids: &[u32]) -> Result<(Vec<u8>, Vec<u32>)> {
        let mut codes = vec![None; self.symbols.len().max(ids.iter().map(|&i| i as usize + 1).max().unwrap_or(0))];
        for len in self.min_len..=self.max_len {
            let first = self.symindex[len] as usize;
            for rank in 0..self.lcount[len] {
                let id = self.symbols[first + rank as usize] as usize;
                if let Some(slot) = codes.get_mut(id) {
                    *slot = Some((self.min_code[len] + rank, len));
                }
            }
        }

        let mut bits = BitWriter::default();
        let mut sync = Vec::with_capacity(self.block_count());
        for (n, &id) in ids.iter().enumerate() {
            if n % SYNC_INTERVAL == 0 {
                bits.align();
                sync.push(bits.bytes.len() as u32);
            }
            let (code, len) = codes
                .get(id as usize)
                .copied()
                .flatten()
                .ok_or_else(|| CorpusError::corrupt("<stream>", format!("no code for lexicon id {}", id)))?;
            bits.write(code, len);
        }
        bits.align();
        Ok((bits.bytes, sync))
    }
}

/// Huffman code lengths per symbol; symbols with zero frequency get length 0
fn code_lengths(freqs: &[u64]) -> Vec<usize> {
    let used: Vec<usize> = (0..freqs.len()).filter(|&i| freqs[i] > 0).collect();
    let mut lengths = vec![0; freqs.len()];
    match used.as_slice() {
        [] => return lengths,
        [only] => {
            lengths[*only] = 1;
            return lengths;
        }
        _ => {}
    }

    // nodes 0..used.len() are leaves; internal nodes are appended
    let mut parent: Vec<Option<usize>> = vec![None; used.len()];
    let mut heap: BinaryHeap<Reverse<(u64, usize)>> =
        used.iter().enumerate().map(|(node, &sym)| Reverse((freqs[sym], node))).collect();
    while let (Some(Reverse((fa, a))), Some(Reverse((fb, b)))) = (heap.pop(), heap.pop()) {
        let node = parent.len();
        parent.push(None);
        parent[a] = Some(node);
        parent[b] = Some(node);
        heap.push(Reverse((fa + fb, node)));
    }

    for (leaf, &sym) in used.iter().enumerate() {
        let mut depth = 0;
        let mut node = leaf;
        while let Some(up) = parent[node] {
            depth += 1;
            node = up;
        }
        lengths[sym] = depth;
    }
    lengths
}

struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn read(&mut self, n: usize) -> Option<u32> {
        let mut v = 0u32;
        for _ in 0..n {
            let byte = *self.data.get(self.pos / 8)?;
            let bit = (byte >> (7 - self.pos % 8)) & 1;
            v = (v << 1) | bit as u32;
            self.pos += 1;
        }
        Some(v)
    }
}

#[derive(Default)]
struct BitWriter {
    bytes: Vec<u8>,
    current: u8,
    filled: u32,
}

impl BitWriter {
    fn write(&mut self, code: u32, len: usize) {
        for i in (0..len).rev() {
            self.current = (self.current << 1) | ((code >> i) & 1) as u8;
            self.filled += 1;
            if self.filled == 8 {
                self.bytes.push(self.current);
                self.current = 0;
                self.filled = 0;
            }
        }
    }

    fn align(&mut self) {
        if self.filled > 0 {
            self.bytes.push(self.current << (8 - self.filled));
            self.current = 0;
            self.filled = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_code_for_three_symbols() {
        // id 0 is most frequent and gets the single short code
        let code = HuffmanCode::build(&[0, 0, 0, 0, 1, 2], 3).unwrap();
        assert_eq!((code.min_len, code.max_len), (1, 2));
        assert_eq!(code.min_code[1], 1);
        assert_eq!(code.min_code[2], 0);
        assert_eq!(code.symbols, vec![0, 1, 2]);

        // "1" "00" "01" "1"
        let (huf, sync) = code.encode(&[0, 1, 2, 0]).unwrap();
        assert_eq!(huf, vec![0b1000_1100]);
        assert_eq!(sync, vec![0]);
        assert_eq!(code.decode_block(&huf, 4).unwrap(), vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_single_symbol_lexicon() {
        let code = HuffmanCode::build(&[0, 0, 0], 1).unwrap();
        let (huf, _) = code.encode(&[0, 0, 0]).unwrap();
        assert_eq!(code.decode_block(&huf, 3).unwrap(), vec![0, 0, 0]);
    }

    #[test]
    fn test_blocks_are_byte_aligned() {
        let ids: Vec<u32> = (0..300).map(|i| (i * 7 % 11) as u32).collect();
        let code = HuffmanCode::build(&ids, 11).unwrap();
        let (huf, sync) = code.encode(&ids).unwrap();

        assert_eq!(sync.len(), 3);
        assert_eq!(code.block_count(), 3);
        let second = &huf[sync[1] as usize..sync[2] as usize];
        assert_eq!(code.decode_block(second, 5).unwrap(), ids[128..133].to_vec());
    }

    #[test]
    fn test_descriptor_bytes_parse_back() {
        let code = HuffmanCode::build(&[3, 1, 1, 2, 0, 1], 4).unwrap();
        let parsed = HuffmanCode::parse(Path::new("word.hcd"), &code.to_bytes()).unwrap();
        assert_eq!(parsed, code);
        assert_eq!(parsed.size(), 6);
    }

    #[test]
    fn test_truncated_descriptor_is_corrupt() {
        let bytes = HuffmanCode::build(&[0, 1], 2).unwrap().to_bytes();
        let result = HuffmanCode::parse(Path::new("word.hcd"), &bytes[..bytes.len() - 4]);
        assert!(matches!(result, Err(CorpusError::Corrupt { .. })));
    }

    #[test]
    fn test_decode_past_end_of_data() {
        let code = HuffmanCode::build(&[0, 0, 1, 2], 3).unwrap();
        assert!(code.decode_block(&[], 1).is_none());
    }
}
