//! Document sources feeding the streaming collection filler.
//!
//! A source is asked for documents until it runs dry. It may know the final
//! document count upfront ([`Start::Expected`]) or only learn it at
//! exhaustion ([`Start::Unknown`]).

use crate::{
    error::SourceError,
    keys::{document_key, document_sha},
    random::RandomSource,
};
use model::documents::{Doc, SingleField};
use serde_json::Value;
use std::{fs, path::Path};

/// Outcome of preparing a source against the current collection count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Start {
    Expected(u64),
    Unknown,
    /// Everything the source could produce is already stored.
    Done,
}

/// Documents produced by one step of a source, with their payload size.
#[derive(Debug, Default)]
pub struct Chunk {
    pub bytes: u64,
    pub docs: Vec<Value>,
}

/// `count` single-field documents sharing `size` bytes equally.
#[derive(Debug)]
pub struct EqualLength {
    count: u64,
    size: u64,
    each: u64,
    random: RandomSource,
}

impl EqualLength {
    pub fn new(count: u64, size: u64, random: RandomSource) -> Self {
        Self {
            count,
            size,
            each: 0,
            random,
        }
    }
}

/// Whitespace separated `count size` pairs, one chunk per pair.
#[derive(Debug)]
pub struct FilePairs {
    tokens: std::vec::IntoIter<String>,
    random: RandomSource,
}

impl FilePairs {
    pub fn open(path: &Path, random: RandomSource) -> Result<Self, SourceError> {
        let text = fs::read_to_string(path)?;
        Ok(Self::from_text(&text, random))
    }

    pub fn from_text(text: &str, random: RandomSource) -> Self {
        let tokens: Vec<String> = text.split_whitespace().map(str::to_owned).collect();
        Self {
            tokens: tokens.into_iter(),
            random,
        }
    }

    /// Next positive number; `None` at the end of input or on zero.
    fn number(&mut self) -> Result<Option<u64>, SourceError> {
        let Some(token) = self.tokens.next() else {
            return Ok(None);
        };
        let value: u64 = token
            .parse()
            .map_err(|_| SourceError::InvalidToken { token })?;
        Ok((value > 0).then_some(value))
    }
}

/// Deterministic documents for the sequence range
/// `first_seq..first_seq + count`.
#[derive(Debug)]
pub struct KeyedDocuments {
    pub first_seq: u64,
    pub count: u64,
    pub payload_size: usize,
    pub with_geo: bool,
    pub words: usize,
    random: RandomSource,
}

impl KeyedDocuments {
    pub fn new(
        first_seq: u64,
        count: u64,
        payload_size: usize,
        with_geo: bool,
        words: usize,
        random: RandomSource,
    ) -> Self {
        Self {
            first_seq,
            count,
            payload_size,
            with_geo,
            words,
            random,
        }
    }

    /// The document for sequence number `seq`.
    pub fn document(&mut self, seq: u64) -> Doc {
        Doc {
            key: document_key(seq),
            sha: document_sha(seq),
            payload: self.random.string_with_spaces(self.payload_size),
            geo: self.with_geo.then(|| self.random.polygon()),
            words: if self.words > 0 {
                self.random.words(self.words)
            } else {
                String::new()
            },
        }
    }
}

pub enum DocumentSource {
    EqualLength(EqualLength),
    FromFile(FilePairs),
    Keyed(KeyedDocuments),
}

impl DocumentSource {
    pub fn init(&mut self, current_count: u64) -> Result<Start, SourceError> {
        match self {
            DocumentSource::EqualLength(source) => {
                if source.count == 0 {
                    return Err(SourceError::CountZero);
                }
                source.each = source.size / source.count;
                Ok(Start::Expected(source.count))
            }
            DocumentSource::FromFile(source) => {
                // One pair per stored document is skipped so reruns resume.
                for _ in 0..current_count {
                    if source.tokens.next().is_none() || source.tokens.next().is_none() {
                        return Ok(Start::Done);
                    }
                }
                Ok(Start::Unknown)
            }
            DocumentSource::Keyed(source) => {
                if source.count == 0 {
                    return Err(SourceError::CountZero);
                }
                Ok(Start::Expected(source.count))
            }
        }
    }

    /// Next documents given how many are stored or already produced;
    /// `None` once the source is exhausted.
    pub fn next_chunk(&mut self, current_count: u64) -> Result<Option<Chunk>, SourceError> {
        match self {
            DocumentSource::EqualLength(source) => {
                if current_count >= source.count {
                    return Ok(None);
                }
                let doc = SingleField {
                    value: source.random.string(source.each as usize),
                };
                Ok(Some(Chunk {
                    bytes: source.each,
                    docs: vec![serde_json::to_value(doc)?],
                }))
            }
            DocumentSource::FromFile(source) => {
                let Some(count) = source.number()? else {
                    return Ok(None);
                };
                let Some(size) = source.number()? else {
                    return Ok(None);
                };
                let mut docs = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let doc = SingleField {
                        value: source.random.string(size as usize),
                    };
                    docs.push(serde_json::to_value(doc)?);
                }
                Ok(Some(Chunk {
                    bytes: count * size,
                    docs,
                }))
            }
            DocumentSource::Keyed(source) => {
                if current_count >= source.count {
                    return Ok(None);
                }
                let doc = source.document(source.first_seq + current_count);
                Ok(Some(Chunk {
                    bytes: source.payload_size as u64,
                    docs: vec![serde_json::to_value(doc)?],
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn random() -> RandomSource {
        RandomSource::new(1)
    }

    #[test]
    fn equal_length_splits_size() {
        let mut source = DocumentSource::EqualLength(EqualLength::new(4, 100, random()));
        assert_eq!(source.init(0).unwrap(), Start::Expected(4));

        let chunk = source.next_chunk(0).unwrap().unwrap();
        assert_eq!(chunk.bytes, 25);
        assert_eq!(chunk.docs[0]["a"].as_str().unwrap().len(), 25);
        assert!(source.next_chunk(4).unwrap().is_none());
    }

    #[test]
    fn equal_length_rejects_zero_count() {
        let mut source = DocumentSource::EqualLength(EqualLength::new(0, 100, random()));
        assert!(matches!(source.init(0), Err(SourceError::CountZero)));
    }

    #[test]
    fn file_pairs_skip_stored_and_stop_on_zero() {
        let mut source = DocumentSource::FromFile(FilePairs::from_text(
            "1 10\n3 5\n2 4 0 7 9 9",
            random(),
        ));
        assert_eq!(source.init(1).unwrap(), Start::Unknown);

        let chunk = source.next_chunk(1).unwrap().unwrap();
        assert_eq!(chunk.docs.len(), 3);
        assert_eq!(chunk.bytes, 15);
        assert_eq!(source.next_chunk(4).unwrap().unwrap().docs.len(), 2);
        assert!(source.next_chunk(6).unwrap().is_none());
    }

    #[test]
    fn file_pairs_eof_during_skip_is_done() {
        let mut source = DocumentSource::FromFile(FilePairs::from_text("1 10", random()));
        assert_eq!(source.init(2).unwrap(), Start::Done);
    }

    #[test]
    fn file_pairs_reject_garbage() {
        let mut source = DocumentSource::FromFile(FilePairs::from_text("x 10", random()));
        assert!(matches!(
            source.next_chunk(0),
            Err(SourceError::InvalidToken { .. })
        ));
    }

    #[test]
    fn file_pairs_open_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "2 8").unwrap();

        let mut source = DocumentSource::FromFile(FilePairs::open(file.path(), random()).unwrap());
        assert_eq!(source.init(0).unwrap(), Start::Unknown);
        assert_eq!(source.next_chunk(0).unwrap().unwrap().bytes, 16);
    }

    #[test]
    fn keyed_documents_are_deterministic_in_key() {
        let mut source = KeyedDocuments::new(10, 5, 20, true, 2, random());
        let doc = source.document(11);

        assert_eq!(doc.key, document_key(11));
        assert_eq!(doc.sha, document_sha(11));
        assert_eq!(doc.payload.len(), 20);
        assert!(doc.geo.is_some());
        assert!(!doc.words.is_empty());

        let mut plain = KeyedDocuments::new(0, 1, 4, false, 0, random());
        let value = serde_json::to_value(plain.document(0)).unwrap();
        assert!(value.get("geo").is_none());
        assert!(value.get("words").is_none());
    }
}
