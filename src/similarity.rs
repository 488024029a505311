//! Bag-of-words similarity index.
//!
//! Every card's combined feature string is turned into raw term counts over a
//! vocabulary learned from the whole catalog, and the pairwise cosine
//! similarity of those count vectors is stored as a symmetric matrix indexed
//! by card name.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::codec::{self, CanonicalDecode, CanonicalEncode, CodecError, Hash32};
use crate::features::{combined_features, tokenize};

const ARTIFACT_MAGIC: [u8; 8] = *b"OMENSIM\0";
const ARTIFACT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum IndexError {
    /// No card produced a single term, so similarity is undefined.
    #[error("feature corpus yields an empty vocabulary")]
    EmptyVocabulary,

    /// The matrix was built from a different catalog and must be rebuilt.
    #[error(
        "similarity index does not match the catalog ({index_cards} indexed cards, {catalog_cards} catalog cards); rebuild it"
    )]
    StaleIndex {
        index_cards: usize,
        catalog_cards: usize,
    },

    #[error("{names} card names for {documents} feature documents")]
    ShapeMismatch { names: usize, documents: usize },

    #[error("failed to access similarity index {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid similarity index: {0}")]
    Codec(#[from] CodecError),
}

/// Raw term counts for a corpus of documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermCounts {
    /// Terms in lexicographic order; a term's position is its column.
    vocabulary: Vec<String>,
    /// Per document, `(column, count)` pairs sorted by column.
    rows: Vec<Vec<(usize, u64)>>,
}

impl TermCounts {
    /// Learns the vocabulary from `documents` and counts every term.
    pub fn fit<S: AsRef<str>>(documents: &[S]) -> Result<Self, IndexError> {
        let tokenized: Vec<Vec<String>> = documents
            .iter()
            .map(|document| tokenize(document.as_ref()))
            .collect();

        let mut columns: BTreeMap<&str, usize> = BTreeMap::new();
        for tokens in &tokenized {
            for token in tokens {
                columns.entry(token.as_str()).or_insert(0);
            }
        }
        if columns.is_empty() {
            return Err(IndexError::EmptyVocabulary);
        }
        for (column, slot) in columns.values_mut().enumerate() {
            *slot = column;
        }

        let rows = tokenized
            .iter()
            .map(|tokens| {
                let mut counts: BTreeMap<usize, u64> = BTreeMap::new();
                for token in tokens {
                    *counts.entry(columns[token.as_str()]).or_insert(0) += 1;
                }
                counts.into_iter().collect()
            })
            .collect();
        let vocabulary = columns.keys().map(|term| term.to_string()).collect();

        Ok(Self { vocabulary, rows })
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn row(&self, document: usize) -> &[(usize, u64)] {
        &self.rows[document]
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Pairwise cosine similarity, upper triangle packed row by row.
    ///
    /// Dot products are accumulated through per-term posting lists so only
    /// pairs sharing a term are visited.
    fn cosine_upper_triangle(&self) -> Vec<f64> {
        let n = self.rows.len();
        let mut postings: Vec<Vec<(usize, u64)>> = vec![Vec::new(); self.vocabulary.len()];
        for (doc, row) in self.rows.iter().enumerate() {
            for &(column, count) in row {
                postings[column].push((doc, count));
            }
        }
        let norms: Vec<u64> = self
            .rows
            .iter()
            .map(|row| row.iter().map(|&(_, count)| count * count).sum())
            .collect();

        let mut packed = vec![0.0f64; packed_len(n)];
        let mut dots = vec![0u64; n];
        let mut touched = Vec::new();
        for i in 0..n {
            for &(column, count) in &self.rows[i] {
                let posting = &postings[column];
                let start = posting.partition_point(|&(doc, _)| doc <= i);
                for &(j, other) in &posting[start..] {
                    if dots[j] == 0 {
                        touched.push(j);
                    }
                    dots[j] += count * other;
                }
            }

            packed[packed_offset(n, i, i)] = 1.0;
            for &j in &touched {
                packed[packed_offset(n, i, j)] = cosine(dots[j], norms[i], norms[j]);
                dots[j] = 0;
            }
            touched.clear();
        }
        packed
    }
}

/// Cosine of two count vectors from their dot product and squared norms.
///
/// Identical vectors give exactly `1.0`: the squared norms equal the dot
/// product, and `sqrt(d * d)` is exact for the integer ranges involved.
fn cosine(dot: u64, norm_a: u64, norm_b: u64) -> f64 {
    if dot == 0 || norm_a == 0 || norm_b == 0 {
        return 0.0;
    }
    let denominator = ((norm_a as f64) * (norm_b as f64)).sqrt();
    (dot as f64 / denominator).clamp(0.0, 1.0)
}

fn packed_len(n: usize) -> usize {
    n * (n + 1) / 2
}

/// Offset of `(i, j)` with `i <= j` in a row-major packed upper triangle.
fn packed_offset(n: usize, i: usize, j: usize) -> usize {
    i * (2 * n - i + 1) / 2 + (j - i)
}

/// Fingerprint of a catalog: SHA-256 over its names, each NUL terminated.
pub fn catalog_fingerprint<'a>(names: impl IntoIterator<Item = &'a str>) -> Hash32 {
    let mut payload = Vec::new();
    for name in names {
        payload.extend_from_slice(name.as_bytes());
        payload.push(0);
    }
    Hash32::of(&payload)
}

/// Symmetric cosine-similarity matrix indexed by card name on both axes.
///
/// Immutable once built. Only the upper triangle is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    names: Vec<String>,
    positions: HashMap<String, usize>,
    packed: Vec<f64>,
}

impl SimilarityMatrix {
    /// Vectorizes `documents` and computes their pairwise similarity.
    ///
    /// `names[i]` labels `documents[i]`. Names are expected to be unique.
    pub fn from_documents<S: AsRef<str>>(
        names: Vec<String>,
        documents: &[S],
    ) -> Result<Self, IndexError> {
        if names.len() != documents.len() {
            return Err(IndexError::ShapeMismatch {
                names: names.len(),
                documents: documents.len(),
            });
        }
        let counts = TermCounts::fit(documents)?;
        debug!(
            documents = counts.len(),
            vocabulary = counts.vocabulary().len(),
            "vectorized feature corpus"
        );
        let packed = counts.cosine_upper_triangle();
        Ok(Self::from_parts(names, packed))
    }

    fn from_parts(names: Vec<String>, packed: Vec<f64>) -> Self {
        let positions = names
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx))
            .collect();
        Self {
            names,
            positions,
            packed,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Similarity between the cards at positions `i` and `j`.
    pub fn value(&self, i: usize, j: usize) -> f64 {
        let (low, high) = if i <= j { (i, j) } else { (j, i) };
        self.packed[packed_offset(self.names.len(), low, high)]
    }

    /// Similarity between two cards by name.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        Some(self.value(self.position(a)?, self.position(b)?))
    }

    /// The full similarity row of `name`, in catalog order.
    pub fn row(&self, name: &str) -> Option<Vec<f64>> {
        let i = self.position(name)?;
        Some((0..self.len()).map(|j| self.value(i, j)).collect())
    }

    pub fn fingerprint(&self) -> Hash32 {
        catalog_fingerprint(self.names.iter().map(String::as_str))
    }

    /// Fails with [`IndexError::StaleIndex`] unless the matrix was built from
    /// exactly this catalog's names, in this order.
    pub fn ensure_matches(&self, catalog: &Catalog) -> Result<(), IndexError> {
        if self.len() == catalog.len() && self.fingerprint() == catalog_fingerprint(catalog.names())
        {
            return Ok(());
        }
        Err(IndexError::StaleIndex {
            index_cards: self.len(),
            catalog_cards: catalog.len(),
        })
    }

    /// Writes the matrix to `path` in the canonical artifact format.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), IndexError> {
        let path = path.as_ref();
        fs::write(path, self.to_bytes()).map_err(|source| IndexError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), cards = self.len(), "saved similarity index");
        Ok(())
    }

    /// Reads a matrix previously written by [`SimilarityMatrix::save`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| IndexError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let matrix = Self::from_bytes(&bytes)?;
        info!(path = %path.display(), cards = matrix.len(), "loaded similarity index");
        Ok(matrix)
    }

    /// Encodes the artifact: header, names, packed values, trailing checksum.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(64 + self.packed.len() * 8);
        body.extend_from_slice(&ARTIFACT_MAGIC);
        ARTIFACT_VERSION.encode(&mut body);
        self.fingerprint().encode(&mut body);
        self.names.encode(&mut body);
        self.packed.encode(&mut body);
        codec::seal(body)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut input = codec::unseal(bytes)?;
        if codec::read_exact::<8>(&mut input)? != ARTIFACT_MAGIC {
            return Err(CodecError::BadMagic);
        }
        let version = u32::decode(&mut input)?;
        if version != ARTIFACT_VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }
        let fingerprint = Hash32::decode(&mut input)?;
        let names = Vec::<String>::decode(&mut input)?;
        let packed = Vec::<f64>::decode(&mut input)?;
        if !input.is_empty() {
            return Err(CodecError::TrailingBytes(input.len()));
        }
        if packed.len() != packed_len(names.len()) {
            return Err(CodecError::Corrupt(format!(
                "{} values for {} cards",
                packed.len(),
                names.len()
            )));
        }
        let matrix = Self::from_parts(names, packed);
        if matrix.fingerprint() != fingerprint {
            return Err(CodecError::Corrupt("name fingerprint mismatch".to_string()));
        }
        Ok(matrix)
    }
}

/// Builds the similarity matrix for every card of the catalog.
pub fn build_index(catalog: &Catalog) -> Result<SimilarityMatrix, IndexError> {
    let documents: Vec<String> = catalog.entries().iter().map(combined_features).collect();
    let names = catalog.names().map(str::to_string).collect();
    let matrix = SimilarityMatrix::from_documents(names, &documents)?;
    info!(cards = matrix.len(), "built similarity index");
    Ok(matrix)
}

/// Loads the persisted matrix at `path`, or builds and saves it when the file
/// is missing, `rebuild` is set, or the stored matrix belongs to another catalog.
pub fn load_or_build(
    catalog: &Catalog,
    path: impl AsRef<Path>,
    rebuild: bool,
) -> Result<SimilarityMatrix, IndexError> {
    let path = path.as_ref();
    if !rebuild && path.exists() {
        let matrix = SimilarityMatrix::load(path)?;
        match matrix.ensure_matches(catalog) {
            Ok(()) => return Ok(matrix),
            Err(err) => warn!(path = %path.display(), %err, "rebuilding stale similarity index"),
        }
    }
    let matrix = build_index(catalog)?;
    matrix.save(path)?;
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn vocabulary_is_sorted_and_counts_are_raw() {
        let counts = TermCounts::fit(&["draw draw card", "card token"]).unwrap();
        assert_eq!(counts.vocabulary(), &["card", "draw", "token"]);
        assert_eq!(counts.row(0), &[(0, 1), (1, 2)]);
        assert_eq!(counts.row(1), &[(0, 1), (2, 1)]);
    }

    #[test]
    fn empty_corpus_is_an_error() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            TermCounts::fit(&empty),
            Err(IndexError::EmptyVocabulary)
        ));
    }

    #[test]
    fn single_character_tokens_do_not_form_a_vocabulary() {
        let result = SimilarityMatrix::from_documents(names(&["A", "B"]), &["a b c", "1 2"]);
        assert!(matches!(result, Err(IndexError::EmptyVocabulary)));
    }

    #[test]
    fn cosine_matches_hand_computation() {
        // [1, 2, 0] . [1, 0, 1] = 1; norms sqrt(5), sqrt(2).
        let matrix =
            SimilarityMatrix::from_documents(names(&["A", "B"]), &["draw draw card", "card token"])
                .unwrap();
        let expected = 1.0 / (5.0f64 * 2.0).sqrt();
        assert!((matrix.get("A", "B").unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn matrix_is_symmetric_with_unit_diagonal() {
        let matrix = SimilarityMatrix::from_documents(
            names(&["A", "B", "C", "D"]),
            &[
                "flying vigilance angel",
                "flying haste dragon dragon",
                "draw two cards",
                "x",
            ],
        )
        .unwrap();
        for a in matrix.names() {
            assert_eq!(matrix.get(a, a), Some(1.0));
            for b in matrix.names() {
                let ab = matrix.get(a, b).unwrap();
                assert_eq!(ab, matrix.get(b, a).unwrap());
                assert!((0.0..=1.0).contains(&ab));
            }
        }
        assert_eq!(matrix.get("A", "C"), Some(0.0));
        assert_eq!(matrix.get("D", "A"), Some(0.0));
    }

    #[test]
    fn identical_documents_are_exactly_similar() {
        let matrix = SimilarityMatrix::from_documents(
            names(&["A", "B", "C"]),
            &[
                "whenever creature dies draw card",
                "whenever creature dies draw card",
                "whenever land enters gain life",
            ],
        )
        .unwrap();
        assert_eq!(matrix.get("A", "B"), Some(1.0));
        assert!(matrix.get("A", "C").unwrap() < 1.0);
    }

    #[test]
    fn row_follows_catalog_order() {
        let matrix = SimilarityMatrix::from_documents(
            names(&["A", "B", "C"]),
            &["red red", "red blue", "green"],
        )
        .unwrap();
        let row = matrix.row("B").unwrap();
        assert_eq!(row.len(), 3);
        assert_eq!(row[1], 1.0);
        assert_eq!(row[0], matrix.get("A", "B").unwrap());
        assert_eq!(row[2], 0.0);
        assert!(matrix.row("Z").is_none());
    }

    #[test]
    fn artifact_round_trip_is_bit_identical() {
        let matrix = SimilarityMatrix::from_documents(
            names(&["A", "B", "C"]),
            &["one two three", "two three four", "three four five six"],
        )
        .unwrap();
        let decoded = SimilarityMatrix::from_bytes(&matrix.to_bytes()).unwrap();
        assert_eq!(decoded.names(), matrix.names());
        for (left, right) in decoded.packed.iter().zip(&matrix.packed) {
            assert_eq!(left.to_bits(), right.to_bits());
        }
    }

    #[test]
    fn artifact_rejects_wrong_magic() {
        let matrix =
            SimilarityMatrix::from_documents(names(&["A"]), &["solo card"]).unwrap();
        let mut body = matrix.to_bytes();
        body.truncate(body.len() - 32);
        body[0] = b'X';
        let resealed = codec::seal(body);
        assert_eq!(
            SimilarityMatrix::from_bytes(&resealed),
            Err(CodecError::BadMagic)
        );
    }

    #[test]
    fn build_index_uses_catalog_entries() {
        let catalog = Catalog::from_entries(vec![
            json!({"name": "Llanowar Elves", "cmc": 1.0, "type_line": "Creature — Elf Druid",
                   "oracle_text": "{T}: Add {G}.", "power": "1", "toughness": "1"}),
            json!({"name": "Elvish Mystic", "cmc": 1.0, "type_line": "Creature — Elf Druid",
                   "oracle_text": "{T}: Add {G}.", "power": "1", "toughness": "1"}),
            json!({"name": "Shock", "cmc": 1.0, "type_line": "Instant",
                   "oracle_text": "Shock deals 2 damage to any target."}),
        ]);
        let matrix = build_index(&catalog).unwrap();
        assert_eq!(matrix.get("Llanowar Elves", "Elvish Mystic"), Some(1.0));
        assert!(matrix.ensure_matches(&catalog).is_ok());
    }

    #[test]
    fn ensure_matches_detects_a_different_catalog() {
        let catalog = Catalog::from_entries(vec![
            json!({"name": "Opt", "oracle_text": "Scry 1. Draw a card."}),
            json!({"name": "Brainstorm", "oracle_text": "Draw three cards."}),
        ]);
        let matrix = build_index(&catalog).unwrap();
        let grown = Catalog::from_entries(vec![
            json!({"name": "Opt", "oracle_text": "Scry 1. Draw a card."}),
            json!({"name": "Brainstorm", "oracle_text": "Draw three cards."}),
            json!({"name": "Ponder", "oracle_text": "Draw a card."}),
        ]);
        assert!(matches!(
            matrix.ensure_matches(&grown),
            Err(IndexError::StaleIndex {
                index_cards: 2,
                catalog_cards: 3
            })
        ));
    }
}
