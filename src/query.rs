//! Similar-card queries over a catalog and its similarity matrix.

use thiserror::Error;
use tracing::debug;

use crate::card::CardRecord;
use crate::catalog::Catalog;
use crate::filter::QueryFilters;
use crate::similarity::{IndexError, SimilarityMatrix};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("card '{0}' is not in the catalog")]
    CardNotFound(String),
}

/// A recommended card and its similarity to the queried card.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recommendation<'a> {
    pub card: &'a CardRecord,
    pub similarity: f64,
}

/// Result of a query: the queried card and its ranked, filtered neighbours.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome<'a> {
    pub query: &'a CardRecord,
    pub results: Vec<Recommendation<'a>>,
}

/// Answers similar-card queries.
///
/// Borrows an immutable catalog and the similarity matrix built from it; any
/// number of recommenders may share them.
#[derive(Debug, Clone, Copy)]
pub struct Recommender<'a> {
    catalog: &'a Catalog,
    matrix: &'a SimilarityMatrix,
}

impl<'a> Recommender<'a> {
    /// Pairs a catalog with its matrix, rejecting a matrix built from a
    /// different catalog.
    pub fn new(catalog: &'a Catalog, matrix: &'a SimilarityMatrix) -> Result<Self, IndexError> {
        matrix.ensure_matches(catalog)?;
        Ok(Self { catalog, matrix })
    }

    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    /// Ranks every other card by similarity to `name`, then applies the
    /// filters in order (mana value, type, rarity, colors, commander
    /// identity, legality) and keeps the first `filters.limit` cards.
    ///
    /// Ties keep catalog order.
    pub fn get_similar_cards(
        &self,
        name: &str,
        filters: &QueryFilters,
    ) -> Result<QueryOutcome<'a>, QueryError> {
        let query_pos = self
            .catalog
            .position(name)
            .ok_or_else(|| QueryError::CardNotFound(name.to_string()))?;
        let records = self.catalog.records();

        let mut ranked: Vec<(usize, f64)> = (0..records.len())
            .map(|pos| (pos, self.matrix.value(query_pos, pos)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let candidates = ranked
            .into_iter()
            .map(|(pos, similarity)| Recommendation {
                card: &records[pos],
                similarity,
            })
            .filter(|rec| rec.card.name != name);

        let results: Vec<Recommendation<'a>> = candidates
            .filter(|rec| filters.passes_cmc(rec.card))
            .filter(|rec| filters.passes_type(rec.card))
            .filter(|rec| filters.passes_rarity(rec.card))
            .filter(|rec| filters.passes_colors(rec.card))
            .filter(|rec| filters.passes_commander(rec.card))
            .filter(|rec| filters.passes_legality(rec.card))
            .take(filters.limit)
            .collect();

        debug!(query = name, results = results.len(), "similar cards query");
        Ok(QueryOutcome {
            query: &records[query_pos],
            results,
        })
    }
}
