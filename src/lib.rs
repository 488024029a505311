pub mod card;
pub mod catalog;
pub mod codec;
pub mod color;
pub mod config;
pub mod features;
pub mod filter;
pub mod query;
pub mod similarity;

pub use card::{Attribute, CardRecord, Rarity};
pub use catalog::{
    Catalog, CatalogError, DedupeReport, FlatRecord, FlatValue, dedupe_catalog_file,
    dedupe_entries, flatten_entry,
};
pub use codec::{CodecError, Hash32};
pub use color::{Color, ColorSet};
pub use config::Settings;
pub use features::combined_features;
pub use filter::{Comparison, FilterError, QueryFilters, legality_key};
pub use query::{QueryError, QueryOutcome, Recommendation, Recommender};
pub use similarity::{IndexError, SimilarityMatrix, TermCounts, build_index, load_or_build};
