//! Query filters applied to similarity-ranked candidates.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::card::{CardRecord, Rarity};
use crate::color::ColorSet;

/// Card types offered by default: a candidate must mention at least one.
pub const DEFAULT_TYPES: [&str; 15] = [
    "Artifact",
    "Conspiracy",
    "Creature",
    "Emblem",
    "Enchantment",
    "Hero",
    "Instant",
    "Land",
    "Phenomenon",
    "Plane",
    "Planeswalker",
    "Scheme",
    "Sorcery",
    "Tribal",
    "Vanguard",
];

pub const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The expression does not start with `>=`, `>`, `<=`, `<`, `==` or `!=`.
    #[error("invalid comparison '{0}': expected one of >=, >, <=, <, ==, != followed by a number")]
    InvalidComparison(String),

    #[error("invalid threshold '{0}' in comparison: not a number")]
    InvalidThreshold(String),

    #[error("unknown color symbol '{0}': expected W, U, B, R, G or C")]
    UnknownColor(String),

    #[error("unknown rarity '{0}': expected common, uncommon, rare, mythic, special or bonus")]
    UnknownRarity(String),
}

/// A numeric comparison against a card's converted mana cost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Comparison {
    Equal(f64),
    NotEqual(f64),
    LessThan(f64),
    LessThanOrEqual(f64),
    GreaterThan(f64),
    GreaterThanOrEqual(f64),
}

impl Comparison {
    /// Check if a value satisfies this comparison.
    pub fn satisfies(&self, value: f64) -> bool {
        match *self {
            Comparison::Equal(n) => value == n,
            Comparison::NotEqual(n) => value != n,
            Comparison::LessThan(n) => value < n,
            Comparison::LessThanOrEqual(n) => value <= n,
            Comparison::GreaterThan(n) => value > n,
            Comparison::GreaterThanOrEqual(n) => value >= n,
        }
    }

    fn parts(&self) -> (&'static str, f64) {
        match *self {
            Comparison::Equal(n) => ("==", n),
            Comparison::NotEqual(n) => ("!=", n),
            Comparison::LessThan(n) => ("<", n),
            Comparison::LessThanOrEqual(n) => ("<=", n),
            Comparison::GreaterThan(n) => (">", n),
            Comparison::GreaterThanOrEqual(n) => (">=", n),
        }
    }
}

impl Default for Comparison {
    /// `>=0`, which every card with a mana value passes.
    fn default() -> Self {
        Comparison::GreaterThanOrEqual(0.0)
    }
}

impl FromStr for Comparison {
    type Err = FilterError;

    /// Parses expressions such as `>=3`, `< 2.5` or `==0`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let expr = raw.trim();
        // Two-character operators first so `>=` is not read as `>`.
        let operators: [(&str, fn(f64) -> Comparison); 6] = [
            (">=", Comparison::GreaterThanOrEqual),
            ("<=", Comparison::LessThanOrEqual),
            ("==", Comparison::Equal),
            ("!=", Comparison::NotEqual),
            (">", Comparison::GreaterThan),
            ("<", Comparison::LessThan),
        ];
        let (threshold, build) = operators
            .iter()
            .find_map(|(op, build)| expr.strip_prefix(op).map(|rest| (rest.trim(), build)))
            .ok_or_else(|| FilterError::InvalidComparison(raw.to_string()))?;
        let value = threshold
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| FilterError::InvalidThreshold(threshold.to_string()))?;
        Ok(build(value))
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (op, n) = self.parts();
        write!(f, "{op}{n}")
    }
}

/// Maps a format name as shown to users to its Scryfall legality key.
///
/// `"Duel Commander"` becomes `duel`, `"Old School 93/94"` becomes
/// `oldschool`; other names are lowercased with spaces removed.
pub fn legality_key(format: &str) -> String {
    let lower = format.trim().to_lowercase();
    match lower.as_str() {
        "future standard" => "future".to_string(),
        "penny dreadful" => "penny".to_string(),
        "duel commander" => "duel".to_string(),
        "old school 93/94" | "old school" => "oldschool".to_string(),
        _ => lower.split_whitespace().collect(),
    }
}

/// Parses a rarity name accepted by the rarity filter.
pub fn parse_rarity(raw: &str) -> Result<Rarity, FilterError> {
    match Rarity::from_name(raw) {
        Rarity::Other(_) => Err(FilterError::UnknownRarity(raw.trim().to_string())),
        rarity => Ok(rarity),
    }
}

/// Parses color symbols for the color and commander filters.
pub fn parse_colors(raw: &str) -> Result<ColorSet, FilterError> {
    ColorSet::parse_symbols(raw).map_err(FilterError::UnknownColor)
}

/// Every predicate of a similar-cards query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFilters {
    pub cmc: Comparison,
    /// Colors a candidate must all have. `None` skips the color filter.
    pub colors: Option<ColorSet>,
    /// Colors allowed in a candidate's color identity.
    pub commander: ColorSet,
    /// A candidate's type line must contain one of these substrings.
    pub types: Vec<String>,
    pub rarities: Vec<Rarity>,
    /// Scryfall format keys. `None` skips the legality filter.
    pub legality: Option<Vec<String>>,
    pub limit: usize,
}

impl Default for QueryFilters {
    fn default() -> Self {
        Self {
            cmc: Comparison::default(),
            colors: None,
            commander: ColorSet::ALL,
            types: DEFAULT_TYPES.iter().map(|ty| ty.to_string()).collect(),
            rarities: vec![Rarity::Common, Rarity::Mythic, Rarity::Rare, Rarity::Uncommon],
            legality: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl QueryFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cmc(mut self, comparison: Comparison) -> Self {
        self.cmc = comparison;
        self
    }

    /// Parses and sets the CMC expression, e.g. `">=3"`.
    pub fn cmc_expr(self, expr: &str) -> Result<Self, FilterError> {
        Ok(self.cmc(expr.parse()?))
    }

    pub fn colors(mut self, colors: ColorSet) -> Self {
        self.colors = Some(colors);
        self
    }

    pub fn commander(mut self, colors: ColorSet) -> Self {
        self.commander = colors;
        self
    }

    pub fn types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn rarities(mut self, rarities: Vec<Rarity>) -> Self {
        self.rarities = rarities;
        self
    }

    /// Requires legality in each format; display names are normalized.
    pub fn legal_in<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.legality = Some(
            formats
                .into_iter()
                .map(|format| legality_key(format.as_ref()))
                .collect(),
        );
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// A card without a mana value never passes.
    pub fn passes_cmc(&self, card: &CardRecord) -> bool {
        card.cmc.is_some_and(|cmc| self.cmc.satisfies(cmc))
    }

    pub fn passes_type(&self, card: &CardRecord) -> bool {
        let type_line = card.type_line_text();
        self.types
            .iter()
            .any(|wanted| type_line.contains(wanted.as_str()))
    }

    pub fn passes_rarity(&self, card: &CardRecord) -> bool {
        card.rarity
            .as_ref()
            .is_some_and(|rarity| self.rarities.contains(rarity))
    }

    pub fn passes_colors(&self, card: &CardRecord) -> bool {
        match self.colors {
            Some(required) => card.filter_colors().contains_all(required),
            None => true,
        }
    }

    /// Drops cards whose identity uses a color outside the allowed set.
    pub fn passes_commander(&self, card: &CardRecord) -> bool {
        let excluded = self.commander.complement();
        !card.color_identity.intersects(excluded)
    }

    pub fn passes_legality(&self, card: &CardRecord) -> bool {
        match &self.legality {
            Some(formats) => formats
                .iter()
                .all(|format| !card.is_not_legal_in(format)),
            None => true,
        }
    }
}
