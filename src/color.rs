use std::fmt;

use serde_json::Value;

/// A color symbol as it appears in card data.
///
/// `Colorless` is the `C` symbol. Scryfall never lists it in `colors` or
/// `color_identity`, but queries use it as a sixth selectable symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    White,
    Blue,
    Black,
    Red,
    Green,
    Colorless,
}

impl Color {
    pub const ALL: [Color; 6] = [
        Color::White,
        Color::Blue,
        Color::Black,
        Color::Red,
        Color::Green,
        Color::Colorless,
    ];

    /// Parses a single-letter color code (`W`, `U`, `B`, `R`, `G`, `C`).
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol.trim() {
            "W" | "w" => Some(Color::White),
            "U" | "u" => Some(Color::Blue),
            "B" | "b" => Some(Color::Black),
            "R" | "r" => Some(Color::Red),
            "G" | "g" => Some(Color::Green),
            "C" | "c" => Some(Color::Colorless),
            _ => None,
        }
    }

    pub const fn symbol(self) -> char {
        match self {
            Color::White => 'W',
            Color::Blue => 'U',
            Color::Black => 'B',
            Color::Red => 'R',
            Color::Green => 'G',
            Color::Colorless => 'C',
        }
    }
}

/// A set of color symbols represented as bitflags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ColorSet(u8);

impl ColorSet {
    pub const EMPTY: Self = Self(0);
    pub const WHITE: Self = Self(1 << 0);
    pub const BLUE: Self = Self(1 << 1);
    pub const BLACK: Self = Self(1 << 2);
    pub const RED: Self = Self(1 << 3);
    pub const GREEN: Self = Self(1 << 4);
    pub const COLORLESS: Self = Self(1 << 5);
    /// Every symbol a query can select: W, U, B, R, G and C.
    pub const ALL: Self = Self(0b11_1111);

    /// Creates a new empty ColorSet.
    pub const fn new() -> Self {
        Self(0)
    }

    /// Creates a ColorSet from a single color.
    pub const fn from_color(color: Color) -> Self {
        match color {
            Color::White => Self::WHITE,
            Color::Blue => Self::BLUE,
            Color::Black => Self::BLACK,
            Color::Red => Self::RED,
            Color::Green => Self::GREEN,
            Color::Colorless => Self::COLORLESS,
        }
    }

    /// Returns true if this set contains no symbols.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns true if this set contains the given color.
    pub const fn contains(self, color: Color) -> bool {
        self.0 & Self::from_color(color).0 != 0
    }

    /// Returns true if this set contains all colors in the other set.
    pub const fn contains_all(self, other: ColorSet) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if the two sets share at least one color.
    pub const fn intersects(self, other: ColorSet) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn union(self, other: ColorSet) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn intersection(self, other: ColorSet) -> Self {
        Self(self.0 & other.0)
    }

    /// The symbols of [`ColorSet::ALL`] that are not in this set.
    pub const fn complement(self) -> Self {
        Self(Self::ALL.0 & !self.0)
    }

    /// Returns the number of colors in this set.
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Adds a color to this set, returning the new set.
    pub const fn with(self, color: Color) -> Self {
        self.union(Self::from_color(color))
    }

    /// Removes a color from this set, returning the new set.
    pub const fn without(self, color: Color) -> Self {
        Self(self.0 & !Self::from_color(color).0)
    }

    pub fn iter(self) -> impl Iterator<Item = Color> {
        Color::ALL.into_iter().filter(move |color| self.contains(*color))
    }

    /// Reads a JSON array of color codes such as `["W", "U"]`.
    ///
    /// Returns `None` when the value is not an array. Unknown codes are ignored.
    pub fn from_json(value: &Value) -> Option<Self> {
        value.as_array().map(|items| Self::from_codes(items))
    }

    pub fn from_codes(items: &[Value]) -> Self {
        items
            .iter()
            .filter_map(Value::as_str)
            .filter_map(Color::from_symbol)
            .collect()
    }

    /// Parses a comma separated list of codes, e.g. `"W,U"` or `"G R"`.
    pub fn parse_symbols(raw: &str) -> Result<Self, String> {
        raw.split(|ch: char| ch == ',' || ch.is_whitespace())
            .filter(|part| !part.is_empty())
            .map(|part| Color::from_symbol(part).ok_or_else(|| part.to_string()))
            .collect()
    }
}

impl From<Color> for ColorSet {
    fn from(color: Color) -> Self {
        Self::from_color(color)
    }
}

impl FromIterator<Color> for ColorSet {
    fn from_iter<T: IntoIterator<Item = Color>>(iter: T) -> Self {
        iter.into_iter()
            .fold(ColorSet::EMPTY, |set, color| set.with(color))
    }
}

impl fmt::Display for ColorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbols: Vec<String> = self.iter().map(|color| color.symbol().to_string()).collect();
        write!(f, "[{}]", symbols.join(", "))
    }
}
