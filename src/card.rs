use serde_json::Value;

use crate::catalog::FlatRecord;
use crate::color::ColorSet;

/// An attribute that a multi-faced card may store per face instead of at the
/// top level of its entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute<T> {
    /// Present on the card entry itself.
    Direct(T),
    /// Missing at the top level. One slot per face, in face order; a face
    /// lacking the attribute holds `None`. Cards without faces resolve to an
    /// empty list.
    PerFace(Vec<Option<T>>),
}

impl<T> Attribute<T> {
    /// Resolves `key` on a raw catalog entry, falling back to `card_faces`.
    ///
    /// `read` converts a JSON value into `T`; a value it rejects counts as
    /// missing. JSON `null` is always treated as missing.
    pub fn resolve(entry: &Value, key: &str, read: impl Fn(&Value) -> Option<T>) -> Self {
        if let Some(value) = entry.get(key).filter(|value| !value.is_null())
            && let Some(direct) = read(value)
        {
            return Attribute::Direct(direct);
        }

        let faces = entry
            .get("card_faces")
            .and_then(Value::as_array)
            .map(|faces| {
                faces
                    .iter()
                    .map(|face| {
                        face.get(key)
                            .filter(|value| !value.is_null())
                            .and_then(&read)
                    })
                    .collect()
            })
            .unwrap_or_default();
        Attribute::PerFace(faces)
    }

    pub fn is_direct(&self) -> bool {
        matches!(self, Attribute::Direct(_))
    }

    pub fn direct(&self) -> Option<&T> {
        match self {
            Attribute::Direct(value) => Some(value),
            Attribute::PerFace(_) => None,
        }
    }

    /// The value on the first face, if the attribute is stored per face.
    pub fn first_face(&self) -> Option<&T> {
        match self {
            Attribute::Direct(_) => None,
            Attribute::PerFace(faces) => faces.first().and_then(Option::as_ref),
        }
    }

    /// The direct value, or every face value that is present, in face order.
    pub fn values(&self) -> Vec<&T> {
        match self {
            Attribute::Direct(value) => vec![value],
            Attribute::PerFace(faces) => faces.iter().filter_map(Option::as_ref).collect(),
        }
    }

    pub fn is_missing(&self) -> bool {
        self.values().is_empty()
    }
}

impl Attribute<String> {
    /// Text of the attribute, joining face values with `separator`.
    pub fn text(&self, separator: &str) -> Option<String> {
        let values = self.values();
        if values.is_empty() {
            return None;
        }
        Some(
            values
                .into_iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(separator),
        )
    }
}

/// Print rarity of a card.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Mythic,
    Special,
    Bonus,
    /// Any other value found in the catalog, kept verbatim.
    Other(String),
}

impl Rarity {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "common" => Rarity::Common,
            "uncommon" => Rarity::Uncommon,
            "rare" => Rarity::Rare,
            "mythic" => Rarity::Mythic,
            "special" => Rarity::Special,
            "bonus" => Rarity::Bonus,
            _ => Rarity::Other(name.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Rarity::Common => "common",
            Rarity::Uncommon => "uncommon",
            Rarity::Rare => "rare",
            Rarity::Mythic => "mythic",
            Rarity::Special => "special",
            Rarity::Bonus => "bonus",
            Rarity::Other(name) => name,
        }
    }
}

/// Legality status string Scryfall uses for cards that cannot be played in a format.
pub const NOT_LEGAL: &str = "not_legal";

/// Typed view of one deduplicated catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CardRecord {
    pub name: String,
    /// Converted mana cost. Absent for a few non-game objects.
    pub cmc: Option<f64>,
    pub mana_cost: Attribute<String>,
    pub type_line: Attribute<String>,
    pub oracle_text: Attribute<String>,
    pub power: Attribute<String>,
    pub toughness: Attribute<String>,
    pub colors: Attribute<ColorSet>,
    pub color_identity: ColorSet,
    pub rarity: Option<Rarity>,
    /// Flattened attributes with dotted keys, e.g. `legalities.modern`.
    pub flat: FlatRecord,
}

impl CardRecord {
    /// Builds the typed record from a raw entry and its flattened projection.
    ///
    /// Returns `None` when the entry has no string `name`.
    pub fn from_entry(entry: &Value, flat: FlatRecord) -> Option<Self> {
        let name = flat.text("name")?.to_string();
        let string = |value: &Value| value.as_str().map(str::to_string);

        Some(Self {
            cmc: flat.number("cmc"),
            mana_cost: Attribute::resolve(entry, "mana_cost", string),
            type_line: Attribute::resolve(entry, "type_line", string),
            oracle_text: Attribute::resolve(entry, "oracle_text", string),
            power: Attribute::resolve(entry, "power", string),
            toughness: Attribute::resolve(entry, "toughness", string),
            colors: Attribute::resolve(entry, "colors", ColorSet::from_json),
            color_identity: flat
                .list("color_identity")
                .map(ColorSet::from_codes)
                .unwrap_or_default(),
            rarity: flat.text("rarity").map(Rarity::from_name),
            name,
            flat,
        })
    }

    /// Colors used by the color filter.
    ///
    /// Cards without top-level `colors` use their first face. A first face
    /// with no colors (or no face at all) counts as colorless (`C`).
    pub fn filter_colors(&self) -> ColorSet {
        match &self.colors {
            Attribute::Direct(colors) => *colors,
            per_face => match per_face.first_face() {
                Some(colors) if !colors.is_empty() => *colors,
                _ => ColorSet::COLORLESS,
            },
        }
    }

    /// Full type line; per-face type lines are joined like Scryfall does.
    pub fn type_line_text(&self) -> String {
        self.type_line.text(" // ").unwrap_or_default()
    }

    pub fn mana_cost_text(&self) -> String {
        self.mana_cost.text(" // ").unwrap_or_default()
    }

    /// Legality string for a Scryfall format key, e.g. `"legal"` or `"not_legal"`.
    pub fn legality(&self, format: &str) -> Option<&str> {
        self.flat.text(&format!("legalities.{format}"))
    }

    /// True when the card is explicitly marked `not_legal` in `format`.
    /// A format missing from the card's legalities is not a rejection.
    pub fn is_not_legal_in(&self, format: &str) -> bool {
        self.legality(format) == Some(NOT_LEGAL)
    }

    /// Image URL of the given size (`large`, `normal`, `small`, ...), falling
    /// back to the first face for multi-faced layouts.
    pub fn image_uri(&self, size: &str) -> Option<&str> {
        if let Some(uri) = self.flat.text(&format!("image_uris.{size}")) {
            return Some(uri);
        }
        self.flat
            .list("card_faces")?
            .first()?
            .get("image_uris")?
            .get(size)?
            .as_str()
    }

    pub fn scryfall_uri(&self) -> Option<&str> {
        self.flat.text("scryfall_uri")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::flatten_entry;
    use crate::color::Color;
    use serde_json::json;

    fn record(entry: Value) -> CardRecord {
        let flat = flatten_entry(&entry);
        CardRecord::from_entry(&entry, flat).expect("fixture has a name")
    }

    fn delver() -> Value {
        json!({
            "name": "Delver of Secrets // Insectile Aberration",
            "cmc": 1.0,
            "color_identity": ["U"],
            "rarity": "common",
            "legalities": {"modern": "legal", "standard": "not_legal"},
            "card_faces": [
                {
                    "name": "Delver of Secrets",
                    "mana_cost": "{U}",
                    "type_line": "Creature — Human Wizard",
                    "oracle_text": "At the beginning of your upkeep, look at the top card of your library.",
                    "colors": ["U"],
                    "power": "1",
                    "toughness": "1",
                    "image_uris": {"large": "https://img.example/delver-front.jpg"}
                },
                {
                    "name": "Insectile Aberration",
                    "mana_cost": "",
                    "type_line": "Creature — Human Insect",
                    "oracle_text": "Flying",
                    "colors": ["U"],
                    "power": "3",
                    "toughness": "2"
                }
            ]
        })
    }

    #[test]
    fn direct_attribute_wins_over_faces() {
        let card = record(json!({
            "name": "Omen Machine",
            "cmc": 6.0,
            "type_line": "Artifact",
            "colors": [],
            "card_faces": [{"type_line": "ignored"}]
        }));
        assert_eq!(card.type_line, Attribute::Direct("Artifact".to_string()));
        assert!(card.colors.is_direct());
    }

    #[test]
    fn missing_attribute_resolves_per_face() {
        let card = record(delver());
        assert!(!card.type_line.is_direct());
        assert_eq!(
            card.type_line_text(),
            "Creature — Human Wizard // Creature — Human Insect"
        );
        assert_eq!(card.oracle_text.values().len(), 2);
        assert!(card.cmc.is_some());
    }

    #[test]
    fn absent_attribute_without_faces_is_empty_per_face() {
        let card = record(json!({"name": "Shock", "type_line": "Instant"}));
        assert_eq!(card.power, Attribute::PerFace(Vec::new()));
        assert!(card.power.is_missing());
        assert_eq!(card.power.text(" "), None);
    }

    #[test]
    fn filter_colors_fall_back_to_first_face() {
        let card = record(delver());
        assert_eq!(card.filter_colors(), ColorSet::BLUE);
    }

    #[test]
    fn colorless_first_face_counts_as_colorless_symbol() {
        let card = record(json!({
            "name": "Colorless Flip",
            "card_faces": [{"colors": []}, {"colors": ["R"]}]
        }));
        assert_eq!(card.filter_colors(), ColorSet::COLORLESS);
        assert!(card.filter_colors().contains(Color::Colorless));
    }

    #[test]
    fn direct_empty_colors_stay_empty() {
        let card = record(json!({"name": "Sol Ring", "colors": []}));
        assert_eq!(card.filter_colors(), ColorSet::EMPTY);
    }

    #[test]
    fn legality_reads_flattened_keys() {
        let card = record(delver());
        assert_eq!(card.legality("modern"), Some("legal"));
        assert!(card.is_not_legal_in("standard"));
        assert!(!card.is_not_legal_in("vintage"));
    }

    #[test]
    fn image_uri_falls_back_to_first_face() {
        let card = record(delver());
        assert_eq!(
            card.image_uri("large"),
            Some("https://img.example/delver-front.jpg")
        );

        let single = record(json!({
            "name": "Omen Machine",
            "image_uris": {"large": "https://img.example/omen.jpg"}
        }));
        assert_eq!(single.image_uri("large"), Some("https://img.example/omen.jpg"));
    }

    #[test]
    fn rarity_parses_known_and_unknown_values() {
        assert_eq!(Rarity::from_name("mythic"), Rarity::Mythic);
        assert_eq!(Rarity::from_name("Special"), Rarity::Special);
        assert_eq!(
            Rarity::from_name("timeshifted"),
            Rarity::Other("timeshifted".to_string())
        );
        assert_eq!(Rarity::Other("timeshifted".to_string()).as_str(), "timeshifted");
    }

    #[test]
    fn entry_without_name_is_rejected() {
        let entry = json!({"type_line": "Land"});
        assert!(CardRecord::from_entry(&entry, flatten_entry(&entry)).is_none());
    }
}
