//! Combined feature strings and their tokenization.

use serde_json::Value;

use crate::card::Attribute;

/// Card attributes combined into the feature string, in order.
pub const FEATURES: [&str; 6] = [
    "cmc",
    "mana_cost",
    "type_line",
    "oracle_text",
    "power",
    "toughness",
];

/// Renders a scalar attribute the way it is written into the feature string.
///
/// Floating point numbers always carry a fractional part (`3.0`), so a mana
/// value below 10 never produces a two-character token.
fn feature_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(match (number.as_i64(), number.as_f64()) {
            (Some(int), _) if !number.is_f64() => int.to_string(),
            (_, Some(float)) => format!("{float:?}"),
            _ => number.to_string(),
        }),
        Value::Bool(true) => Some("True".to_string()),
        Value::Bool(false) => Some("False".to_string()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Text of one feature: the top-level value, or every face's value followed
/// by a space. Empty when the card has it nowhere.
fn feature_segment(entry: &Value, feature: &str) -> String {
    match Attribute::resolve(entry, feature, feature_text) {
        Attribute::Direct(text) => text,
        Attribute::PerFace(faces) => faces
            .into_iter()
            .flatten()
            .map(|text| text + " ")
            .collect(),
    }
}

/// Builds the combined feature string for a raw catalog entry.
pub fn combined_features(entry: &Value) -> String {
    let mut combined = String::new();
    for feature in FEATURES {
        combined.push_str(&feature_segment(entry, feature));
        combined.push(' ');
    }
    normalize(&combined)
}

/// Strips reminder text, `//` separators and em-dashes, then collapses whitespace.
pub fn normalize(text: &str) -> String {
    let stripped = strip_reminder_text(text)
        .replace("//", "")
        .replace('—', "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Removes parenthesized reminder text together with one leading space.
///
/// A group needs at least one character between the parentheses and ends at
/// the first `)`; an unmatched `(` is kept.
pub fn strip_reminder_text(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut idx = 0;
    while idx < chars.len() {
        let open = if chars[idx] == ' ' && chars.get(idx + 1) == Some(&'(') {
            idx + 1
        } else {
            idx
        };
        if chars[open] == '('
            && let Some(len) = chars[open + 1..].iter().position(|ch| *ch == ')')
            && len > 0
        {
            idx = open + len + 2;
            continue;
        }
        out.push(chars[idx]);
        idx += 1;
    }
    out
}

/// Splits text into lowercase terms: runs of two or more word characters.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for ch in text.chars() {
        if ch.is_alphanumeric() || ch == '_' {
            current.extend(ch.to_lowercase());
            current_len += 1;
            continue;
        }
        if current_len >= 2 {
            tokens.push(std::mem::take(&mut current));
        } else {
            current.clear();
        }
        current_len = 0;
    }

    if current_len >= 2 {
        tokens.push(current);
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reminder_text_is_removed_with_leading_space() {
        assert_eq!(
            strip_reminder_text(
                "Cycling—Sacrifice a land. (Sacrifice a land, Discard this card: Draw a card.)"
            ),
            "Cycling—Sacrifice a land."
        );
    }

    #[test]
    fn empty_and_unmatched_parentheses_survive() {
        assert_eq!(strip_reminder_text("a () b"), "a () b");
        assert_eq!(strip_reminder_text("open (ended"), "open (ended");
    }

    #[test]
    fn nested_parentheses_end_at_first_close() {
        assert_eq!(strip_reminder_text("x (a (b) c) y"), "x c) y");
    }

    #[test]
    fn normalize_drops_separators_and_dashes() {
        assert_eq!(normalize("Wear  //  Tear — Fuse\n"), "Wear Tear Fuse");
    }

    #[test]
    fn combined_features_follow_fixed_order() {
        let entry = json!({
            "name": "Grizzly Bears",
            "cmc": 2.0,
            "mana_cost": "{1}{G}",
            "type_line": "Creature — Bear",
            "power": "2",
            "toughness": "2"
        });
        assert_eq!(combined_features(&entry), "2.0 {1}{G} Creature Bear 2 2");
    }

    #[test]
    fn combined_features_concatenate_face_values() {
        let entry = json!({
            "name": "Wear // Tear",
            "cmc": 3.0,
            "mana_cost": "{1}{R} // {W}",
            "type_line": "Instant // Instant",
            "card_faces": [
                {"oracle_text": "Destroy target artifact. (Fuse reminder.)"},
                {"oracle_text": "Destroy target enchantment."}
            ]
        });
        assert_eq!(
            combined_features(&entry),
            "3.0 {1}{R} {W} Instant Instant Destroy target artifact. Destroy target enchantment."
        );
    }

    #[test]
    fn faces_missing_a_feature_contribute_nothing() {
        let entry = json!({
            "name": "Adventure",
            "card_faces": [{"power": "3"}, {}]
        });
        assert_eq!(combined_features(&entry), "3");
    }

    #[test]
    fn integer_json_numbers_render_without_fraction() {
        assert_eq!(feature_text(&json!(10)), Some("10".to_string()));
        assert_eq!(feature_text(&json!(0.5)), Some("0.5".to_string()));
        assert_eq!(feature_text(&json!(null)), None);
    }

    #[test]
    fn tokenize_keeps_words_of_two_or_more_characters() {
        assert_eq!(
            tokenize("Draw a card. {T}: Add {G}. 10.0 Flying_Thing"),
            vec!["draw", "card", "add", "10", "flying_thing"]
        );
    }

    #[test]
    fn tokenize_handles_unicode_letters() {
        assert_eq!(tokenize("Æther Vial"), vec!["æther", "vial"]);
    }
}
