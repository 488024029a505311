use std::fs;

use omen::{
    Catalog, CodecError, IndexError, Recommender, SimilarityMatrix, build_index, load_or_build,
};
use serde_json::{Value, json};

fn card(name: &str, oracle_text: &str) -> Value {
    json!({
        "name": name,
        "cmc": 3.0,
        "type_line": "Artifact",
        "oracle_text": oracle_text,
        "rarity": "rare"
    })
}

fn catalog_of(cards: &[(&str, &str)]) -> Catalog {
    Catalog::from_entries(
        cards
            .iter()
            .map(|(name, text)| card(name, text))
            .collect(),
    )
}

fn first_catalog() -> Catalog {
    catalog_of(&[
        ("Omen Machine", "Players can't draw cards. Each player exiles the top card of their library."),
        ("Sol Ring", "Add two colorless mana."),
        ("Howling Mine", "Each player draws an additional card."),
    ])
}

#[test]
fn saved_index_loads_bit_identical() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("SimilarCardsDf.bin");
    let catalog = first_catalog();
    let matrix = build_index(&catalog).expect("index");

    matrix.save(&path).expect("save");
    let loaded = SimilarityMatrix::load(&path).expect("load");

    assert_eq!(loaded.names(), matrix.names());
    for a in matrix.names() {
        for b in matrix.names() {
            let expected = matrix.get(a, b).expect("pair");
            let actual = loaded.get(a, b).expect("pair");
            assert_eq!(expected.to_bits(), actual.to_bits(), "{a} / {b}");
        }
    }
    assert!(Recommender::new(&catalog, &loaded).is_ok());
}

#[test]
fn corrupted_index_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("index.bin");
    build_index(&first_catalog())
        .expect("index")
        .save(&path)
        .expect("save");

    let mut bytes = fs::read(&path).expect("read");
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0xff;
    fs::write(&path, &bytes).expect("write");
    assert!(matches!(
        SimilarityMatrix::load(&path),
        Err(IndexError::Codec(CodecError::ChecksumMismatch))
    ));

    fs::write(&path, &bytes[..10]).expect("write");
    assert!(matches!(
        SimilarityMatrix::load(&path),
        Err(IndexError::Codec(_))
    ));

    assert!(matches!(
        SimilarityMatrix::load(dir.path().join("missing.bin")),
        Err(IndexError::Io { .. })
    ));
}

#[test]
fn load_or_build_creates_missing_index() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("SimilarCardsDf.bin");
    let catalog = first_catalog();

    let built = load_or_build(&catalog, &path, false).expect("build");
    assert!(path.exists());
    let reloaded = load_or_build(&catalog, &path, false).expect("load");
    assert_eq!(built, reloaded);
}

#[test]
fn stale_index_is_rebuilt_for_a_new_catalog() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("SimilarCardsDf.bin");
    let old = first_catalog();
    build_index(&old).expect("index").save(&path).expect("save");

    let new = catalog_of(&[
        ("Sol Ring", "Add two colorless mana."),
        ("Mind Stone", "Add one colorless mana. Sacrifice Mind Stone: Draw a card."),
    ]);
    let stale = SimilarityMatrix::load(&path).expect("load");
    assert!(matches!(
        Recommender::new(&new, &stale),
        Err(IndexError::StaleIndex {
            index_cards: 3,
            catalog_cards: 2
        })
    ));

    let rebuilt = load_or_build(&new, &path, false).expect("rebuild");
    assert_eq!(rebuilt.len(), 2);
    assert!(Recommender::new(&new, &rebuilt).is_ok());
    let on_disk = SimilarityMatrix::load(&path).expect("load");
    assert_eq!(on_disk, rebuilt);
}

#[test]
fn forced_rebuild_ignores_existing_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("SimilarCardsDf.bin");
    fs::write(&path, b"not an index").expect("write");

    let catalog = first_catalog();
    assert!(load_or_build(&catalog, &path, false).is_err());
    let matrix = load_or_build(&catalog, &path, true).expect("rebuild");
    assert_eq!(matrix.len(), 3);
    assert_eq!(matrix.get("Sol Ring", "Sol Ring"), Some(1.0));
}
