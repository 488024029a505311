//! Omen - similar card recommendations
//!
//! ## Usage
//!
//! ```
//! omen [CARD NAME] [OPTIONS]
//!
//! Options:
//!   --catalog <path>      Deduplicated catalog (default: $OMEN_CATALOG or default-cards-unique.json)
//!   --index <path>        Similarity index (default: $OMEN_INDEX or SimilarCardsDf.bin)
//!   --rebuild             Rebuild the similarity index even if it exists
//!   --random              Query a random card from the catalog
//!   --cmc <expr>          Mana value comparison, e.g. ">=3"
//!   --colors <W,U,...>    Results must have all of these colors
//!   --commander <W,U,..>  Allowed color identity
//!   --types <A,B,...>     Type line must contain one of these
//!   --rarity <r,...>      Allowed rarities
//!   --format <name>       Must not be not_legal in this format (repeatable)
//!   --limit <n>           Number of results (default 10)
//! ```
//!
//! The index is built and saved on first use when the file does not exist.

use std::env;
use std::path::PathBuf;

use omen::config::{Settings, init_tracing};
use omen::filter::{parse_colors, parse_rarity};
use omen::{Catalog, CardRecord, QueryFilters, Recommender, load_or_build};
use rand::seq::IndexedRandom;

const DEFAULT_CARD: &str = "Omen Machine";

#[derive(Debug)]
struct Args {
    card: Option<String>,
    catalog: PathBuf,
    index: PathBuf,
    rebuild: bool,
    random: bool,
    filters: QueryFilters,
}

fn list_arg(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

fn parse_args() -> Result<Args, String> {
    let settings = Settings::from_env();
    let mut card_words: Vec<String> = Vec::new();
    let mut catalog = settings.catalog;
    let mut index = settings.index;
    let mut rebuild = false;
    let mut random = false;
    let mut filters = QueryFilters::default();
    let mut formats: Vec<String> = Vec::new();

    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--catalog" => {
                catalog = iter
                    .next()
                    .ok_or_else(|| "--catalog requires a path".to_string())?
                    .into();
            }
            "--index" => {
                index = iter
                    .next()
                    .ok_or_else(|| "--index requires a path".to_string())?
                    .into();
            }
            "--rebuild" => rebuild = true,
            "--random" => random = true,
            "--cmc" => {
                let raw = iter
                    .next()
                    .ok_or_else(|| "--cmc requires an expression like >=3".to_string())?;
                filters = filters
                    .cmc_expr(&raw)
                    .map_err(|e| format!("invalid --cmc value '{raw}': {e}"))?;
            }
            "--colors" => {
                let raw = iter
                    .next()
                    .ok_or_else(|| "--colors requires color symbols".to_string())?;
                let colors =
                    parse_colors(&raw).map_err(|e| format!("invalid --colors value: {e}"))?;
                filters = filters.colors(colors);
            }
            "--commander" => {
                let raw = iter
                    .next()
                    .ok_or_else(|| "--commander requires color symbols".to_string())?;
                let colors =
                    parse_colors(&raw).map_err(|e| format!("invalid --commander value: {e}"))?;
                filters = filters.commander(colors);
            }
            "--types" => {
                let raw = iter
                    .next()
                    .ok_or_else(|| "--types requires a comma separated list".to_string())?;
                filters = filters.types(list_arg(&raw));
            }
            "--rarity" => {
                let raw = iter
                    .next()
                    .ok_or_else(|| "--rarity requires a comma separated list".to_string())?;
                let rarities = list_arg(&raw)
                    .iter()
                    .map(|name| parse_rarity(name))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| format!("invalid --rarity value: {e}"))?;
                filters = filters.rarities(rarities);
            }
            "--format" => {
                formats.push(
                    iter.next()
                        .ok_or_else(|| "--format requires a format name".to_string())?,
                );
            }
            "--limit" => {
                let raw = iter
                    .next()
                    .ok_or_else(|| "--limit requires a number".to_string())?;
                let limit = raw
                    .parse::<usize>()
                    .map_err(|e| format!("invalid --limit value '{raw}': {e}"))?;
                filters = filters.limit(limit);
            }
            flag if flag.starts_with("--") => {
                return Err(format!(
                    "unknown argument '{flag}'. supported: [CARD NAME] --catalog <path> --index <path> --rebuild --random --cmc <expr> --colors <W,U,B,R,G,C> --commander <W,U,B,R,G,C> --types <list> --rarity <list> --format <name> --limit <n>"
                ));
            }
            word => card_words.push(word.to_string()),
        }
    }

    if !formats.is_empty() {
        filters = filters.legal_in(&formats);
    }
    let card = if card_words.is_empty() {
        None
    } else {
        Some(card_words.join(" "))
    };

    Ok(Args {
        card,
        catalog,
        index,
        rebuild,
        random,
        filters,
    })
}

fn print_card(card: &CardRecord, similarity: Option<f64>) {
    let similarity = similarity
        .map(|value| format!("{value:.3}"))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{:<40} {:>6}  {:<40} {:<16} {}",
        card.name,
        similarity,
        card.type_line_text(),
        card.mana_cost_text(),
        card.color_identity
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = parse_args().map_err(std::io::Error::other)?;

    let catalog = Catalog::load(&args.catalog)?;
    let matrix = load_or_build(&catalog, &args.index, args.rebuild)?;
    let recommender = Recommender::new(&catalog, &matrix)?;

    let card = if args.random {
        catalog
            .records()
            .choose(&mut rand::rng())
            .map(|record| record.name.clone())
            .ok_or_else(|| std::io::Error::other("catalog is empty"))?
    } else {
        args.card.unwrap_or_else(|| DEFAULT_CARD.to_string())
    };

    let outcome = recommender.get_similar_cards(&card, &args.filters)?;

    print_card(outcome.query, None);
    println!();
    if outcome.results.is_empty() {
        println!("No cards matched the filters.");
    }
    for rec in &outcome.results {
        print_card(rec.card, Some(rec.similarity));
    }

    Ok(())
}
