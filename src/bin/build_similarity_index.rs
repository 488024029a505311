use std::env;
use std::path::PathBuf;
use std::time::Instant;

use omen::config::{Settings, init_tracing};
use omen::{Catalog, build_index};
use tracing::info;

#[derive(Debug)]
struct Args {
    catalog_path: PathBuf,
    index_path: PathBuf,
}

fn parse_args() -> Result<Args, String> {
    let settings = Settings::from_env();
    let mut catalog_path = settings.catalog;
    let mut index_path = settings.index;

    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--catalog" => {
                catalog_path = iter
                    .next()
                    .ok_or_else(|| "--catalog requires a path".to_string())?
                    .into();
            }
            "--index" => {
                index_path = iter
                    .next()
                    .ok_or_else(|| "--index requires a path".to_string())?
                    .into();
            }
            _ => {
                return Err(format!(
                    "unknown argument '{arg}'. supported: --catalog <path> --index <path>"
                ));
            }
        }
    }

    Ok(Args {
        catalog_path,
        index_path,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = parse_args().map_err(std::io::Error::other)?;

    let started = Instant::now();
    let catalog = Catalog::load(&args.catalog_path)?;
    let matrix = build_index(&catalog)?;
    matrix.save(&args.index_path)?;
    info!(
        cards = matrix.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        index = %args.index_path.display(),
        "saved similarity index"
    );

    println!(
        "{}: {} cards, fingerprint {}",
        args.index_path.display(),
        matrix.len(),
        matrix.fingerprint()
    );
    Ok(())
}
