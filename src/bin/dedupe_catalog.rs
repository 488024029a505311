use std::env;
use std::path::PathBuf;

use omen::config::{Settings, init_tracing};
use omen::dedupe_catalog_file;

#[derive(Debug)]
struct Args {
    raw_path: PathBuf,
    out_path: PathBuf,
}

fn parse_args() -> Result<Args, String> {
    let settings = Settings::from_env();
    let mut raw_path = settings.raw_catalog;
    let mut out_path = settings.catalog;

    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--raw" => {
                raw_path = iter
                    .next()
                    .ok_or_else(|| "--raw requires a path".to_string())?
                    .into();
            }
            "--out" => {
                out_path = iter
                    .next()
                    .ok_or_else(|| "--out requires a path".to_string())?
                    .into();
            }
            _ => {
                return Err(format!(
                    "unknown argument '{arg}'. supported: --raw <path> --out <path>"
                ));
            }
        }
    }

    Ok(Args { raw_path, out_path })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let args = parse_args().map_err(std::io::Error::other)?;
    let report = dedupe_catalog_file(&args.raw_path, &args.out_path)?;

    println!(
        "{} -> {}: {} printings, {} unique cards",
        args.raw_path.display(),
        args.out_path.display(),
        report.total,
        report.unique
    );
    Ok(())
}
