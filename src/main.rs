#[macro_use]
extern crate log;

mod config;

use std::path::Path;
use std::process::ExitCode;

use log::LevelFilter;
use quadasm_core::driver;
use std::io::Write;

fn main() -> ExitCode {
    env_logger::Builder::new()
        .format(|f, record| writeln!(f, "{}: {}", record.level(), record.args()))
        .filter(None, LevelFilter::Info)
        .init();

    let files: Vec<String> = std::env::args().skip(1).collect();
    if files.is_empty() {
        eprintln!("usage: assembler FILE...");
        return ExitCode::FAILURE;
    }

    let cfg = config::Config::load().unwrap_or_default();

    let mut had_fatal_error = false;
    for file in &files {
        if let Err(err) = assemble_one(file, &cfg) {
            error!("{}: {}", file, err);
            had_fatal_error = true;
            if !cfg.continue_on_error {
                break;
            }
        }
    }

    if had_fatal_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// `name` is a basename; the source lives at `name.as`.
fn assemble_one(name: &str, cfg: &config::Config) -> Result<(), driver::AssembleError> {
    let stem = Path::new(name);
    let artifacts = driver::assemble_basename(stem)?;

    if artifacts.diagnostics.is_empty() {
        let encoded = artifacts.encoded.expect("clean run always produces artifacts");
        let output_dir = cfg.output_dir.as_deref().map(Path::new);
        driver::write_artifacts(stem, &encoded, output_dir)?;
        info!("{}: assembled cleanly", name);
    } else {
        for diagnostic in &artifacts.diagnostics {
            println!("{}: {}", name, diagnostic);
        }
    }

    Ok(())
}
