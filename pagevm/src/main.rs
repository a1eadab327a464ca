#![deny(clippy::all)]
#![deny(clippy::pedantic)]

//! Runs paged processes built from code and heap images.

use clap::Parser;
use log::{error, info, LevelFilter};
use pagevm_kernel::{
    config::Word,
    console::{Console, StdConsole},
    load_image, logging, Emulator, Fault, LoadError,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Image pairs, one process each: `<CODE> <HEAP> [<CODE> <HEAP> ...]`
    #[arg(required = true, value_name = "IMAGE")]
    images: Vec<PathBuf>,
}

/// Why a run ended without every process halting
#[derive(Debug, Error)]
enum RunError {
    #[error("images come in <CODE> <HEAP> pairs, got {0} paths")]
    OddImageCount(usize),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("no process could be created")]
    NoProcess,
    #[error(transparent)]
    Fault(#[from] Fault),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = logging::init(LevelFilter::Info) {
        eprintln!("cannot install logger: {err}");
    }
    match run_images(&cli.images, StdConsole) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

/// Creates one process per image pair and runs them until all halt.
///
/// A pair whose process cannot be created is logged and skipped. The
/// emulator is handed back so its console can be inspected.
fn run_images<C: Console>(images: &[PathBuf], console: C) -> Result<Emulator<C>, RunError> {
    if images.len() % 2 != 0 {
        return Err(RunError::OddImageCount(images.len()));
    }

    let mut emu = Emulator::new(console);
    let mut first = None;
    for pair in images.chunks_exact(2) {
        let (code, heap) = load_pair(&pair[0], &pair[1])?;
        match emu.create_process(&code, &heap) {
            Ok(pid) => {
                first.get_or_insert(pid);
            }
            Err(err) => error!("skipping {}: {err}", pair[0].display()),
        }
    }

    let pid = first.ok_or(RunError::NoProcess)?;
    emu.load_process(pid);
    let result = emu.run();
    emu.console_mut().flush();
    result?;
    info!("all processes halted");
    Ok(emu)
}

fn load_pair(code: &Path, heap: &Path) -> Result<(Vec<Word>, Vec<Word>), LoadError> {
    Ok((load_image(code)?, load_image(heap)?))
}
