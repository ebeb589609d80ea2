use clap::Parser;
use env_logger::Env;
use log::info;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use taqman::barcode::write_barcodes;
use taqman::error::Result;
use taqman::Experiment;

#[derive(Parser, Debug)]
#[clap(
    name = "taqman",
    version,
    about = "Calls SNPs from a TaqMan export and prints one barcode per sample."
)]
struct Args {
    /// The TaqMan text export to read.
    input: PathBuf,

    /// Where to write the barcodes. Defaults to stdout.
    output: Option<PathBuf>,
}

fn run(args: &Args) -> Result<()> {
    let experiment = Experiment::from_path(&args.input)?;
    let barcodes = experiment.barcodes()?;

    // Nothing is written until every barcode is known.
    let mut rendered = Vec::new();
    write_barcodes(&mut rendered, &barcodes)?;

    match &args.output {
        Some(path) => {
            fs::write(path, &rendered)?;
            info!("Wrote {} barcodes to {}", barcodes.len(), path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&rendered)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
