use anyhow::Result;
use clap::Parser;
use compliance_review::cli;

fn main() -> Result<()> {
    let args = cli::Args::parse();
    if let Err(err) = cli::dispatch(args) {
        // Logging may not be up yet when the config itself failed.
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
    Ok(())
}
