#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::perf,
    clippy::style,
    clippy::missing_safety_doc,
    clippy::missing_const_for_fn
)]
#![allow(clippy::as_conversions, clippy::mod_module_files)]

use std::{
    path::{Path, PathBuf},
    process,
};

use labpubs as lib;

use lib::{export, Config};

use clap::Parser;
use eyre::WrapErr;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, trace};
use reqwest::header::{HeaderMap, HeaderValue};

fn main() {
    if let Err(err) = try_main() {
        error!("{err:?}");
        process::exit(2);
    }
}

fn try_main() -> eyre::Result<()> {
    let Cli {
        out_dir,
        verbosity,
        quiet,
    } = Cli::parse();

    setup_errlog(verbosity as usize, quiet)?;

    let config = Config::load(Path::new(".")).wrap_err("Cannot load the configuration")?;
    trace!(
        "Using group {} with collections {} and {}",
        config.group,
        config.publications,
        config.preprints
    );

    let client = http_client(&config)?;
    let progress = progress_bar(quiet)?;

    let publications = lib::fetch_publications(&client, &config, &progress)
        .wrap_err("Cannot collect the publication list")?;
    progress.finish_and_clear();

    export::write_all(&out_dir, &publications)
        .wrap_err_with(|| format!("Cannot write the exports to '{}'", out_dir.display()))?;

    if let Some(readme) = &config.readme {
        info!("Updating '{}'", readme.display());
        export::write_readme(readme, &publications)
            .wrap_err_with(|| format!("Cannot update '{}'", readme.display()))?;
    }

    if !quiet {
        println!(
            "{} publications written to '{}'",
            publications.len(),
            out_dir.display()
        );
    }
    Ok(())
}

fn setup_errlog(verbosity: usize, quiet: bool) -> eyre::Result<()> {
    // if quiet then ignore verbosity but still show errors
    let verbosity = if quiet { 0 } else { verbosity + 1 };

    // the binary and the library share the `labpubs` crate name
    stderrlog::new()
        .module("labpubs")
        .verbosity(verbosity)
        .init()?;
    Ok(())
}

fn progress_bar(quiet: bool) -> eyre::Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }

    let progress = ProgressBar::new_spinner();
    progress.set_style(ProgressStyle::with_template("{spinner} {pos} items fetched")?);
    Ok(progress)
}

fn http_client(config: &Config) -> eyre::Result<reqwest::blocking::Client> {
    let mut headers = HeaderMap::new();
    headers.insert("Zotero-API-Version", HeaderValue::from_static("3"));
    if let Some(key) = &config.api_key {
        let value =
            HeaderValue::from_str(key).wrap_err("The Zotero API key is not a valid header")?;
        headers.insert("Zotero-API-Key", value);
    }

    reqwest::blocking::Client::builder()
        .user_agent(concat!("labpubs/", env!("CARGO_PKG_VERSION")))
        .default_headers(headers)
        .build()
        .wrap_err("Cannot build the HTTP client")
}

#[derive(Parser)]
#[clap(name = "labpubs")]
#[clap(about = "Fetch the lab publication list from Zotero and export it as JSON, CSV and Markdown")]
#[clap(version, author)]
struct Cli {
    /// Directory to write papers.json, pubs.csv and preprints.csv to
    #[clap(parse(from_os_str), default_value = "data")]
    out_dir: PathBuf,

    /// How chatty the program is
    ///
    /// The number of times this flag is used will increase how chatty
    /// the program is.
    #[clap(short, long, parse(from_occurrences))]
    verbosity: u8,

    /// Only print errors, hides the progress bar and the summary.
    #[clap(short, long)]
    quiet: bool,
}
