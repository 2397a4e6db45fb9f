//! formpack command line
//!
//! - `generate`: fill the selected forms and assemble them with attachments
//! - `totals`: print computed totals and any mismatch with the entered total
//! - `fields`: list the form fields of a template PDF

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use formpack_core::acroform::{list_widgets, read_value};
use formpack_core::{generate_package, Attachment, Config, FormSession, PackageTotals};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for formpack
#[derive(Parser, Debug)]
#[command(name = "formpack")]
#[command(version, about = "Club finance form filler and package assembler")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fill the forms in a session and write the merged package
    Generate {
        /// Session file (JSON) with the form inputs
        #[arg(short, long)]
        session: PathBuf,

        /// Configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Extra attachments, appended after the session's own
        #[arg(short, long = "attach")]
        attach: Vec<PathBuf>,

        /// Directory for the package, overriding the configuration
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Print the computed totals of a session as JSON
    Totals {
        /// Session file (JSON) with the form inputs
        #[arg(short, long)]
        session: PathBuf,

        /// Configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// List the form fields of a template PDF
    Fields {
        /// Template PDF
        template: PathBuf,

        /// Print JSON instead of one line per widget
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::registry()
        .with(log_filter(cli.verbose, rust_log.as_deref()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Command::Generate {
            session,
            config,
            attach,
            output_dir,
        } => generate(&session, config.as_deref(), attach, output_dir),
        Command::Totals { session, config } => totals(&session, config.as_deref()),
        Command::Fields { template, json } => fields(&template, json),
    }
}

/// `RUST_LOG` directives when set and valid, else INFO (DEBUG with `-v`)
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(log_level.to_string()))
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::from_file(path),
        None => Ok(Config::default()),
    }
}

fn load_session(path: &Path) -> anyhow::Result<FormSession> {
    FormSession::from_file(path)
        .with_context(|| format!("Failed to load session: {}", path.display()))
}

/// Session attachment paths are relative to the session file
fn session_attachments(session: &FormSession, session_path: &Path) -> Vec<PathBuf> {
    let base = session_path.parent().unwrap_or_else(|| Path::new(""));
    session
        .attachments
        .iter()
        .map(|path| {
            if path.is_relative() {
                base.join(path)
            } else {
                path.clone()
            }
        })
        .collect()
}

fn generate(
    session_path: &Path,
    config_path: Option<&Path>,
    attach: Vec<PathBuf>,
    output_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let session = load_session(session_path)?;

    let mut paths = session_attachments(&session, session_path);
    paths.extend(attach);

    let collected = session.collect(&config.address_book);
    if collected.is_empty() && paths.is_empty() {
        bail!("Nothing to generate: the session selects no forms and has no attachments");
    }

    let attachments = paths
        .iter()
        .map(|path| {
            Attachment::from_path(path)
                .with_context(|| format!("Failed to load attachment: {}", path.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    info!("Generating package for {:?}", session.selected_forms());

    let totals = PackageTotals::compute(&collected);
    debug!("Computed totals: {:?}", totals);

    let package = generate_package(
        &collected,
        &config,
        attachments,
        chrono::Local::now().naive_local(),
    )
    .context("Failed to generate package")?;

    let dir = output_dir.unwrap_or_else(|| config.output.directory.clone());
    let path = package
        .write_to_dir(&dir)
        .with_context(|| format!("Failed to write package to {}", dir.display()))?;

    println!("{}", path.display());
    Ok(())
}

fn totals(session_path: &Path, config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let session = load_session(session_path)?;
    let collected = session.collect(&config.address_book);

    let totals = PackageTotals::compute(&collected);
    if totals.mismatch.is_some() {
        warn!("Cover sheet total needs review");
    }

    println!("{}", serde_json::to_string_pretty(&totals)?);
    Ok(())
}

fn fields(template: &Path, json: bool) -> anyhow::Result<()> {
    let doc = lopdf::Document::load(template)
        .with_context(|| format!("Failed to open template: {}", template.display()))?;
    let widgets = list_widgets(&doc);
    info!("{} widgets in {}", widgets.len(), template.display());

    if json {
        println!("{}", serde_json::to_string_pretty(&widgets)?);
        return Ok(());
    }

    for widget in &widgets {
        let value = read_value(&doc, widget).unwrap_or_default();
        println!(
            "{}\t{:?}\t{}\t[{}]\t{}",
            widget.page,
            widget.kind,
            widget.name,
            widget.states.join(", "),
            value
        );
    }
    Ok(())
}
