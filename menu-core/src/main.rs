//! src/main.rs
//! `menuctl`: inspect, audit, render and export action menus.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use menu_core::{
    ActionRegistry, Logger, MenuResult,
    audit::Auditor,
    composition::{CompositionEngine, FilterMode, render_text},
    config::Config,
    discovery::{ActionTags, LoadedModule, ModuleUnit, ScanReport, Scanner, TaggedHandler},
    registry::{HandlerRef, SummaryView},
    serializer::{self, ImportMode},
};

#[derive(Parser, Debug)]
#[command(name = "menuctl")]
#[command(about = "Inspect, audit and render action menus")]
#[command(version)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Menu document to read and write (overrides `menus_path`)
    #[arg(long, global = true)]
    document: Option<PathBuf>,

    /// Scan this action directory before loading the menu document
    #[arg(long, global = true)]
    actions: Option<PathBuf>,

    /// Mirror log output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run discovery over an action directory and print group counts
    Scan {
        /// Defaults to the configured discovery base path
        dir: Option<PathBuf>,
    },
    /// Check every composition against the registry
    Audit {
        /// Exit with an error when any finding is an error
        #[arg(long)]
        fail_fast: bool,
    },
    /// Print the menu built from one composition
    Render {
        composition: String,
        /// Filter mode, e.g. `All`, `Videos`, `Subtitles`
        #[arg(long)]
        mode: Option<String>,
    },
    /// Print the registry contents
    Summary {
        #[arg(long)]
        flat: bool,
    },
    /// Regenerate the menu document from the registry
    Export {
        /// Keep only groups starting with this prefix
        #[arg(long)]
        filter: Option<String>,
        /// Print the document to stdout
        #[arg(long)]
        print: bool,
        /// Write the document to its configured path
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path).await,
        None => Config::load().await,
    }
    .context("Failed to load configuration")?;

    if cli.verbose {
        config.logging.stderr = true;
    }
    let _guard = Logger::init(&config.logging).context("Failed to initialize logging")?;
    info!(command = ?cli.command, "menuctl starting");

    let document_path = match &cli.document {
        Some(path) => path.clone(),
        None => config.menus_path()?,
    };

    match cli.command {
        Command::Scan { dir } => {
            let scanner = Scanner::new(&config.discovery, &stem_loader);
            let mut registry = ActionRegistry::new();
            let report = match &dir {
                Some(dir) => scanner.scan(dir, &mut registry),
                None => scanner.scan_configured(&mut registry),
            };
            print_scan_report(dir.as_deref().unwrap_or(&config.discovery.base_path), &report);
        }

        Command::Audit { fail_fast } => {
            let mut registry = load_registry(&config, cli.actions.as_deref(), &document_path).await?;
            let report = Auditor::default()
                .with_dynamic_groups(&config.dynamic_filter.groups)
                .run(&config.compositions, &mut registry);

            report.log();
            for finding in report.findings() {
                println!("{finding}");
            }
            if report.findings().is_empty() {
                println!("No findings.");
            }
            report.into_result(fail_fast || config.audit.fail_fast)?;
        }

        Command::Render { composition, mode } => {
            let registry = load_registry(&config, cli.actions.as_deref(), &document_path).await?;
            let mode: FilterMode = match mode {
                Some(raw) => FilterMode::from(raw),
                None => config.dynamic_filter.initial_mode.clone(),
            };

            let engine = CompositionEngine::new(
                config.compositions.clone(),
                config.dynamic_filter.clone(),
                mode,
            );
            if engine.composition(&composition).is_none() {
                bail!("Unknown composition: {composition}");
            }

            let items = engine.build(&composition, &registry);
            print!("{}", render_text(&items));
        }

        Command::Summary { flat } => {
            let registry = load_registry(&config, cli.actions.as_deref(), &document_path).await?;
            let view = if flat { SummaryView::Flat } else { SummaryView::Tree };
            print!("{}", registry.summary(view));

            let shared = registry.discover_shared_groups(&config.shared_groups);
            if !shared.is_empty() {
                println!("Shared groups: {}", shared.join(", "));
            }
        }

        Command::Export {
            filter,
            print,
            write,
        } => {
            let registry = load_registry(&config, cli.actions.as_deref(), &document_path).await?;
            let document = serializer::export(&registry, filter.as_deref());

            if print || !write {
                print!("{}", document.to_toml_string()?);
            }
            if write {
                serializer::write_document(&document_path, &document).await?;
                println!(
                    "Wrote {} item(s) in {} group(s) to {}",
                    document.record_count(),
                    document.menus.len(),
                    document_path.display()
                );
            }
        }
    }

    Ok(())
}

/// Registry as the host would see it: the scanned action tree, if given,
/// then the menu document on top. Document actions with no scanned handler
/// become disabled placeholders.
async fn load_registry(
    config: &Config,
    actions: Option<&Path>,
    document_path: &Path,
) -> Result<ActionRegistry> {
    let mut registry = ActionRegistry::new();

    if let Some(dir) = actions {
        Scanner::new(&config.discovery, &stem_loader).scan(dir, &mut registry);
    }

    if document_path.exists() {
        let document = serializer::read_document(document_path).await?;
        let lookup = registry.handler_index();
        serializer::import(&document, &lookup, &mut registry, ImportMode::Merge);
    } else {
        warn!(
            "No menu document at {}, registry holds scanned actions only",
            document_path.display()
        );
    }

    Ok(registry)
}

/// Each module file exposes one action named after the file; packages
/// expose nothing of their own.
fn stem_loader(unit: &ModuleUnit) -> MenuResult<LoadedModule> {
    if unit.is_package {
        return Ok(LoadedModule::default());
    }

    let name = unit
        .name
        .rsplit("::")
        .next()
        .unwrap_or(unit.name.as_str())
        .to_string();
    let module = unit.name.clone();
    let handler = HandlerRef::new(name, move || info!(module = %module, "Action invoked"));

    Ok(LoadedModule {
        skip_scan: false,
        handlers: vec![TaggedHandler {
            handler,
            tags: ActionTags::default(),
        }],
    })
}

fn print_scan_report(dir: &Path, report: &ScanReport) {
    println!("Scanned {}", dir.display());
    for (group, count) in &report.group_counts {
        println!("  {group}: {count}");
    }
    println!(
        "{} module(s) loaded, {} failed, {} skipped, {} duplicate(s)",
        report.modules_loaded, report.modules_failed, report.modules_skipped, report.duplicates
    );
}
