//! climind CLI: localize the climate-risk ontology for a session.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::Result;

use climind_localize::config::LocalizeConfig;
use climind_localize::engine::{Localized, Localizer};
use climind_localize::error::ConfigError;
use climind_localize::ontology::SharedOntology;
use climind_localize::ontology::load::{load_with_backup, save_graph};
use climind_localize::store::durable::DurableStore;
use climind_localize::store::mem::MemStore;
use climind_localize::store::{RelevanceImport, SessionStore};

#[derive(Parser)]
#[command(name = "climind", version, about = "Climate-risk ontology localization")]
struct Cli {
    /// TOML config file. Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Master ontology graph (overrides `paths.graph_file`).
    #[arg(long, global = true)]
    graph: Option<PathBuf>,

    /// Data directory for sessions and relevance rows (overrides `paths.data_dir`).
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show graph statistics and causal loops.
    Info,

    /// List the seed leaves of the acyclic projection.
    Leaves,

    /// Manage session postal codes.
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Manage relevance data.
    Relevance {
        #[command(subcommand)]
        action: RelevanceAction,
    },

    /// Localize the ontology for one session.
    Localize {
        /// Session (quiz) identifier.
        #[arg(long)]
        session: String,

        /// Write the resulting graph as node-link JSON.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Record the postal code for a session.
    Set {
        session: String,
        postal_code: String,
    },
    /// Show the postal code recorded for a session.
    Show { session: String },
}

#[derive(Subcommand)]
enum RelevanceAction {
    /// Import relevance rows from a JSON file.
    Import {
        #[arg(long)]
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => LocalizeConfig::from_file(path)?,
        None => LocalizeConfig::default(),
    };
    if let Some(graph) = cli.graph {
        config.paths.graph_file = graph;
    }
    if let Some(dir) = cli.data_dir {
        config.paths.data_dir = Some(dir);
    }

    match cli.command {
        Commands::Info => {
            let graph = load_master(&config)?;
            let graph = graph.graph();
            println!("ontology graph");
            println!("  nodes:  {}", graph.node_count());
            println!("  edges:  {}", graph.edge_count());
            let loops = graph.cyclic_components();
            println!("  causal loops: {}", loops.len());
            for members in &loops {
                println!("    [{}] {}", members.len(), members.join(", "));
            }
        }

        Commands::Leaves => {
            // Seed selection reads only the graph.
            let ontology = load_master(&config)?;
            let store = Arc::new(MemStore::new());
            let localizer = Localizer::new(config, ontology, store.clone(), store)?;
            let (graph, seeds) = localizer.terminal_nodes()?;
            println!("Terminal nodes ({}):", seeds.len());
            for idx in seeds {
                if let Some(node) = graph.node(idx) {
                    println!("  {} <{}>", node.id, node.iri);
                }
            }
        }

        Commands::Session { action } => {
            let store = open_store(&config)?;
            match action {
                SessionAction::Set {
                    session,
                    postal_code,
                } => {
                    store.set_postal_code(&session, &postal_code)?;
                    println!("Recorded postal code {postal_code} for {session}");
                }
                SessionAction::Show { session } => match store.postal_code(&session)? {
                    Some(code) => println!("{session}: {code}"),
                    None => println!("{session}: no postal code recorded"),
                },
            }
        }

        Commands::Relevance { action } => {
            let store = open_store(&config)?;
            match action {
                RelevanceAction::Import { file } => {
                    let import = RelevanceImport::from_file(&file)?;
                    let count = import.apply(&store)?;
                    println!(
                        "Imported {count} relevance rows ({} columns) from {}",
                        import.columns.len(),
                        file.display()
                    );
                }
            }
        }

        Commands::Localize { session, output } => {
            let localizer = build_localizer(&config)?;
            let result = localizer.localize(&session)?;
            match &result {
                Localized::Unchanged { reason, .. } => {
                    println!("Not localized: {reason}");
                }
                Localized::Localized { report, .. } => {
                    println!("Localized for postal code {}", report.postal_code);
                    println!("  cycle edges dropped: {}", report.removed_edges.len());
                    println!("  annotated nodes:     {}", report.annotation.annotated);
                    println!("  unmatched columns:   {}", report.annotation.unmatched);
                    println!("  seeds:               {}", report.propagation.seeds);
                    println!("  resolved nodes:      {}", report.propagation.visited);
                    println!("    possibly local:    {}", report.propagation.local);
                    println!("    not local:         {}", report.propagation.not_local);
                }
            }
            if let Some(path) = output {
                save_graph(result.graph(), &path)?;
                println!("Wrote {}", path.display());
            }
        }
    }

    Ok(())
}

fn load_master(config: &LocalizeConfig) -> Result<SharedOntology> {
    let graph = load_with_backup(
        &config.paths.graph_file,
        config.paths.graph_backup_file.as_deref(),
    )?;
    Ok(SharedOntology::new(graph))
}

fn open_store(config: &LocalizeConfig) -> Result<DurableStore> {
    let Some(dir) = &config.paths.data_dir else {
        return Err(ConfigError::Invalid {
            message: "a data directory is required (--data-dir or paths.data_dir)".into(),
        }
        .into());
    };
    Ok(DurableStore::open(dir)?)
}

fn build_localizer(config: &LocalizeConfig) -> Result<Localizer> {
    let ontology = load_master(config)?;
    let store = Arc::new(open_store(config)?);
    Ok(Localizer::new(
        config.clone(),
        ontology,
        store.clone(),
        store,
    )?)
}
