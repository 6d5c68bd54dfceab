use std::net::Ipv4Addr;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use hugo_rag::{
    api, config,
    document::{AddressingMethod, path_to_link},
    logging,
    processing::{
        ChunkIdCounter, FileFilter, IngestService, IngestSettings, QueryApi, prepare_document,
    },
    qdrant::QdrantService,
};
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(
    name = "hugo-rag",
    about = "Chunk Hugo articles into Qdrant and answer questions from them"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index every article below a content directory.
    Ingest {
        /// Root of the content tree.
        dir: PathBuf,
        /// Index every `.md` file instead of only `index.md` bundles.
        #[arg(long)]
        all_markdown: bool,
        /// First chunk id; use disjoint ranges when several runs share a collection.
        #[arg(long, default_value_t = 0)]
        start_id: u64,
        /// Export a collection snapshot to this file after the run.
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Print the chunks, title and link of one article without indexing it.
    Preview {
        file: PathBuf,
        #[arg(long, default_value_t = hugo_rag::chunking::DEFAULT_CHUNK_MAX_SIZE)]
        max_size: NonZeroUsize,
        #[arg(long, default_value = "1")]
        method: AddressingMethod,
        #[arg(long, default_value = "")]
        base_url: String,
    },
    /// Print the link derived from a source path.
    Link {
        path: String,
        #[arg(long, default_value = "1")]
        method: AddressingMethod,
        #[arg(long, default_value = "")]
        date: String,
    },
    /// Ask a question against the indexed articles.
    Ask {
        question: String,
        /// Also print the retrieved documents.
        #[arg(long)]
        verbose: bool,
    },
    /// Download a snapshot of the collection.
    Export { file: PathBuf },
    /// Restore the collection from a local snapshot file or a URL the Qdrant server can reach.
    Import { location: String },
    /// Serve the HTTP query API.
    Serve,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    logging::init_tracing();
    if let Err(err) = run().await {
        tracing::error!(error = %format!("{err:#}"), "Command failed");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Preview {
            file,
            max_size,
            method,
            base_url,
        } => {
            let settings = IngestSettings {
                chunk_max_size: max_size,
                addressing_method: method,
                link_base_url: base_url,
                ..IngestSettings::default()
            };
            let prepared = prepare_document(&file, &settings)?;
            println!("Title: {}", prepared.metadata.title);
            println!("Link: {}", prepared.link);
            for (index, chunk) in prepared.chunks.iter().enumerate() {
                println!("Cluster {}: {{{}}}\n / [{}]", index + 1, chunk.text, chunk.context);
            }
        }
        Command::Link { path, method, date } => {
            println!("{}", path_to_link(&path, method, &date)?);
        }
        Command::Ingest {
            dir,
            all_markdown,
            start_id,
            snapshot,
        } => {
            let config = config::init_config()?;
            let service = IngestService::from_config(config)?;
            let filter = if all_markdown {
                FileFilter::AnyMarkdown
            } else {
                FileFilter::IndexOnly
            };
            let mut counter = ChunkIdCounter::starting_at(start_id);
            let report = service.ingest_directory(&dir, filter, &mut counter).await?;
            println!(
                "Indexed {} documents ({} chunks); next id {}",
                report.documents_indexed, report.chunks_indexed, report.next_id
            );
            for path in &report.failed {
                println!("Failed: {}", path.display());
            }
            if let Some(file) = snapshot {
                let store = QdrantService::from_config(config)?;
                let export = store.export_snapshot(&file).await?;
                println!("Snapshot {} written to {}", export.name, file.display());
            }
            if !report.failed.is_empty() {
                bail!("{} documents failed", report.failed.len());
            }
        }
        Command::Ask { question, verbose } => {
            let config = config::init_config()?;
            let service = IngestService::from_config(config)?;
            let response = service.ask(&question).await?;
            if config.chat_model.is_none() {
                println!("Answer: (no CHAT_MODEL configured)");
            } else {
                println!("Answer: {}", response.answer);
            }
            if verbose {
                println!("\nThe following documents were used\n============\n");
                for document in &response.documents {
                    println!("Document ID: {} (score {:.3})", document.id, document.score);
                    println!("Title: {}", document.title);
                    println!("Link: {}", document.link);
                    println!("Content: {}", document.content);
                    println!("Context: {}\n", document.context);
                }
            }
        }
        Command::Export { file } => {
            let config = config::init_config()?;
            let store = QdrantService::from_config(config)?;
            let export = store
                .export_snapshot(&file)
                .await
                .with_context(|| format!("exporting {}", store.collection()))?;
            println!(
                "Snapshot {} ({} bytes) written to {}",
                export.name,
                export.bytes,
                file.display()
            );
        }
        Command::Import { location } => {
            let config = config::init_config()?;
            let store = QdrantService::from_config(config)?;
            store
                .import_snapshot(&location)
                .await
                .with_context(|| format!("importing into {}", store.collection()))?;
            println!("Collection {} restored from {location}", store.collection());
        }
        Command::Serve => {
            let config = config::init_config()?;
            let service = Arc::new(IngestService::from_config(config)?);
            let app = api::create_router(service);
            let (listener, port) = bind_listener(config.server_port).await?;
            tracing::info!("Listening on http://0.0.0.0:{}", port);
            axum::serve(listener, app).await?;
        }
    }
    Ok(())
}

async fn bind_listener(server_port: Option<u16>) -> Result<(TcpListener, u16)> {
    if let Some(port) = server_port {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .with_context(|| format!("binding port {port}"))?;
        return Ok((listener, port));
    }

    const PORT_RANGE: std::ops::RangeInclusive<u16> = 4100..=4199;
    for port in PORT_RANGE {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => {
                tracing::debug!(port, "Bound server port");
                return Ok((listener, port));
            }
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }

    bail!("No available port found in range 4100-4199")
}
