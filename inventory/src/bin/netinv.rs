use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use netinv_docstore::documentstore;
use netinv_inventory::model::{Branch, BranchPatch, NewBranch, NewDevice};
use netinv_inventory::{DeletionFilter, InventoryService, NodeKind, ScopeLevel};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, Level};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Whether to log in JSON
    #[arg(long)]
    json: bool,

    #[arg(long)]
    log_level: Option<Level>,

    #[arg(long, env = "NETINV_STORE_ADDR", default_value = "redb:///var/lib/netinv/branches.redb")]
    store_addr: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Imports branch documents from a JSON file, holding either a single
    /// branch or an array of them.
    Import {
        #[clap(value_name = "FILE")]
        path: PathBuf,
    },
    /// Manages branches.
    #[command(subcommand)]
    Branch(BranchCommands),
    /// Manages devices below branches.
    #[command(subcommand)]
    Device(DeviceCommands),
}

#[derive(Subcommand)]
enum BranchCommands {
    /// Creates a new, empty branch.
    Create {
        #[arg(long)]
        name: String,

        /// Generated if not set.
        #[arg(long)]
        id: Option<String>,
    },
    /// Lists all branches.
    List {
        #[arg(long, default_value_t)]
        filter: DeletionFilter,

        #[arg(long)]
        scope: Option<ScopeLevel>,
    },
    /// Shows a single branch.
    Get {
        id: String,

        #[arg(long, default_value_t)]
        filter: DeletionFilter,

        #[arg(long)]
        scope: Option<ScopeLevel>,
    },
    /// Updates the descriptive fields of a branch, from a JSON patch.
    Update {
        id: String,

        /// e.g. `{"name": "Bandung Timur"}`
        patch: String,
    },
}

#[derive(Subcommand)]
enum DeviceCommands {
    /// Shows a single device with its subtree.
    Get {
        kind: NodeKind,
        id: String,

        #[arg(long, default_value_t)]
        filter: DeletionFilter,

        #[arg(long)]
        scope: Option<ScopeLevel>,
    },
    /// Adds a device below a parent, from a JSON description tagged by its
    /// `type`.
    Add {
        parent_kind: NodeKind,
        parent_id: String,

        /// e.g. `{"type": "ont", "label": "N3"}`
        device: String,
    },
    /// Soft-deletes a device and everything below it.
    Delete { kind: NodeKind, id: String },
    /// Restores a device and everything deleted together with it.
    Restore { kind: NodeKind, id: String },
}

fn print<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut tracing_builder = netinv_tracing::TracingBuilder::default()
        .level(cli.log_level.unwrap_or(Level::INFO));
    if cli.json {
        tracing_builder = tracing_builder.enable_json();
    }
    tracing_builder.build()?;

    let document_store = documentstore::from_addr(&cli.store_addr).await?;
    let service = InventoryService::new(document_store);

    match cli.command {
        Commands::Import { path } => {
            let contents = tokio::fs::read(&path).await?;
            let branches: Vec<Branch> = match serde_json::from_slice::<serde_json::Value>(&contents)? {
                serde_json::Value::Array(elems) => elems
                    .into_iter()
                    .map(serde_json::from_value)
                    .collect::<Result<_, _>>()?,
                value => vec![serde_json::from_value(value)?],
            };

            let mut imported = Vec::with_capacity(branches.len());
            for branch in branches {
                let branch = service.import_branch(branch).await?;
                info!(branch.id = %branch.id, "imported branch");
                imported.push(branch.id);
            }
            print(&imported)?;
        }
        Commands::Branch(cmd) => match cmd {
            BranchCommands::Create { name, id } => {
                let branch = service
                    .create_branch(NewBranch {
                        id,
                        name,
                        address: None,
                        location: None,
                    })
                    .await?;
                print(&branch)?;
            }
            BranchCommands::List { filter, scope } => {
                print(&service.list_branches(filter, scope).await?)?;
            }
            BranchCommands::Get { id, filter, scope } => {
                print(&service.get_branch(&id, filter, scope).await?)?;
            }
            BranchCommands::Update { id, patch } => {
                let patch: BranchPatch = serde_json::from_str(&patch)?;
                print(&service.update_branch(&id, patch).await?)?;
            }
        },
        Commands::Device(cmd) => match cmd {
            DeviceCommands::Get {
                kind,
                id,
                filter,
                scope,
            } => {
                print(&service.get_device(kind, &id, filter, scope).await?)?;
            }
            DeviceCommands::Add {
                parent_kind,
                parent_id,
                device,
            } => {
                let device: NewDevice = serde_json::from_str(&device)?;
                print(&service.add_child(parent_kind, &parent_id, device).await?)?;
            }
            DeviceCommands::Delete { kind, id } => {
                print(&service.soft_delete(kind, &id).await?)?;
            }
            DeviceCommands::Restore { kind, id } => {
                print(&service.restore(kind, &id).await?)?;
            }
        },
    }

    Ok(())
}
