// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Nexa-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Nexa and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Nexa CLI entrypoint.
//!
//! Every command opens the workspace stored under `--store` (default `.nexa`), applies one
//! action through a [`WorkspaceSession`] and writes the result back. Replies come from the
//! offline scripted streamer and are printed as they arrive.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use nexa::model::{ConversationSnapshot, MessageId, ModelProviderSettings, NodeId, NoteId};
use nexa::ops::{BranchMode, BranchRequest, NewNote};
use nexa::store::{workspace_to_value, DirStorage, WriteDurability};
use nexa::stream::{redact_key, ScriptedStreamer};
use nexa::{StreamKey, StreamUpdate, WorkspaceSession};

const LOG_ENV: &str = "NEXA_LOG";

#[derive(Parser)]
#[command(name = "nexa")]
#[command(about = "Branching conversation workspace", long_about = None)]
struct Cli {
    /// Directory holding the workspace files
    #[arg(long, global = true, default_value = ".nexa")]
    store: PathBuf,
    /// fsync every write before renaming it into place
    #[arg(long, global = true)]
    durable_writes: bool,
    /// Log at debug level (overridden by NEXA_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the active conversation as a tree
    Show {
        /// Emit the stored workspace JSON instead
        #[arg(long)]
        json: bool,
    },

    /// Send a message to the active node and stream the reply
    Send { text: String },

    /// Branch from a message, optionally asking about a quoted selection
    Branch {
        #[arg(long)]
        node: String,
        #[arg(long)]
        message: String,
        /// Text from the message to follow up on
        #[arg(long)]
        selection: Option<String>,
    },

    /// Ask for another reply to a user message
    Retry {
        #[arg(long)]
        node: String,
        #[arg(long)]
        message: String,
    },

    /// List, add or remove notes
    Notes {
        #[command(subcommand)]
        command: Option<NoteCommands>,
    },

    /// Show or change the model provider
    Settings {
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Delete the stored workspace and start over
    Reset,
}

#[derive(Subcommand)]
enum NoteCommands {
    /// Save a note that points at a message of the active conversation
    Add {
        #[arg(long)]
        node: String,
        #[arg(long)]
        message: String,
        text: String,
    },
    Remove { id: String },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV)
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let Cli {
        store,
        durable_writes,
        verbose,
        command,
    } = Cli::parse();
    init_logging(verbose);

    let durability = if durable_writes {
        WriteDurability::Durable
    } else {
        WriteDurability::BestEffort
    };
    let storage = Arc::new(DirStorage::new(&store).with_durability(durability));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the runtime")?;
    runtime.block_on(async {
        let mut session = WorkspaceSession::open(storage, Arc::new(ScriptedStreamer::new()));
        let result = run(&mut session, command).await;
        session.shutdown().await;
        if !session.last_save_succeeded() {
            eprintln!("warning: the workspace could not be saved to {}", store.display());
        }
        result
    })
}

async fn run(session: &mut WorkspaceSession, command: Commands) -> Result<()> {
    match command {
        Commands::Show { json } => {
            if json {
                let value = workspace_to_value(session.state())?;
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                print_workspace(session);
            }
        }
        Commands::Send { text } => {
            let key = session.send_message(&text)?;
            print_reply(session, &key).await;
        }
        Commands::Branch {
            node,
            message,
            selection,
        } => {
            let request = BranchRequest {
                mode: match selection {
                    Some(text) => BranchMode::Selection { text },
                    None => BranchMode::Clone,
                },
                source_node_id: NodeId::new(node)?,
                source_message_id: MessageId::new(message)?,
            };
            let started = session.branch(&request)?;
            println!("branch {}", started.node_id);
            if let Some(key) = started.stream {
                print_reply(session, &key).await;
            }
        }
        Commands::Retry { node, message } => {
            let key = session.retry(&NodeId::new(node)?, &MessageId::new(message)?)?;
            print_reply(session, &key).await;
        }
        Commands::Notes { command } => match command {
            None => {
                for note in session.state().notes() {
                    println!("{}  {}  ({})", note.id, note.title, note.source_message_id);
                }
            }
            Some(NoteCommands::Add {
                node,
                message,
                text,
            }) => {
                let id = session.add_note(NewNote {
                    content: text,
                    source_conversation_id: session.active_conversation_id().clone(),
                    source_node_id: NodeId::new(node)?,
                    source_message_id: MessageId::new(message)?,
                })?;
                println!("note {id}");
            }
            Some(NoteCommands::Remove { id }) => {
                session.remove_note(&NoteId::new(id)?)?;
            }
        },
        Commands::Settings { url, api_key } => {
            if url.is_some() || api_key.is_some() {
                let current = session.state().model_provider().clone();
                session.update_model_provider(ModelProviderSettings {
                    provider_url: url.unwrap_or(current.provider_url),
                    api_key: api_key.unwrap_or(current.api_key),
                })?;
            }
            let provider = session.state().model_provider();
            println!("provider_url: {}", provider.provider_url);
            println!("api_key: {}", redact_key(&provider.api_key));
        }
        Commands::Reset => {
            session.reset();
            println!("workspace reset");
        }
    }

    Ok(())
}

async fn print_reply(session: &mut WorkspaceSession, key: &StreamKey) {
    let mut stdout = std::io::stdout();
    while let Some(update) = session.next_update().await {
        match update {
            StreamUpdate::Delta { key: ref from, delta } if from == key => {
                let _ = write!(stdout, "{delta}");
                let _ = stdout.flush();
            }
            StreamUpdate::Finished { key: ref from, outcome } if from == key => {
                let _ = writeln!(stdout);
                if outcome.is_interrupted() {
                    eprintln!("reply {outcome:?}");
                }
            }
            _ => {}
        }
    }
}

fn print_workspace(session: &WorkspaceSession) {
    for conversation in session.state().conversations() {
        let marker = if conversation.id() == session.active_conversation_id() {
            '*'
        } else {
            ' '
        };
        println!("{marker} {}  {}", conversation.id(), conversation.title());
    }
    if let Some(snapshot) = session.active_snapshot() {
        println!();
        if let Some(root) = snapshot.root() {
            print_node(snapshot, root.id(), 0);
        }
    }
}

fn print_node(snapshot: &ConversationSnapshot, node_id: &NodeId, depth: usize) {
    let indent = "  ".repeat(depth);
    let Some(node) = snapshot.node(node_id) else {
        return;
    };
    let marker = if node_id == snapshot.active_node_id() {
        "*"
    } else {
        "-"
    };
    println!("{indent}{marker} {}  [{}]", node.title(), node.id());
    for message in snapshot.messages(node_id) {
        println!(
            "{indent}    {} {}: {}",
            message.id(),
            message.role().as_str(),
            message.content()
        );
    }
    for child in snapshot.children_of(node_id) {
        print_node(snapshot, child.id(), depth + 1);
    }
}
