//! scenelink CLI
//!
//! Inspect and edit a scene snapshot (JSON) through the scenelink facade:
//! - list the reference graph, flat or recursive
//! - load / unload / lock / remove / import / rename references
//! - read and write workspace rule tables and scene file info
//! - run the file operation table (exports, reference creation)
//!
//! Commands that change the scene write the snapshot back to `--scene`.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use scenelink::{
    EntryKind, FileOptions, FileOutcome, FileType, ReferenceIdentity, ReferenceNode, Session,
    SessionConfig,
};
use scenelink_host::SimulatedHost;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scenelink")]
#[command(author, version, about = "scenelink: inspect and edit scene references")]
struct Cli {
    /// Scene snapshot (JSON) to operate on.
    #[arg(short, long, global = true)]
    scene: Option<PathBuf>,

    /// Session configuration (JSON).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace). Overrides RUST_LOG.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the scene's references keyed by namespace.
    Refs {
        /// Include nested references under `parent:child` keys.
        #[arg(short, long)]
        recursive: bool,
        #[arg(long)]
        json: bool,
    },

    /// List top-level namespaces in scene order.
    Namespaces,

    /// Show one reference.
    Ref {
        namespace: String,
        #[arg(long)]
        json: bool,
    },

    /// Load a reference, optionally re-targeting it at another file.
    Load {
        namespace: String,
        #[arg(long)]
        replace: Option<String>,
    },

    Unload { namespace: String },
    Lock { namespace: String },
    Unlock { namespace: String },
    Remove { namespace: String },

    /// Merge a reference's contents into the scene.
    Import { namespace: String },

    /// Rename a reference's namespace.
    Rename { namespace: String, new_namespace: String },

    /// Reference a file into the scene.
    CreateRef {
        path: String,
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Read or write a workspace rule table
    /// (object-types, file-rules, render-types, variables).
    Rules {
        kind: String,
        name: Option<String>,
        value: Option<String>,
    },

    /// Read or write scene file info.
    Info { key: Option<String>, value: Option<String> },

    /// Remove a file info key and print its value.
    InfoPop {
        key: String,
        #[arg(long)]
        default: Option<String>,
    },

    /// Split a raw reference path into base path and copy number.
    ParseRef { raw: String },

    /// Run a file operation by name (exportAll, exportSelected, ...).
    Export {
        operation: String,
        path: String,
        /// Explicit file type tag; inferred from the extension when omitted.
        #[arg(short = 't', long = "type")]
        file_type: Option<String>,
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Serialize)]
struct ReferenceRow {
    key: String,
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    copy_number: Option<u32>,
    raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    loaded: Option<bool>,
}

impl ReferenceRow {
    fn new(key: &str, node: &ReferenceNode) -> Self {
        Self {
            key: key.to_string(),
            path: node.path().to_string(),
            copy_number: node.copy_number(),
            raw: node.with_copy_number(),
            loaded: node.is_loaded().ok(),
        }
    }
}

#[derive(Serialize)]
struct ReferenceDetail {
    #[serde(flatten)]
    row: ReferenceRow,
    locked: bool,
    handle: Option<String>,
    nodes: Vec<String>,
    children: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Commands::ParseRef { raw } = &cli.command {
        cmd_parse_ref(raw);
        return Ok(());
    }

    let scene = cli
        .scene
        .clone()
        .ok_or_else(|| anyhow!("--scene <snapshot.json> is required for this command"))?;
    let host = Arc::new(
        SimulatedHost::load(&scene)
            .with_context(|| format!("failed to read scene snapshot {}", scene.display()))?,
    );
    let config = load_config(cli.config.as_deref())?;
    let session = Session::with_config(host.clone(), config);

    let changed = run(&session, cli.command)?;
    if changed {
        host.save(&scene)
            .with_context(|| format!("failed to write scene snapshot {}", scene.display()))?;
        tracing::info!(scene = %scene.display(), "snapshot written");
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<SessionConfig> {
    let Some(path) = path else {
        return Ok(SessionConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

/// Execute one command; returns whether the scene changed.
fn run(session: &Session, command: Commands) -> Result<bool> {
    match command {
        Commands::Refs { recursive, json } => {
            cmd_refs(session, recursive, json)?;
            Ok(false)
        }
        Commands::Namespaces => {
            for ns in session.list_namespaces() {
                println!("{ns}");
            }
            Ok(false)
        }
        Commands::Ref { namespace, json } => {
            cmd_ref(session, &namespace, json)?;
            Ok(false)
        }
        Commands::Load { namespace, replace } => {
            let mut node = session.reference_by_namespace(&namespace)?;
            node.load(replace.as_deref())?;
            done("loaded", &node.with_copy_number());
            Ok(true)
        }
        Commands::Unload { namespace } => {
            let node = session.reference_by_namespace(&namespace)?;
            node.unload()?;
            done("unloaded", &node.with_copy_number());
            Ok(true)
        }
        Commands::Lock { namespace } => {
            let node = session.reference_by_namespace(&namespace)?;
            node.lock()?;
            done("locked", &node.with_copy_number());
            Ok(true)
        }
        Commands::Unlock { namespace } => {
            let node = session.reference_by_namespace(&namespace)?;
            node.unlock()?;
            done("unlocked", &node.with_copy_number());
            Ok(true)
        }
        Commands::Remove { namespace } => {
            let node = session.reference_by_namespace(&namespace)?;
            node.remove()?;
            done("removed", &node.with_copy_number());
            Ok(true)
        }
        Commands::Import { namespace } => {
            let node = session.reference_by_namespace(&namespace)?;
            node.import_contents()?;
            done("imported", &node.with_copy_number());
            Ok(true)
        }
        Commands::Rename {
            namespace,
            new_namespace,
        } => {
            let node = session.reference_by_namespace(&namespace)?;
            node.set_namespace(&new_namespace)?;
            done("renamed", &format!("{namespace} → {new_namespace}"));
            Ok(true)
        }
        Commands::CreateRef { path, namespace } => {
            let mut options = FileOptions::new();
            if let Some(ns) = namespace {
                options = options.namespace(ns);
            }
            let node = session.files().create_reference(&path, &options)?;
            let ns = node.namespace()?;
            done("referenced", &format!("{} as {ns}", node.with_copy_number()));
            Ok(true)
        }
        Commands::Rules { kind, name, value } => cmd_rules(session, &kind, name, value),
        Commands::Info { key, value } => cmd_info(session, key, value),
        Commands::InfoPop { key, default } => {
            let info = session.file_info();
            let present = info.contains(&key)?;
            let value = info.pop(&key, default.as_deref())?;
            println!("{value}");
            Ok(present)
        }
        Commands::ParseRef { raw } => {
            cmd_parse_ref(&raw);
            Ok(false)
        }
        Commands::Export {
            operation,
            path,
            file_type,
            force,
        } => {
            let mut options = FileOptions::new();
            if let Some(tag) = file_type {
                options = options.file_type(FileType::from(tag));
            }
            if force {
                options = options.force();
            }
            let outcome = session.file_operation(&operation, Some(&path), &options)?;
            match &outcome {
                FileOutcome::Reference(node) => done("referenced", &node.with_copy_number()),
                other => done("wrote", &other.to_string()),
            }
            Ok(true)
        }
    }
}

fn done(verb: &str, what: &str) {
    eprintln!("{} {}", verb.green().bold(), what.bold());
}

fn cmd_refs(session: &Session, recursive: bool, json: bool) -> Result<()> {
    let graph = session.list_references(recursive);
    let rows: Vec<ReferenceRow> = graph
        .iter()
        .map(|(key, node)| ReferenceRow::new(key, node))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        eprintln!("{}", "no references".dimmed());
        return Ok(());
    }
    for row in rows {
        let state = match row.loaded {
            Some(true) => "loaded".green(),
            Some(false) => "deferred".yellow(),
            None => "unknown".red(),
        };
        println!("{:<24} {} [{}]", row.key.bold(), row.raw, state);
    }
    Ok(())
}

fn cmd_ref(session: &Session, namespace: &str, json: bool) -> Result<()> {
    let node = session.reference_by_namespace(namespace)?;
    let detail = ReferenceDetail {
        row: ReferenceRow::new(namespace, &node),
        locked: node.is_locked()?,
        handle: node.backing_handle().map(|h| h.to_string()),
        nodes: node.nodes()?,
        children: node.sub_references().keys().map(str::to_string).collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }
    println!("{}", namespace.bold());
    println!("  {} {}", "path:".cyan(), detail.row.path);
    if let Some(n) = detail.row.copy_number {
        println!("  {} {n}", "copy:".cyan());
    }
    println!(
        "  {} {}",
        "node:".cyan(),
        detail.handle.as_deref().unwrap_or("-")
    );
    println!(
        "  {} {}{}",
        "state:".cyan(),
        if detail.row.loaded == Some(false) { "deferred" } else { "loaded" },
        if detail.locked { ", locked" } else { "" }
    );
    for n in &detail.nodes {
        println!("  {} {n}", "→".cyan());
    }
    for child in &detail.children {
        println!("  {} {child}", "↳".yellow());
    }
    Ok(())
}

fn cmd_rules(session: &Session, kind: &str, name: Option<String>, value: Option<String>) -> Result<bool> {
    let kind: EntryKind = kind.parse()?;
    let table = session.workspace().entries(kind);
    match (name, value) {
        (None, None) => {
            for (k, v) in table.items()? {
                println!("{k}\t{v}");
            }
            Ok(false)
        }
        (Some(name), None) => {
            println!("{}", table.get(&name)?);
            Ok(false)
        }
        (Some(name), Some(value)) => {
            table.set(&name, &value)?;
            done("set", &format!("{kind} {name} = {value}"));
            Ok(true)
        }
        (None, Some(_)) => bail!("a value needs a name"),
    }
}

fn cmd_info(session: &Session, key: Option<String>, value: Option<String>) -> Result<bool> {
    let info = session.file_info();
    match (key, value) {
        (None, _) => {
            for (k, v) in info.items()? {
                println!("{k}\t{v}");
            }
            Ok(false)
        }
        (Some(key), None) => {
            println!("{}", info.get(&key)?);
            Ok(false)
        }
        (Some(key), Some(value)) => {
            info.set(&key, &value)?;
            done("set", &format!("{key} = {value}"));
            Ok(true)
        }
    }
}

fn cmd_parse_ref(raw: &str) {
    let id = ReferenceIdentity::parse(raw);
    println!("{}", id.base());
    if let Some(n) = id.copy_number() {
        println!("{n}");
    }
}
