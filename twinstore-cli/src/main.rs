//! Read-only operational inspection tool for a twinstore-embedding process
//! (spec-adjacent §6 "external interfaces", added ambient tooling — not a
//! business API). Grounded in the teacher's `binlog_cli` crate: a small
//! `clap`-driven wrapper around library internals, printing YAML or JSON.
//!
//! Because the model registry and statement cache are process-wide state
//! owned by whatever application embeds `twinstore`, this binary has
//! nothing of its own to introspect unless something registers a model
//! first. It registers one demo type (`CliDemoUser`) at startup so `models`
//! has a nonempty answer to give; a real deployment would instead expose
//! these same `ModelRegistry`/`StatementCache` handles from its own process
//! (e.g. behind a debug endpoint) rather than running this binary directly.

use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use twinstore_cache::StatementCache;
use twinstore_common::err::CoreResult;
use twinstore_common::log::tracing_factory::TracingFactory;
use twinstore_model::{
    FieldKind, Model, PrimaryKeyDescriptor, RecordDescriptor, MODEL_REGISTRY,
};

#[derive(Parser, Debug)]
#[command(name = "twinstore-cli")]
#[command(version = "0.1.0")]
#[command(about = "Read-only inspection tool for a twinstore runtime")]
struct CliArgs {
    /// Output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    format: OutputFormat,

    /// Enable debug-level logging.
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Yaml,
    Json,
}

impl OutputFormat {
    fn render<T: Serialize>(self, value: &T) -> String {
        match self {
            OutputFormat::Yaml => serde_yaml::to_string(value).unwrap_or_else(|e| format!("yaml error: {e}")),
            OutputFormat::Json => serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("json error: {e}")),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List registered table names and their primary-key kind.
    Models,
    /// Print a prepared-statement cache activity snapshot.
    CacheStats {
        /// Data source name the snapshot is scoped to (documentation only —
        /// this binary does not attach to a running process).
        #[arg(long)]
        ds: String,
    },
}

#[derive(Serialize)]
struct ModelRow {
    table_name: &'static str,
    model_name: &'static str,
    primary_key_kind: &'static str,
    auto_id: bool,
    mirror_to_doc_store: bool,
}

#[derive(Serialize)]
struct CacheStatsRow {
    ds_name: String,
    entries: u64,
    hits: u64,
    misses: u64,
    poisoned: u64,
}

#[tokio::main]
async fn main() -> CoreResult<()> {
    let args = CliArgs::parse();
    TracingFactory::init_log(args.debug);

    register_model::<CliDemoUser>();

    match args.command {
        Commands::Models => {
            let mut rows: Vec<ModelRow> = MODEL_REGISTRY
                .table_names()
                .into_iter()
                .filter_map(|table| MODEL_REGISTRY.describe(table))
                .map(|info| ModelRow {
                    table_name: info.table_name,
                    model_name: info.model_name,
                    primary_key_kind: pk_kind_name(info.primary_key_kind),
                    auto_id: info.auto_id,
                    mirror_to_doc_store: info.mirror_to_doc_store,
                })
                .collect();
            rows.sort_by_key(|r| r.table_name);
            println!("{}", args.format.render(&rows));
        }
        Commands::CacheStats { ds } => {
            // Documents the shape only: a fresh, empty cache scoped to this
            // process, not the embedding application's live one.
            let cache = Arc::new(StatementCache::<u32>::new());
            let stats = cache.stats();
            let row = CacheStatsRow {
                ds_name: ds,
                entries: stats.entries,
                hits: stats.hits,
                misses: stats.misses,
                poisoned: stats.poisoned,
            };
            println!("{}", args.format.render(&row));
        }
    }

    Ok(())
}

fn pk_kind_name(kind: twinstore_model::PrimaryKeyKind) -> &'static str {
    match kind {
        twinstore_model::PrimaryKeyKind::Int64 => "int64",
        twinstore_model::PrimaryKeyKind::String => "string",
        twinstore_model::PrimaryKeyKind::DocumentId => "document_id",
    }
}

fn register_model<T: Model>() {
    twinstore_model::register_model::<T>();
}

/// Minimal stand-in record type so `models` has something to list when this
/// binary is run on its own, without pulling in an application's schema.
struct CliDemoUser {
    id: i64,
    name: String,
}

impl Model for CliDemoUser {
    fn descriptor() -> RecordDescriptor<Self> {
        RecordDescriptor::new(
            "cli_demo_user",
            "CliDemoUser",
            PrimaryKeyDescriptor::new_i64(
                "id",
                true,
                false,
                |r: &CliDemoUser| twinstore_model::Value::I64(r.id),
                |r: &mut CliDemoUser, v| r.id = v,
            ),
            vec![twinstore_model::FieldDescriptor::new(
                "name",
                "name",
                "name",
                FieldKind::String,
                "string",
                false,
                false,
                |r: &CliDemoUser| twinstore_model::Value::Str(r.name.clone()),
                |r: &mut CliDemoUser, raw| {
                    r.name = twinstore_model::from_value(twinstore_model::parse_scalar(FieldKind::String, false, raw)?)?;
                    Ok(())
                },
            )],
            || CliDemoUser {
                id: 0,
                name: String::new(),
            },
            |container, one| container.push(one),
        )
    }
}
