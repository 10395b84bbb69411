//! tablekit CLI
//!
//! Runs the table pipeline over a JSON file of records, optionally
//! persisting the view configuration in a state directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tablekit::record::json_columns;
use tablekit::store::{ConfigKey, ConfigStore, FileStorage, MemoryStorage, StorageBackend};
use tablekit::{EngineConfig, FilterCondition, Operator, SortConfig, SortDirection, TableEngine, TableError};
use tracing_subscriber::{fmt, EnvFilter};

/// tablekit CLI
#[derive(Parser, Debug)]
#[command(name = "tablekit-cli")]
#[command(about = "Search, filter and sort JSON records with persisted view config")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the visible set of a JSON array of objects
    View {
        /// Path to a JSON file holding an array of objects with an "id" field
        file: PathBuf,

        /// Free-text search term
        #[arg(short, long)]
        search: Option<String>,

        /// Column filter as column:operator[:value] (repeatable)
        #[arg(short, long = "filter")]
        filters: Vec<String>,

        /// Sort as field[:asc|desc]
        #[arg(long)]
        sort: Option<String>,

        /// Toggle visibility of a column (repeatable)
        #[arg(long = "toggle")]
        toggles: Vec<String>,

        /// Comma-separated column list (default: fields of the first record)
        #[arg(long)]
        columns: Option<String>,

        /// Directory for persisted view config (default: in-memory only)
        #[arg(long)]
        state_dir: Option<PathBuf>,

        /// Storage namespace
        #[arg(short, long, default_value = "table")]
        namespace: String,
    },

    /// Inspect or clear persisted view config
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print every stored key of a namespace
    Show {
        #[arg(long)]
        state_dir: PathBuf,
        #[arg(short, long, default_value = "table")]
        namespace: String,
    },

    /// Remove every stored key of a namespace
    Reset {
        #[arg(long)]
        state_dir: PathBuf,
        #[arg(short, long, default_value = "table")]
        namespace: String,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tablekit=debug"));

    fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();

    let args = Args::parse();

    let outcome = match args.command {
        Commands::View {
            file,
            search,
            filters,
            sort,
            toggles,
            columns,
            state_dir,
            namespace,
        } => run_view(ViewArgs {
            file,
            search,
            filters,
            sort,
            toggles,
            columns,
            state_dir,
            namespace,
        }),
        Commands::Config { action } => run_config(action),
    };

    if let Err(e) = outcome {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

struct ViewArgs {
    file: PathBuf,
    search: Option<String>,
    filters: Vec<String>,
    sort: Option<String>,
    toggles: Vec<String>,
    columns: Option<String>,
    state_dir: Option<PathBuf>,
    namespace: String,
}

fn run_view(args: ViewArgs) -> tablekit::Result<()> {
    let records = load_records(&args.file)?;

    let column_ids: Vec<String> = match &args.columns {
        Some(list) => list.split(',').map(|c| c.trim().to_string()).filter(|c| !c.is_empty()).collect(),
        None => records
            .first()
            .and_then(Value::as_object)
            .map(|obj| obj.keys().cloned().collect())
            .unwrap_or_default(),
    };

    let backend: Arc<dyn StorageBackend> = match &args.state_dir {
        Some(dir) => Arc::new(FileStorage::open(dir)?),
        None => Arc::new(MemoryStorage::new()),
    };

    // One-shot process: write through instead of debouncing
    let config = EngineConfig::builder()
        .namespace(&args.namespace)
        .persist_delay(Duration::ZERO)
        .build();

    let mut engine = TableEngine::builder(json_columns(column_ids))
        .config(config)
        .records(records)
        .storage(backend)
        .build()?;

    replace_filters(&mut engine, &args.filters)?;
    if let Some(term) = &args.search {
        engine.set_search_term(term.as_str());
    }
    if let Some(arg) = &args.sort {
        engine.set_sort_config(parse_sort(arg)?);
    }
    for column in &args.toggles {
        engine.toggle_column_visibility(column);
    }

    let visible = engine.visible_columns();
    println!("{}", visible.join("\t"));
    for record in engine.view() {
        let cells: Vec<String> = visible.iter().map(|c| render_cell(record.get(c))).collect();
        println!("{}", cells.join("\t"));
    }
    eprintln!("{} of {} records", engine.visible_count(), engine.total_count());

    engine.close()?;
    Ok(())
}

fn run_config(action: ConfigAction) -> tablekit::Result<()> {
    match action {
        ConfigAction::Show { state_dir, namespace } => {
            let storage = FileStorage::open(&state_dir)?;
            for key in ConfigKey::ALL {
                let full_key = key.key(&namespace);
                match storage.get(&full_key) {
                    Ok(Some(raw)) => println!("{} = {}", full_key, raw),
                    Ok(None) => println!("{} = <unset>", full_key),
                    Err(e) => println!("{} = <unreadable: {}>", full_key, e),
                }
            }
            Ok(())
        }
        ConfigAction::Reset { state_dir, namespace } => {
            let store = ConfigStore::new(Arc::new(FileStorage::open(&state_dir)?), Duration::ZERO)?;
            let removed = store.remove_namespace(&namespace)?;
            println!("Removed {} key(s) from namespace '{}'", removed, namespace);
            store.close()?;
            Ok(())
        }
    }
}

fn load_records(path: &Path) -> tablekit::Result<Vec<Value>> {
    let text = fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&text)? {
        Value::Array(items) => Ok(items),
        _ => Err(TableError::Config(format!("{} does not hold a JSON array", path.display()))),
    }
}

/// Filters given on the command line replace the stored ones; with none
/// given the stored filters stay active
fn replace_filters(engine: &mut TableEngine<Value>, args: &[String]) -> tablekit::Result<()> {
    if args.is_empty() {
        return Ok(());
    }
    let conditions = args
        .iter()
        .enumerate()
        .map(|(n, arg)| parse_filter(n, arg))
        .collect::<tablekit::Result<Vec<_>>>()?;

    engine.clear_all_filters();
    for condition in conditions {
        let id = condition.id.clone();
        if !engine.add_custom_filter(condition) {
            return Err(TableError::Config(format!("filter '{}' was refused", id)));
        }
    }
    Ok(())
}

/// "status:equals:open" → FilterCondition; the value may itself contain ':'
fn parse_filter(n: usize, arg: &str) -> tablekit::Result<FilterCondition> {
    let mut parts = arg.splitn(3, ':');
    let column = parts.next().unwrap_or_default();
    let operator = parts
        .next()
        .ok_or_else(|| TableError::Config(format!("filter '{}' needs column:operator[:value]", arg)))?;
    let value = parts.next().unwrap_or_default();

    let operator = Operator::from(operator.to_string());
    if operator.is_unknown() {
        let known: Vec<String> = Operator::all()
            .iter()
            .map(|op| format!("{} ({})", op.as_str(), op.label()))
            .collect();
        return Err(TableError::Config(format!(
            "unknown operator '{}' (expected one of: {})",
            operator,
            known.join(", ")
        )));
    }
    Ok(FilterCondition::new(format!("cli-{}", n), column, operator, value))
}

/// "name" or "name:desc"
fn parse_sort(arg: &str) -> tablekit::Result<SortConfig> {
    let (field, direction) = match arg.split_once(':') {
        Some((field, "asc")) => (field, SortDirection::Asc),
        Some((field, "desc")) => (field, SortDirection::Desc),
        Some((_, other)) => {
            return Err(TableError::Config(format!("unknown sort direction '{}'", other)));
        }
        None => (arg, SortDirection::Asc),
    };
    Ok(SortConfig::new(field, direction))
}

fn render_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
