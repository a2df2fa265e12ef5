use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use strata::banner::{BannerInfo, print_banner, print_session_summary};
use strata::commands::{BrowseState, CommandRegistry, CommandResult, SessionInfo, StateChange};
use strata::config::Config;
use strata::consts::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, default_db_path, format_number};
use strata::ingest;
use strata::query::paged::paginated_get;
use strata::query::parse::parse_filters;
use strata::query::{Filter, Paginated, QueryStats, Row, SelectExpr, Value};
use strata::store::sqlite::SqliteStore;
use strata::store::{Datapoint, Dataset, datapoints_table};

#[derive(Parser)]
#[command(name = "strata", version, about = "Layered data, one page at a time.")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// SQLite database path (use :memory: for ephemeral)
    #[arg(short, long)]
    db: Option<PathBuf>,

    /// Rows per page (overrides the saved preference)
    #[arg(short = 's', long)]
    page_size: Option<u32>,

    /// Dataset to select at startup
    #[arg(long)]
    dataset: Option<String>,

    /// Run a single filter query against --dataset, print JSON, and exit
    #[arg(short, long)]
    run: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Import a file or URL into a dataset
    Import {
        /// Path or http(s) URL of a .json, .jsonl, or .csv source
        source: String,
        /// Dataset to import into (created if missing)
        #[arg(long)]
        dataset: String,
    },
    /// List datasets and their row counts
    Datasets,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let db_path = cli.db.unwrap_or_else(default_db_path);
    let db = db_path.to_string_lossy().to_string();
    if db != ":memory:" {
        if let Some(parent) = Path::new(&db).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
    }

    // Handle subcommands
    if let Some(command) = &cli.command {
        match command {
            Command::Import { source, dataset } => {
                return handle_import(&db, source, dataset).await;
            }
            Command::Datasets => {
                return handle_datasets(&db);
            }
        }
    }

    let store = SqliteStore::open(&db)?;
    let config = Config::open(&db)?;

    let page_size = cli
        .page_size
        .or(config.page_size()?)
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let mut state = BrowseState::new(page_size);

    if let Some(name) = &cli.dataset {
        match store.dataset(name)? {
            Some(dataset) => state.dataset = Some(dataset),
            None => anyhow::bail!("no dataset named {name} — run `strata datasets`"),
        }
    } else if let Some(name) = config.last_dataset()? {
        // A stale saved name just means nothing is selected.
        state.dataset = store.dataset(&name)?;
    }

    // Single query mode
    if let Some(expr) = &cli.run {
        return run_single(&store, &state, expr).await;
    }

    let db_label = if db == ":memory:" { "ephemeral" } else { &db };
    print_banner(&BannerInfo {
        database: db_label,
        datasets: store.datasets()?.len() as u64,
        datapoints: store.total_datapoints()?,
        page_size: state.page_size,
    });

    let registry = CommandRegistry::new();
    let mut stats = QueryStats::default();

    // Show the first page right away when a dataset is already selected
    if state.dataset.is_some() {
        run_and_render(&store, &state, &mut stats).await;
    }

    // REPL — async stdin so Ctrl+C is caught at the prompt too
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        let prompt = match &state.dataset {
            Some(dataset) => format!("strata[{}]> ", dataset.name),
            None => "strata> ".to_string(),
        };
        print!("\n{prompt}");
        io::stdout().flush()?;

        // Read next line, interruptible by Ctrl+C
        let line = tokio::select! {
            result = lines.next_line() => {
                match result {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        // Ctrl+D (EOF)
                        println!();
                        break;
                    }
                    Err(e) => {
                        eprintln!("input error: {e}");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let info = SessionInfo {
            store: &store,
            config: &config,
            state: &state,
            db_path: db_label,
        };

        match registry.dispatch(input, &info).await {
            CommandResult::NotACommand => {
                // Bare input is a filter expression; run it from page one
                match parse_filters(input) {
                    Ok(filters) => {
                        state.filters = filters;
                        state.filter_text = input.to_string();
                        state.page = 0;
                        run_and_render(&store, &state, &mut stats).await;
                    }
                    Err(e) => eprintln!("✗ {e}"),
                }
            }
            CommandResult::Handled => {}
            CommandResult::StateChanged(change) => {
                apply_change(&mut state, change);
                run_and_render(&store, &state, &mut stats).await;
            }
            CommandResult::Quit => break,
        }
    }

    print_session_summary(stats);
    Ok(())
}

fn apply_change(state: &mut BrowseState, change: StateChange) {
    match change {
        StateChange::Dataset(dataset) => {
            state.dataset = Some(dataset);
            state.filters.clear();
            state.filter_text.clear();
            state.page = 0;
        }
        StateChange::Filters(filters, text) => {
            state.filters = filters;
            state.filter_text = text;
            state.page = 0;
        }
        StateChange::Order(order) => {
            state.order = order;
            state.page = 0;
        }
        StateChange::Page(page) => state.page = page,
        StateChange::PageSize(size) => {
            state.page_size = size;
            state.page = 0;
        }
        StateChange::ClearFilters => {
            state.filters.clear();
            state.filter_text.clear();
            state.page = 0;
        }
        StateChange::Refresh => {}
    }
}

/// The computed `size` column (payload bytes), projected only when the
/// current filters or ordering reference it.
fn size_projection(state: &BrowseState) -> Option<Vec<SelectExpr>> {
    let uses_size = state.order.column.as_str() == "size"
        || state.filters.iter().any(|f| f.column.as_str() == "size");
    uses_size.then(|| vec![SelectExpr::new("length(data)", "size").expect("static projection")])
}

async fn run_query(
    store: &SqliteStore,
    state: &BrowseState,
    dataset: &Dataset,
) -> Result<Paginated<Row>> {
    let base_filters = vec![Filter::eq("dataset_id", dataset.id.to_string())?];
    let projection = size_projection(state);
    paginated_get(
        store,
        &datapoints_table(),
        state.page,
        state.page_size,
        &base_filters,
        &state.filters,
        state.order.clone(),
        projection.as_deref(),
        None,
    )
    .await
}

async fn run_and_render(store: &SqliteStore, state: &BrowseState, stats: &mut QueryStats) {
    let Some(dataset) = &state.dataset else {
        eprintln!("✗ no dataset selected — try /datasets and /use <name>");
        return;
    };
    match run_query(store, state, dataset).await {
        Ok(page) => {
            stats.record(page.items.len() as u64);
            render_page(&page, state);
        }
        Err(e) => eprintln!("✗ query failed: {e}"),
    }
}

fn render_page(page: &Paginated<Row>, state: &BrowseState) {
    if page.items.is_empty() {
        if page.total_count > 0 {
            println!(
                "page {} is past the end ({} rows, {} pages)",
                state.page + 1,
                format_number(page.total_count),
                format_number(page.total_pages(state.page_size)),
            );
        } else if page.any_in_scope {
            println!("no rows match the current filters — /clear to reset them");
        } else {
            println!("dataset is empty — /import <path-or-url> to fill it");
        }
        return;
    }

    for row in &page.items {
        println!("  {}", summarize_row(row));
    }
    println!(
        "\npage {}/{} · {} rows total",
        state.page + 1,
        format_number(page.total_pages(state.page_size)),
        format_number(page.total_count),
    );
}

fn summarize_row(row: &Row) -> String {
    let id = match row.get("id") {
        Some(Value::Text(s)) => s.chars().take(8).collect(),
        _ => "????????".to_string(),
    };
    let mut line = match row.get("data") {
        Some(Value::Text(data)) => format!("{id}  {}", truncate(data, 64)),
        _ => id,
    };
    if let Some(Value::Text(target)) = row.get("target") {
        line.push_str(&format!("  → {}", truncate(target, 32)));
    }
    if let Some(Value::Integer(size)) = row.get("size") {
        line.push_str(&format!(
            "  ({} bytes)",
            format_number(u64::try_from(*size).unwrap_or(0)),
        ));
    }
    line
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{head}…")
    }
}

/// `--run` mode: one query, JSON on stdout, exit.
async fn run_single(store: &SqliteStore, state: &BrowseState, expr: &str) -> Result<()> {
    let Some(dataset) = &state.dataset else {
        anyhow::bail!("--run needs a dataset (--dataset <name>)");
    };

    let mut state = state.clone();
    if !expr.trim().is_empty() {
        state.filters = parse_filters(expr)?;
        state.filter_text = expr.to_string();
    }

    let page = run_query(store, &state, dataset).await?;
    let items = page
        .items
        .iter()
        .map(Datapoint::from_row)
        .collect::<Result<Vec<_>>>()?;
    let out = serde_json::json!({
        "items": items,
        "totalCount": page.total_count,
        "anyInScope": page.any_in_scope,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

async fn handle_import(db: &str, source: &str, dataset_name: &str) -> Result<()> {
    let store = SqliteStore::open(db)?;
    let dataset = store.create_dataset(dataset_name)?;
    let summary = ingest::import_source(&store, &dataset, source).await?;
    println!(
        "✓ imported {} rows into {} ({} skipped)",
        format_number(summary.inserted),
        dataset.name,
        format_number(summary.skipped),
    );
    Ok(())
}

fn handle_datasets(db: &str) -> Result<()> {
    let store = SqliteStore::open(db)?;
    let datasets = store.datasets()?;
    if datasets.is_empty() {
        println!("no datasets yet — strata import <path> --dataset <name>");
        return Ok(());
    }
    let max_width = datasets.iter().map(|d| d.name.len()).max().unwrap_or(10);
    for dataset in datasets {
        let count = store.datapoint_count(dataset.id)?;
        println!(
            "{:<max_width$}  {:>10} rows  created {}",
            dataset.name,
            format_number(count),
            dataset.created_at,
        );
    }
    Ok(())
}
