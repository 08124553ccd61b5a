use clap::Parser;
use docsql::shell::{self, Shell};
use docsql::{dataset, Config, InMemoryStore, QueryExecutor};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "docsql")]
#[command(about = "Query document collections with a small SQL dialect", long_about = None)]
struct Args {
    /// Configuration file (defaults to ./docsql.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON dataset to load into the in-memory store
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// IANA time zone for toDate (local time when unset)
    #[arg(long)]
    timezone: Option<String>,

    /// Document root for relative FROM paths
    #[arg(long)]
    base_path: Option<String>,

    /// Include document ids in SELECT * rows
    #[arg(long)]
    include_id: bool,

    /// Run one query, print each row as JSON and exit
    #[arg(short, long)]
    execute: Option<String>,
}

impl Args {
    fn apply(self, config: &mut Config) -> Option<String> {
        if self.data.is_some() {
            config.data = self.data;
        }
        if self.timezone.is_some() {
            config.timezone = self.timezone;
        }
        if self.base_path.is_some() {
            config.base_path = self.base_path;
        }
        if self.include_id {
            config.include_id = true;
        }
        self.execute
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docsql=info,docsql_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = Config::load(args.config.as_deref())?;
    let execute = args.apply(&mut config);
    let settings = config.settings()?;

    let (store, source) = match &config.data {
        Some(path) => (dataset::load_file(path)?, path.display().to_string()),
        None => {
            tracing::info!("No dataset configured, starting with an empty store");
            (InMemoryStore::new(), "(empty)".to_string())
        }
    };
    let collections: Vec<String> = store.collection_paths().map(str::to_string).collect();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let executor = QueryExecutor::with_settings(store, settings);

    if let Some(query) = execute {
        let output = runtime.block_on(executor.execute(&query))?;
        for row in output.into_rows() {
            println!("{}", serde_json::to_string(&row)?);
        }
        return Ok(());
    }

    let mut shell = Shell::new(executor, source);
    shell::run_interactive(&runtime, &mut shell, collections)?;
    Ok(())
}
