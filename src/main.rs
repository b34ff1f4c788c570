use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use plotping::app::App;
use plotping::constants::{DEFAULT_DATA_FILE, DEFAULT_MAX_RECORDS};
use plotping::probe::SystemPing;
use plotping::store::{self, LoadPolicy};
use plotping::ui;

/// Live ping time graph for a host, with on-disk history.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// The address to ping
    host: String,

    /// File to save and load ping data
    #[arg(long, default_value = DEFAULT_DATA_FILE)]
    data_file: PathBuf,

    /// Load all records from the data file
    #[arg(long)]
    load_all: bool,

    /// Number of records to load from the data file
    #[arg(long)]
    num_records: Option<usize>,

    /// Maximum number of records to keep in memory
    #[arg(long, default_value_t = DEFAULT_MAX_RECORDS)]
    max_records: usize,
}

impl Cli {
    // --load-all wins over --num-records; otherwise load what fits in memory.
    fn load_policy(&self) -> LoadPolicy {
        if self.load_all {
            LoadPolicy::All
        } else if let Some(n) = self.num_records {
            LoadPolicy::Newest(n)
        } else {
            LoadPolicy::Newest(self.max_records)
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let window = store::load(&cli.data_file, cli.load_policy(), cli.max_records)
        .context("cannot load ping history")?;
    info!(
        "loaded {} samples from {}",
        window.len(),
        cli.data_file.display()
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("cannot install the Ctrl-C handler")?;

    info!("monitoring {}", cli.host);
    let app = App::new(cli.host, cli.data_file, window, Box::new(SystemPing));
    ui::run(app, shutdown)?;

    info!("shutting down");
    Ok(())
}
