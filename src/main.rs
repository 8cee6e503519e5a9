use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use futures::executor::block_on;
use ratatui::DefaultTerminal;
use tracing::{error, info, subscriber::set_global_default};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt};

use tabview::{
    FileSource, Renderer, SchemaPolicy, TableConfig, TableController, TableError, ViewModel,
};

mod inputter;
mod keys;
mod ui;

use keys::KeyMapper;
use ui::TableUI;

/// Tabbed, sortable and searchable view of a JSON, CSV, Parquet or Arrow file.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// File to show. `~` and environment variables are expanded.
    path: String,
    /// Field whose distinct values become tabs
    #[arg(short, long)]
    tabs: Option<String>,
    /// Column to hide, can be repeated. Defaults to the tab field.
    #[arg(long = "hide")]
    hide: Vec<String>,
    /// Pad records that miss fields instead of rejecting the file
    #[arg(long)]
    pad_schema: bool,
    /// Only check this many records against the schema
    #[arg(long)]
    schema_sample: Option<usize>,
    /// Terminal event poll time in milliseconds
    #[arg(long, default_value_t = 100)]
    poll: u64,
    /// Log file, the terminal belongs to the table
    #[arg(long, default_value = "tabview.log")]
    log: PathBuf,
    /// Print the initial view as JSON instead of starting the tui
    #[arg(long)]
    dump: bool,
}

impl Args {
    fn table_config(&self) -> TableConfig {
        let mut cfg = TableConfig::default().with_schema_policy(if self.pad_schema {
            SchemaPolicy::Pad
        } else {
            SchemaPolicy::Strict
        });
        if let Some(key) = &self.tabs {
            cfg = cfg.with_partition_key(key.clone());
        }
        if !self.hide.is_empty() {
            cfg = cfg.with_hidden_columns(self.hide.clone());
        }
        if let Some(sample) = self.schema_sample {
            cfg = cfg.with_schema_sample(sample);
        }
        cfg
    }
}

/// Prints the view model as JSON on stdout.
#[derive(Default)]
struct DumpRenderer {
    notices: Vec<String>,
}

impl Renderer for DumpRenderer {
    fn render(&mut self, view: &ViewModel) {
        for notice in self.notices.drain(..) {
            eprintln!("Warning: {notice}");
        }
        match serde_json::to_string_pretty(view) {
            Ok(json) => println!("{json}"),
            Err(e) => error!("Could not serialize view: {e}"),
        }
    }

    fn render_error(&mut self, error: &TableError) {
        self.notices.push(error.to_string());
    }
}

fn main() -> ExitCode {
    match run() {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

/// Logs go to a file since the tui owns the terminal.
fn start_logging(path: &Path) -> Result<(), TableError> {
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let subscriber = Registry::default()
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_filter(filter),
        )
        .with(ErrorLayer::default());

    set_global_default(subscriber).expect("unable to set global subscriber");
    Ok(())
}

fn run() -> Result<(), TableError> {
    let args = Args::parse();
    start_logging(&args.log)?;
    info!("Starting tabview with {args:?}");

    let path = shellexpand::full(&args.path)
        .map_err(|e| TableError::DataLoad(e.to_string()))?
        .into_owned();
    let source = FileSource::open(PathBuf::from(&path))?;
    let mut controller = TableController::new(args.table_config())
        .on_load(|result| match result {
            Ok(count) => info!("Received {count} records"),
            Err(e) => error!("No table: {e}"),
        });

    if args.dump {
        let mut renderer = DumpRenderer::default();
        return block_on(controller.load(&source, &mut renderer));
    }

    let name = PathBuf::from(&path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("???")
        .to_string();
    let mut terminal = ratatui::init();
    let result = run_tui(&mut terminal, controller, &source, name, args.poll);
    ratatui::restore();
    result
}

fn run_tui(
    terminal: &mut DefaultTerminal,
    mut controller: TableController,
    source: &FileSource,
    name: String,
    poll: u64,
) -> Result<(), TableError> {
    let mut ui = TableUI::new(name);
    let keys = KeyMapper::new(poll);

    terminal.draw(|f| ui.draw(f))?;
    block_on(controller.load(source, &mut ui))?;

    while !ui.exiting() {
        // Render the current view
        terminal.draw(|f| ui.draw(f))?;

        // Handle events and map them to a table message
        if let Some(action) = keys.handle_event(ui.raw_keyevents())?
            && let Some(message) = ui.update(action)
            && let Err(e) = controller.handle(message, &mut ui)
        {
            ui.render_error(&e);
        }
    }
    Ok(())
}
