// stepwise: step through a script function body and navigate its history

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use serde_json::Map;
use tracing::{debug, error};

use stepwise::config::EngineConfig;
use stepwise::logging::{self, LogTarget};
use stepwise::navigator::{Navigator, TracingObserver};
use stepwise::source::ProgramSource;
use stepwise::ui::App;

#[derive(Parser, Debug)]
#[command(name = "stepwise")]
#[command(about = "Step through a script function body with time-travel navigation")]
struct Args {
    /// File holding the function body to run
    file: PathBuf,

    /// Bindings object, as inline JSON or @path to a JSON file
    #[arg(long)]
    bindings: Option<String>,

    /// TOML engine configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Autoplay interval in milliseconds
    #[arg(long)]
    interval: Option<u64>,

    /// Write log events to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print the whole history as JSON lines instead of opening the viewer
    #[arg(long)]
    dump: bool,
}

fn load_bindings(
    arg: Option<&str>,
) -> Result<Map<String, serde_json::Value>, Box<dyn std::error::Error>> {
    let Some(arg) = arg else {
        return Ok(Map::new());
    };
    let text = match arg.strip_prefix('@') {
        Some(path) => fs::read_to_string(path)?,
        None => arg.to_string(),
    };
    match serde_json::from_str::<serde_json::Value>(&text)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(format!("bindings must be a JSON object, got {other}").into()),
    }
}

fn dump(navigator: &mut Navigator) -> io::Result<()> {
    navigator.go_to_end();
    let mut out = BufWriter::new(io::stdout().lock());
    for entry in navigator.history().entries() {
        serde_json::to_writer(&mut out, entry)?;
        writeln!(out)?;
    }
    out.flush()
}

fn run_tui(app: &mut App) -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = app.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run(args: Args) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let target = match (&args.log_file, args.dump) {
        (Some(path), _) => LogTarget::File(path),
        (None, true) => LogTarget::Stderr,
        (None, false) => LogTarget::Off,
    };
    logging::init(target)?;

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(ms) = args.interval {
        config.autoplay_interval_ms = ms;
        config.validate()?;
    }

    let body = fs::read_to_string(&args.file)
        .map_err(|e| format!("cannot read '{}': {e}", args.file.display()))?;
    let bindings = load_bindings(args.bindings.as_deref())?;
    let source = ProgramSource::from_body(&body, &config.bridge.bindings_name);
    debug!(file = ?args.file, interval = ?config.autoplay_interval(), "starting");

    let mut navigator = Navigator::new(config);
    navigator.add_observer(Box::new(TracingObserver));
    // A code error is shown in the viewer; the dump reports it below
    let _ = navigator.refresh_source(&source, &bindings);

    if args.dump {
        dump(&mut navigator)?;
        if let Some(err) = navigator.error() {
            error!(%err, "run failed");
            eprintln!("error: {err}");
            return Ok(ExitCode::FAILURE);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut app = App::new(navigator, source, bindings);
    run_tui(&mut app)?;
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    match run(Args::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
