use std::io::stdout;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::WrapErr;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;

mod app;
mod config;
mod confirm;
mod kill;
mod list;
mod logging;
mod lsof;
mod refresh;
mod ui;

use app::App;
use config::{Config, Scope};
use kill::SignalTerminator;
use lsof::LsofSource;
use ui::Theme;

#[derive(Debug, Parser)]
#[command(name = "gruyere", about = "View and kill processes on listening ports", version)]
struct Cli {
    /// filter text applied to the list on startup.
    #[arg(value_name = "FILTER")]
    filter: Option<String>,

    /// only show processes listening on this port.
    #[arg(short, long)]
    port: Option<u16>,

    /// only show processes owned by this user.
    #[arg(short, long)]
    user: Option<String>,

    /// only show processes whose command contains this text (case-insensitive).
    #[arg(short, long)]
    command: Option<String>,

    /// refresh interval in milliseconds.
    #[arg(long = "refresh-rate", value_name = "ms", default_value_t = 1000)]
    refresh_rate: u64,

    /// upper bound on one lsof run, in milliseconds.
    #[arg(long, value_name = "ms", default_value_t = 3000)]
    timeout: u64,

    /// leave mouse capture off.
    #[arg(long)]
    no_mouse: bool,

    /// write logs here (RUST_LOG controls the level).
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            refresh_interval: Duration::from_millis(cli.refresh_rate.max(1)),
            lsof_timeout: Duration::from_millis(cli.timeout.max(1)),
            initial_filter: cli.filter,
            scope: Scope {
                port: cli.port,
                user: cli.user,
                command: cli.command,
            },
            mouse: !cli.no_mouse,
            log_file: cli.log_file,
        }
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let config = Config::from(Cli::parse());
    logging::init(config.log_file.as_deref())?;

    let source = LsofSource::new(config.lsof_timeout);
    let snapshots = refresh::spawn(source.clone(), config.refresh_interval)
        .wrap_err("failed to start refresh worker")?;
    let mouse = config.mouse;
    let app = App::new(config, Box::new(source), Box::new(SignalTerminator));

    let terminal = ratatui::try_init().wrap_err("failed to initialize terminal")?;
    if mouse {
        if let Err(err) = execute!(stdout(), EnableMouseCapture) {
            ratatui::restore();
            return Err(err).wrap_err("failed to enable mouse capture");
        }
    }

    tracing::info!("session started");
    let result = app.run(terminal, snapshots, &Theme::default());

    if mouse {
        let _ = execute!(stdout(), DisableMouseCapture);
    }
    ratatui::restore();
    tracing::info!("session ended");
    result
}
