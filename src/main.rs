//! ragchew - keyboard-to-keyboard group chat over a point-to-point radio link.

use std::io;
use std::panic;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

mod cli;
mod error;
mod finger;
mod logging;
mod modem;
mod proto;
mod relay;
mod session;
mod ui;

use finger::FingerStore;
use modem::{fake::FakeModem, serial::SerialModem, Modem};
use session::Session;

/// Longest the pipeline gets to flush queued transmissions at shutdown.
const DRAIN_WAIT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> ExitCode {
    // The guard keeps the background log writer alive for the whole run.
    let _guard = match logging::init() {
        Ok((guard, _)) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let args = cli::Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: cli::Args) -> anyhow::Result<()> {
    // Open the modem before touching the terminal so failures print cleanly.
    let modem: Arc<dyn Modem> = if args.fake {
        tracing::info!("Using fake modem");
        Arc::new(FakeModem::new())
    } else {
        Arc::new(
            SerialModem::open(&args.device, args.baud).map_err(|e| {
                anyhow::anyhow!("could not open modem on {}: {}", args.device, e)
            })?,
        )
    };

    let cache_path = FingerStore::default_path()?;
    let store = match FingerStore::open(&cache_path) {
        Ok(store) => store,
        Err(e) => {
            tracing::warn!(
                "Finger cache at {} unreadable ({}); starting empty",
                cache_path.display(),
                e
            );
            FingerStore::empty(&cache_path)
        }
    };

    let (outbound_tx, outbound_rx) = relay::channel();
    let (raw_tx, raw_rx) = relay::channel();
    let (inbound_tx, inbound_rx) = relay::channel();

    let listen_task = relay::spawn_listen(modem.clone(), raw_tx);
    let inbound_task = relay::spawn_inbound(raw_rx, inbound_tx.clone());
    let outbound_task = relay::spawn_outbound(modem, outbound_rx, inbound_tx);

    let session = Session::new(&args.callsign, &args.group, store, outbound_tx, inbound_rx);
    tracing::info!("On the air as {} in {}", session.callsign(), session.group());

    // From here the terminal belongs to the chat screen; make sure a panic
    // gives it back.
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;

    let mut app = ui::App::new(session);
    let result = app.run(&mut terminal).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    // Dropping the app closes the engine's side of the outbound queue; give
    // the relay a bounded window to put any queued sign-off on the air.
    drop(app);
    if tokio::time::timeout(DRAIN_WAIT, outbound_task).await.is_err() {
        tracing::warn!("Outbound queue did not drain within {:?}", DRAIN_WAIT);
    }
    listen_task.abort();
    inbound_task.abort();

    tracing::info!("Session closed");
    result
}
