//! reptrack daemon: reads samples from stdin, ticks the engine and
//! broadcasts output lines on a Unix socket.

mod daemon;
mod error;
mod sensor;
mod state;

use std::io::Write;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use reptrack::{Engine, EngineState};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::daemon::{Daemon, Sink};
use crate::error::Result;
use crate::state::StateFile;

/// Count repetitions from a distance sensor stream
#[derive(Parser)]
#[command(name = "reptrack")]
#[command(about = "Count repetitions from a distance sensor stream", long_about = None)]
#[command(version)]
struct Cli {
    /// Unix socket that output lines are broadcast on
    #[arg(short, long, env = "REPTRACK_SOCKET", default_value = "/tmp/reptrack.sock")]
    socket: PathBuf,

    /// TOML file holding the calibration range and configuration
    #[arg(long, env = "REPTRACK_STATE")]
    state: Option<PathBuf>,

    /// Tick interval in milliseconds
    #[arg(long, env = "REPTRACK_TICK_MS", default_value_t = 100)]
    tick_ms: u64,

    /// Log level
    #[arg(long, env = "REPTRACK_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "REPTRACK_LOG_JSON")]
    json: bool,
}

type Clients = Arc<Mutex<Vec<UnixStream>>>;

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    if let Err(e) = run(cli) {
        error!("reptrack: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(cli: &Cli) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| cli.log_level.clone().into());

    // stdout carries output lines, logs go to stderr
    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn run(cli: Cli) -> Result<()> {
    let state_file = cli.state.map(StateFile::new);
    let saved = match &state_file {
        Some(file) => file.load()?,
        None => EngineState::default(),
    };

    let broadcast = Broadcast::listen(&cli.socket)?;
    let mut daemon = Daemon::new(Engine::from_state(saved), state_file, broadcast);

    // Sensor feed on its own thread, engine on this one
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        if let Err(e) = sensor::start(std::io::stdin().lock(), tx) {
            error!("sensor feed error: {e}");
        }
    });

    info!("waiting for samples... (ctrl+d to quit)");

    let epoch = Instant::now();
    let interval = Duration::from_millis(cli.tick_ms.max(1));
    let mut next_tick = epoch + interval;

    loop {
        let timeout = next_tick.saturating_duration_since(Instant::now());
        match rx.recv_timeout(timeout) {
            Ok(input) => daemon.handle(input, epoch.elapsed()),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let now = Instant::now();
        if now >= next_tick {
            daemon.tick(now - epoch)?;
            next_tick += interval;
            // Drop ticks we were too late for rather than bursting them
            if next_tick <= now {
                next_tick = now + interval;
            }
        }
    }

    daemon.shutdown();
    let _ = std::fs::remove_file(&cli.socket);
    Ok(())
}

/// Prints output lines and hands them to a writer thread that fans them
/// out to socket clients, so a stalled client never holds up a tick.
struct Broadcast {
    tx: mpsc::Sender<String>,
}

impl Broadcast {
    /// Bind the output socket, accept clients and start the writer thread.
    fn listen(path: &Path) -> Result<Self> {
        // Clean up stale socket from previous run
        let _ = std::fs::remove_file(path);
        let listener = UnixListener::bind(path)?;

        let clients: Clients = Arc::new(Mutex::new(Vec::new()));

        let accepted = clients.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                match stream {
                    Ok(stream) => {
                        info!("client connected");
                        stream.set_write_timeout(Some(Duration::from_millis(100))).ok();
                        accepted
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push(stream);
                    }
                    Err(e) => {
                        warn!("accept error: {e}");
                        thread::sleep(Duration::from_millis(100));
                    }
                }
            }
        });

        let (tx, rx) = mpsc::channel::<String>();
        thread::spawn(move || {
            for json in rx {
                let mut clients = clients.lock().unwrap_or_else(PoisonError::into_inner);
                clients.retain_mut(|stream| match writeln!(stream, "{json}") {
                    Ok(_) => {
                        stream.flush().ok();
                        true
                    }
                    Err(_) => {
                        info!("client disconnected");
                        false
                    }
                });
            }
        });

        info!(socket = %path.display(), "listening");
        Ok(Self { tx })
    }
}

impl Sink for Broadcast {
    fn emit(&mut self, line: &str) {
        println!("{line}");
        std::io::stdout().flush().ok();
        // Writer thread only stops with the process
        let _ = self.tx.send(line.to_string());
    }
}
