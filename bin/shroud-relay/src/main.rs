use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use rand::Rng;

use shroud_hal::SessionAdapter;
use shroud_inject::{enable, FillerConfig};
use shroud_linux::relay::{client_write_keys, drain};
use shroud_linux::{RecordReader, TcpSession};

#[derive(Parser)]
#[command(about = "Filler-record injection demo relay")]
struct Cli {
    /// Shared secret both ends derive record keys from.
    #[arg(long, default_value = "shroud-demo")]
    secret: String,
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Accept sessions and open every record received.
    Listen {
        #[arg(long, default_value = "127.0.0.1:8443")]
        bind: String,
    },
    /// Relay side: fill each upstream wait with filler, then send the response.
    Connect {
        #[arg(long, default_value = "127.0.0.1:8443")]
        peer: String,
        #[arg(long, default_value_t = 900)]
        min_len: usize,
        #[arg(long, default_value_t = 1400)]
        max_len: usize,
        #[arg(long, default_value_t = 5)]
        interval_ms: u64,
        #[arg(long, default_value_t = 0)]
        initial_delay_ms: u64,
        /// Upper bound of the simulated upstream wait.
        #[arg(long, default_value_t = 200)]
        window_ms: u64,
        #[arg(long, default_value_t = 10)]
        responses: u32,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        warn!("Signal received. Stopping...");
        r.store(false, Ordering::SeqCst);
    })?;

    match cli.mode {
        Mode::Listen { bind } => listen(&bind, cli.secret.as_bytes()),
        Mode::Connect {
            peer,
            min_len,
            max_len,
            interval_ms,
            initial_delay_ms,
            window_ms,
            responses,
        } => {
            let config = FillerConfig::new(
                min_len,
                max_len,
                Duration::from_millis(interval_ms),
                Duration::from_millis(initial_delay_ms),
            )?;
            connect(&peer, cli.secret.as_bytes(), config, window_ms, responses, &running)
        }
    }
}

fn listen(bind: &str, secret: &[u8]) -> anyhow::Result<()> {
    let keys = client_write_keys(secret)?;
    let listener = TcpListener::bind(bind)?;
    info!("Listening on {}", bind);

    for stream in listener.incoming() {
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                warn!("accept failed: {}", e);
                continue;
            }
        };
        let peer = stream.peer_addr().map(|a| a.to_string()).unwrap_or_default();
        let keys = keys.clone();
        thread::spawn(move || {
            info!("session from {}", peer);
            let mut reader = RecordReader::new(stream, &keys);
            if let Err(e) = drain(&mut reader, |_, _| {}) {
                error!("session {} failed after {} records: {}", peer, reader.records_read(), e);
            }
        });
    }
    Ok(())
}

fn connect(
    peer: &str,
    secret: &[u8],
    config: FillerConfig,
    window_ms: u64,
    responses: u32,
    running: &AtomicBool,
) -> anyhow::Result<()> {
    let session = Arc::new(TcpSession::connect(peer)?);
    session.install_cipher(&client_write_keys(secret)?);

    let adapter: Arc<dyn SessionAdapter> = session.clone();
    let controller = enable(adapter, config)?;
    let mut rng = rand::thread_rng();

    for i in 0..responses {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        // Upstream round trip: the window the relay would otherwise sit silent in.
        let wait = Duration::from_millis(rng.gen_range(window_ms / 2..=window_ms));
        controller.start()?;
        thread::sleep(wait);
        controller.stop();
        if let Some(e) = controller.last_error() {
            warn!("filler window {} ended early: {}", i, e);
        }

        session.send(format!("response {}", i).as_bytes())?;
    }

    info!(
        "Done: {} filler records, {} records total",
        controller.records_sent(),
        session.write_sequence()
    );
    session.shutdown()?;
    Ok(())
}
