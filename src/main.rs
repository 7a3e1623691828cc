//! kvreactor - Network Ingress for a Key-Value Store
//!
//! This is the main entry point for the kvreactor server.
//! It parses settings, binds the reactor and runs it until Ctrl+C.

use kvreactor::config::{ParsedArgs, ServerSettings};
use kvreactor::{Reactor, RunState, TracingHandler};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn print_help() {
    println!(
        r#"
kvreactor - Network Ingress for a Key-Value Store

USAGE:
    kvreactor [OPTIONS]

OPTIONS:
    -h, --host <HOST>            Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>            Port to listen on (default: 6379)
        --buffer-size <BYTES>    Read buffer capacity (default: 1024)
        --events <COUNT>         Readiness events per poll (default: 1024)
        --poll-timeout-ms <MS>   Upper bound on one poll, 0 = unbounded (default: 100)
    -v, --version                Print version information
        --help                   Print this help message

EXAMPLES:
    kvreactor                          # Start on 127.0.0.1:6379
    kvreactor --port 6380              # Start on port 6380
    kvreactor --host 0.0.0.0           # Listen on all interfaces

Set RUST_LOG=debug to see every delivery.
"#
    );
}

fn print_banner(settings: &ServerSettings) {
    println!(
        r#"
kvreactor v{} - Network Ingress for a Key-Value Store
──────────────────────────────────────────────────────
Listening on {}
Read buffer {} bytes, {} events per poll

Use Ctrl+C to shutdown gracefully.
"#,
        kvreactor::VERSION,
        settings.bind_address(),
        settings.read_buffer_capacity,
        settings.events_capacity,
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let settings = match ServerSettings::from_args(std::env::args().skip(1)) {
        Ok(ParsedArgs::Run(settings)) => settings,
        Ok(ParsedArgs::Help) => {
            print_help();
            return Ok(());
        }
        Ok(ParsedArgs::Version) => {
            println!("kvreactor version {}", kvreactor::VERSION);
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(1);
        }
    };

    // Set up logging
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let state = RunState::new();
    let reactor = Reactor::new(settings.clone(), state.clone(), TracingHandler::new()).bind()?;
    let wakeup = reactor.wakeup();
    let stats = reactor.stats();

    print_banner(&ServerSettings {
        port: reactor.local_addr().port(),
        ..settings
    });

    // The reactor blocks its thread; keep it off the async workers
    let mut server = tokio::task::spawn_blocking(move || reactor.run());

    tokio::select! {
        result = &mut server => {
            // The loop ended on its own, which only happens on a fatal error
            result??;
            return Ok(());
        }
        signal = signal::ctrl_c() => {
            signal?;
            info!("Shutdown signal received, stopping server...");
        }
    }

    state.stop();
    wakeup.wake()?;
    server.await??;

    info!(
        accepted = stats.connections_accepted.load(std::sync::atomic::Ordering::Relaxed),
        "Server shutdown complete"
    );
    Ok(())
}
