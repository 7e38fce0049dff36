//! Chatelly real-time connection hub.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin chatelly-server -- --widget cw_0123456789abcdef_0123456789abcdef=site-1
//! ```

use chatelly_server::Config;
use chatelly_shared::logger::setup_logger;
use clap::Parser;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    // Run the server
    if let Err(e) = chatelly_server::run_server(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
