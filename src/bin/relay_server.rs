use std::path::PathBuf;
use std::sync::Arc;
use std::{env, process};

use roomrelay::log::Logger;
use roomrelay::log::log_sink::LogSink;
use roomrelay::relay::run::{config_path, load_settings, run_relay_server_with_log};

fn usage(prog: &str) -> ! {
    eprintln!("Usage:");
    eprintln!("  {prog} [--config PATH]                # listen on bind_addr from config (default 0.0.0.0:5000)");
    eprintln!("  {prog} [--config PATH] [ADDR]         # e.g. 0.0.0.0:6000");
    eprintln!("  {prog} [--config PATH] [IP] [PORT]    # e.g. 127.0.0.1 6000");
    eprintln!();
    eprintln!("When using cargo:");
    eprintln!("  cargo run --bin relay_server");
    eprintln!("  cargo run --bin relay_server -- 0.0.0.0:6000");
    eprintln!("  cargo run --bin relay_server -- --config relay.conf 127.0.0.1 6000");
    process::exit(1);
}

fn main() -> std::io::Result<()> {
    // --- Parse CLI args ----------------------------------------------------
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);

    let mut explicit_config: Option<PathBuf> = None;
    if let Some(pos) = args.iter().position(|a| a == "--config") {
        if pos + 1 >= args.len() {
            usage(&prog);
        }
        explicit_config = Some(PathBuf::from(args.remove(pos + 1)));
        args.remove(pos);
    }

    // --- Load settings -----------------------------------------------------
    let path = config_path(explicit_config);
    let mut settings = match load_settings(&path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[relay_server] bad configuration: {e}");
            process::exit(1);
        }
    };

    // Positional address beats config and PORT.
    match args.len() {
        0 => {}
        1 => settings.bind_addr = args[0].clone(),
        2 => settings.bind_addr = format!("{}:{}", args[0], args[1]),
        _ => usage(&prog),
    }

    // --- Start process logger ----------------------------------------------
    let logger = Logger::start_server(&settings);
    let log_sink: Arc<dyn LogSink> = Arc::new(logger.handle());

    eprintln!(
        "[relay_server] starting on {} (config {}, log {})",
        settings.bind_addr,
        path.display(),
        logger.file_path().display()
    );

    // --- Run relay (blocks) ------------------------------------------------
    run_relay_server_with_log(settings, log_sink)
}
