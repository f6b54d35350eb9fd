use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;

/// Logging for the gateway, written to stderr
pub fn setup_logging(verbose_level: u8) {
    setup_logging_with_file(verbose_level, None);
}

/// Logging for terminal commands, written to a file so it does not interleave
/// with printed messages
pub fn setup_logging_for_terminal(verbose_level: u8) {
    let log_file_path = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("stock-chat")
        .join("client.log");

    if let Some(parent) = log_file_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    setup_logging_with_file(verbose_level, Some(log_file_path));
}

fn filter_for(verbose_level: u8) -> &'static str {
    match verbose_level {
        0 => "warn,stock_chat=info,agent=info,market=info",
        1 => "info,stock_chat=debug,agent=debug,market=debug,message_content=debug",
        _ => "debug,stock_chat=trace,agent=trace,market=trace,message_content=trace",
    }
}

fn setup_logging_with_file(verbose_level: u8, log_file: Option<PathBuf>) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        tracing_subscriber::EnvFilter::new(filter_for(verbose_level))
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_level(true);

    let file = log_file.and_then(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| eprintln!("Warning: Could not open log file {path:?} ({e}), logging to stderr"))
            .ok()
    });

    match file {
        Some(file) => subscriber
            .with_ansi(false)
            .with_writer(move || -> Box<dyn io::Write + Send> {
                match file.try_clone() {
                    Ok(file) => Box::new(file),
                    Err(_) => Box::new(io::sink()),
                }
            })
            .init(),
        None => subscriber.with_writer(io::stderr).init(),
    }
}
