use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("FOCUSDESK_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let workspace_root = match std::env::args_os().nth(1) {
        Some(path) => PathBuf::from(path),
        None => match std::env::current_dir() {
            Ok(path) => path,
            Err(error) => {
                eprintln!("focusdesk: failed to resolve current directory: {error}");
                std::process::exit(1);
            }
        },
    };

    if let Err(error) = focusdesk::run(workspace_root).await {
        eprintln!("focusdesk: {error}");
        std::process::exit(1);
    }
}
