use libmatrix::config::{ENV_DEBUG, WorkerConfig};
use libmatrix::dispatch::protocol::info_lines;
use libmatrix::dispatch::worker::run_eventloop;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("libmatrix");

    match args.get(1).map(String::as_str) {
        Some("info") if args.len() == 2 => {
            for line in info_lines() {
                println!("{}", line);
            }
            Ok(())
        }
        Some("eventloop") => {
            let level = if std::env::var_os(ENV_DEBUG).is_some() {
                tracing::Level::DEBUG
            } else {
                tracing::Level::INFO
            };

            // stdout belongs to the controller's launcher
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .init();

            let config = WorkerConfig::from_args(&args[2..])?;
            run_eventloop(&config).await?;

            Ok(())
        }
        _ => {
            println!("syntax: {} info|eventloop ...", program);
            std::process::exit(1);
        }
    }
}
