mod commands;
mod config;
mod error;
mod prompt;

#[tokio::main]
async fn main() {
    let (settings, command) = match config::load() {
        Ok(loaded) => loaded,
        Err(err) => {
            eprintln!("{}", err.user_message());
            std::process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "tripshare={level},client={level},engine={level}",
            level = settings.log_level
        ))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = commands::run(&settings, command).await {
        tracing::error!("command failed: {err}");
        eprintln!("{}", err.user_message());
        std::process::exit(1);
    }
}
