use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = timelab::cli::Cli::parse();
    if let Err(e) = timelab::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
