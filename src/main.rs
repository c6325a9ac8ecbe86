use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = slackmux::cli::Cli::parse();
    if let Err(e) = slackmux::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
