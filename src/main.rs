//! Provides the main entry point to the market engine program.

fn main() -> anyhow::Result<()> {
    market_engine::cli::run_cli()
}
