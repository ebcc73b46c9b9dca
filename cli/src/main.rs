use clap::Parser;

use crate::args::Args;

mod args;
mod commands;
mod logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();
    logging::init_logger(&args.log);

    commands::run(args).await
}
