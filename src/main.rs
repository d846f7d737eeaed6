// src/main.rs

use scoutwarden::{cli, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;

    // Dropping the run on Ctrl-C kills the worker (`kill_on_drop`).
    tokio::select! {
        res = run(args) => res,
        sig = tokio::signal::ctrl_c() => {
            sig?;
            Err(anyhow::anyhow!("interrupted"))
        }
    }
}
