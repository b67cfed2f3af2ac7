use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use wallet_ledger::config::Config;
use wallet_ledger::parser::load_ledger;
use wallet_ledger::writer::{write_balances, write_history_files};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args.len() > 3 {
        anyhow::bail!(
            "Usage: {} <dump-dir> [config.toml]\nExpected 1 or 2 arguments, got {}",
            args[0],
            args.len() - 1
        );
    }

    let dump_dir = Path::new(&args[1]);
    let config = match args.get(2) {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let ledger = load_ledger(dump_dir, config.balance_check)
        .with_context(|| format!("Failed to import '{}'", dump_dir.display()))?;

    let total = ledger
        .sum_payments(config.workers)
        .context("Failed to sum payments")?;
    tracing::info!(
        "Sum of {} payments with {} workers: {}",
        ledger.payments().len(),
        config.workers,
        total.to_major()
    );

    for progress in ledger.sum_payments_in_chunks(config.progress_chunk_size) {
        let progress = progress.context("Failed to sum payment chunk")?;
        tracing::info!(
            processed = progress.processed,
            partial_total = %progress.partial_total.to_major(),
            "Chunk summed"
        );
    }

    if let Some(history_dir) = &config.history_dir {
        for account in ledger.accounts() {
            let Ok(history) = ledger.account_history(account.id) else {
                continue;
            };
            let dir = history_dir.join(account.id.to_string());
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create '{}'", dir.display()))?;
            write_history_files(&history, &dir, config.history_records_per_file)?;
        }
        tracing::info!("Wrote account histories to {}", history_dir.display());
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_balances(&mut handle, ledger.accounts()).context("Failed to write balances")?;
    handle.flush()?;

    Ok(())
}
