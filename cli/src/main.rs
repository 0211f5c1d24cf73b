//! stakewatch CLI — inspect coinbase snapshots and monitor state.
//!
//! Usage:
//! ```bash
//! stakewatch cache <dir> <network>   # summarize a persisted snapshot
//! stakewatch reset <dir> <network>   # delete a persisted snapshot
//! stakewatch info
//! ```

use std::env;
use std::process;

use stakewatch_core::snapshot::SnapshotStore;
use stakewatch_store::JsonFileStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    match args[1].as_str() {
        "cache" if args.len() == 4 => cmd_cache(&args[2], &args[3]).await?,
        "reset" if args.len() == 4 => cmd_reset(&args[2], &args[3]).await?,
        "info" => cmd_info(),
        "version" | "--version" | "-V" => {
            println!("stakewatch {}", env!("CARGO_PKG_VERSION"));
        }
        "help" | "--help" | "-h" => print_usage(),
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    }
    Ok(())
}

fn print_usage() {
    println!("stakewatch {}", env!("CARGO_PKG_VERSION"));
    println!("Coinbase reconciliation and attester lifecycle monitor\n");
    println!("USAGE:");
    println!("    stakewatch <COMMAND>\n");
    println!("COMMANDS:");
    println!("    cache <dir> <network>  Summarize the persisted coinbase snapshot");
    println!("    reset <dir> <network>  Delete the persisted coinbase snapshot");
    println!("    info                   Show Stakewatch configuration info");
    println!("    version                Print version");
    println!("    help                   Print this help");
}

fn cmd_info() {
    println!("Stakewatch v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "  Default chunk size: {} blocks/call",
        stakewatch_core::DEFAULT_CHUNK_SIZE
    );
    println!(
        "  Snapshot schema version: {}",
        stakewatch_core::SNAPSHOT_VERSION
    );
    println!("  Snapshot backends: memory, JSON file (atomic rename)");
    println!("  Chains: EVM rollup registries");
}

async fn cmd_cache(dir: &str, network: &str) -> anyhow::Result<()> {
    let store = JsonFileStore::new(dir);
    match store.load(network).await? {
        None => println!("No snapshot for network '{network}' under {dir}"),
        Some(snapshot) => {
            println!(
                "Snapshot for '{network}' (provider {})",
                snapshot.staking_provider_id
            );
            println!("  last scanned block: {}", snapshot.last_scanned_block);
            println!(
                "  scraped at:         {}",
                chrono::DateTime::from_timestamp(snapshot.scraped_at, 0)
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| snapshot.scraped_at.to_string())
            );
            println!("  mappings:           {}", snapshot.mappings.len());
            let mut mappings: Vec<_> = snapshot.mappings.values().collect();
            mappings.sort_by_key(|m| m.block_number);
            for mapping in mappings {
                println!(
                    "    {} -> {} @ block {}",
                    mapping.attester_address, mapping.coinbase_address, mapping.block_number
                );
            }
        }
    }
    Ok(())
}

async fn cmd_reset(dir: &str, network: &str) -> anyhow::Result<()> {
    let store = JsonFileStore::new(dir);
    store.delete(network).await?;
    println!("Deleted snapshot for network '{network}' under {dir}");
    Ok(())
}
