//! tandem-ctl: command-line interface for the tandem daemon.

use anyhow::{Context, Result};

mod cmd;

const DEFAULT_PORT: u16 = 5000;

fn print_usage() {
    println!("Usage: tandem-ctl [--port <port>] <command>");
    println!();
    println!("Commands:");
    println!("  status      Show connected, waiting, session and block counts");
    println!("  sessions    List active sessions");
    println!("  blocks      List peers currently blocked from matching");
    println!("  reports     Show report totals by reason");
    println!();
    println!("Options:");
    println!("  --port <port>   Daemon HTTP port (default: {})", DEFAULT_PORT);
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // Parse --port option
    let mut port = DEFAULT_PORT;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--port" {
            i += 1;
            port = args
                .get(i)
                .context("--port requires a value")?
                .parse()
                .context("--port must be a number")?;
        } else {
            remaining.push(&args[i]);
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["status"] | []                => cmd::status::cmd_status(port).await,
        ["sessions"]                   => cmd::status::cmd_sessions(port).await,
        ["blocks"]                     => cmd::moderation::cmd_blocks(port).await,
        ["reports"]                    => cmd::moderation::cmd_reports(port).await,
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
