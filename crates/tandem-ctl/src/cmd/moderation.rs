//! Block list and report commands.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json, human_secs};

#[derive(Deserialize)]
struct BlocksResponse {
    blocks: Vec<BlockInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockInfo {
    peer: String,
    remaining_secs: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportStatsResponse {
    total_reports: u64,
    by_reason: BTreeMap<String, u64>,
}

pub async fn cmd_blocks(port: u16) -> Result<()> {
    let resp: BlocksResponse = get_json(&format!("{}/blocks", base_url(port))).await?;

    if resp.blocks.is_empty() {
        println!("No blocked peers.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Blocked Peers ({})", resp.blocks.len());
    println!("═══════════════════════════════════════");
    for b in &resp.blocks {
        println!("  {}  expires in {}", b.peer, human_secs(b.remaining_secs));
    }

    Ok(())
}

pub async fn cmd_reports(port: u16) -> Result<()> {
    let resp: ReportStatsResponse = get_json(&format!("{}/report/stats", base_url(port))).await?;

    println!("═══════════════════════════════════════");
    println!("  Reports ({} total)", resp.total_reports);
    println!("═══════════════════════════════════════");
    for (reason, count) in &resp.by_reason {
        println!("  {:<24} {}", reason, count);
    }

    Ok(())
}
