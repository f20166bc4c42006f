//! Status and session commands.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json, human_secs, short};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    version: String,
    uptime_secs: u64,
    active_users: usize,
    waiting_users: usize,
    active_sessions: usize,
    blocked_users: usize,
    geolocation_enabled: bool,
    block_ttl_secs: u64,
}

#[derive(Deserialize)]
struct SessionsResponse {
    sessions: Vec<SessionInfo>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionInfo {
    id: String,
    peers: [String; 2],
    age_secs: u64,
}

pub async fn cmd_status(port: u16) -> Result<()> {
    let resp: StatusResponse = get_json(&format!("{}/status", base_url(port))).await?;

    println!("═══════════════════════════════════════");
    println!("  Tandem Daemon Status (v{})", resp.version);
    println!("═══════════════════════════════════════");
    println!("  Uptime           : {}", human_secs(resp.uptime_secs));
    println!("  Connected peers  : {}", resp.active_users);
    println!("  Waiting          : {}", resp.waiting_users);
    println!("  Active sessions  : {}", resp.active_sessions);
    println!("  Blocked peers    : {}", resp.blocked_users);
    println!("  Block TTL        : {}", human_secs(resp.block_ttl_secs));
    println!(
        "  Geolocation      : {}",
        if resp.geolocation_enabled { "enabled" } else { "disabled" }
    );

    Ok(())
}

pub async fn cmd_sessions(port: u16) -> Result<()> {
    let resp: SessionsResponse = get_json(&format!("{}/sessions", base_url(port))).await?;

    if resp.sessions.is_empty() {
        println!("No active sessions.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Active Sessions ({})", resp.sessions.len());
    println!("═══════════════════════════════════════");

    for s in &resp.sessions {
        println!("  ┌─ {}", s.id);
        println!("  │  peers  : {} ↔ {}", short(&s.peers[0]), short(&s.peers[1]));
        println!("  └─ uptime : {}", human_secs(s.age_secs));
    }

    Ok(())
}
