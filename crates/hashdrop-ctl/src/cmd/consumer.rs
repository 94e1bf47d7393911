//! Consumer commands: fetch, records, status.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::http::{get_json, post_json};

// ── Response types ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct Record {
    timestamp: DateTime<Utc>,
    payload_name: String,
    expected_digest: String,
    actual_digest: String,
    status: String,
    source_address: String,
}

#[derive(Deserialize)]
struct RecordsResponse {
    count: usize,
    records: Vec<Record>,
}

#[derive(Deserialize)]
struct HealthResponse {
    status: String,
}

fn print_record(r: &Record) {
    println!("  ┌─ {}", r.timestamp.to_rfc3339());
    println!("  │  status   : {}", r.status);
    println!("  │  payload  : {}", r.payload_name);
    println!("  │  expected : {}", r.expected_digest);
    println!("  │  actual   : {}", r.actual_digest);
    println!("  └─ source   : {}", r.source_address);
}

// ── Subcommand handlers ───────────────────────────────────────────────────────

pub async fn cmd_fetch(consumer: &str) -> Result<()> {
    let record: Record = post_json(&format!("{}/fetch", consumer)).await?;

    println!("═══════════════════════════════════════");
    println!("  Transfer {}", record.status);
    println!("═══════════════════════════════════════");
    print_record(&record);

    Ok(())
}

pub async fn cmd_records(consumer: &str, since: Option<&str>) -> Result<()> {
    let url = match since {
        Some(s) => {
            // Validate locally so a typo fails before the request is made.
            let t = DateTime::parse_from_rfc3339(s)
                .with_context(|| format!("--since must be an RFC 3339 timestamp, got {}", s))?;
            // `+` would decode as a space in the query string.
            format!(
                "{}/records?since={}",
                consumer,
                t.with_timezone(&Utc).format("%Y-%m-%dT%H:%M:%S%.fZ")
            )
        }
        None => format!("{}/records", consumer),
    };
    let resp: RecordsResponse = get_json(&url).await?;

    if resp.records.is_empty() {
        println!("No records logged.");
        return Ok(());
    }

    println!("═══════════════════════════════════════");
    println!("  Verification Records ({})", resp.count);
    println!("═══════════════════════════════════════");
    for r in &resp.records {
        print_record(r);
    }

    Ok(())
}

pub async fn cmd_status(producer: &str, consumer: &str) -> Result<()> {
    println!("═══════════════════════════════════════");
    println!("  hashdrop Status");
    println!("═══════════════════════════════════════");

    for (name, url) in [("Producer", producer), ("Consumer", consumer)] {
        match get_json::<HealthResponse>(&format!("{}/health", url)).await {
            Ok(h) => println!("  {:<9}: {} ({})", name, h.status, url),
            Err(e) => println!("  {:<9}: unreachable ({}): {:#}", name, url, e),
        }
    }

    if let Ok(resp) = get_json::<RecordsResponse>(&format!("{}/records", consumer)).await {
        println!("  Records  : {}", resp.count);
        if let Some(last) = resp.records.last() {
            println!("\n  Last transfer:");
            print_record(last);
        }
    }

    Ok(())
}
