//! hashdrop-ctl — command-line interface for the hashdrop services.

use anyhow::{Context, Result};

mod cmd;

use cmd::{consumer, producer};

const DEFAULT_PRODUCER: &str = "http://127.0.0.1:5001";
const DEFAULT_CONSUMER: &str = "http://127.0.0.1:5000";
const DEFAULT_DOWNLOAD: &str = "data.txt";

fn print_usage() {
    println!("Usage: hashdrop-ctl [--producer <url>] [--consumer <url>] <command>");
    println!();
    println!("Commands:");
    println!("  status                    Show service health and the latest record");
    println!("  generate                  Ask the producer for a fresh payload");
    println!(
        "  download [path]           Save the current payload (default: {})",
        DEFAULT_DOWNLOAD
    );
    println!("  fetch                     Run one transfer cycle on the consumer");
    println!("  records [--since <time>]  List verification records (RFC 3339 time)");
    println!();
    println!("Options:");
    println!("  --producer <url>   Producer base URL (default: {})", DEFAULT_PRODUCER);
    println!("  --consumer <url>   Consumer base URL (default: {})", DEFAULT_CONSUMER);
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    // Parse --producer / --consumer options
    let mut producer_url = DEFAULT_PRODUCER.to_string();
    let mut consumer_url = DEFAULT_CONSUMER.to_string();
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--producer" => {
                i += 1;
                producer_url = args.get(i).context("--producer requires a value")?.clone();
            }
            "--consumer" => {
                i += 1;
                consumer_url = args.get(i).context("--consumer requires a value")?.clone();
            }
            other => remaining.push(other),
        }
        i += 1;
    }
    let producer_url = producer_url.trim_end_matches('/');
    let consumer_url = consumer_url.trim_end_matches('/');

    match remaining.as_slice() {
        ["status"] | [] => consumer::cmd_status(producer_url, consumer_url).await,
        ["generate"] => producer::cmd_generate(producer_url).await,
        ["download"] => producer::cmd_download(producer_url, DEFAULT_DOWNLOAD).await,
        ["download", path] => producer::cmd_download(producer_url, path).await,
        ["fetch"] => consumer::cmd_fetch(consumer_url).await,
        ["records"] => consumer::cmd_records(consumer_url, None).await,
        ["records", "--since", since] => consumer::cmd_records(consumer_url, Some(*since)).await,
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
