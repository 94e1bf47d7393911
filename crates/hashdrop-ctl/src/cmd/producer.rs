//! Producer commands: generate, download.

use anyhow::{Context, Result};
use serde::Deserialize;

use super::http::{get_bytes, get_json};

#[derive(Deserialize)]
struct GenerateResponse {
    message: String,
    checksum: String,
    file_path: String,
    #[serde(default)]
    locator: Option<String>,
}

pub async fn cmd_generate(producer: &str) -> Result<()> {
    let resp: GenerateResponse = get_json(&format!("{}/generate", producer)).await?;

    println!("═══════════════════════════════════════");
    println!("  {}", resp.message);
    println!("═══════════════════════════════════════");
    println!("  Checksum : {}", resp.checksum);
    println!("  Path     : {}", resp.file_path);
    if let Some(locator) = &resp.locator {
        println!("  Locator  : {}", locator);
    }

    Ok(())
}

pub async fn cmd_download(producer: &str, path: &str) -> Result<()> {
    let bytes = get_bytes(&format!("{}/file", producer)).await?;
    std::fs::write(path, &bytes).with_context(|| format!("failed to write {}", path))?;
    println!("Downloaded {} bytes to {}", bytes.len(), path);
    Ok(())
}
