//! Send one menu command and print the reply
//!
//! ```text
//! SCANNER_PORT=/dev/ttyACM0 cargo run --example send_command -- "REVINF"
//! ```

use std::time::Duration;

use anyhow::Context;
use hscanner::{Scanner, ScannerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    
    let port = std::env::var("SCANNER_PORT").unwrap_or_else(|_| "/dev/ttyACM0".to_string());
    let command = std::env::args().nth(1).unwrap_or_else(|| "TRGMOD0;DECHDR1".to_string());
    
    let scanner = Scanner::open(ScannerConfig::new(&port))
        .await
        .with_context(|| format!("opening {}", port))?;
    
    let (success, response) = scanner
        .send_command_status(&command, Duration::from_secs(2))
        .await;
    
    println!("{} -> success={} response={:?}", command, success, response);
    
    scanner.close().await?;
    Ok(())
}
