//! Capture an image and save it as JPEG
//!
//! ```text
//! SCANNER_PORT=/dev/ttyACM0 cargo run --example capture_image -- snapshot.jpg
//! ```

use std::time::Duration;

use anyhow::Context;
use hscanner::{ImageCapture, Scanner, ScannerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    
    let port = std::env::var("SCANNER_PORT").unwrap_or_else(|_| "/dev/ttyACM0".to_string());
    let output = std::env::args().nth(1).unwrap_or_else(|| "capture.jpg".to_string());
    
    let scanner = Scanner::open(ScannerConfig::new(&port))
        .await
        .with_context(|| format!("opening {}", port))?;
    
    // Full resolution with illumination
    let capture = ImageCapture::new().with_illumination(true);
    let image = scanner.capture_image(&capture, Duration::from_secs(10)).await?;
    
    println!("Captured {}", image);
    
    std::fs::write(&output, &image.data).with_context(|| format!("writing {}", output))?;
    println!("Saved to {}", output);
    
    scanner.close().await?;
    Ok(())
}
