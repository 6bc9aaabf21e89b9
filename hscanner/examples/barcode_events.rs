//! Print trigger pulls and barcode scans until Ctrl-C

use std::sync::Arc;
use std::time::Duration;

use hscanner::{ChannelEvents, Scanner, ScannerConfig, ScannerEvent, TriggerMode};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    
    let port = std::env::var("SCANNER_PORT").unwrap_or_else(|_| "/dev/ttyACM0".to_string());
    
    let config = ScannerConfig::new(port).with_command_timeout(Duration::from_secs(2));
    let scanner = Scanner::open(config).await?;
    
    let (events, mut rx) = ChannelEvents::new();
    scanner.set_event_handler(Arc::new(events));
    
    scanner.set_trigger_mode(TriggerMode::Notify).await?;
    scanner.set_decode_header(true).await?;
    
    println!("Waiting for scans, press Ctrl-C to stop");
    
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(ScannerEvent::TriggerPull) => println!("Trigger pulled"),
                Some(ScannerEvent::BarcodeScan(scan)) => println!("{}", scan),
                Some(ScannerEvent::UnsolicitedResponse(text)) => println!("Scanner says {:?}", text),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    
    scanner.set_trigger_mode(TriggerMode::Manual).await?;
    scanner.close().await?;
    Ok(())
}
