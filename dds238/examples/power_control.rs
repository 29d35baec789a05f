//! Relay control example

use std::time::Duration;

use dds238::{Meter, MeterSnapshot};
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> dds238::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let port = std::env::var("METER_PORT").unwrap_or_else(|_| "/dev/ttyUSB0".to_string());

    let mut meter = Meter::new(port);
    let mut snapshot = MeterSnapshot::new();

    meter.open().await?;

    // Cut the supply
    println!("Opening relay...");
    meter.set_power_cut(true, &mut snapshot).await?;
    println!("Relay: {}", snapshot.power_cut.data.reason);
    sleep(Duration::from_secs(3)).await;

    // Restore it
    println!("Closing relay...");
    meter.set_power_cut(false, &mut snapshot).await?;

    // Cut again in 10 minutes
    meter.set_delay(true, 10, &mut snapshot).await?;
    println!("Delayed cut in {} minutes", snapshot.power_cut.data.delay_minutes);

    // Raw query for the power cut record
    match meter.send_hex_message("48:06:02:01:00:00").await {
        Ok(reply) => println!("Raw reply: {}", reply),
        Err(e) => println!("Raw query failed: {} ({})", e, e.kind()),
    }

    println!("Done!");

    meter.close().await?;

    Ok(())
}
