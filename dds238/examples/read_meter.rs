//! Read all meter records

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

    // Tariff is host side, used for the derived totals
    meter.set_power_company(1250.0, 0.15, &mut snapshot).await?;

    for _ in 0..5 {
        meter.get_power_cut(&mut snapshot, false).await?;
        meter.get_measurement(&mut snapshot, false).await?;
        meter.get_limit_purchase(&mut snapshot, false).await?;

        let cut = &snapshot.power_cut.data;
        println!("Relay: {} ({})", if cut.power_cut { "open" } else { "closed" }, cut.reason);
        println!("{}", snapshot.measurement.data);

        let limits = &snapshot.limit_purchase.data;
        println!(
            "Limits: {:.2} A, {}-{} V, balance {:.2} kWh",
            limits.max_current, limits.min_voltage, limits.max_voltage, limits.energy_balance
        );

        sleep(Duration::from_secs(1)).await;
    }

    let session = meter.session();
    println!(
        "{} successful operations, {} errors",
        session.success_count(false),
        session.error_count(false)
    );

    meter.close().await?;

    Ok(())
}
