//! BeeLight node
//!
//! Runs the light and battery sampling pipeline against an in-process
//! Zigbee stack with simulated sensor drivers.

use config::NodeConfig;
use publisher::AttributePublisher;
use sensor_pipeline::{reading_channel, BatterySampler, LightSampler, Ticker};
use signals::NodeSignalHandler;
use simulated::{SimulatedBattery, SimulatedLightSensor};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zigbee_core::{AttributeReport, DeviceContext, EndpointDescriptor, InMemoryStack};

mod config;
mod publisher;
mod signals;
mod simulated;

/// Log every attribute report the stack would send to bound clients
async fn log_reports(mut reports: broadcast::Receiver<AttributeReport>) {
    loop {
        match reports.recv().await {
            Ok(report) => match serde_json::to_string(&report) {
                Ok(json) => tracing::info!("Attribute report: {}", json),
                Err(e) => tracing::warn!("Failed to serialize report: {}", e),
            },
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!("Report logger lagged by {} reports", n);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "beelight_node=debug,sensor_pipeline=debug,zigbee_core=info,info".into()
            }),
        )
        .init();

    tracing::info!("Starting BeeLight node v{}", env!("CARGO_PKG_VERSION"));

    let config = NodeConfig::load()?;
    tracing::debug!("Configuration: {:?}", config);

    // Endpoint and attribute memory
    let endpoint = EndpointDescriptor::light_sensor(config.endpoint);
    tracing::info!(
        "Endpoint {}: {} server clusters, {} reportable attributes",
        endpoint.id,
        endpoint.in_clusters().len(),
        endpoint.reportable_attribute_count()
    );
    let ctx = DeviceContext::new(config.endpoint, &config.basic);
    let stack = InMemoryStack::new();
    stack.register_endpoint(endpoint, ctx.attributes());

    let report_task = tokio::spawn(log_reports(stack.subscribe()));

    let mut signal_handler = NodeSignalHandler::default();
    stack.start(&mut signal_handler);
    if !signal_handler.joined() {
        tracing::warn!("Not joined to a network, attribute reports go nowhere");
    }

    // Pipeline
    let (light_tx, light_rx) = reading_channel("light", config.channel_capacity);
    let (battery_tx, battery_rx) = reading_channel("battery", config.channel_capacity);

    let publisher_task =
        tokio::spawn(AttributePublisher::new(ctx, stack.clone()).run(light_rx, battery_rx));

    let ticker = Ticker::new(config.tick_interval(), config.tick_initial_delay());
    let light = LightSampler::new(
        SimulatedLightSensor::new(&config.simulation),
        config.track_light_extrema,
    );
    let light_task = tokio::spawn(light.run(
        ticker.subscribe(),
        light_tx,
        config.light_publish_timeout(),
    ));
    let ticker_task = ticker.start();

    let battery = BatterySampler::new(
        SimulatedBattery::new(&config.simulation),
        config.discharge_curve.clone(),
    );
    let battery_task = tokio::spawn(battery.run(
        battery_tx,
        config.battery_period(),
        config.battery_publish_timeout(),
    ));

    tracing::info!("BeeLight application started");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    // Stopping the producers closes both reading channels
    ticker_task.abort();
    light_task.abort();
    battery_task.abort();
    let ctx = publisher_task.await?;
    report_task.abort();

    tracing::info!(
        "Final state: illuminance {} (min {}, max {}), battery {} dV, {} half-percent",
        ctx.illuminance.measured_value,
        ctx.illuminance.min_measured_value,
        ctx.illuminance.max_measured_value,
        ctx.power.voltage,
        ctx.power.percent_remaining
    );

    Ok(())
}
