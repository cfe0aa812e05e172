use clap::Parser;
use log::{error, info, warn};
use presence_bridge::PresenceBridge;
use presence_bridge::config::{Config, load_dotenv};
use presence_bridge::detection::HandoffSignal;
use presence_bridge::profile::server::{AttributeKind, CLIENT_CONFIG_UUID};
use presence_bridge::profile::subscriptions::ConnHandle;
use presence_bridge::profile::{
    AttributeRef, LoggingAttributeServer, Parameter, ProximityService,
};
use presence_bridge::sensor::SimulatedSensor;
use presence_bridge::sensor::simulated::run_presence_simulation;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::time::Duration;

/// Raised by the simulated driver, consumed by the worker task.
static DETECTION_HANDOFF: HandoffSignal = HandoffSignal::new();

/// First handle assigned by the logging stack binding.
const FIRST_HANDLE: u16 = 0x0010;

const DEMO_PEER: ConnHandle = 1;

#[derive(Parser)]
#[command(name = "presence-bridge")]
#[command(about = "Expose a presence sensor through the BLE proximity service")]
struct Args {
    /// JSON config file; environment variables override its values
    #[arg(long, env = "PRESENCE_CONFIG")]
    config: Option<PathBuf>,

    /// Initial detection range in cm (20-200)
    #[arg(long)]
    range: Option<u16>,

    /// Initial sensitivity (1-6)
    #[arg(long)]
    sensitivity: Option<u8>,

    /// Initial presence timeout in ms
    #[arg(long)]
    timeout_ms: Option<u16>,

    /// Maximum simultaneous peers
    #[arg(long)]
    max_peers: Option<usize>,

    /// Simulated reading period in ms
    #[arg(long)]
    sim_period_ms: Option<u64>,

    /// Do not run the scripted demo peer
    #[arg(long)]
    no_demo_peer: bool,
}

impl Args {
    fn resolve_config(&self) -> presence_bridge::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::from_env(),
        };
        if let Some(range) = self.range {
            config.sensor.range = range;
        }
        if let Some(sensitivity) = self.sensitivity {
            config.sensor.sensitivity = sensitivity;
        }
        if let Some(timeout) = self.timeout_ms {
            config.sensor.timeout_ms = timeout;
        }
        if let Some(max_peers) = self.max_peers {
            config.link.max_peers = max_peers;
        }
        if let Some(period) = self.sim_period_ms {
            config.simulation.period_ms = period;
        }
        if self.no_demo_peer {
            config.simulation.demo_peer = false;
        }
        Ok(config.sanitized())
    }
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

/// Play the part of a peer: subscribe to Detection, then try an invalid and
/// a valid Range write.
async fn run_demo_peer(service: Arc<ProximityService>) {
    if let Err(e) = service.on_connect(DEMO_PEER) {
        warn!("[Demo] connect: {}", e);
    }

    let Some(ccc) = service.handle_of(AttributeKind::ClientConfig(Parameter::Detection)) else {
        error!("[Demo] service not registered");
        return;
    };
    let ccc = AttributeRef::new(ccc, CLIENT_CONFIG_UUID);
    if let Err(e) = service.write_attribute(DEMO_PEER, &ccc, &[0x01, 0x00], 0) {
        warn!("[Demo] subscribe failed: {}", e);
    }

    let Some(range) = service.handle_of(AttributeKind::Value(Parameter::Range)) else {
        return;
    };
    let range = AttributeRef::new(range, Parameter::Range.uuid());
    for value in [250u16, 100] {
        tokio::time::sleep(Duration::from_secs(2)).await;
        match service.write_attribute(DEMO_PEER, &range, &value.to_le_bytes(), 0) {
            Ok(()) => info!("[Demo] wrote Range = {}", value),
            Err(e) => info!(
                "[Demo] Range = {} rejected with 0x{:02X} ({})",
                value,
                e.code(),
                e
            ),
        }
        if let Ok(bytes) = service.read_attribute(DEMO_PEER, &range, 0) {
            info!("[Demo] Range reads back {:02X?}", bytes);
        }
    }
}

#[tokio::main]
async fn main() {
    load_dotenv();
    init_logger();
    info!("Starting Presence Bridge");

    let args = Args::parse();
    let config = match args.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!("Configuration loaded:");
    info!("  Range: {} cm", config.sensor.range);
    info!("  Sensitivity: {}", config.sensor.sensitivity);
    info!("  Timeout: {} ms", config.sensor.timeout_ms);
    info!("  Max peers: {}", config.link.max_peers);

    let sensor = Arc::new(SimulatedSensor::new(
        config.sensor.range,
        config.sensor.sensitivity,
        config.sensor.timeout_ms,
    ));
    let server = Arc::new(LoggingAttributeServer::new(FIRST_HANDLE));

    let mut bridge =
        match PresenceBridge::build(&config, sensor.clone(), server.clone(), &DETECTION_HANDOFF) {
            Ok(bridge) => bridge,
            Err(e) => {
                error!("Failed to start proximity service: {}", e);
                std::process::exit(1);
            }
        };
    let worker_task = bridge.spawn_worker();
    let sim_task = run_presence_simulation(
        sensor,
        Duration::from_millis(config.simulation.period_ms),
    );
    let demo_task = config
        .simulation
        .demo_peer
        .then(|| tokio::spawn(run_demo_peer(bridge.service().clone())));

    info!("Presence Bridge is running");
    info!("  - Press Ctrl+C to exit");

    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }

    if let Some(task) = demo_task {
        task.abort();
        if let Err(e) = bridge.service().on_disconnect(DEMO_PEER, 0) {
            warn!("[Demo] disconnect: {}", e);
        }
    }
    sim_task.abort();
    if let Some(task) = worker_task {
        task.abort();
    }

    info!(
        "Presence Bridge stopped ({} notification(s) sent, {} parameter change(s))",
        server.notifications_sent(),
        bridge.service().store().version()
    );
}
