use clap::{Parser, Subcommand};
use wisun_rs::{
    connect_meter, init_logger, log_info, MeterPoller, ModemHandle, ReadingSink, RouteBConfig,
    WiSunError,
};

#[derive(Parser)]
#[command(name = "wisun-cli")]
#[command(about = "CLI tool for reading smart meters over Wi-SUN Route-B")]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "watt_reader.json")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Establish a session and poll the meter until interrupted
    Run,
    /// Run one discovery round and log the PAN descriptor
    Scan,
}

/// Logs every reading; stands in for the display/metrics collaborators.
struct LogSink;

impl ReadingSink for LogSink {
    fn instantaneous_watt(&mut self, watt: u32) {
        log_info(&format!("instantaneous power: {watt} W"));
    }

    fn cumulative_watt_hour(&mut self, watt_hour: f64) {
        log_info(&format!("cumulative energy: {watt_hour} kWh"));
    }
}

#[tokio::main]
async fn main() -> Result<(), WiSunError> {
    init_logger();

    let cli = Cli::parse();
    let config = RouteBConfig::load(&cli.config)?;

    match cli.command {
        Commands::Run => {
            let mut modem = connect_meter(&config).await?;
            log_info("smart meter connected");

            let mut poller = MeterPoller::new(LogSink);
            poller.calibrate(&mut modem).await?;
            poller.run(&mut modem).await
        }
        Commands::Scan => {
            let port = wisun_rs::open_port(&config.port, config.baudrate)?;
            let mut modem = ModemHandle::new(
                port,
                config.route_b_id.clone(),
                config.route_b_password.clone(),
            );
            modem.initialize().await?;
            let descriptor = modem.discover().await?;
            log_info(&format!(
                "pan descriptor: channel={} pan_id={} addr={}",
                descriptor.channel.as_deref().unwrap_or("n/a"),
                descriptor.pan_id.as_deref().unwrap_or("n/a"),
                descriptor.addr.as_deref().unwrap_or("n/a"),
            ));
            Ok(())
        }
    }
}
