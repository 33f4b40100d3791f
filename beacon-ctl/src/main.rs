//! Host tool for the BLE wake beacon
//!
//! Talks to the same cloud topic the device subscribes to, and scans for the
//! wake packet the device advertises.

use beacon_device::{sanitize, DeviceConfig};
use beacon_proto::ble::{manufacturer_data, WAKE_ADV_DATA, WAKE_COMPANY_ID};
use beacon_proto::{
    async_io, publish_line, subscribe_line, Command, CLOUD_HOST, CLOUD_PORT, HEARTBEAT,
    HEARTBEAT_INTERVAL_MS,
};
use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager};
use clap::{Args, Parser, Subcommand};
use data_encoding::HEXLOWER;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;

#[derive(Parser)]
#[command(name = "beacon-ctl")]
#[command(about = "Drive and inspect a BLE wake beacon")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Cloud {
    /// Cloud user id
    #[arg(long, env = "BEMFA_UID")]
    uid: String,
    /// Topic the device subscribes to
    #[arg(long, env = "BEMFA_TOPIC")]
    topic: String,
    #[arg(long, default_value = CLOUD_HOST)]
    host: String,
    #[arg(long, default_value_t = CLOUD_PORT)]
    port: u16,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish a message ("on" wakes the beacon) to the topic
    Publish {
        #[command(flatten)]
        cloud: Cloud,
        message: String,
    },
    /// Subscribe like the device does and print every line
    Listen {
        #[command(flatten)]
        cloud: Cloud,
    },
    /// Scan for wake advertisements
    Scan {
        /// Scan duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Show what the device would store for these values
    Check {
        #[arg(long, default_value = "")]
        uid: String,
        #[arg(long, default_value = "")]
        topic: String,
        #[arg(long, default_value = "")]
        mac: String,
        #[arg(long, default_value = "")]
        data: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Publish { cloud, message } => publish(&cloud, &message).await?,
        Commands::Listen { cloud } => listen(&cloud).await?,
        Commands::Scan { duration } => {
            let adapter = get_adapter().await?;
            scan(&adapter, duration).await?;
        }
        Commands::Check {
            uid,
            topic,
            mac,
            data,
        } => {
            let candidate = DeviceConfig {
                bafa_uid: uid,
                bafa_topic: topic,
                ble_mac: mac,
                ble_data: data,
            };
            println!("{}", serde_json::to_string_pretty(&sanitize(candidate))?);
        }
    }

    Ok(())
}

async fn publish(cloud: &Cloud, message: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("Connecting to {}:{}...", cloud.host, cloud.port);
    let stream = TcpStream::connect((cloud.host.as_str(), cloud.port)).await?;
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    async_io::write_line(&mut writer, &publish_line(&cloud.uid, &cloud.topic, message)).await?;
    println!("Published '{}' to {}", message, cloud.topic);

    match tokio::time::timeout(Duration::from_secs(5), async_io::read_line(&mut reader)).await {
        Ok(Ok(Some(reply))) => println!("Server: {}", reply),
        Ok(Ok(None)) => println!("Server closed the connection"),
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => println!("No reply within 5s"),
    }
    Ok(())
}

async fn listen(cloud: &Cloud) -> Result<(), Box<dyn std::error::Error>> {
    println!("Connecting to {}:{}...", cloud.host, cloud.port);
    let stream = TcpStream::connect((cloud.host.as_str(), cloud.port)).await?;
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    async_io::write_line(&mut writer, &subscribe_line(&cloud.uid, &cloud.topic)).await?;
    println!("Subscribed to {}, Ctrl-C to stop", cloud.topic);

    let mut heartbeat = tokio::time::interval(Duration::from_millis(HEARTBEAT_INTERVAL_MS));
    // first tick completes immediately
    heartbeat.tick().await;

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                async_io::write_line(&mut writer, HEARTBEAT).await?;
                println!("(heartbeat)");
            }
            line = lines.next_line() => match line? {
                Some(line) => println!("{} [{}]", line, describe(&line)),
                None => {
                    println!("Server closed the connection");
                    break;
                }
            },
        }
    }
    Ok(())
}

/// How the device would react to this line
fn describe(line: &str) -> &'static str {
    match Command::classify(line) {
        Some(Command::TurnOn) => "beacon on",
        Some(Command::TurnOff) => "beacon off",
        None => "ignored",
    }
}

/// True if `data` (company id already stripped) is what the device advertises
fn is_wake_packet(data: &[u8]) -> bool {
    matches!(
        manufacturer_data(&WAKE_ADV_DATA),
        Some((WAKE_COMPANY_ID, expected)) if expected == data
    )
}

async fn get_adapter() -> Result<Adapter, Box<dyn std::error::Error>> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;
    adapters
        .into_iter()
        .next()
        .ok_or_else(|| "No Bluetooth adapter found".into())
}

async fn scan(adapter: &Adapter, duration: u64) -> Result<(), Box<dyn std::error::Error>> {
    println!("Scanning for wake beacons ({} seconds)...", duration);

    adapter.start_scan(ScanFilter::default()).await?;
    tokio::time::sleep(Duration::from_secs(duration)).await;

    let peripherals = adapter.peripherals().await?;
    let mut found = 0;

    for peripheral in peripherals {
        let Some(props) = peripheral.properties().await? else {
            continue;
        };
        let Some(data) = props.manufacturer_data.get(&WAKE_COMPANY_ID) else {
            continue;
        };
        found += 1;
        let rssi = props
            .rssi
            .map(|r| format!("{} dBm", r))
            .unwrap_or_else(|| "N/A".to_string());
        let kind = if is_wake_packet(data) { "wake" } else { "other" };
        println!(
            "  {} RSSI: {} [{}] data: {}",
            peripheral.address(),
            rssi,
            kind,
            HEXLOWER.encode(data)
        );
    }

    println!("\nFound {} wake beacon(s)", found);
    adapter.stop_scan().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_matches_device() {
        assert_eq!(describe("cmd=2&uid=u&topic=t&msg=on"), "beacon on");
        assert_eq!(describe("cmd=2&msg=off"), "beacon off");
        assert_eq!(describe("cmd=0&res=1"), "ignored");
    }

    #[test]
    fn wake_packet_recognised() {
        assert!(is_wake_packet(&WAKE_ADV_DATA[7..]));
        assert!(!is_wake_packet(&WAKE_ADV_DATA[7..20]));
        assert!(!is_wake_packet(&[]));
    }

    #[test]
    fn cli_parses_publish() {
        let cli = Cli::try_parse_from([
            "beacon-ctl", "publish", "--uid", "u1", "--topic", "lamp", "on",
        ])
        .unwrap();
        match cli.command {
            Commands::Publish { cloud, message } => {
                assert_eq!(cloud.host, CLOUD_HOST);
                assert_eq!(cloud.port, CLOUD_PORT);
                assert_eq!(message, "on");
            }
            _ => panic!("expected publish"),
        }
    }
}
