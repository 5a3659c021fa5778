// Manual check of a camera's credentials, snapshot and motion endpoints.
// Run with: cargo run --bin check_camera -- <ip[:port]> <username> <password> [channel]

use std::time::Duration;

use anyhow::{bail, Context};
use reolink_bridge::camera::{CameraAddress, CameraApi, ReolinkClient};
use reolink_bridge::device::settings::parse_channel;
use reolink_bridge::device::streams::derive_stream_candidates;
use reolink_bridge::device::ResolvedAddress;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        bail!("usage: check_camera <ip[:port]> <username> <password> [channel]");
    }

    let (ip, http_port) = match args[0].split_once(':') {
        Some((ip, port)) => (ip.to_string(), port.parse::<u16>().context("invalid port")?),
        None => (args[0].clone(), 80),
    };

    let resolved = ResolvedAddress {
        ip,
        http_port,
        rtmp_port: 1935,
        rtsp_port: 554,
        channel: parse_channel(args.get(3).map(String::as_str)),
        username: args[1].clone(),
        password: args[2].clone(),
    };
    let address: CameraAddress = resolved.camera_address();

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;
    let camera = ReolinkClient::new(address, http_client);

    println!("\n=== Testing Snap ===");
    match camera.jpeg_snapshot().await {
        Ok(jpeg) => println!("Snapshot OK: {} bytes", jpeg.len()),
        Err(e) => eprintln!("Snapshot Error: {}", e),
    }

    println!("\n=== Testing GetMdState ===");
    match camera.get_motion_state().await {
        Ok(state) => {
            println!("Motion detected: {}", state.detected);
            println!("Raw: {}", state.raw);
        }
        Err(e) => eprintln!("GetMdState Error: {}", e),
    }

    println!("\n=== Stream candidates ===");
    for candidate in derive_stream_candidates(&resolved) {
        println!("{:<16} {}", candidate.name, candidate.url);
    }

    Ok(())
}
