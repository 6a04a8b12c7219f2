//! Command-line interface for the BESS dashboard.
//!
//! Prints site status and history. When the device API is configured in
//! the environment, it is asked directly first (LAN addresses allowed);
//! otherwise, or when that fails, the dashboard daemon is queried.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use time::OffsetDateTime;

use bess_dashboard::api_client::{
    self,
    types::{HistoryPoint, StatusSnapshot},
};
use bess_dashboard::config::UpstreamConfig;
use bess_dashboard::site::{SiteConfigProvider, SiteTable};
use bess_dashboard::types::{HistoryWindow, parse_rfc3339};
use bess_dashboard::upstream::{UpstreamClient, check_endpoint, mapping};

/// Bound on the direct device attempt before falling back to the daemon.
const DIRECT_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        usage();
        std::process::exit(1);
    }

    let command = &args[1];

    match command.as_str() {
        "sites" => cmd_sites().await?,
        "status" => cmd_status(site_arg(&args)?).await?,
        "history" => {
            let start = time_arg(&args, 3)?;
            let end = time_arg(&args, 4)?;
            cmd_history(site_arg(&args)?, start, end).await?
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            eprintln!("Run without arguments to see usage.");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn usage() {
    eprintln!("Usage: bess-cli <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  sites                          List configured sites");
    eprintln!("  status <site>                  Show current site status");
    eprintln!("  history <site> [start] [end]   Show history (RFC 3339 bounds)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  BESS_DASHBOARD_URL    Daemon base URL (default: {})", api_client::DEFAULT_BASE_URL);
    eprintln!("  BESS_API_URL, BESS_API_KEY, BESS_DEVICE_ID_<SITE>");
    eprintln!("                        Query the device API directly when set");
}

fn site_arg(args: &[String]) -> Result<&str> {
    match args.get(2) {
        Some(site) => Ok(site.as_str()),
        None => bail!("missing <site> argument"),
    }
}

fn time_arg(args: &[String], index: usize) -> Result<Option<OffsetDateTime>> {
    args.get(index)
        .map(|raw| parse_rfc3339(raw).with_context(|| format!("invalid RFC 3339 time: {raw}")))
        .transpose()
}

/// Build a daemon client, honoring BESS_DASHBOARD_URL if set.
fn make_client() -> api_client::Client {
    match env::var("BESS_DASHBOARD_URL") {
        Ok(url) => api_client::Client::with_base_url(url),
        Err(_) => api_client::Client::new(),
    }
}

/// The device API client and device id for `site`, if the environment
/// configures one.
fn direct_target(sites: &SiteTable, site: &str) -> Option<(UpstreamClient, String)> {
    let mut config = UpstreamConfig::from_env(&sites.keys()).ok()?;
    config.allow_private = true;
    config.timeout = DIRECT_TIMEOUT;

    let device_id = config.device_id(site)?.to_owned();
    let endpoint = check_endpoint(&config).ok()?;
    let client = UpstreamClient::new(endpoint, DIRECT_TIMEOUT).ok()?;
    Some((client, device_id))
}

async fn fetch_status(site: &str) -> Result<StatusSnapshot> {
    let sites = SiteTable::builtin();
    if let Some((client, device_id)) = direct_target(&sites, site) {
        match client.fetch_status(&device_id).await {
            Ok(payload) => {
                return Ok(mapping::map_status(
                    site,
                    sites.site(site),
                    &device_id,
                    &payload,
                    OffsetDateTime::now_utc(),
                ));
            }
            Err(e) => eprintln!("Device API unavailable ({e}), asking the dashboard daemon"),
        }
    }
    make_client().get_status(site).await
}

async fn fetch_history(
    site: &str,
    start: Option<OffsetDateTime>,
    end: Option<OffsetDateTime>,
) -> Result<Vec<HistoryPoint>> {
    let sites = SiteTable::builtin();
    if let Some((client, device_id)) = direct_target(&sites, site) {
        let window = HistoryWindow::resolve(start, end, OffsetDateTime::now_utc());
        match client.fetch_history(&device_id, window).await {
            Ok(payload) => return Ok(mapping::map_history(&payload)),
            Err(e) => eprintln!("Device API unavailable ({e}), asking the dashboard daemon"),
        }
    }
    make_client().get_history(site, start, end).await
}

async fn cmd_sites() -> Result<()> {
    let sites = make_client().get_sites().await?;
    for site in &sites {
        println!("{:<10} {}", site.key, site.name);
    }
    Ok(())
}

/// Print a summary of the current site state.
async fn cmd_status(site: &str) -> Result<()> {
    let status = fetch_status(site).await?;

    println!("Site:       {} ({})", status.site_name, status.device_id);
    println!("Time:       {}", status.timestamp);
    println!(
        "System:     {} / {} / up {}",
        status.system.status, status.system.connection, status.system.uptime
    );
    println!(
        "Grid:       {:.3} Hz, bus {:.1} V",
        status.system.frequency, status.system.bus_voltage
    );
    println!(
        "Power:      {:.1} kW, {:.1} kvar, execution {:.1} %",
        status.system.real_power_kw, status.system.reactive_power_kvar, status.system.execution_rate
    );
    println!(
        "Battery:    SoC {:.1} %, SoH {:.1} %, {:.1} V, {:.1} A, {:.1} °C",
        status.battery.soc,
        status.battery.soh,
        status.battery.voltage,
        status.battery.current,
        status.battery.temp
    );
    println!(
        "Flows:      PV {:.1} kW, load {:.1} kW, grid {:.1} kW",
        status.power.pv_kw, status.power.load_kw, status.power.grid_kw
    );

    if !status.devices.is_empty() {
        println!("Devices:");
        for device in &status.devices {
            println!(
                "  - {:<14} {:<8} SoC {:>5.1} %  {:>4.1} °C  {:>6.1} V",
                device.name, device.status, device.soc, device.temp, device.voltage
            );
        }
    }

    if status.alerts.is_empty() {
        println!("Alerts:     (none)");
    } else {
        println!("Alerts:");
        for alert in &status.alerts {
            println!("  - [{}] {}", alert.severity, alert.message);
        }
    }

    Ok(())
}

async fn cmd_history(
    site: &str,
    start: Option<OffsetDateTime>,
    end: Option<OffsetDateTime>,
) -> Result<()> {
    let points = fetch_history(site, start, end).await?;
    if points.is_empty() {
        println!("No history available.");
        return Ok(());
    }

    println!(
        "{:<26} {:>6} {:>9} {:>8} {:>7} {:>9}",
        "time", "soc", "power", "freq", "exec", "reactive"
    );
    for p in &points {
        println!(
            "{:<26} {:>6.1} {:>9.1} {:>8.3} {:>7.1} {:>9.1}",
            p.time, p.soc, p.power, p.frequency, p.execution_rate, p.reactive_power
        );
    }
    Ok(())
}
