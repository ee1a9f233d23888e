//! tikup: upgrade or inventory a fleet of MikroTik routers.
//!
//! ```bash
//! tikup --mode gather --file routers.txt
//! tikup --mode upgrade --ip 192.168.88.1 --user admin
//! ```
//!
//! The password is always asked for interactively.

mod cli;
mod logging;

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::info;
use serde::Serialize;

use tikup::target::read_target_list;
use tikup::{
    Credentials, DeviceTarget, Discovery, DiscoveryConfig, Fleet, FleetConfig, SshConnector,
    UpgradeConfig, Upgrader,
};

use cli::{Args, Mode};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every device succeeded.
async fn run(args: Args) -> anyhow::Result<bool> {
    let addresses = match (&args.selection.ip, &args.selection.file) {
        (Some(ip), _) => vec![ip.clone()],
        (None, Some(path)) => read_target_list(path)?,
        (None, None) => anyhow::bail!("one of --ip or --file is required"),
    };

    logging::init(&args.log_file)?;

    let username = match &args.user {
        Some(user) => user.clone(),
        None => prompt_username()?,
    };
    let password =
        rpassword::prompt_password("Password: ").context("failed to read password")?;

    let credentials = Arc::new(Credentials::new(username, password));
    let targets: Vec<DeviceTarget> = addresses
        .into_iter()
        .map(|address| DeviceTarget::new(address, credentials.clone()).with_port(args.port))
        .collect();

    let mut connector =
        SshConnector::new().with_host_key_verification(args.host_key_checking.into());
    if let Some(path) = &args.known_hosts {
        connector = connector.with_known_hosts_path(path.clone());
    }
    let fleet = Fleet::new(FleetConfig::default());

    info!("Starting {:?} run over {} device(s)", args.mode, targets.len());

    match args.mode {
        Mode::Gather => {
            let discovery = Discovery::new(connector, DiscoveryConfig::default());
            let summary = fleet.discover_all(&discovery, &targets).await;
            if args.json {
                print_json(&summary)?;
            }
            Ok(summary.all_succeeded())
        }
        Mode::Upgrade => {
            let config = UpgradeConfig::default();
            config.validate()?;
            let upgrader = Upgrader::new(connector, config);
            let summary = fleet.upgrade_all(&upgrader, &targets).await;
            if args.json {
                print_json(&summary)?;
            }
            Ok(summary.all_succeeded())
        }
    }
}

fn prompt_username() -> anyhow::Result<String> {
    print!("Username: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read username")?;

    let username = line.trim().to_string();
    if username.is_empty() {
        anyhow::bail!("a username is required");
    }
    Ok(username)
}

fn print_json<T: Serialize>(summary: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    println!("{}", json);
    Ok(())
}
