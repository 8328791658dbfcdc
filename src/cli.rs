//! CLI definitions and the client-side commands.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::Value;

use tabwatch_config::{ConfigLoader, ControlConfig, StoreConfig};
use tabwatch_core::FileStateStore;
use tabwatch_protocols::StateStore;

use crate::control::ActionResponse;

/// Tabwatch CLI.
#[derive(Parser)]
#[command(name = "tabwatch")]
#[command(about = "Browser tab activity tracker")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (default: ~/.tabwatch/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Commands {
    /// Run the tracker in foreground (default)
    Run,

    /// Show tracker status from a running instance
    Status,

    /// Capture the active tab now
    Capture,

    /// Resync every open tab with the companion app
    Resync,

    /// Delete the durable tracker state
    Reset,
}

fn client() -> Result<reqwest::Client, Box<dyn std::error::Error>> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?)
}

fn not_reachable(control: &ControlConfig, e: reqwest::Error) -> Box<dyn std::error::Error> {
    format!(
        "Tracker not reachable at {} ({}). Is `tabwatch run` active?",
        control.base_url(),
        e
    )
    .into()
}

pub(crate) async fn status(control: &ControlConfig) -> Result<(), Box<dyn std::error::Error>> {
    let response = client()?
        .get(format!("{}/status", control.base_url()))
        .send()
        .await
        .map_err(|e| not_reachable(control, e))?;
    let body: Value = response.json().await?;
    if let Some(error) = body.get("error").and_then(Value::as_str) {
        return Err(error.into());
    }

    let yes_no = |key: &str| {
        if body[key].as_bool().unwrap_or(false) {
            "yes"
        } else {
            "no"
        }
    };
    println!("Companion app:   {}", yes_no("connected"));
    println!("Command channel: {}", yes_no("commandChannel"));
    println!("Tracked tabs:    {}", body["tabCount"]);
    match body["activeTabId"].as_i64() {
        Some(id) => println!("Active tab:      {}", id),
        None => println!("Active tab:      none"),
    }
    if let Some(delivery) = body.get("delivery") {
        println!("Delivery:        {}", delivery);
    }
    Ok(())
}

async fn action(control: &ControlConfig, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let response = client()?
        .post(format!("{}{}", control.base_url(), path))
        .send()
        .await
        .map_err(|e| not_reachable(control, e))?;
    let body: ActionResponse = response.json().await?;
    match (body.ok, body.error) {
        (_, Some(error)) => Err(error.into()),
        (Some(false), None) => Err(format!("{} did not reach the companion app", path).into()),
        _ => {
            println!("ok");
            Ok(())
        }
    }
}

pub(crate) async fn capture(control: &ControlConfig) -> Result<(), Box<dyn std::error::Error>> {
    action(control, "/capture").await
}

pub(crate) async fn resync(control: &ControlConfig) -> Result<(), Box<dyn std::error::Error>> {
    action(control, "/resync").await
}

pub(crate) async fn reset(store: &StoreConfig) -> Result<(), Box<dyn std::error::Error>> {
    let path = ConfigLoader::expand_path(&store.path);
    let store = FileStateStore::open(&path).await?;
    store.clear().await?;
    println!("Cleared {}", path);
    Ok(())
}
