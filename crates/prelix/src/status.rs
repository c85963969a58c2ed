// SPDX-FileCopyrightText: 2026 Prelix Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `prelix status` command implementation.
//!
//! Probes the gateway health endpoint and reports whether a Prelix
//! instance is running. Falls back gracefully when it is not.

use std::time::Duration;

use prelix_config::PrelixConfig;
use prelix_core::PrelixError;
use serde::{Deserialize, Serialize};

/// Health endpoint response from the gateway.
#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_secs: u64,
}

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub running: bool,
    pub status: String,
    pub version: Option<String>,
    pub uptime_secs: Option<u64>,
    pub uptime_human: Option<String>,
    pub gateway_address: String,
    pub gateway_port: u16,
}

/// Format seconds into a human-readable duration string.
fn format_uptime(secs: u64) -> String {
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let minutes = (secs % 3600) / 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Run the `prelix status` command.
///
/// Connects to the gateway health endpoint. With `--json`, emits structured
/// output for scripting.
pub async fn run_status(config: &PrelixConfig, json: bool) -> Result<(), PrelixError> {
    let address = &config.gateway.bind_address;
    let port = config.gateway.port;
    let url = format!("http://{address}:{port}/v1/health");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(3))
        .build()
        .map_err(|e| PrelixError::Internal(format!("failed to create HTTP client: {e}")))?;

    let result = client.get(&url).send().await;

    let resp = match result {
        Ok(resp) if resp.status().is_success() => {
            let health: HealthResponse = resp.json().await.map_err(|e| {
                PrelixError::Internal(format!("failed to parse health response: {e}"))
            })?;
            StatusResponse {
                running: true,
                status: health.status,
                version: Some(health.version),
                uptime_secs: Some(health.uptime_secs),
                uptime_human: Some(format_uptime(health.uptime_secs)),
                gateway_address: address.clone(),
                gateway_port: port,
            }
        }
        _ => StatusResponse {
            running: false,
            status: "not running".to_string(),
            version: None,
            uptime_secs: None,
            uptime_human: None,
            gateway_address: address.clone(),
            gateway_port: port,
        },
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&resp).unwrap_or_else(|_| "{}".to_string())
        );
    } else if resp.running {
        let uptime = resp.uptime_human.as_deref().unwrap_or("0m");
        println!("prelix: {} (uptime: {uptime})", resp.status);
    } else {
        println!("prelix: not running");
        println!("  endpoint: {url}");
        println!("  start with: prelix serve");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_uptime_minutes() {
        assert_eq!(format_uptime(120), "2m");
    }

    #[test]
    fn format_uptime_hours() {
        assert_eq!(format_uptime(3720), "1h 2m");
    }

    #[test]
    fn format_uptime_days() {
        assert_eq!(format_uptime(90060), "1d 1h 1m");
    }

    #[test]
    fn status_response_serializes() {
        let resp = StatusResponse {
            running: true,
            status: "ok".to_string(),
            version: Some("0.1.0".to_string()),
            uptime_secs: Some(3600),
            uptime_human: Some("1h 0m".to_string()),
            gateway_address: "127.0.0.1".to_string(),
            gateway_port: 7400,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"running\":true"));
        assert!(json.contains("\"status\":\"ok\""));
    }

    #[test]
    fn status_response_offline_serializes() {
        let resp = StatusResponse {
            running: false,
            status: "not running".to_string(),
            version: None,
            uptime_secs: None,
            uptime_human: None,
            gateway_address: "127.0.0.1".to_string(),
            gateway_port: 7400,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"running\":false"));
    }
}
