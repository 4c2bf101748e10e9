//! Scenario replay.
//!
//! A scenario file is a YAML description of coordinator traffic: downstream
//! address requests and releases interleaved with upstream network snapshots.
//! Replaying one produces a report of every assignment, failure and prefix
//! conflict, which the CLI serializes to JSON. With `random_seed` set a run
//! is fully reproducible.
//!
//! ```yaml
//! config:
//!   wifi_p2p_dedicated_ip: false
//! random_seed: 7
//! events:
//!   - action: request
//!     client: hotspot
//!     reuse_last: true
//!   - action: upstream_update
//!     network: 1
//!     transport: wifi
//!     addresses: ["192.168.43.5/24"]
//!   - action: release
//!     client: hotspot
//!   - action: upstream_remove
//!     network: 1
//! ```

use crate::addr::sanitizer::{SeededSource, SubAddrSource, ThreadRngSource};
use crate::config::CoordinatorConfig;
use crate::coordinator::Coordinator;
use crate::reservation::DownstreamClient;
use crate::upstream::{NetworkId, ObservedAddress, TransportKind, UpstreamSnapshot};
use color_eyre::eyre::{Result, WrapErr};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::Rc;

/// A replayable sequence of coordinator operations.
#[derive(Debug, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: CoordinatorConfig,
    /// Seed for the draw source; omit for real randomness.
    #[serde(default)]
    pub random_seed: Option<u64>,
    pub events: Vec<ScenarioEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioEvent {
    Request {
        client: DownstreamClient,
        #[serde(default)]
        reuse_last: bool,
    },
    Release {
        client: DownstreamClient,
    },
    UpstreamUpdate {
        network: u32,
        #[serde(default)]
        transport: Option<TransportKind>,
        #[serde(default)]
        addresses: Vec<String>,
    },
    UpstreamRemove {
        network: u32,
    },
}

/// One observable outcome of a replay step.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportEntry {
    Assigned {
        client: DownstreamClient,
        address: String,
    },
    AllocationFailed {
        client: DownstreamClient,
        error: String,
    },
    Released {
        client: DownstreamClient,
    },
    UpstreamUpdated {
        network: u32,
    },
    UpstreamRemoved {
        network: u32,
    },
    PrefixConflict {
        client: DownstreamClient,
    },
}

#[derive(Debug, Default, Serialize)]
pub struct ScenarioReport {
    pub entries: Vec<ReportEntry>,
}

/// Load a scenario from a YAML file.
pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let raw = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read scenario file '{}'", path.display()))?;
    serde_yaml::from_str(&raw)
        .wrap_err_with(|| format!("Failed to parse scenario file '{}'", path.display()))
}

/// Drive a fresh coordinator through every event of the scenario.
pub fn run_scenario(scenario: &Scenario) -> Result<ScenarioReport> {
    let conflicts: Rc<RefCell<Vec<DownstreamClient>>> = Rc::default();
    let sink_conflicts = Rc::clone(&conflicts);

    let random: Box<dyn SubAddrSource> = match scenario.random_seed {
        Some(seed) => Box::new(SeededSource::new(seed)),
        None => Box::new(ThreadRngSource),
    };
    let mut coordinator = Coordinator::new(
        scenario.config.clone(),
        random,
        Box::new(move |client| sink_conflicts.borrow_mut().push(client)),
    );

    let mut report = ScenarioReport::default();
    for event in &scenario.events {
        match event {
            ScenarioEvent::Request { client, reuse_last } => {
                match coordinator.request_downstream_address(*client, *reuse_last) {
                    Ok(address) => {
                        info!("scenario: {} assigned {}", client, address);
                        report.entries.push(ReportEntry::Assigned {
                            client: *client,
                            address: address.to_string(),
                        });
                    }
                    Err(err) => {
                        error!("scenario: allocation for {} failed: {}", client, err);
                        report.entries.push(ReportEntry::AllocationFailed {
                            client: *client,
                            error: err.to_string(),
                        });
                    }
                }
            }
            ScenarioEvent::Release { client } => {
                coordinator.release_downstream(*client);
                report.entries.push(ReportEntry::Released { client: *client });
            }
            ScenarioEvent::UpstreamUpdate {
                network,
                transport,
                addresses,
            } => {
                let addresses = addresses
                    .iter()
                    .map(|a| {
                        a.parse::<ObservedAddress>()
                            .wrap_err_with(|| format!("Invalid upstream address '{}'", a))
                    })
                    .collect::<Result<Vec<_>>>()?;
                let snapshot = UpstreamSnapshot {
                    network: NetworkId(*network),
                    transport: *transport,
                    addresses,
                };
                coordinator.update_upstream_prefix(&snapshot);
                report
                    .entries
                    .push(ReportEntry::UpstreamUpdated { network: *network });
                for client in conflicts.borrow_mut().drain(..) {
                    report.entries.push(ReportEntry::PrefixConflict { client });
                }
            }
            ScenarioEvent::UpstreamRemove { network } => {
                coordinator.remove_upstream_prefix(NetworkId(*network));
                report
                    .entries
                    .push(ReportEntry::UpstreamRemoved { network: *network });
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
random_seed: 7
events:
  - action: request
    client: hotspot
    reuse_last: true
  - action: upstream_update
    network: 1
    transport: wifi
    addresses: ["10.0.0.8/24"]
  - action: release
    client: hotspot
  - action: upstream_remove
    network: 1
"#;

    #[test]
    fn test_load_scenario_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let scenario = load_scenario(file.path()).unwrap();
        assert_eq!(scenario.random_seed, Some(7));
        assert_eq!(scenario.events.len(), 4);
        assert!(matches!(
            scenario.events[0],
            ScenarioEvent::Request {
                client: DownstreamClient::Hotspot,
                reuse_last: true,
            }
        ));
    }

    #[test]
    fn test_replay_produces_entries_in_order() {
        let scenario: Scenario = serde_yaml::from_str(SAMPLE).unwrap();
        let report = run_scenario(&scenario).unwrap();

        assert_eq!(report.entries.len(), 4);
        assert!(matches!(report.entries[0], ReportEntry::Assigned { .. }));
        assert_eq!(report.entries[1], ReportEntry::UpstreamUpdated { network: 1 });
        assert_eq!(
            report.entries[2],
            ReportEntry::Released {
                client: DownstreamClient::Hotspot
            }
        );
        assert_eq!(report.entries[3], ReportEntry::UpstreamRemoved { network: 1 });
    }

    #[test]
    fn test_seeded_replays_are_identical() {
        let scenario: Scenario = serde_yaml::from_str(SAMPLE).unwrap();
        let a = run_scenario(&scenario).unwrap();
        let b = run_scenario(&scenario).unwrap();
        assert_eq!(a.entries, b.entries);
    }

    #[test]
    fn test_conflicting_upstream_is_reported() {
        let scenario: Scenario = serde_yaml::from_str(
            r#"
events:
  - action: upstream_update
    network: 3
    transport: vpn
    addresses: ["192.168.43.5/24"]
"#,
        )
        .unwrap();
        let report = run_scenario(&scenario).unwrap();
        // VPN snapshots never produce conflict entries.
        assert_eq!(report.entries, vec![ReportEntry::UpstreamUpdated { network: 3 }]);
    }

    #[test]
    fn test_invalid_upstream_address_is_an_error() {
        let scenario: Scenario = serde_yaml::from_str(
            r#"
events:
  - action: upstream_update
    network: 1
    transport: wifi
    addresses: ["not-an-address"]
"#,
        )
        .unwrap();
        assert!(run_scenario(&scenario).is_err());
    }
}
