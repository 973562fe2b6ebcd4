//! edautomation - scenario runner for the factory automation devices
//!
//! Loads a scenario (or the built-in demo), runs it headless and logs every
//! level event as JSON lines.

mod scenario;

use anyhow::{Context, Result};
use edautomation_core::SimTick;
use edautomation_testkit::{EventRecord, JsonlSink};
use edautomation_world::{Automaton, AutomationConfig, Device, DeviceFields, Level};
use scenario::Scenario;
use serde::Serialize;
use std::{env, fs, path::PathBuf};
use tracing::info;

fn main() -> Result<()> {
    // Initialize tracing with INFO level by default (can be overridden via RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting edautomation v{}", env!("CARGO_PKG_VERSION"));

    let cli = CliOptions::parse(env::args().skip(1));
    let mut scenario = match &cli.scenario {
        Some(path) => Scenario::load_from_path(path)?,
        None => Scenario {
            config: AutomationConfig::load(),
            ..Scenario::demo()
        },
    };
    if let Some(path) = &cli.config {
        scenario.config = AutomationConfig::load_from_path(path);
    }
    let ticks = cli.ticks.unwrap_or(scenario.ticks);
    info!(scenario = %scenario.name, seed = scenario.seed, ticks, "running scenario");

    let mut level = scenario.build_level();
    let mut sink = match &cli.events {
        Some(path) => Some(JsonlSink::create(path)?),
        None => None,
    };
    let events = scenario.run(&mut level, ticks, |event| {
        if let Some(sink) = sink.as_mut() {
            sink.write(&EventRecord {
                tick: SimTick(event.tick()),
                kind: event.label(),
                payload: event,
            })?;
        }
        Ok(())
    })?;
    if let Some(sink) = sink {
        let lines = sink.finish()?;
        info!(lines, "event log written");
    }

    let summary = Summary::collect(&scenario.name, &level, events);
    summary.log();
    if let Some(path) = &cli.save {
        let json = level.save_devices_json().context("failed to serialize devices")?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "device records saved");
    }
    if let Some(path) = &cli.summary {
        let json = serde_json::to_string_pretty(&summary)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok(())
}

#[derive(Debug, Serialize)]
struct DeviceSummary {
    pos: [i32; 3],
    kind: String,
    items: u64,
    fields: Vec<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    energy_percent: Option<u32>,
}

#[derive(Debug, Serialize)]
struct Summary {
    scenario: String,
    ticks: u64,
    events: u64,
    loose_items: u64,
    devices: Vec<DeviceSummary>,
}

impl Summary {
    fn collect(name: &str, level: &Level, events: u64) -> Self {
        let devices = level
            .save_devices()
            .into_iter()
            .filter_map(|saved| {
                let device = level.device(saved.pos)?;
                let automaton = device.automaton();
                let energy_percent = match device {
                    Device::Incinerator(incinerator) => Some(incinerator.battery().soc_percent()),
                    Device::MineralSmelter(smelter) => Some(smelter.battery().soc_percent()),
                    _ => None,
                };
                Some(DeviceSummary {
                    pos: [saved.pos.x, saved.pos.y, saved.pos.z],
                    kind: format!("{:?}", saved.kind),
                    items: automaton.slots().total_count(),
                    fields: automaton.fields(),
                    energy_percent,
                })
            })
            .collect();
        Self {
            scenario: name.to_string(),
            ticks: level.tick_count().0,
            events,
            loose_items: level.loose_item_count(),
            devices,
        }
    }

    fn log(&self) {
        info!(
            scenario = %self.scenario,
            ticks = self.ticks,
            events = self.events,
            loose_items = self.loose_items,
            "scenario complete"
        );
        for device in &self.devices {
            info!(
                kind = %device.kind,
                pos = ?device.pos,
                items = device.items,
                fields = ?device.fields,
                energy_percent = ?device.energy_percent,
                "device"
            );
        }
    }
}

#[derive(Debug, Default)]
struct CliOptions {
    scenario: Option<PathBuf>,
    config: Option<PathBuf>,
    ticks: Option<u64>,
    events: Option<PathBuf>,
    save: Option<PathBuf>,
    summary: Option<PathBuf>,
}

impl CliOptions {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> Self {
        let mut opts = CliOptions::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--scenario" => {
                    if let Some(path) = args.next() {
                        opts.scenario = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--scenario requires a file path");
                    }
                }
                "--config" => {
                    if let Some(path) = args.next() {
                        opts.config = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--config requires a file path");
                    }
                }
                "--ticks" => {
                    if let Some(raw) = args.next() {
                        match raw.parse::<u64>() {
                            Ok(value) => opts.ticks = Some(value),
                            Err(err) => {
                                tracing::error!(%err, value = %raw, "--ticks must be an integer");
                            }
                        }
                    } else {
                        tracing::error!("--ticks requires an integer");
                    }
                }
                "--events" => {
                    if let Some(path) = args.next() {
                        opts.events = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--events requires a file path");
                    }
                }
                "--save" => {
                    if let Some(path) = args.next() {
                        opts.save = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--save requires a file path");
                    }
                }
                "--summary" => {
                    if let Some(path) = args.next() {
                        opts.summary = Some(PathBuf::from(path));
                    } else {
                        tracing::error!("--summary requires a file path");
                    }
                }
                other => {
                    tracing::warn!(arg = other, "ignoring unknown argument");
                }
            }
        }

        opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edautomation_core::DeviceKind;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|arg| arg.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn parses_all_flags() {
        let opts = CliOptions::parse(args(&[
            "--scenario",
            "demo.toml",
            "--ticks",
            "50",
            "--events",
            "out/events.jsonl",
        ]));
        assert_eq!(opts.scenario, Some(PathBuf::from("demo.toml")));
        assert_eq!(opts.ticks, Some(50));
        assert_eq!(opts.events, Some(PathBuf::from("out/events.jsonl")));
        assert!(opts.save.is_none());
    }

    #[test]
    fn bad_tick_count_is_ignored() {
        let opts = CliOptions::parse(args(&["--ticks", "many", "--bogus"]));
        assert_eq!(opts.ticks, None);
    }

    #[test]
    fn summary_lists_every_device() {
        let scenario = Scenario::demo();
        let mut level = scenario.build_level();
        let events = scenario.run(&mut level, 5, |_| Ok(())).unwrap();
        let summary = Summary::collect(&scenario.name, &level, events);
        assert_eq!(summary.devices.len(), scenario.devices.len());
        assert_eq!(summary.ticks, 5);
        let powered = summary.devices.iter().filter(|d| d.energy_percent.is_some()).count();
        let expected = scenario
            .devices
            .iter()
            .filter(|d| matches!(d.kind, DeviceKind::Incinerator | DeviceKind::MineralSmelter))
            .count();
        assert_eq!(powered, expected);
    }
}
