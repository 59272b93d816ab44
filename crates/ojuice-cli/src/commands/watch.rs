//! Watch command: tick the engine on the configured interval and render
//! each snapshot, reprinting only when something changed.

use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use anyhow::{Result, bail};
use owo_colors::OwoColorize;
use tracing::info;

use ojuice_core::{AppConfig, FieldKey, NativeProvider, Snapshot, Status, SyncEngine};

pub fn run(config: AppConfig, interval: Option<u64>, locks: &[String]) -> Result<()> {
    let mut engine = SyncEngine::new(NativeProvider, &config);

    if let Some(ms) = interval {
        let effective = engine.set_poll_interval_ms(ms);
        if effective != ms {
            info!("Poll interval clamped to {} ms", effective);
        }
    }

    for entry in locks {
        let Some((key, value)) = entry.split_once('=') else {
            bail!("Invalid lock '{}', expected KEY=VALUE", entry);
        };
        let key: FieldKey = key.trim().parse()?;
        let value: i32 = value.trim().parse()?;
        engine.set_lock(key, value)?;
        info!("Locked {} at {}", key, value);
    }

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))?;

    info!("Watching for {}...", config.process_name);
    let mut last_rendered = String::new();
    while running.load(Ordering::SeqCst) {
        let snapshot = engine.refresh_tick();
        let rendered = render(&snapshot);
        if rendered != last_rendered {
            println!("{rendered}");
            last_rendered = rendered;
        }
        thread::sleep(engine.poll_interval());
    }

    Ok(())
}

fn render(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    match snapshot.status {
        Status::Detected => {
            let _ = write!(out, "[{}]", snapshot.status.green());
        }
        Status::Waiting | Status::Detached => {
            let _ = write!(out, "[{}]", snapshot.status.red());
            return out;
        }
    }
    if let Some(round) = snapshot.round {
        let _ = write!(out, " round {}", round);
    }
    out.push('\n');

    for reading in &snapshot.fields {
        if !reading.configured {
            continue;
        }
        let key = reading.key.to_string();
        match reading.value {
            Some(value) => {
                let _ = writeln!(out, "  {key:<18} {value}");
            }
            None => {
                let _ = writeln!(out, "  {key:<18} {}", "-".dimmed());
            }
        }
    }
    for (index, name) in &snapshot.names {
        if !name.is_empty() {
            let key = format!("player{index}_name");
            let _ = writeln!(out, "  {key:<18} {name}");
        }
    }
    out.pop();
    out
}
