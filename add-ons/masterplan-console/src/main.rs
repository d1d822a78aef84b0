//! Master-plan operator console.
//!
//! Reads one command per line from stdin and drives a [`MasterPlanStore`] backed by Sled.
//! Type `help` for the command list.

mod commands;

use commands::{Command, HELP};
use masterplan_core::{open_configured, MasterPlanStore, PlanConfig};
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[masterplan-console] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let config = match PlanConfig::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(target: "masterplan::console", error = %e, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    let mut store = match open_configured(&config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(
                target: "masterplan::console",
                storage_path = %config.storage_path,
                error = %e,
                "Failed to open master plan storage"
            );
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        target: "masterplan::console",
        storage_path = %config.storage_path,
        "Master plan console ready"
    );

    let stdin = io::stdin();
    let mut out = io::stdout().lock();
    if let Err(e) = print_status(&store, &mut out) {
        tracing::warn!(target: "masterplan::console", error = %e, "stdout write failed");
        store.flush();
        return ExitCode::FAILURE;
    }
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(target: "masterplan::console", error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let command = match commands::parse(&line) {
            Ok(c) => c,
            Err(msg) => {
                if let Err(e) = report_parse_error(&mut out, &msg) {
                    tracing::warn!(target: "masterplan::console", error = %e, "stdout write failed");
                    break;
                }
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        if let Err(e) = run(&mut store, command, &mut out) {
            tracing::warn!(target: "masterplan::console", error = %e, "stdout write failed");
            break;
        }
    }

    store.flush();
    tracing::info!(target: "masterplan::console", "Master plan console closed");
    ExitCode::SUCCESS
}

fn run(store: &mut MasterPlanStore, command: Command, out: &mut impl Write) -> io::Result<()> {
    match command {
        Command::Status => print_status(store, out)?,
        Command::Pins => {
            for pin in store.current_level_pins() {
                writeln!(out, "{}", to_json(&pin))?;
            }
        }
        Command::Levels => {
            for level in store.levels().iter() {
                let marker = if level.id == store.current_level_id() { "*" } else { " " };
                writeln!(out, "{} {}", marker, to_json(level))?;
            }
        }
        Command::ToggleAdmin => {
            store.toggle_admin_mode();
            writeln!(out, "admin mode: {}", on_off(store.is_admin_mode()))?;
        }
        Command::Customer => {
            store.enter_customer_view();
            writeln!(out, "customer view (admin off)")?;
        }
        Command::Go { level_id, name } => {
            store.navigate_to_level(&level_id, &name);
            print_status(store, out)?;
        }
        Command::Open { pin_id } => {
            if store.activate_pin(&pin_id) {
                print_status(store, out)?;
            } else {
                writeln!(out, "pin {} is not a portal on this level", pin_id)?;
            }
        }
        Command::Back => {
            if store.can_go_back() {
                store.go_back();
                print_status(store, out)?;
            } else {
                writeln!(out, "already at the top")?;
            }
        }
        Command::Add { lat, lng, name } => {
            let id = (store.pins().len() + 1..)
                .map(|n| format!("pin-{}", n))
                .find(|id| store.pin(id).is_none())
                .unwrap_or_default();
            let pin = masterplan_core::Pin::new(&id, store.current_level_id(), lat, lng, name);
            if store.add_pin(pin) {
                writeln!(out, "added {}", id)?;
            } else {
                writeln!(out, "pin already exists here")?;
            }
        }
        Command::Create { draft, lat, lng } => {
            let step = store.pin_step();
            match store.create_pin(draft, lat, lng) {
                Some(id) => writeln!(out, "created {}", id)?,
                None if !store.is_admin_mode() => writeln!(out, "enable admin mode first")?,
                None => writeln!(out, "not created ({:?} level, bounds or duplicate)", step)?,
            }
        }
        Command::Remove { pin_id } => {
            if store.delete_pin(&pin_id) {
                writeln!(out, "removed {}", pin_id)?;
            } else {
                writeln!(out, "nothing removed (admin mode off or unknown pin)")?;
            }
        }
        Command::Rename { pin_id, name } => {
            if store.pin(&pin_id).is_some() {
                store.update_pin(&pin_id, Command::rename_patch(&name));
                writeln!(out, "renamed {}", pin_id)?;
            } else {
                writeln!(out, "unknown pin {}", pin_id)?;
            }
        }
        Command::Image { level_id, payload } => {
            store.update_level_image(&level_id, &payload);
            writeln!(out, "image set on {}", level_id)?;
        }
        Command::ClearImage { level_id } => {
            let before = store.pins().len();
            store.remove_level_image(&level_id);
            writeln!(
                out,
                "image cleared on {} ({} pins removed)",
                level_id,
                before - store.pins().len()
            )?;
        }
        Command::Help => writeln!(out, "{}", HELP)?,
        Command::Quit => {}
    }
    out.flush()
}

fn report_parse_error(out: &mut impl Write, msg: &str) -> io::Result<()> {
    writeln!(out, "error: {}", msg)?;
    out.flush()
}

fn print_status(store: &MasterPlanStore, out: &mut impl Write) -> io::Result<()> {
    let snap = store.snapshot();
    let trail = store
        .navigation_history()
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(store.current_level_id()))
        .collect::<Vec<_>>()
        .join(" > ");
    writeln!(
        out,
        "[{}] {} | pins: {} | step: {:?} | admin: {} | back: {}",
        trail,
        snap.current_level.name,
        snap.current_level_pins.len(),
        snap.pin_step,
        on_off(snap.admin_mode),
        if snap.can_go_back { "yes" } else { "no" },
    )?;
    out.flush()
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("<unprintable: {}>", e))
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}
