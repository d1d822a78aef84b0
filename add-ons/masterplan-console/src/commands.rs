//! Console command parsing. One command per line; parse failures never reach the store.

use masterplan_core::{PinDraft, PinPatch};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Status,
    Pins,
    Levels,
    ToggleAdmin,
    Customer,
    Go { level_id: String, name: String },
    Open { pin_id: String },
    Back,
    Add { lat: f64, lng: f64, name: String },
    Create { draft: PinDraft, lat: f64, lng: f64 },
    Remove { pin_id: String },
    Rename { pin_id: String, name: String },
    Image { level_id: String, payload: String },
    ClearImage { level_id: String },
    Help,
    Quit,
}

impl Command {
    /// Patch for [`Command::Rename`].
    pub fn rename_patch(name: &str) -> PinPatch {
        PinPatch {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }
}

pub const HELP: &str = "\
status | pins | levels | admin | customer | back | help | quit
go <level-id> [name...]         navigate forward (creates the level if missing)
open <pin-id>                   drill down through a portal pin
add <lat> <lng> <name...>       raw pin on the current level
create region <lat> <lng> <name...> [| image]
create building <lat> <lng> <name...> | <block-number>
create unit <lat> <lng> <name...>
rm <pin-id> | rename <pin-id> <name...>
image <level-id> <payload> | clear-image <level-id>";

pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((h, r)) => (h, r.trim()),
        None => (line, ""),
    };
    match head {
        "status" => Ok(Command::Status),
        "pins" => Ok(Command::Pins),
        "levels" => Ok(Command::Levels),
        "admin" => Ok(Command::ToggleAdmin),
        "customer" => Ok(Command::Customer),
        "back" => Ok(Command::Back),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        "go" => {
            let (level_id, name) = split_word(rest).ok_or("usage: go <level-id> [name...]")?;
            let name = if name.is_empty() { level_id } else { name };
            Ok(Command::Go {
                level_id: level_id.to_string(),
                name: name.to_string(),
            })
        }
        "open" => Ok(Command::Open {
            pin_id: single_word(rest).ok_or("usage: open <pin-id>")?,
        }),
        "rm" => Ok(Command::Remove {
            pin_id: single_word(rest).ok_or("usage: rm <pin-id>")?,
        }),
        "clear-image" => Ok(Command::ClearImage {
            level_id: single_word(rest).ok_or("usage: clear-image <level-id>")?,
        }),
        "rename" => {
            let (pin_id, name) = split_word(rest).ok_or("usage: rename <pin-id> <name...>")?;
            non_empty(name, "name")?;
            Ok(Command::Rename {
                pin_id: pin_id.to_string(),
                name: name.to_string(),
            })
        }
        "image" => {
            let (level_id, payload) = split_word(rest).ok_or("usage: image <level-id> <payload>")?;
            non_empty(payload, "payload")?;
            Ok(Command::Image {
                level_id: level_id.to_string(),
                payload: payload.to_string(),
            })
        }
        "add" => {
            let (lat, lng, name) = coords_and_tail(rest)?;
            non_empty(name, "name")?;
            Ok(Command::Add {
                lat,
                lng,
                name: name.to_string(),
            })
        }
        "create" => parse_create(rest),
        "" => Err("empty command".to_string()),
        other => Err(format!("unknown command '{}' (try 'help')", other)),
    }
}

fn parse_create(rest: &str) -> Result<Command, String> {
    let (kind, rest) = split_word(rest).ok_or("usage: create region|building|unit ...")?;
    let (lat, lng, tail) = coords_and_tail(rest)?;
    let (name, extra) = match tail.split_once('|') {
        Some((n, e)) => (n.trim(), Some(e.trim()).filter(|e| !e.is_empty())),
        None => (tail.trim(), None),
    };
    non_empty(name, "name")?;
    let name = name.to_string();
    let draft = match kind {
        "region" => PinDraft::Regional {
            name,
            description: None,
            image: extra.map(str::to_string),
        },
        "building" => PinDraft::Building {
            name,
            description: None,
            block_number: extra.ok_or("building needs '| <block-number>'")?.to_string(),
        },
        "unit" => PinDraft::Simple {
            name,
            description: None,
        },
        other => return Err(format!("unknown pin kind '{}'", other)),
    };
    Ok(Command::Create { draft, lat, lng })
}

fn split_word(s: &str) -> Option<(&str, &str)> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    Some(match s.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (s, ""),
    })
}

fn single_word(s: &str) -> Option<String> {
    match split_word(s) {
        Some((w, "")) => Some(w.to_string()),
        _ => None,
    }
}

fn coords_and_tail(s: &str) -> Result<(f64, f64, &str), String> {
    let (lat, rest) = split_word(s).ok_or("missing <lat>")?;
    let (lng, tail) = split_word(rest).ok_or("missing <lng>")?;
    let lat = lat.parse::<f64>().map_err(|_| format!("bad latitude '{}'", lat))?;
    let lng = lng.parse::<f64>().map_err(|_| format!("bad longitude '{}'", lng))?;
    if !lat.is_finite() || !lng.is_finite() {
        return Err("coordinates must be finite".to_string());
    }
    Ok((lat, lng, tail))
}

fn non_empty(s: &str, what: &str) -> Result<(), String> {
    if s.trim().is_empty() {
        Err(format!("{} is required", what))
    } else {
        Ok(())
    }
}
