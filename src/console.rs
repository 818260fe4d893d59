//! Operator console intents.
//!
//! One line of operator input maps to one [`Intent`]:
//!
//! ```text
//! connect                  open the live link to the configured endpoint
//! disconnect               drop the live link and resume simulation
//! endpoint <url>           change the endpoint (takes effect on next connect)
//! cmd <name> [machine-id]  send a command over the live link
//! export [dir]             write a snapshot export
//! status                   print mode, connection and fleet stats
//! help                     list intents
//! quit                     shut down
//! ```

use std::path::PathBuf;

use crate::error::ConsoleError;

/// Help text for the console.
pub const HELP: &str = "\
connect                  open the live link to the configured endpoint
disconnect               drop the live link and resume simulation
endpoint <url>           change the endpoint (takes effect on next connect)
cmd <name> [machine-id]  send a command (emergency_stop, reset, start, stop)
export [dir]             write a snapshot export (default: current directory)
status                   show mode, connection and fleet stats
help                     show this help
quit                     shut down";

/// Something the operator asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Connect,
    Disconnect,
    SetEndpoint(String),
    Command {
        name: String,
        machine_id: Option<String>,
    },
    Export(Option<PathBuf>),
    Status,
    Help,
    Quit,
}

/// Parse one line of operator input.
///
/// The intent word is case-insensitive; arguments are kept as typed.
pub fn parse_intent(line: &str) -> Result<Intent, ConsoleError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err(ConsoleError::Empty);
    };
    let args: Vec<&str> = words.collect();

    let intent = match (head.to_ascii_lowercase().as_str(), args.as_slice()) {
        ("connect", []) => Intent::Connect,
        ("disconnect", []) => Intent::Disconnect,
        ("endpoint", [url]) => Intent::SetEndpoint(url.to_string()),
        ("endpoint", _) => return Err(ConsoleError::Usage("endpoint <url>")),
        ("cmd" | "command", [name]) => Intent::Command {
            name: name.to_string(),
            machine_id: None,
        },
        ("cmd" | "command", [name, id]) => Intent::Command {
            name: name.to_string(),
            machine_id: Some(id.to_string()),
        },
        ("cmd" | "command", _) => return Err(ConsoleError::Usage("cmd <name> [machine-id]")),
        ("export", []) => Intent::Export(None),
        ("export", [dir]) => Intent::Export(Some(PathBuf::from(dir))),
        ("export", _) => return Err(ConsoleError::Usage("export [dir]")),
        ("status", []) => Intent::Status,
        ("help" | "?", _) => Intent::Help,
        ("quit" | "exit", []) => Intent::Quit,
        ("connect" | "disconnect" | "status" | "quit" | "exit", _) => {
            return Err(ConsoleError::Usage("this command takes no arguments"))
        }
        (other, _) => return Err(ConsoleError::Unknown(other.to_string())),
    };
    Ok(intent)
}
