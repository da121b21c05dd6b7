//! Command classification
//!
//! Maps a raw line to a `Command`. Parsing never fails: anything that
//! does not start with a known command token is chat content.

const CMD_CREATE: &str = "/criar";
const CMD_LIST: &str = "/lista";
const CMD_JOIN: &str = "/juntar";
const CMD_LEAVE: &str = "/deixar";
const CMD_NAME: &str = "/nome";
const CMD_HELP: &str = "/ajuda";
const CMD_QUIT: &str = "/sair";

/// Action requested by one line of client input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/criar <name>`
    CreateRoom(String),
    /// `/lista`
    ListRooms,
    /// `/juntar <name>`
    JoinRoom(String),
    /// `/deixar`
    LeaveRoom,
    /// `/nome <name>`
    Rename(String),
    /// `/ajuda`
    Help,
    /// `/sair`
    Quit,
    /// Anything else: chat content for the current room
    Content(String),
}

impl Command {
    /// Classify a line (terminator already stripped)
    ///
    /// Tokens are matched as case-sensitive prefixes in a fixed order.
    /// The argument is whatever follows `"<token> "`; a line that starts
    /// with the token but lacks the separating space keeps the whole line
    /// as its argument.
    pub fn parse(line: &str) -> Self {
        if line.starts_with(CMD_CREATE) {
            Command::CreateRoom(argument(line, CMD_CREATE))
        } else if line.starts_with(CMD_LIST) {
            Command::ListRooms
        } else if line.starts_with(CMD_JOIN) {
            Command::JoinRoom(argument(line, CMD_JOIN))
        } else if line.starts_with(CMD_LEAVE) {
            Command::LeaveRoom
        } else if line.starts_with(CMD_NAME) {
            Command::Rename(argument(line, CMD_NAME))
        } else if line.starts_with(CMD_HELP) {
            Command::Help
        } else if line.starts_with(CMD_QUIT) {
            Command::Quit
        } else {
            Command::Content(line.to_string())
        }
    }
}

fn argument(line: &str, token: &str) -> String {
    line.strip_prefix(token)
        .and_then(|rest| rest.strip_prefix(' '))
        .unwrap_or(line)
        .to_string()
}
