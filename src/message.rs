//! Line protocol definitions
//!
//! `Message` is one line read from a client. The rest of this module holds
//! the server → client notice texts; every line sent to a client ends
//! with a newline.

use chrono::{DateTime, Local};

use crate::types::ClientId;

/// Display name given to clients until they pick one with `/nome`
pub const CLIENT_NAME: &str = "Cliente";

/// Time format for chat lines (kitchen clock, e.g. `3:04PM`)
const TIME_FORMAT: &str = "%-I:%M%p";

pub const MSG_CONNECT: &str =
    "Bem vindo ao servidor! Digite \"/ajuda\" para acessar a lista de comandos.\n";
pub const MSG_FULL: &str = "O servidor esta cheio. Por favor tente se conectar mais tarde.\n";

pub const ERROR_NOT_IN_ROOM: &str = "Erro: Voce nao pode enviar mensagens neste servidor.\n";
pub const ERROR_ROOM_EXISTS: &str = "Erro: Um chat com este nome ja existe.\n";
pub const ERROR_ROOM_NOT_FOUND: &str = "Erro: Um chat com este nome nao existe.\n";
pub const ERROR_CANNOT_LEAVE: &str = "Erro: Voce nao pode deixar este chat.\n";

pub const NOTICE_ROOM_DELETE: &str = "Alerta: O chat esta inativo e sera deletado.\n";

pub const ROOM_LIST_HEADER: &str = "Salas de chat:\n";

pub const HELP_LINES: &[&str] = &[
    "\n",
    "Comandos:\n",
    "/ajuda - lista todos os comandos\n",
    "/lista - lista todas as salas\n",
    "/criar foo - cria uma sala com o nome foo\n",
    "/juntar foo - se junta a um chat chamado foo\n",
    "/deixar - deixa a sala atual\n",
    "/nome foo - altera seu nome para foo\n",
    "/sair - sair do programa\n",
    "\n",
];

pub fn notice_room_join(name: &str) -> String {
    format!("Alerta: \"{}\" se juntou ao chat.\n", name)
}

pub fn notice_room_leave(name: &str) -> String {
    format!("Alerta: \"{}\" deixou o chat.\n", name)
}

pub fn notice_room_rename(old: &str, new: &str) -> String {
    format!("Alerta: \"{}\" mudou o nome para \"{}\".\n", old, new)
}

pub fn notice_personal_create(room: &str) -> String {
    format!("Alerta: Sala de chat \"{}\" criada.\n", room)
}

pub fn notice_personal_rename(name: &str) -> String {
    format!("Alerta: Nome alterado para \"{}\".\n", name)
}

/// One line received from a client
///
/// Built by the client's read pump and handed over to the Lobby.
/// Never mutated after construction.
#[derive(Debug, Clone)]
pub struct Message {
    pub time: DateTime<Local>,
    pub client_id: ClientId,
    /// Raw line with the terminator stripped
    pub text: String,
}

impl Message {
    /// Create a message stamped with the current local time
    pub fn new(client_id: ClientId, text: impl Into<String>) -> Self {
        Self::at(Local::now(), client_id, text)
    }

    pub fn at(time: DateTime<Local>, client_id: ClientId, text: impl Into<String>) -> Self {
        Self {
            time,
            client_id,
            text: text.into(),
        }
    }

    /// Render as a chat line: `<time> - <sender>: <text>\n`
    pub fn format(&self, sender_name: &str) -> String {
        format!(
            "{} - {}: {}\n",
            self.time.format(TIME_FORMAT),
            sender_name,
            self.text
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_message_format() {
        let time = Local.with_ymd_and_hms(2024, 1, 1, 15, 4, 0).unwrap();
        let msg = Message::at(time, ClientId::new(), "oi");
        assert_eq!(msg.format("Ana"), "3:04PM - Ana: oi\n");
    }

    #[test]
    fn test_message_format_morning() {
        let time = Local.with_ymd_and_hms(2024, 1, 1, 9, 30, 0).unwrap();
        let msg = Message::at(time, ClientId::new(), "bom dia");
        assert_eq!(msg.format("Bia"), "9:30AM - Bia: bom dia\n");
    }

    #[test]
    fn test_notices_are_lines() {
        assert!(MSG_CONNECT.ends_with('\n'));
        assert!(MSG_FULL.ends_with('\n'));
        assert!(notice_room_join("Ana").contains("\"Ana\""));
        assert_eq!(
            notice_room_rename("Ana", "Bia"),
            "Alerta: \"Ana\" mudou o nome para \"Bia\".\n"
        );
        assert!(HELP_LINES.iter().all(|line| line.ends_with('\n')));
    }
}
