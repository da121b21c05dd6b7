//! Error types for the chat server
//!
//! Defines application-level errors, user errors and message send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::message::{
    ERROR_CANNOT_LEAVE, ERROR_NOT_IN_ROOM, ERROR_ROOM_EXISTS, ERROR_ROOM_NOT_FOUND,
};

/// Application-level errors
///
/// Fatal for the connection or the server; never shown to users.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal for the connection)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The Lobby's coordination channels are closed
    #[error("Lobby closed")]
    LobbyClosed,

    /// A user error surfaced outside the Lobby
    #[error(transparent)]
    User(#[from] UserError),
}

/// Errors caused by a client's command
///
/// Reported to the originating client as a one-line notice; no state changes.
#[derive(Debug, Error)]
pub enum UserError {
    /// Chat content sent while not in a room
    #[error("Not in room")]
    NotInRoom,

    /// A room with this name already exists
    #[error("Room already exists: {0}")]
    RoomExists(String),

    /// Room not found with the given name
    #[error("Room not found: {0}")]
    RoomNotFound(String),

    /// Leave requested while not in a room
    #[error("Cannot leave: not in a room")]
    CannotLeave,
}

/// Message send errors
///
/// Occurs when attempting to send messages through closed channels.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}

/// Convert UserError to the notice line sent to the client
impl From<UserError> for String {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotInRoom => ERROR_NOT_IN_ROOM,
            UserError::RoomExists(_) => ERROR_ROOM_EXISTS,
            UserError::RoomNotFound(_) => ERROR_ROOM_NOT_FOUND,
            UserError::CannotLeave => ERROR_CANNOT_LEAVE,
        }
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_errors_become_notices() {
        let notice: String = UserError::RoomExists("geral".to_string()).into();
        assert_eq!(notice, ERROR_ROOM_EXISTS);

        let notice: String = UserError::RoomNotFound("geral".to_string()).into();
        assert_eq!(notice, ERROR_ROOM_NOT_FOUND);

        let notice: String = UserError::NotInRoom.into();
        assert!(notice.starts_with("Erro: "));
        assert!(notice.ends_with('\n'));
    }

    #[test]
    fn test_error_display() {
        let err = UserError::RoomNotFound("geral".to_string());
        assert_eq!(err.to_string(), "Room not found: geral");

        let err: AppError = UserError::CannotLeave.into();
        assert_eq!(err.to_string(), "Cannot leave: not in a room");
    }
}
