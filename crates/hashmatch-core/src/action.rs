//! User actions arriving from the notification surface or the control socket.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserAction {
    /// Compare the current file against the next digest copied to the clipboard.
    RequestVerify,
    /// Forget the current file.
    Ignore,
    /// Drop a pending comparison but keep the file.
    Dismiss,
}

impl UserAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserAction::RequestVerify => "verify",
            UserAction::Ignore => "ignore",
            UserAction::Dismiss => "dismiss",
        }
    }
}

impl fmt::Display for UserAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown action: {0:?}")]
pub struct UnknownAction(pub String);

impl FromStr for UserAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "verify" | "request-verify" => Ok(UserAction::RequestVerify),
            "ignore" => Ok(UserAction::Ignore),
            "dismiss" => Ok(UserAction::Dismiss),
            other => Err(UnknownAction(other.to_string())),
        }
    }
}

/// One line of the control protocol: a user action, a request to copy the
/// current digest to the clipboard, or a status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Action(UserAction),
    Copy,
    Status,
}

impl fmt::Display for ControlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlCommand::Action(action) => fmt::Display::fmt(action, f),
            ControlCommand::Copy => f.write_str("copy"),
            ControlCommand::Status => f.write_str("status"),
        }
    }
}

impl From<UserAction> for ControlCommand {
    fn from(action: UserAction) -> Self {
        ControlCommand::Action(action)
    }
}

impl FromStr for ControlCommand {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "copy" | "copy-actual" => Ok(ControlCommand::Copy),
            "status" => Ok(ControlCommand::Status),
            other => other.parse().map(ControlCommand::Action),
        }
    }
}
