//! `hashmatch verify|ignore|dismiss` – forward a user action to the running watcher.

use anyhow::Result;
use hashmatch_core::UserAction;

use crate::cli::control_socket;

pub async fn run_action(action: UserAction) -> Result<()> {
    let path = hashmatch_core::control::default_control_socket_path()?;
    control_socket::send_action(&path, action).await?;
    match action {
        UserAction::RequestVerify => println!("Copy the published digest to verify."),
        UserAction::Ignore => println!("Ignored the current file."),
        UserAction::Dismiss => println!("Dismissed."),
    }
    Ok(())
}
