//! Typed command marshalling on top of the raw link.

use std::sync::Arc;

use anyhow::Result;

use uart_proto::Command;

use super::protocol::UartLink;

/// Send commands to the vehicle. Cheap to clone; all clones share the link.
#[derive(Clone)]
pub struct Sender {
    link: Arc<UartLink>,
}

impl Sender {
    pub fn new(link: Arc<UartLink>) -> Self {
        Self { link }
    }

    /// Turn by `angle` degrees. `snap` asks the firmware to settle on the
    /// exact angle instead of best-effort.
    pub async fn turn(&self, angle: i16, snap: bool) -> Result<()> {
        let mut payload = Vec::with_capacity(3);
        payload.extend_from_slice(&angle.to_le_bytes());
        payload.push(snap as u8);
        self.link.send_command(Command::Turn, &payload).await
    }

    /// Follow the current line until the vehicle reports an event.
    pub async fn follow_line(&self) -> Result<()> {
        self.link.send_command(Command::FollowLine, &[]).await
    }

    pub async fn set_debug_logging(&self, enabled: bool) -> Result<()> {
        self.link
            .send_command(Command::SetDebugLogging, &[enabled as u8])
            .await
    }

    pub async fn set_speed(&self, speed: i8) -> Result<()> {
        self.link
            .send_command(Command::SetSpeed, &[speed as u8])
            .await
    }

    /// Signal that the mission target was reached.
    pub async fn destination_reached(&self) -> Result<()> {
        self.link
            .send_command(Command::DestinationReached, &[])
            .await
    }
}
