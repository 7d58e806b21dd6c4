//! Console transport: every line read is a chat message from `console`.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::debug;

use crate::ChatError;
use crate::message::ChatMessage;
use crate::service::ChatServiceHandle;

pub const CONSOLE_AUTHOR: &str = "console";
pub const CONSOLE_CHANNEL: &str = "console";

/// Feed lines from `reader` into the chat service until EOF.
///
/// Returns the number of lines submitted. Blank lines are skipped.
pub async fn pump_lines<R>(reader: R, handle: &ChatServiceHandle) -> Result<usize, ChatError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut submitted = 0;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }
        handle
            .submit(ChatMessage::new(CONSOLE_CHANNEL, CONSOLE_AUTHOR, line))
            .await?;
        submitted += 1;
    }

    debug!(submitted, "Console input closed");
    Ok(submitted)
}
