//! Sequential, paced IRCC command dispatch.

use std::time::Duration;

use bravia_types::CommandId;
use tracing::{debug, info};

use crate::error::SessionError;
use crate::session::DeviceSession;

/// Ordered commands for one `send`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandBatch(Vec<CommandId>);

impl CommandBatch {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl IntoIterator for CommandBatch {
    type Item = CommandId;
    type IntoIter = std::vec::IntoIter<CommandId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<T: Into<CommandId>> FromIterator<T> for CommandBatch {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl From<&str> for CommandBatch {
    fn from(value: &str) -> Self {
        Self(vec![value.into()])
    }
}

impl From<String> for CommandBatch {
    fn from(value: String) -> Self {
        Self(vec![value.into()])
    }
}

impl From<CommandId> for CommandBatch {
    fn from(value: CommandId) -> Self {
        Self(vec![value])
    }
}

impl<T: Into<CommandId>> From<Vec<T>> for CommandBatch {
    fn from(value: Vec<T>) -> Self {
        value.into_iter().collect()
    }
}

impl<T: Into<CommandId> + Clone> From<&[T]> for CommandBatch {
    fn from(value: &[T]) -> Self {
        value.iter().cloned().collect()
    }
}

impl<T: Into<CommandId>, const N: usize> From<[T; N]> for CommandBatch {
    fn from(value: [T; N]) -> Self {
        value.into_iter().collect()
    }
}

/// Sends a batch one code at a time, waiting `delay` between codes.
///
/// The first failure ends the batch; codes already sent stay sent.
pub struct CommandQueue<'a> {
    session: &'a DeviceSession,
    delay: Duration,
}

impl<'a> CommandQueue<'a> {
    pub fn new(session: &'a DeviceSession, delay: Duration) -> Self {
        Self { session, delay }
    }

    pub async fn run(&self, batch: CommandBatch) -> Result<(), SessionError> {
        let total = batch.len();
        for (index, command) in batch.into_iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.delay).await;
            }
            let code = self.session.resolve(&command).await?;
            self.session.endpoint().send_ircc(&code).await?;
            debug!(command = %command, index, total, "IRCC code delivered");
        }
        info!(count = total, "IRCC batch sent");
        Ok(())
    }
}
