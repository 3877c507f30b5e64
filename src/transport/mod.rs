//! Message transports: a reader/writer half pair per connection.
//!
//! The session sends and receives concurrently, so a connection is driven
//! by two halves: the inbound loop owns the reader, the outbound queue
//! drainer owns the writer.

use crate::protocol::Message;

#[async_trait::async_trait]
pub trait MessageReader: Send {
    /// Block until the next message arrives. An error is fatal to the
    /// connection (end of stream, malformed frame, timeout).
    async fn recv(&mut self) -> anyhow::Result<Message>;
}

#[async_trait::async_trait]
pub trait MessageWriter: Send {
    async fn send(&mut self, msg: Message) -> anyhow::Result<()>;
}

pub mod in_memory;
pub mod tcp;
