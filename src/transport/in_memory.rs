//! In-memory transport pair for tests: two endpoints connected by
//! unbounded queues, with the same hang-up semantics as a closed socket.

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::protocol::Message;
use crate::transport::{MessageReader, MessageWriter};

pub struct InMemoryWriter {
    tx: UnboundedSender<Message>,
}

pub struct InMemoryReader {
    rx: UnboundedReceiver<Message>,
}

/// Two connected endpoints, each a (reader, writer) half pair.
pub fn pair() -> ((InMemoryReader, InMemoryWriter), (InMemoryReader, InMemoryWriter)) {
    let (a_tx, b_rx) = unbounded_channel();
    let (b_tx, a_rx) = unbounded_channel();
    (
        (InMemoryReader { rx: a_rx }, InMemoryWriter { tx: a_tx }),
        (InMemoryReader { rx: b_rx }, InMemoryWriter { tx: b_tx }),
    )
}

#[async_trait::async_trait]
impl MessageReader for InMemoryReader {
    async fn recv(&mut self) -> anyhow::Result<Message> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| anyhow::anyhow!("channel closed"))
    }
}

#[async_trait::async_trait]
impl MessageWriter for InMemoryWriter {
    async fn send(&mut self, msg: Message) -> anyhow::Result<()> {
        self.tx
            .send(msg)
            .map_err(|_| anyhow::anyhow!("channel closed"))
    }
}
