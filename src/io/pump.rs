//! Byte-level pump over an async stream

use crate::stage::{Basin, BufferDrain, Faucet, Outer, Pipe, SendError, Valve, ValveState, Valved};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;
use tracing::debug;

/// Read buffer capacity
const READ_BUFFER: usize = 65536;

/// The canonical leaf stage: pumps a stream (socket, descriptor, in-memory
/// pipe) into the stack above it.
///
/// [`IoPump::start`] spawns the read loop; incoming bytes land on the outer
/// sink, EOF and read errors stop the stack upward. `send` writes downward.
/// `shut` halts the loop, flushes and closes the write side, then finalizes
/// the valve.
pub struct IoPump<S> {
    faucet: Arc<Faucet<BufferDrain>>,
    reader: Mutex<Option<ReadHalf<S>>>,
    writer: tokio::sync::Mutex<WriteHalf<S>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<S> IoPump<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    pub fn new(outer: Outer<BufferDrain>, stream: S) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            faucet: Arc::new(Faucet::new(outer)),
            reader: Mutex::new(Some(reader)),
            writer: tokio::sync::Mutex::new(writer),
            task: Mutex::new(None),
        }
    }

    /// Start pumping inbound data upward.
    ///
    /// Panics when called twice; a pump reads exactly one stream, once.
    pub fn start(&self) {
        let mut reader = self
            .reader
            .lock()
            .expect("reader lock")
            .take()
            .expect("pump already started");

        let faucet = Arc::clone(&self.faucet);
        let handle = tokio::spawn(async move {
            let mut buf = BytesMut::with_capacity(READ_BUFFER);
            loop {
                match reader.read_buf(&mut buf).await {
                    Ok(0) => {
                        debug!("stream closed by peer");
                        faucet.stop(None);
                        break;
                    }
                    Ok(_) => {
                        if faucet.valve().state() != ValveState::Active {
                            break;
                        }
                        faucet.land(buf.split().freeze());
                    }
                    Err(error) => {
                        let message = error.to_string();
                        debug!(error = %message, "read failed");
                        faucet.stop(Some(&message));
                        break;
                    }
                }
            }
        });

        *self.task.lock().expect("task lock") = Some(handle);
    }
}

impl<S> Basin for IoPump<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    fn stop(&self, error: Option<&str>) {
        self.faucet.stop(error);
    }
}

#[async_trait]
impl<S> Pipe<Bytes> for IoPump<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    async fn send(&self, data: &Bytes) -> Result<(), SendError> {
        if self.faucet.valve().state() != ValveState::Active {
            return Err(SendError::Stopped);
        }
        let mut writer = self.writer.lock().await;
        writer.write_all(data).await?;
        Ok(())
    }
}

#[async_trait]
impl<S> Valved for IoPump<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    fn valve(&self) -> &Valve {
        self.faucet.valve()
    }

    async fn shut(&self) {
        // Halt the read loop before closing the stream under it
        let task = self.task.lock().expect("task lock").take();
        if let Some(task) = task {
            task.abort();
            let _ = task.await;
        }

        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;

        self.faucet.valve().shut().await;
    }
}

impl<S> Drop for IoPump<S> {
    fn drop(&mut self) {
        // The read loop must not outlive the stack it lands into
        if let Ok(slot) = self.task.get_mut() {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
    }
}
