//! In-process request/response bus between callers and adapter instances.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::TransportError;
use crate::transport::{AdapterAddress, Transport};

/// One request travelling to an adapter instance, with its reply slot.
#[derive(Debug)]
pub struct Envelope {
    pub id: Uuid,
    pub command: String,
    pub message: Value,
    reply: oneshot::Sender<Value>,
}

impl Envelope {
    /// Returns false if the caller stopped waiting.
    pub fn reply(self, value: Value) -> bool {
        self.reply.send(value).is_ok()
    }
}

/// Receiving end registered for one adapter address.
#[derive(Debug)]
pub struct Mailbox {
    address: AdapterAddress,
    receiver: mpsc::Receiver<Envelope>,
}

impl Mailbox {
    pub fn address(&self) -> &AdapterAddress {
        &self.address
    }

    pub async fn recv(&mut self) -> Option<Envelope> {
        self.receiver.recv().await
    }
}

const MAILBOX_CAPACITY: usize = 16;

#[derive(Debug)]
pub struct MessageBus {
    routes: RwLock<HashMap<AdapterAddress, mpsc::Sender<Envelope>>>,
    timeout: Duration,
}

impl MessageBus {
    pub fn new(timeout: Duration) -> Self {
        Self {
            routes: RwLock::new(HashMap::new()),
            timeout,
        }
    }

    /// Registers an adapter instance. A second registration of the same
    /// address replaces the first; the old mailbox sees its channel close.
    pub fn register(&self, address: AdapterAddress) -> Mailbox {
        let (sender, receiver) = mpsc::channel(MAILBOX_CAPACITY);
        let previous = self
            .routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address.clone(), sender);
        if previous.is_some() {
            warn!(%address, "replacing existing adapter registration");
        }
        Mailbox { address, receiver }
    }

    pub fn unregister(&self, address: &AdapterAddress) -> bool {
        self.routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(address)
            .is_some()
    }

    fn route(&self, address: &AdapterAddress) -> Option<mpsc::Sender<Envelope>> {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(address)
            .cloned()
    }
}

#[async_trait]
impl Transport for MessageBus {
    async fn send(
        &self,
        to: &AdapterAddress,
        command: &str,
        message: Value,
    ) -> Result<Value, TransportError> {
        let sender = self.route(to).ok_or_else(|| TransportError::Unreachable {
            address: to.clone(),
        })?;

        let id = Uuid::new_v4();
        let (reply, response) = oneshot::channel();
        let envelope = Envelope {
            id,
            command: command.to_string(),
            message,
            reply,
        };

        let exchange = async {
            sender
                .send(envelope)
                .await
                .map_err(|_| TransportError::Disconnected {
                    address: to.clone(),
                })?;
            response.await.map_err(|_| TransportError::Disconnected {
                address: to.clone(),
            })
        };

        let span = info_span!("bus_request", %id, address = %to, command);
        let outcome = tokio::time::timeout(self.timeout, exchange)
            .instrument(span)
            .await
            .map_err(|_| TransportError::Timeout {
                address: to.clone(),
                after: self.timeout,
            })?;

        debug!(%id, ok = outcome.is_ok(), "bus exchange finished");
        outcome
    }
}
