#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use meterflux_core::{AdapterAddress, Transport, TransportError};
use serde_json::Value;
use tokio::sync::Notify;

pub fn fixture(name: &str) -> String {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../meterflux-parser/tests/data")
        .join(name);
    std::fs::read_to_string(path).expect("read fixture")
}

pub fn endpoint() -> AdapterAddress {
    "meterflux.0".parse().expect("address")
}

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub to: AdapterAddress,
    pub command: String,
    pub message: Value,
}

/// Replays canned replies in order and records what was sent. An optional
/// gate holds every reply until it is released.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<Value, TransportError>>>,
    sent: Mutex<Vec<SentMessage>>,
    gate: Option<Notify>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Result<Value, TransportError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            sent: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn gated(replies: Vec<Result<Value, TransportError>>) -> Self {
        Self {
            gate: Some(Notify::new()),
            ..Self::new(replies)
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        to: &AdapterAddress,
        command: &str,
        message: Value,
    ) -> Result<Value, TransportError> {
        self.sent.lock().unwrap().push(SentMessage {
            to: to.clone(),
            command: command.to_string(),
            message,
        });
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("no scripted reply left")
    }
}
