//! Backend side of the import protocol: one adapter instance that parses and
//! stores uploaded readings.

use std::sync::Arc;

use blake3::Hasher;
use meterflux_parser::{format_timestamp, parse_readings, supported_formats};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};

use crate::bus::Mailbox;
use crate::error::BackendError;
use crate::payload::decode_data_url;
use crate::store::{ReadingStore, SeriesKey};
use crate::types::{encode_response, ImportRequest, ImportResult, IMPORT_COMMAND};

pub struct ImportAdapter<S> {
    store: Arc<S>,
}

impl<S> Clone for ImportAdapter<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: ReadingStore + 'static> ImportAdapter<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Serves the mailbox until every sender is gone. Requests are handled
    /// one at a time so each import is applied as a unit.
    pub async fn run(self, mut mailbox: Mailbox) {
        let address = mailbox.address().clone();
        info!(%address, "import adapter started");

        while let Some(mut envelope) = mailbox.recv().await {
            let command = std::mem::take(&mut envelope.command);
            let message = std::mem::take(&mut envelope.message);
            let span = info_span!("adapter_request", id = %envelope.id, %address, command = %command);

            let reply = self.handle(&command, message).instrument(span).await;
            if !envelope.reply(reply) {
                warn!(%address, "caller went away before the reply was delivered");
            }
        }

        info!(%address, "import adapter stopped");
    }

    pub fn spawn(self, mailbox: Mailbox) -> JoinHandle<()> {
        tokio::spawn(self.run(mailbox))
    }

    /// Routes one command. Always produces exactly one reply.
    pub async fn handle(&self, command: &str, message: Value) -> Value {
        let outcome = if command == IMPORT_COMMAND {
            self.import(message).await
        } else {
            Err(BackendError::new(format!("unsupported command '{command}'")))
        };
        encode_response(&outcome)
    }

    pub async fn import(&self, message: Value) -> Result<ImportResult, BackendError> {
        let request: ImportRequest = serde_json::from_value(message)
            .map_err(|err| BackendError::new(format!("invalid import request: {err}")))?;

        if !supported_formats().contains(&request.format.as_str()) {
            return Err(BackendError::new(format!(
                "unsupported import format '{}'",
                request.format
            )));
        }

        let (_, bytes) = decode_data_url(&request.content).map_err(BackendError::new)?;
        let hash = compute_hash(&bytes);

        let content = std::str::from_utf8(&bytes)
            .map_err(|_| BackendError::new("file contents were not valid UTF-8"))?;

        let parsed = parse_readings(&request.format, content)
            .map_err(|err| BackendError::new(err.to_string()))?;

        let key = SeriesKey::new(request.utility_type, request.meter_name);
        let report = self
            .store
            .upsert(&key, &hash, &parsed.readings)
            .await
            .map_err(|err| BackendError::new(err.to_string()))?;

        info!(
            series = %key,
            hash = %hash,
            records = parsed.len(),
            inserted = report.inserted,
            updated = report.updated,
            "readings imported"
        );

        Ok(ImportResult {
            count: parsed.len() as u64,
            first: parsed.first().map(format_timestamp),
            last: parsed.last().map(format_timestamp),
        })
    }
}

fn compute_hash(contents: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(contents);
    let hash = hasher.finalize();
    hash.to_hex().to_string()
}
