use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tracing::{info, warn};

use crate::error::DispatchError;
use crate::transport::{AdapterAddress, Transport};
use crate::types::{decode_response, ImportRequest, ImportResult, IMPORT_COMMAND};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchPhase {
    Idle,
    Validating,
    Transmitting,
}

/// Sends import requests to one adapter instance, one at a time.
#[derive(Debug)]
pub struct Dispatcher<T> {
    transport: T,
    endpoint: AdapterAddress,
    phase: Mutex<DispatchPhase>,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T, endpoint: AdapterAddress) -> Self {
        Self {
            transport,
            endpoint,
            phase: Mutex::new(DispatchPhase::Idle),
        }
    }

    pub fn endpoint(&self) -> &AdapterAddress {
        &self.endpoint
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn phase(&self) -> DispatchPhase {
        *self.lock_phase()
    }

    pub fn is_busy(&self) -> bool {
        self.phase() != DispatchPhase::Idle
    }

    /// Claims the single flight slot. The slot is released when the returned
    /// [`Flight`] is dropped or sent.
    pub fn begin(&self) -> Result<Flight<'_, T>, DispatchError> {
        let mut phase = self.lock_phase();
        if *phase != DispatchPhase::Idle {
            warn!(endpoint = %self.endpoint, phase = ?*phase, "rejecting import while another is in flight");
            return Err(DispatchError::Busy);
        }
        *phase = DispatchPhase::Validating;
        Ok(Flight { dispatcher: self })
    }

    pub async fn dispatch(&self, request: ImportRequest) -> Result<ImportResult, DispatchError> {
        self.begin()?.send(request).await
    }

    fn lock_phase(&self) -> std::sync::MutexGuard<'_, DispatchPhase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, next: DispatchPhase) {
        *self.lock_phase() = next;
    }
}

/// An import attempt holding the dispatcher's flight slot.
pub struct Flight<'a, T: Transport> {
    dispatcher: &'a Dispatcher<T>,
}

impl<T: Transport> Flight<'_, T> {
    pub async fn send(self, request: ImportRequest) -> Result<ImportResult, DispatchError> {
        let dispatcher = self.dispatcher;
        dispatcher.set_phase(DispatchPhase::Transmitting);

        let message = serde_json::to_value(&request).map_err(crate::error::TransportError::from)?;
        info!(
            endpoint = %dispatcher.endpoint,
            utility_type = %request.utility_type,
            meter_name = %request.meter_name,
            "dispatching import request"
        );

        let reply = dispatcher
            .transport
            .send(&dispatcher.endpoint, IMPORT_COMMAND, message)
            .await
            .inspect_err(|err| {
                warn!(endpoint = %dispatcher.endpoint, error = %err, "import transport failed")
            })?;

        match decode_response(reply)? {
            Ok(result) => {
                info!(
                    endpoint = %dispatcher.endpoint,
                    count = result.count,
                    first = result.first.as_deref().unwrap_or(""),
                    last = result.last.as_deref().unwrap_or(""),
                    "import accepted"
                );
                Ok(result)
            }
            Err(err) => {
                warn!(endpoint = %dispatcher.endpoint, error = %err, "import rejected by backend");
                Err(err.into())
            }
        }
    }
}

impl<T: Transport> Drop for Flight<'_, T> {
    fn drop(&mut self) {
        self.dispatcher.set_phase(DispatchPhase::Idle);
    }
}
