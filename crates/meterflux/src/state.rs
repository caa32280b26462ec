use std::sync::Arc;

use meterflux_core::{
    Dispatcher, ImportAdapter, ImportConfig, MemoryStore, MessageBus, PayloadBuilder, Transport,
};
use tokio::task::JoinHandle;

pub type SharedTransport = Arc<dyn Transport>;

/// Everything an upload handler needs: the payload builder and the
/// single-flight dispatcher pointed at the configured adapter.
pub struct ImportState {
    pub builder: PayloadBuilder,
    pub dispatcher: Dispatcher<SharedTransport>,
}

impl ImportState {
    pub fn new(config: &ImportConfig, transport: SharedTransport) -> Self {
        Self {
            builder: PayloadBuilder::new(config.max_file_bytes),
            dispatcher: Dispatcher::new(transport, config.adapter.clone()),
        }
    }
}

/// A bus with a local import adapter registered at the configured address.
pub struct LocalBackend {
    pub bus: Arc<MessageBus>,
    pub store: Arc<MemoryStore>,
    pub adapter_task: JoinHandle<()>,
}

impl LocalBackend {
    pub fn start(config: &ImportConfig) -> Self {
        let bus = Arc::new(MessageBus::new(config.timeout));
        let store = Arc::new(MemoryStore::new());
        let mailbox = bus.register(config.adapter.clone());
        let adapter_task = ImportAdapter::new(Arc::clone(&store)).spawn(mailbox);
        Self {
            bus,
            store,
            adapter_task,
        }
    }

    pub fn transport(&self) -> SharedTransport {
        self.bus.clone()
    }
}
