pub mod adapter;
pub mod bus;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod payload;
pub mod session;
pub mod store;
pub mod transport;
pub mod types;

pub use adapter::ImportAdapter;
pub use bus::MessageBus;
pub use config::ImportConfig;
pub use dispatcher::{DispatchPhase, Dispatcher};
pub use error::{
    BackendError, DispatchError, ImportError, TransportError, ValidationError,
    ValidationErrorKind,
};
pub use payload::{FileSelection, FileSource, LocalFile, MemoryFile, PayloadBuilder};
pub use session::{ImportOutcome, ImportSession, SessionSnapshot};
pub use store::{MemoryStore, ReadingStore, SeriesKey};
pub use transport::{AdapterAddress, Transport};
pub use types::{ImportName, ImportRequest, ImportResult, UtilityType};
