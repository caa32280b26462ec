//! Caller-side import form: the selected file, its labels, and the outcome of
//! the last attempt.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{info, warn};

use crate::dispatcher::{DispatchPhase, Dispatcher};
use crate::error::{ImportError, Result, ValidationError};
use crate::payload::{FileSelection, FileSource, PayloadBuilder};
use crate::transport::Transport;
use crate::types::{ImportResult, UtilityType};

/// Terminal state of one attempt, kept for display until the next attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ImportOutcome {
    Success(ImportResult),
    InvalidInput { message: String },
    TransportFailed { message: String },
    BackendRejected { message: String },
}

impl ImportOutcome {
    fn from_error(err: &ImportError) -> Option<Self> {
        let message = err.to_string();
        match err {
            ImportError::Validation(_) => Some(ImportOutcome::InvalidInput { message }),
            ImportError::Transport(_) => Some(ImportOutcome::TransportFailed { message }),
            ImportError::Backend(backend) => Some(ImportOutcome::BackendRejected {
                message: backend.message.clone(),
            }),
            // a rejected duplicate submission leaves the pending attempt's display alone
            ImportError::Busy => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ImportOutcome::Success(_))
    }

    /// The single line shown to the user for this outcome.
    pub fn message(&self) -> String {
        match self {
            ImportOutcome::Success(result) => match (&result.first, &result.last) {
                (Some(first), Some(last)) => {
                    format!("imported {} records from {first} to {last}", result.count)
                }
                _ => format!("imported {} records", result.count),
            },
            ImportOutcome::InvalidInput { message }
            | ImportOutcome::TransportFailed { message }
            | ImportOutcome::BackendRejected { message } => message.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub phase: DispatchPhase,
    pub selected_file: Option<String>,
    pub utility_type: UtilityType,
    pub import_name: String,
    pub last_outcome: Option<ImportOutcome>,
}

#[derive(Debug)]
struct FormState {
    selection: FileSelection,
    utility_type: UtilityType,
    import_name: String,
    last_outcome: Option<ImportOutcome>,
}

pub struct ImportSession<T: Transport> {
    builder: PayloadBuilder,
    dispatcher: Dispatcher<T>,
    form: Mutex<FormState>,
}

impl<T: Transport> ImportSession<T> {
    pub fn new(builder: PayloadBuilder, dispatcher: Dispatcher<T>) -> Self {
        Self {
            builder,
            dispatcher,
            form: Mutex::new(FormState {
                selection: FileSelection::new(),
                utility_type: UtilityType::Electricity,
                import_name: String::new(),
                last_outcome: None,
            }),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher<T> {
        &self.dispatcher
    }

    pub fn select_files<F, I>(&self, files: I)
    where
        F: FileSource + 'static,
        I: IntoIterator<Item = F>,
    {
        self.lock_form().selection.select(files);
    }

    pub fn clear_file(&self) {
        self.lock_form().selection.clear();
    }

    pub fn set_utility_type(&self, utility_type: UtilityType) {
        self.lock_form().utility_type = utility_type;
    }

    pub fn set_import_name(&self, name: impl Into<String>) {
        self.lock_form().import_name = name.into();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let form = self.lock_form();
        SessionSnapshot {
            phase: self.dispatcher.phase(),
            selected_file: form.selection.active_name().map(str::to_string),
            utility_type: form.utility_type,
            import_name: form.import_name.clone(),
            last_outcome: form.last_outcome.clone(),
        }
    }

    pub fn last_outcome(&self) -> Option<ImportOutcome> {
        self.lock_form().last_outcome.clone()
    }

    /// Runs one import attempt with the current form values.
    ///
    /// Success clears the selected file and the name; any failure keeps them
    /// so the user can correct and resubmit. Nothing is retried.
    pub async fn submit(&self) -> Result<ImportResult> {
        let flight = self.dispatcher.begin()?;

        let (file, utility_type, import_name) = {
            let form = self.lock_form();
            (
                form.selection.active(),
                form.utility_type,
                form.import_name.clone(),
            )
        };

        let Some(file) = file else {
            return Err(self.fail(ValidationError::MissingFile.into()));
        };

        let request = match self
            .builder
            .build(file.as_ref(), utility_type, &import_name)
            .await
        {
            Ok(request) => request,
            Err(err) => return Err(self.fail(err.into())),
        };

        self.lock_form().last_outcome = None;

        match flight.send(request).await {
            Ok(result) => {
                let mut form = self.lock_form();
                let same_file = form
                    .selection
                    .active()
                    .is_some_and(|current| Arc::ptr_eq(&current, &file));
                if same_file {
                    form.selection.clear();
                }
                if form.import_name == import_name {
                    form.import_name.clear();
                }
                form.last_outcome = Some(ImportOutcome::Success(result.clone()));
                info!(file = file.name(), count = result.count, "import finished");
                Ok(result)
            }
            Err(err) => Err(self.fail(err.into())),
        }
    }

    fn fail(&self, err: ImportError) -> ImportError {
        warn!(error = %err, "import attempt failed");
        if let Some(outcome) = ImportOutcome::from_error(&err) {
            self.lock_form().last_outcome = Some(outcome);
        }
        err
    }

    fn lock_form(&self) -> MutexGuard<'_, FormState> {
        self.form.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
