pub mod api;
pub mod config;
pub mod error;
mod redact;
pub mod session;
pub mod store;
pub mod types;
pub mod wizard;

pub use api::{ApiClient, ApiError, AuthApi, ProjectApi};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use session::SessionManager;
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use wizard::{DraftPatch, ProjectDraft, ProjectWizard, WizardState};
