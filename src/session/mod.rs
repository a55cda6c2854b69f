mod expiry;
mod manager;

pub use expiry::{Clock, SystemClock, DEFAULT_SESSION_DAYS, REMEMBER_ME_DAYS};
pub use manager::SessionManager;
