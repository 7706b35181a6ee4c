pub mod models;
pub mod store;

pub use models::{LoadOutcome, LoadTicket, OpenRequest, SessionSnapshot, Tab, TabId};
pub use store::{display_name, is_supported_design, SessionStore, SUPPORTED_EXTENSIONS};
