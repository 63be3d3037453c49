mod dispatch;
pub mod errors;
pub mod key_manager;
pub mod models;
pub mod providers;
pub mod settings;

pub use dispatch::Switchboard;
pub use errors::{CompleteError, Error, ErrorKind, RegistryError};
pub use models::message::Message;
pub use providers::configs::CallOptions;
