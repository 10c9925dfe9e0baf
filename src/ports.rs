pub mod gateway;
pub mod store;
pub mod time;

pub use gateway::PushGateway;
pub use store::{AddressRegistry, DiagnosticStore, DueWindow, NotificationStore};
pub use time::TimeProvider;
