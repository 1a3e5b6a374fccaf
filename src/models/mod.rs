pub mod access_log;
pub mod event;
pub mod sale;
pub mod ticket;
pub mod user;

pub use access_log::AccessLogEntry;
pub use event::Event;
pub use sale::{Sale, SaleStatus};
pub use ticket::TicketType;
pub use user::{PublicUser, Role, User};
