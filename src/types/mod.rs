//! Type definitions

pub mod blog;
pub mod career;
pub mod customer;
pub mod dashboard;
pub mod import;
pub mod inquiry;
pub mod message_template;
pub mod messages;
pub mod user;

pub use blog::*;
pub use career::*;
pub use customer::*;
pub use dashboard::*;
pub use import::*;
pub use inquiry::*;
pub use message_template::*;
pub use messages::*;
pub use user::*;
