//! Database queries

pub mod blog;
pub mod career;
pub mod customer;
pub mod inquiry;
pub mod message_template;
pub mod user;
