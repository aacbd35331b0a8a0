pub mod account;

pub use account::{login, register};
