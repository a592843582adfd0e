pub mod chrome;
pub mod scripts;

pub use chrome::{ChromeElement, ChromeHost};
