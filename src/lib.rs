pub mod a11y;
#[cfg(feature = "chrome")]
pub mod browser;
pub mod core;
pub mod dom;
pub mod errors;
pub mod testing;
pub mod types;

pub use a11y::DomContext;
#[cfg(feature = "chrome")]
pub use browser::ChromeHost;
pub use core::{Config, HostCapabilities, HostTrait, Target};
pub use dom::MemoryHost;
pub use errors::{DomError, Result};
pub use types::*;
