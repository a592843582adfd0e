pub mod config;
pub mod host;
pub mod target;

pub use config::Config;
pub use host::{HostCapabilities, HostTrait};
pub use target::Target;
