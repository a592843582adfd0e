//! Accessibility helpers.
//!
//! Every helper takes the document through a [`DomContext`], resolves its
//! targets from scratch and never reports failure outward: missing elements,
//! malformed selectors, absent capabilities and host errors become `None`,
//! `false` or an [`Outcome`](crate::types::Outcome).

pub mod coerce;
pub mod focus;
pub mod presentation;
pub mod resolve;
pub mod scroll;

use crate::core::{Config, HostTrait};
use std::sync::Arc;

pub use scroll::is_in_viewport;

pub struct DomContext<B: HostTrait> {
    host: Arc<B>,
    config: Config,
}

impl<B: HostTrait + 'static> DomContext<B> {
    pub fn new(host: B, config: Config) -> Self {
        Self::with_shared(Arc::new(host), config)
    }

    pub fn with_shared(host: Arc<B>, config: Config) -> Self {
        Self { host, config }
    }

    pub fn host(&self) -> &B {
        &self.host
    }

    pub fn shared_host(&self) -> Arc<B> {
        Arc::clone(&self.host)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }
}

impl<B: HostTrait> Clone for DomContext<B> {
    fn clone(&self) -> Self {
        Self {
            host: Arc::clone(&self.host),
            config: self.config.clone(),
        }
    }
}
