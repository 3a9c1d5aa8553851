//! Package manager adapters.
//!
//! # Architecture
//!
//! - [`PackageSource`]: async contract every backend implements
//! - [`WingetSource`] / [`ChocolateySource`]: the two shipped backends
//! - [`parse`]: pure text-to-record parsers, one family per backend
//! - [`command`]: process invocation with timeouts and kill-on-expiry

pub mod chocolatey;
pub mod command;
pub mod parse;
mod source;
pub mod winget;

use std::sync::Arc;

pub use chocolatey::ChocolateySource;
pub use source::{PackageSource, Timeouts};
pub use winget::WingetSource;

use crate::common::config::Config;

/// Build the shipped adapters from configuration, in query order.
pub fn sources_from_config(config: &Config) -> Vec<Arc<dyn PackageSource>> {
    vec![
        Arc::new(WingetSource::new(&config.winget.binary, config.timeouts)),
        Arc::new(ChocolateySource::new(
            &config.chocolatey.binary,
            config.timeouts,
        )),
    ]
}
