#![doc(test(attr(deny(warnings))))]

//! Club Core provides a headless stepped-wizard engine plus the member, team,
//! training-camp and expense wizards that run on top of it.

pub mod cli;
pub mod config;
pub mod core;
pub mod device;
pub mod domain;
pub mod errors;
pub mod notify;
pub mod storage;
pub mod utils;
pub mod wizard;
pub mod wizards;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Club Core tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
    }
}
