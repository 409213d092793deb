//! Core infrastructure for the subsets engine.
//!
//! - [`types`]: partition descriptors, statistics records and index aliases
//! - [`constants`]: limits and configuration defaults
//! - [`error`]: the crate error type
//! - [`profiler`]: named-scope timing hooks

pub mod constants;
pub mod error;
pub mod profiler;
pub mod types;

pub use constants::*;
pub use error::{Result, SubsetsError};
pub use profiler::{profiler, ProfileGuard, ProfileRecord, Profiler};
pub use types::*;

use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};

static CORE_INIT: Once = Once::new();
static CORE_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize logging for the engine.
///
/// Safe to call more than once; only the first call installs the logger.
pub fn initialize_core() -> Result<()> {
    CORE_INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_err() {
            std::env::set_var("RUST_LOG", "info");
        }
        // Another logger may already be installed by the embedding application.
        let _ = env_logger::try_init();

        CORE_INITIALIZED.store(true, Ordering::Release);
        log::info!("Subsets core initialized (version {})", OBLIVIOUS_SUBSETS_VERSION);
        log::debug!(
            "max depth {}, max bin bits {}, rayon threads {}",
            MAX_DEPTH_LIMIT,
            MAX_BIN_BITS,
            rayon::current_num_threads()
        );
    });

    Ok(())
}

/// Check if the core module is initialized
pub fn is_core_initialized() -> bool {
    CORE_INITIALIZED.load(Ordering::Acquire)
}
