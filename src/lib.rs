//! Sportsbook Feeds - Main Library
//!
//! Real-time sportsbook aggregation over live feeds.
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (config path, runners)
//! - **sportsbook**: Store, assembler, sports merger and facade (re-exported from workspace)
//! - **feedsockets**: Subscription channels and transports (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust
//! use sportsbook_feeds::bin_common::{load_config_from_env, ConfigType};
//! use sportsbook_feeds::sportsbook::SportsbookFacade;
//! ```

// Re-export workspace libraries for convenience
pub use feedsockets;
pub use sportsbook;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;
    pub mod runner;

    pub use cli::{load_config_from_env, parse_args, ConfigType};
    pub use runner::{BinaryRunner, RunConfig};
}
