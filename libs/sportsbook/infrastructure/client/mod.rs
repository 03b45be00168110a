//! Upstream feed decoders
//!
//! Provides decoders and route builders for both upstream wire formats.
//! Each decoder turns one raw payload into domain content exactly once,
//! at the channel boundary.

pub mod everymatrix;
pub mod sportradar;

pub use everymatrix::{EveryMatrixDecoder, EveryMatrixRoutes};
pub use sportradar::{SportListKind, SportRadarDecoder, SportRadarMessage, SportRadarRoutes};
