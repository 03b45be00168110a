//! EveryMatrix aggregator feed
//!
//! WAMP topics publish `{version, format, messageType, records}` envelopes.
//! Records are either full entities tagged with `_type` or change records
//! (`CREATE`/`UPDATE`/`DELETE`).

mod decoder;
mod routes;
mod types;

pub use decoder::EveryMatrixDecoder;
pub use routes::EveryMatrixRoutes;
pub use types::{AggregatorResponse, ChangeRecordDto, ChangeType};
