mod decoder;
mod routes;
mod types;

pub use decoder::{SportListKind, SportRadarDecoder, SportRadarMessage};
pub use routes::SportRadarRoutes;
pub use types::{decimal_odds, SocketContent, SportTypeDto};
