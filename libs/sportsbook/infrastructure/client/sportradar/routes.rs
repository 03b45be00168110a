use crate::infrastructure::config::SportsbookConfig;
use feedsockets::Route;

/// Content routes registered over the socket-rest connector
///
/// The session token is not part of these routes; the connector appends it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SportRadarRoutes {
    all_sports: Route,
    live_sports: Route,
}

impl SportRadarRoutes {
    pub fn new(all_sports: impl Into<Route>, live_sports: impl Into<Route>) -> Self {
        Self {
            all_sports: all_sports.into(),
            live_sports: live_sports.into(),
        }
    }

    pub fn from_config(config: &SportsbookConfig) -> Self {
        Self::new(
            config.sportradar.all_sports_route.as_str(),
            config.sportradar.live_sports_route.as_str(),
        )
    }

    pub fn all_sports(&self) -> &Route {
        &self.all_sports
    }

    pub fn live_sports(&self) -> &Route {
        &self.live_sports
    }

    pub fn event_details(event_id: &str) -> Route {
        Route::new(format!("/sports/eventDetails/{}", event_id))
    }

    pub fn market(market_id: &str) -> Route {
        Route::new(format!("/sports/market/{}", market_id))
    }
}

impl Default for SportRadarRoutes {
    fn default() -> Self {
        Self::new("/sports/allSports", "/sports/liveSports")
    }
}
