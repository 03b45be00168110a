use crate::infrastructure::config::SportsbookConfig;
use feedsockets::Route;

/// Builds WAMP topic routes for one operator and language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EveryMatrixRoutes {
    operator_id: String,
    language: String,
}

impl EveryMatrixRoutes {
    pub fn new(operator_id: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            operator_id: operator_id.into(),
            language: language.into(),
        }
    }

    pub fn from_config(config: &SportsbookConfig) -> Self {
        Self::new(&config.operator_id, &config.language)
    }

    fn topic(&self, rest: &str) -> Route {
        Route::new(format!(
            "/sports/{}/{}/{}",
            self.operator_id, self.language, rest
        ))
    }

    /// Full market tree of one match
    pub fn match_details(&self, match_id: &str) -> Route {
        self.topic(&format!("match-aggregator-groups-overview/{}/1", match_id))
    }

    /// Odds-only topic of one match
    pub fn match_odds(&self, match_id: &str) -> Route {
        self.topic(&format!("{}/match-odds", match_id))
    }

    /// Live matches of a sport with their main markets
    pub fn live_matches(&self, sport_id: &str, matches: u32, markets: u32) -> Route {
        self.topic(&format!(
            "live-matches-aggregator-main/{}/all-locations/default-event-info/{}/{}",
            sport_id, matches, markets
        ))
    }

    pub fn popular_matches(&self, sport_id: &str, matches: u32, markets: u32) -> Route {
        self.topic(&format!(
            "popular-matches-aggregator-main/{}/{}/{}",
            sport_id, matches, markets
        ))
    }

    /// Every sport with pre-live and live counters
    pub fn all_sports(&self) -> Route {
        self.topic("disciplines/BOTH/BOTH")
    }

    /// Sports with live events
    pub fn live_sports(&self) -> Route {
        self.topic("disciplines/LIVE/BOTH")
    }

    pub fn tournaments(&self, sport_id: &str) -> Route {
        self.topic(&format!("tournaments/{}", sport_id))
    }

    pub fn popular_tournaments(&self, sport_id: &str, count: u32) -> Route {
        self.topic(&format!("popular-tournaments/{}/{}", sport_id, count))
    }

    /// One-shot RPC returning the current state of `topic`
    pub fn initial_dump(topic: &Route) -> Route {
        Route::new("/sports#initialDump").with_param("topic", topic.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes() {
        let routes = EveryMatrixRoutes::new("4093", "en");
        assert_eq!(
            routes.match_details("123").as_str(),
            "/sports/4093/en/match-aggregator-groups-overview/123/1"
        );
        assert_eq!(routes.match_odds("123").as_str(), "/sports/4093/en/123/match-odds");
        assert_eq!(
            routes.live_matches("1", 20, 3).as_str(),
            "/sports/4093/en/live-matches-aggregator-main/1/all-locations/default-event-info/20/3"
        );
        assert_eq!(routes.all_sports().as_str(), "/sports/4093/en/disciplines/BOTH/BOTH");
        assert_eq!(routes.live_sports().as_str(), "/sports/4093/en/disciplines/LIVE/BOTH");
        assert_eq!(
            routes.popular_tournaments("1", 10).as_str(),
            "/sports/4093/en/popular-tournaments/1/10"
        );
    }

    #[test]
    fn test_initial_dump_route() {
        let topic = Route::new("/sports/4093/en/tournaments/1");
        assert_eq!(
            EveryMatrixRoutes::initial_dump(&topic).as_str(),
            "/sports#initialDump?topic=/sports/4093/en/tournaments/1"
        );
    }
}
