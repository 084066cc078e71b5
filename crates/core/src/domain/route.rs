use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// An ordered origin-destination pair of IATA airport codes, e.g. `LHR-JFK`.
///
/// The string form is the canonical key for seasonal profiles and the
/// historical price series.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Route {
    origin: String,
    destination: String,
}

impl Route {
    pub fn new(origin: &str, destination: &str) -> Result<Self, DomainError> {
        let origin = normalize_code(origin)?;
        let destination = normalize_code(destination)?;
        if origin == destination {
            return Err(DomainError::InvalidRoute {
                value: format!("{origin}-{destination}"),
                reason: "origin and destination must differ".to_string(),
            });
        }
        Ok(Self { origin, destination })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }
}

fn normalize_code(code: &str) -> Result<String, DomainError> {
    let trimmed = code.trim().to_ascii_uppercase();
    if trimmed.len() != 3 || !trimmed.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(DomainError::InvalidRoute {
            value: code.to_string(),
            reason: "airport codes must be three letters".to_string(),
        });
    }
    Ok(trimmed)
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.origin, self.destination)
    }
}

impl FromStr for Route {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (origin, destination) = value.split_once('-').ok_or_else(|| {
            DomainError::InvalidRoute {
                value: value.to_string(),
                reason: "expected ORIGIN-DEST form".to_string(),
            }
        })?;
        Self::new(origin, destination)
    }
}

impl TryFrom<String> for Route {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Route> for String {
    fn from(route: Route) -> Self {
        route.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::Route;

    #[test]
    fn parses_canonical_route_string() {
        let route: Route = "LHR-JFK".parse().expect("valid route");
        assert_eq!(route.origin(), "LHR");
        assert_eq!(route.destination(), "JFK");
        assert_eq!(route.to_string(), "LHR-JFK");
    }

    #[test]
    fn normalizes_case_and_whitespace() {
        let route = Route::new(" lhr ", "jfk").expect("valid route");
        assert_eq!(route.to_string(), "LHR-JFK");
    }

    #[test]
    fn rejects_malformed_codes() {
        assert!("LHRX-JFK".parse::<Route>().is_err());
        assert!("LH-JFK".parse::<Route>().is_err());
        assert!("LHRJFK".parse::<Route>().is_err());
        assert!("L1R-JFK".parse::<Route>().is_err());
    }

    #[test]
    fn rejects_identical_endpoints() {
        assert!("LHR-LHR".parse::<Route>().is_err());
    }

    #[test]
    fn serde_round_trips_as_string() {
        let route: Route = "CDG-NRT".parse().expect("valid route");
        let json = serde_json::to_string(&route).expect("serialize");
        assert_eq!(json, "\"CDG-NRT\"");
        let back: Route = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, route);
    }
}
