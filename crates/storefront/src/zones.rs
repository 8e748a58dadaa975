//! Delivery zone directory.
//!
//! Maps the postal codes the store delivers to onto their cities and offers
//! ranked suggestions while a customer types a postal code.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Maximum number of suggestions returned by [`ZoneDirectory::suggestions_for`].
pub const MAX_SUGGESTIONS: usize = 5;

/// Minimum stripped input length before suggestions are offered.
pub const MIN_QUERY_LEN: usize = 2;

const POSTAL_CODE_LEN: usize = 5;

/// A postal code the store delivers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryZone {
    /// Five-digit postal code.
    pub postal_code: String,
    /// City served under that code.
    pub city: String,
}

impl DeliveryZone {
    /// Create a zone. The postal code is normalized.
    #[must_use]
    pub fn new(postal_code: &str, city: impl Into<String>) -> Self {
        Self {
            postal_code: normalize(postal_code),
            city: city.into(),
        }
    }
}

const DEFAULT_ZONES: &[(&str, &str)] = &[
    ("94300", "Vincennes"),
    ("94160", "Saint-Mandé"),
    ("94220", "Charenton-le-Pont"),
    ("94130", "Nogent-sur-Marne"),
    ("94120", "Fontenay-sous-Bois"),
    ("94340", "Joinville-le-Pont"),
    ("94410", "Saint-Maurice"),
    ("94700", "Maisons-Alfort"),
    ("94100", "Saint-Maur-des-Fossés"),
    ("94170", "Le Perreux-sur-Marne"),
    ("94200", "Ivry-sur-Seine"),
    ("94270", "Le Kremlin-Bicêtre"),
    ("93100", "Montreuil"),
    ("93170", "Bagnolet"),
    ("93260", "Les Lilas"),
    ("75011", "Paris"),
    ("75012", "Paris"),
    ("75020", "Paris"),
];

/// Strip all whitespace and left-pad with `0` to five characters.
///
/// Idempotent: `normalize(&normalize(x)) == normalize(x)`.
#[must_use]
pub fn normalize(code: &str) -> String {
    let stripped = strip_whitespace(code);
    format!("{stripped:0>POSTAL_CODE_LEN$}")
}

fn strip_whitespace(input: &str) -> String {
    input.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Immutable, cheaply cloneable table of delivery zones.
#[derive(Debug, Clone)]
pub struct ZoneDirectory {
    zones: Arc<[DeliveryZone]>,
}

impl Default for ZoneDirectory {
    /// The eastern Paris and Val-de-Marne deployment.
    fn default() -> Self {
        Self::new(
            DEFAULT_ZONES
                .iter()
                .map(|(code, city)| DeliveryZone::new(code, *city))
                .collect(),
        )
    }
}

impl ZoneDirectory {
    /// Build a directory from a list of zones, keeping their order.
    #[must_use]
    pub fn new(zones: Vec<DeliveryZone>) -> Self {
        Self {
            zones: zones.into(),
        }
    }

    /// All zones in directory order.
    #[must_use]
    pub fn zones(&self) -> &[DeliveryZone] {
        &self.zones
    }

    /// Whether the store delivers to `code`.
    #[must_use]
    pub fn is_zone_available(&self, code: &str) -> bool {
        self.zone_for_code(code).is_some()
    }

    /// The zone matching `code` exactly, after normalization.
    #[must_use]
    pub fn zone_for_code(&self, code: &str) -> Option<&DeliveryZone> {
        let code = normalize(code);
        self.zones.iter().find(|zone| zone.postal_code == code)
    }

    /// Ranked suggestions for a partially typed postal code or city name.
    ///
    /// Postal codes starting with the input come first, then cities
    /// containing it (case-insensitive). Within each group, directory order
    /// is kept. At most [`MAX_SUGGESTIONS`] entries, none for inputs shorter
    /// than [`MIN_QUERY_LEN`].
    #[must_use]
    pub fn suggestions_for(&self, partial: &str) -> Vec<&DeliveryZone> {
        let query = strip_whitespace(partial);
        if query.chars().count() < MIN_QUERY_LEN {
            return Vec::new();
        }
        let needle = query.to_lowercase();

        let by_code = self
            .zones
            .iter()
            .filter(|zone| zone.postal_code.starts_with(&query));
        let by_city = self.zones.iter().filter(|zone| {
            !zone.postal_code.starts_with(&query)
                && strip_whitespace(&zone.city).to_lowercase().contains(&needle)
        });

        by_code.chain(by_city).take(MAX_SUGGESTIONS).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(" 94300 "), "94300");
        assert_eq!(normalize("94 300"), "94300");
        assert_eq!(normalize("123"), "00123");
        assert_eq!(normalize(""), "00000");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for input in ["94300", " 7501 1", "1", "", "abc", "123456"] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_default_directory() {
        let zones = ZoneDirectory::default();
        assert_eq!(zones.zones().len(), 18);
        assert!(zones.is_zone_available("94300"));
        assert!(zones.is_zone_available(" 94300 "));
        assert!(!zones.is_zone_available("123"));
        assert!(!zones.is_zone_available("00000"));
        assert_eq!(zones.zone_for_code("94160").unwrap().city, "Saint-Mandé");
    }

    #[test]
    fn test_suggestions_require_two_characters() {
        let zones = ZoneDirectory::default();
        assert!(zones.suggestions_for("9").is_empty());
        assert!(zones.suggestions_for(" 9 ").is_empty());
        assert!(zones.suggestions_for("").is_empty());
    }

    #[test]
    fn test_suggestions_by_code_prefix_are_capped() {
        let zones = ZoneDirectory::default();
        let suggestions = zones.suggestions_for("94");
        assert_eq!(suggestions.len(), MAX_SUGGESTIONS);
        assert_eq!(suggestions[0].postal_code, "94300");
        assert!(suggestions.iter().all(|z| z.postal_code.starts_with("94")));
    }

    #[test]
    fn test_suggestions_by_city() {
        let zones = ZoneDirectory::default();
        let suggestions = zones.suggestions_for("mont");
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].city, "Montreuil");

        let paris = zones.suggestions_for("PARIS");
        assert_eq!(paris.len(), 3);
    }

    #[test]
    fn test_code_matches_rank_before_city_matches() {
        let zones = ZoneDirectory::new(vec![
            DeliveryZone::new("10000", "Le 75 Bistro"),
            DeliveryZone::new("75011", "Paris"),
        ]);
        let suggestions = zones.suggestions_for("75");
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].postal_code, "75011");
        assert_eq!(suggestions[1].postal_code, "10000");
    }
}
