//! Row assembly: composite address and coordinates for each extracted post

use dra_core::{EntityRecord, EntityType, GeocodeOutcome, Geocoder, ResultTable, Row};
use tracing::{debug, warn};

/// An extracted post waiting for enrichment
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPost {
    pub text: String,
    pub entities: EntityRecord,
}

impl ExtractedPost {
    pub fn new(text: impl Into<String>, entities: EntityRecord) -> Self {
        Self {
            text: text.into(),
            entities,
        }
    }
}

/// `"{STREET}, {NEIGHBORHOOD}, {CITY}"`, empty components included
pub fn derive_address(record: &EntityRecord) -> String {
    format!(
        "{}, {}, {}",
        record.get(EntityType::Street),
        record.get(EntityType::Neighborhood),
        record.get(EntityType::City)
    )
}

/// True when every address component is empty
fn is_blank(address: &str) -> bool {
    address.chars().all(|c| c == ',' || c.is_whitespace())
}

/// Resolve one address; never fails.
///
/// An address with no components (`", , "`) is not sent to the geocoder
/// and resolves to [`GeocodeOutcome::NotFound`], the same outcome a lookup
/// of the bare separators would give.
pub async fn resolve(geocoder: &dyn Geocoder, address: &str) -> GeocodeOutcome {
    if is_blank(address) {
        return GeocodeOutcome::NotFound;
    }

    match geocoder.geocode(address).await {
        Ok(Some(coordinates)) => GeocodeOutcome::Resolved(coordinates),
        Ok(None) => {
            debug!(address, "address not found");
            GeocodeOutcome::NotFound
        }
        Err(e) => {
            warn!(geocoder = geocoder.name(), error = %e, "geocoding failed");
            GeocodeOutcome::Failed(e.to_string())
        }
    }
}

/// Build one row per post, in input order
pub async fn enrich_and_render(posts: Vec<ExtractedPost>, geocoder: &dyn Geocoder) -> ResultTable {
    let mut table = ResultTable::new();

    for post in posts {
        let address = derive_address(&post.entities);
        let geocode = resolve(geocoder, &address).await;
        table.push(Row {
            text: post.text,
            entities: post.entities,
            address,
            geocode,
        });
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dra_core::{Coordinates, DraError, Result};
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingGeocoder;

    #[async_trait]
    impl Geocoder for FailingGeocoder {
        async fn geocode(&self, _address: &str) -> Result<Option<Coordinates>> {
            Err(DraError::Transport("connection refused".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    /// Resolves every address to the same point and counts calls
    #[derive(Default)]
    struct FixedGeocoder {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn geocode(&self, _address: &str) -> Result<Option<Coordinates>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(Coordinates::new(39.78, -89.65)))
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn record(street: &str, neighborhood: &str, city: &str) -> EntityRecord {
        EntityRecord::new()
            .with(EntityType::Street, street)
            .with(EntityType::Neighborhood, neighborhood)
            .with(EntityType::City, city)
    }

    #[test]
    fn test_derive_address() {
        assert_eq!(derive_address(&record("A", "B", "C")), "A, B, C");
        assert_eq!(derive_address(&record("", "B", "")), ", B, ");
        assert_eq!(derive_address(&EntityRecord::new()), ", , ");
    }

    #[tokio::test]
    async fn test_failing_geocoder_leaves_coordinates_absent() {
        let posts = vec![
            ExtractedPost::new("fire", record("1 Elm St", "", "Springfield")),
            ExtractedPost::new("flood", record("", "Anna Nagar", "")),
        ];

        let table = enrich_and_render(posts, &FailingGeocoder).await;

        assert_eq!(table.len(), 2);
        for row in &table.rows {
            assert!(row.coordinates().is_none());
            assert!(matches!(row.geocode, GeocodeOutcome::Failed(_)));
        }
        assert_eq!(table.rows[1].address, ", Anna Nagar, ");
    }

    #[tokio::test]
    async fn test_rows_keep_input_order() {
        let geocoder = FixedGeocoder::default();
        let posts = vec![
            ExtractedPost::new("second", record("9 Oak Rd", "", "")),
            ExtractedPost::new("first", record("1 Elm St", "", "")),
        ];

        let table = enrich_and_render(posts, &geocoder).await;

        let texts: Vec<&str> = table.rows.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["second", "first"]);
        assert_eq!(table.rows[0].coordinates(), Some(Coordinates::new(39.78, -89.65)));
    }

    #[tokio::test]
    async fn test_blank_address_skips_lookup() {
        let geocoder = FixedGeocoder::default();

        let outcome = resolve(&geocoder, ", , ").await;

        assert_eq!(outcome, GeocodeOutcome::NotFound);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
    }

    proptest! {
        #[test]
        fn prop_address_has_three_components(
            street in "[A-Za-z0-9 ]{0,12}",
            neighborhood in "[A-Za-z ]{0,12}",
            city in "[A-Za-z ]{0,12}",
        ) {
            let address = derive_address(&record(&street, &neighborhood, &city));
            prop_assert_eq!(address, format!("{street}, {neighborhood}, {city}"));
        }
    }
}
