#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Aggregate statistics over nearby-property result sets.
//!
//! Pure functions: the output depends only on the input multiset of
//! records, never on their order. A statistic computed over zero
//! contributing records (e.g. the mean price of a type whose rows all
//! lack a price) is reported as `None`, never as a fabricated zero.

use std::collections::BTreeMap;

use immo_map_database_models::NearbyProperty;
use immo_map_property_models::PropertyType;
use serde::{Deserialize, Serialize};

/// Derived statistics for a single property type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeStats {
    /// Number of records of this type, priced or not.
    pub nb_biens: u64,
    /// Mean price per m² over priced records, rounded to 3 decimals.
    pub prix_m2_moyen: Option<f64>,
    /// Minimum price per m² over priced records.
    pub prix_m2_min: Option<f64>,
    /// Maximum price per m² over priced records.
    pub prix_m2_max: Option<f64>,
    /// Mean built area over area-bearing records.
    pub surface_moyenne: Option<f64>,
    /// Mean room count over room-bearing records.
    pub nombre_pieces_moyen: Option<f64>,
}

/// Per-type statistics for a result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketStats {
    /// Statistics keyed by property type. Types with no records are
    /// absent from the map.
    pub par_type: BTreeMap<PropertyType, TypeStats>,
}

impl MarketStats {
    /// Total number of records across all types.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.par_type.values().map(|s| s.nb_biens).sum()
    }
}

/// Flat summary used by the lookup endpoint's `stats` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupSummary {
    /// Total number of records.
    pub nb_biens: u64,
    /// Mean price per m² over priced records, rounded to 2 decimals.
    pub prix_moyen: Option<f64>,
    /// Mean built area over area-bearing records, rounded to 2 decimals.
    pub surface_moyenne: Option<f64>,
    /// Distance of the farthest record in meters.
    pub distance_max: Option<f64>,
}

/// Computes per-type statistics over a result set.
#[must_use]
pub fn compute_market_stats(properties: &[NearbyProperty]) -> MarketStats {
    let mut groups: BTreeMap<PropertyType, Vec<&NearbyProperty>> = BTreeMap::new();
    for property in properties {
        groups.entry(property.row.type_local).or_default().push(property);
    }

    let par_type = groups
        .into_iter()
        .map(|(type_local, records)| {
            let prices: Vec<f64> = records.iter().filter_map(|p| p.row.prix_m2).collect();
            let surfaces: Vec<f64> = records
                .iter()
                .filter_map(|p| p.row.surface_reelle_bati)
                .collect();
            let rooms: Vec<f64> = records
                .iter()
                .filter_map(|p| p.row.nombre_pieces_principales)
                .collect();

            let stats = TypeStats {
                nb_biens: records.len() as u64,
                prix_m2_moyen: mean(&prices).map(|m| round_to(m, 3)),
                prix_m2_min: prices.iter().copied().reduce(f64::min),
                prix_m2_max: prices.iter().copied().reduce(f64::max),
                surface_moyenne: mean(&surfaces).map(|m| round_to(m, 2)),
                nombre_pieces_moyen: mean(&rooms),
            };

            (type_local, stats)
        })
        .collect();

    MarketStats { par_type }
}

/// Computes the flat summary for the lookup endpoint.
#[must_use]
pub fn compute_lookup_summary(properties: &[NearbyProperty]) -> LookupSummary {
    let prices: Vec<f64> = properties.iter().filter_map(|p| p.row.prix_m2).collect();
    let surfaces: Vec<f64> = properties
        .iter()
        .filter_map(|p| p.row.surface_reelle_bati)
        .collect();

    LookupSummary {
        nb_biens: properties.len() as u64,
        prix_moyen: mean(&prices).map(|m| round_to(m, 2)),
        surface_moyenne: mean(&surfaces).map(|m| round_to(m, 2)),
        distance_max: properties
            .iter()
            .map(|p| p.distance_m)
            .reduce(f64::max),
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    #[allow(clippy::cast_precision_loss)]
    let count = values.len() as f64;
    Some(values.iter().sum::<f64>() / count)
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use immo_map_database_models::PropertyRow;

    use super::*;

    fn property(
        type_local: PropertyType,
        prix: Option<f64>,
        surface: Option<f64>,
        pieces: Option<f64>,
        distance_m: f64,
    ) -> NearbyProperty {
        NearbyProperty {
            row: PropertyRow {
                latitude: 48.86,
                longitude: 2.36,
                prix_m2: prix,
                type_local,
                date_mutation: "2024-05-02".to_string(),
                surface_reelle_bati: surface,
                id_mutation: "2024-1".to_string(),
                nombre_pieces_principales: pieces,
            },
            distance_m,
        }
    }

    #[test]
    fn empty_input_yields_no_types_and_zero_total() {
        let stats = compute_market_stats(&[]);
        assert!(stats.par_type.is_empty());
        assert_eq!(stats.total_count(), 0);

        let summary = compute_lookup_summary(&[]);
        assert_eq!(summary.nb_biens, 0);
        assert_eq!(summary.prix_moyen, None);
        assert_eq!(summary.surface_moyenne, None);
        assert_eq!(summary.distance_max, None);
    }

    #[test]
    fn known_fixture_means_min_max() {
        let properties = vec![
            property(PropertyType::Appartement, Some(4000.0), Some(40.0), Some(2.0), 100.0),
            property(PropertyType::Appartement, Some(5000.0), Some(50.0), Some(3.0), 200.0),
            property(PropertyType::Appartement, Some(6000.0), Some(60.0), Some(4.0), 300.0),
        ];

        let stats = compute_market_stats(&properties);
        let apartments = &stats.par_type[&PropertyType::Appartement];

        assert_eq!(apartments.nb_biens, 3);
        assert_eq!(apartments.prix_m2_moyen, Some(5000.0));
        assert_eq!(apartments.prix_m2_min, Some(4000.0));
        assert_eq!(apartments.prix_m2_max, Some(6000.0));
        assert_eq!(apartments.surface_moyenne, Some(50.0));
        assert_eq!(apartments.nombre_pieces_moyen, Some(3.0));
    }

    #[test]
    fn unpriced_records_counted_but_excluded_from_price_stats() {
        let properties = vec![
            property(PropertyType::Maison, Some(3000.0), None, None, 50.0),
            property(PropertyType::Maison, None, None, None, 60.0),
        ];

        let stats = compute_market_stats(&properties);
        let houses = &stats.par_type[&PropertyType::Maison];

        assert_eq!(houses.nb_biens, 2);
        assert_eq!(houses.prix_m2_moyen, Some(3000.0));
        assert_eq!(houses.surface_moyenne, None);
        assert_eq!(houses.nombre_pieces_moyen, None);
    }

    #[test]
    fn all_unpriced_type_reports_absent_not_zero() {
        let properties = vec![property(PropertyType::Maison, None, None, None, 10.0)];

        let stats = compute_market_stats(&properties);
        let houses = &stats.par_type[&PropertyType::Maison];

        assert_eq!(houses.nb_biens, 1);
        assert_eq!(houses.prix_m2_moyen, None);
        assert_eq!(houses.prix_m2_min, None);
        assert_eq!(houses.prix_m2_max, None);
    }

    #[test]
    fn output_is_order_independent() {
        let a = property(PropertyType::Appartement, Some(4000.0), Some(40.0), Some(2.0), 100.0);
        let b = property(PropertyType::Maison, Some(8000.0), Some(90.0), Some(5.0), 400.0);
        let c = property(PropertyType::Appartement, Some(6000.0), Some(55.0), Some(3.0), 250.0);

        let forward = compute_market_stats(&[a.clone(), b.clone(), c.clone()]);
        let backward = compute_market_stats(&[c, b, a]);

        assert_eq!(forward, backward);
    }

    #[test]
    fn summary_tracks_max_distance_over_all_records() {
        let properties = vec![
            property(PropertyType::Appartement, Some(7000.0), Some(45.0), Some(2.0), 120.0),
            property(PropertyType::Maison, None, Some(80.0), Some(4.0), 480.0),
        ];

        let summary = compute_lookup_summary(&properties);
        assert_eq!(summary.nb_biens, 2);
        assert_eq!(summary.prix_moyen, Some(7000.0));
        assert_eq!(summary.distance_max, Some(480.0));
    }
}
