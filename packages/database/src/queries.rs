//! Query functions for the DVF transactions table.
//!
//! The nearby-property search is a two-stage filter: a rectangular
//! pre-filter evaluated in SQL (`latitude BETWEEN .. AND longitude
//! BETWEEN ..`), then an exact great-circle pass over the candidates in
//! Rust. The pre-filter box is a strict over-approximation of the search
//! circle, so it can only add candidates, never lose matches.

use immo_map_database_models::{NearbyProperty, NearbyQuery, NearbyResult, NewPropertyRow, PropertyRow};
use immo_map_geo::{BoundingBox, haversine_distance};
use immo_map_property_models::PropertyType;
use moosicbox_json_utils::database::ToValue as _;
use switchy_database::{Database, DatabaseValue};

use crate::DbError;

/// Name of the wide transactions table.
pub const TRANSACTIONS_TABLE: &str = "valeurs_foncieres_idf_2024";

/// Searches for property sales within `query.radius_m` meters of
/// `query.center`, ascending by distance.
///
/// Rows with an unparseable `type_local` or unusable coordinates are
/// skipped with a warning rather than failing the whole search.
///
/// # Errors
///
/// Returns [`DbError`] if the underlying storage query fails. No matches
/// is `Ok` with an empty result, never an error.
pub async fn nearby_properties(
    db: &dyn Database,
    query: &NearbyQuery,
) -> Result<NearbyResult, DbError> {
    let bbox = BoundingBox::around(query.center, query.radius_m);

    let rows = db
        .query_raw_params(
            &format!(
                "SELECT latitude, longitude, prix_m2, type_local, date_mutation,
                        surface_reelle_bati, id_mutation, nombre_pieces_principales
                 FROM {TRANSACTIONS_TABLE}
                 WHERE latitude BETWEEN $1 AND $2
                   AND longitude BETWEEN $3 AND $4"
            ),
            &[
                DatabaseValue::Real64(bbox.south),
                DatabaseValue::Real64(bbox.north),
                DatabaseValue::Real64(bbox.west),
                DatabaseValue::Real64(bbox.east),
            ],
        )
        .await?;

    let mut candidates = Vec::with_capacity(rows.len());

    for row in &rows {
        let type_name: String = row.to_value("type_local").unwrap_or_default();
        let Ok(type_local) = type_name.parse::<PropertyType>() else {
            log::warn!("Skipping row with unexpected type_local: {type_name}");
            continue;
        };

        candidates.push(PropertyRow {
            latitude: row.to_value("latitude").unwrap_or(0.0),
            longitude: row.to_value("longitude").unwrap_or(0.0),
            prix_m2: row.to_value("prix_m2").unwrap_or(None),
            type_local,
            date_mutation: row.to_value("date_mutation").unwrap_or_default(),
            surface_reelle_bati: row.to_value("surface_reelle_bati").unwrap_or(None),
            id_mutation: row.to_value("id_mutation").unwrap_or_default(),
            nombre_pieces_principales: row
                .to_value("nombre_pieces_principales")
                .unwrap_or(None),
        });
    }

    Ok(rank_by_distance(candidates, query))
}

/// Exact-filter stage: keeps candidates within the radius, sorts them
/// ascending by distance (ties broken by mutation id for a stable
/// ordering), and applies the result cap.
#[must_use]
pub fn rank_by_distance(candidates: Vec<PropertyRow>, query: &NearbyQuery) -> NearbyResult {
    let mut matches: Vec<NearbyProperty> = candidates
        .into_iter()
        .filter_map(|row| {
            let distance_m = match haversine_distance(query.center, row.coordinate()) {
                Ok(d) => d,
                Err(e) => {
                    log::warn!("Skipping row {} with bad coordinates: {e}", row.id_mutation);
                    return None;
                }
            };
            (distance_m <= query.radius_m).then_some(NearbyProperty { row, distance_m })
        })
        .collect();

    matches.sort_by(|a, b| {
        a.distance_m
            .total_cmp(&b.distance_m)
            .then_with(|| a.row.id_mutation.cmp(&b.row.id_mutation))
    });

    let truncated = matches.len() > query.limit;
    matches.truncate(query.limit);

    NearbyResult {
        properties: matches,
        truncated,
    }
}

/// Inserts a batch of rows produced by the ingestion pipeline.
///
/// # Errors
///
/// Returns [`DbError`] if any insert fails.
pub async fn insert_properties(
    db: &dyn Database,
    rows: &[NewPropertyRow],
) -> Result<u64, DbError> {
    let mut inserted = 0u64;

    for row in rows {
        let result = db
            .exec_raw_params(
                &format!(
                    "INSERT INTO {TRANSACTIONS_TABLE} (
                        id_mutation, date_mutation, type_local, latitude, longitude,
                        prix_m2, surface_reelle_bati, nombre_pieces_principales,
                        code_postal, departement
                    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
                ),
                &[
                    DatabaseValue::String(row.id_mutation.clone()),
                    DatabaseValue::String(row.date_mutation.clone()),
                    DatabaseValue::String(row.type_local.to_string()),
                    DatabaseValue::Real64(row.latitude),
                    DatabaseValue::Real64(row.longitude),
                    row.prix_m2.map_or(DatabaseValue::Null, DatabaseValue::Real64),
                    row.surface_reelle_bati
                        .map_or(DatabaseValue::Null, DatabaseValue::Real64),
                    row.nombre_pieces_principales
                        .map_or(DatabaseValue::Null, DatabaseValue::Real64),
                    row.code_postal
                        .as_ref()
                        .map_or(DatabaseValue::Null, |c| DatabaseValue::String(c.clone())),
                    DatabaseValue::String(row.departement.clone()),
                ],
            )
            .await?;

        inserted += result;
    }

    Ok(inserted)
}

/// Deletes every row from the transactions table.
///
/// The ingestion pipeline replaces the table contents wholesale; partial
/// refreshes are not supported.
///
/// # Errors
///
/// Returns [`DbError`] if the delete fails.
pub async fn delete_all_properties(db: &dyn Database) -> Result<(), DbError> {
    db.exec_raw(&format!("DELETE FROM {TRANSACTIONS_TABLE}"))
        .await?;
    Ok(())
}

/// Counts the rows currently in the transactions table.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub async fn count_properties(db: &dyn Database) -> Result<i64, DbError> {
    let rows = db
        .query_raw_params(&format!("SELECT COUNT(*) as total FROM {TRANSACTIONS_TABLE}"), &[])
        .await?;

    let row = rows.first().ok_or_else(|| DbError::Conversion {
        message: "COUNT query returned no rows".to_string(),
    })?;

    let total: i64 = row.to_value("total").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse row count: {e}"),
    })?;

    Ok(total)
}

#[cfg(test)]
mod tests {
    use immo_map_geo::Coordinate;

    use super::*;

    fn row(id: &str, lat: f64, lng: f64, prix: Option<f64>) -> PropertyRow {
        PropertyRow {
            latitude: lat,
            longitude: lng,
            prix_m2: prix,
            type_local: PropertyType::Appartement,
            date_mutation: "2024-03-15".to_string(),
            surface_reelle_bati: Some(45.0),
            id_mutation: id.to_string(),
            nombre_pieces_principales: Some(2.0),
        }
    }

    const CENTER: Coordinate = Coordinate::new(48.8673, 2.3632);

    #[test]
    fn keeps_only_rows_within_radius() {
        // ~120m north of center vs ~1.5km away.
        let near = row("2024-1", 48.8684, 2.3632, Some(7000.0));
        let far = row("2024-2", 48.8532, 2.3692, Some(9000.0));

        let result = rank_by_distance(vec![far, near], &NearbyQuery::new(CENTER, 500.0));

        assert_eq!(result.properties.len(), 1);
        assert_eq!(result.properties[0].row.id_mutation, "2024-1");
        assert!((result.properties[0].distance_m - 122.0).abs() < 5.0);
        assert!(!result.truncated);
    }

    #[test]
    fn sorts_ascending_by_distance() {
        let a = row("2024-a", 48.8700, 2.3632, None);
        let b = row("2024-b", 48.8680, 2.3632, None);
        let c = row("2024-c", 48.8690, 2.3632, None);

        let result = rank_by_distance(vec![a, b, c], &NearbyQuery::new(CENTER, 1000.0));

        let ids: Vec<&str> = result
            .properties
            .iter()
            .map(|p| p.row.id_mutation.as_str())
            .collect();
        assert_eq!(ids, vec!["2024-b", "2024-c", "2024-a"]);

        for pair in result.properties.windows(2) {
            assert!(pair[0].distance_m <= pair[1].distance_m);
        }
    }

    #[test]
    fn identical_distances_order_by_mutation_id() {
        let a = row("2024-b", 48.8680, 2.3632, None);
        let b = row("2024-a", 48.8680, 2.3632, None);

        let result = rank_by_distance(vec![a, b], &NearbyQuery::new(CENTER, 1000.0));

        assert_eq!(result.properties[0].row.id_mutation, "2024-a");
        assert_eq!(result.properties[1].row.id_mutation, "2024-b");
    }

    #[test]
    fn truncates_at_limit_and_reports_it() {
        let rows: Vec<PropertyRow> = (0..5)
            .map(|i| {
                row(
                    &format!("2024-{i}"),
                    48.8674 + f64::from(i) * 0.0001,
                    2.3632,
                    None,
                )
            })
            .collect();

        let query = NearbyQuery {
            center: CENTER,
            radius_m: 1000.0,
            limit: 3,
        };
        let result = rank_by_distance(rows, &query);

        assert_eq!(result.properties.len(), 3);
        assert!(result.truncated);
    }

    #[test]
    fn republique_fixture_yields_one_record_and_matching_stats() {
        // One apartment ~120m from 1 Place de la République priced
        // 7000 €/m², searched with a 500m radius.
        let nearby = row("2024-7", 48.8684, 2.3632, Some(7000.0));
        let outside = row("2024-8", 48.9000, 2.3632, Some(5000.0));

        let result = rank_by_distance(vec![outside, nearby], &NearbyQuery::new(CENTER, 500.0));

        assert_eq!(result.properties.len(), 1);
        assert!((result.properties[0].distance_m - 120.0).abs() < 10.0);

        let summary = immo_map_stats::compute_lookup_summary(&result.properties);
        assert_eq!(summary.nb_biens, 1);
        assert_eq!(summary.prix_moyen, Some(7000.0));
    }

    #[test]
    fn empty_candidates_is_empty_result() {
        let result = rank_by_distance(Vec::new(), &NearbyQuery::new(CENTER, 500.0));
        assert!(result.properties.is_empty());
        assert!(!result.truncated);
    }

    #[test]
    fn prefilter_box_never_rejects_an_exact_match() {
        // Every synthetic row within the radius must also fall inside the
        // SQL pre-filter box the search would have used.
        let radius = 800.0;
        let bbox = BoundingBox::around(CENTER, radius);

        for i in 0..200 {
            let lat = CENTER.latitude + (f64::from(i - 100) / 100.0) * 0.01;
            let lng = CENTER.longitude + (f64::from((i * 7) % 200 - 100) / 100.0) * 0.015;
            let point = Coordinate::new(lat, lng);
            let d = haversine_distance(CENTER, point).unwrap();
            if d <= radius {
                assert!(
                    bbox.contains(point),
                    "row at {d:.0}m rejected by the pre-filter box"
                );
            }
        }
    }
}
