#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! DVF open-data ingestion pipeline.
//!
//! Downloads the per-department geo-DVF CSV extracts for Île-de-France,
//! keeps residential sales with complete rows, derives the price per m²
//! for each mutation, and replaces the contents of the transactions
//! table. The derived price divides the mutation's sale value by the
//! total built area across its rows, so multi-unit mutations share one
//! price per m².

use std::collections::BTreeMap;
use std::io::Read as _;

use chrono::NaiveDate;
use immo_map_database::{DbError, queries};
use immo_map_database_models::NewPropertyRow;
use immo_map_property_models::PropertyType;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use switchy_database::Database;
use thiserror::Error;

/// The eight Île-de-France departments.
pub const IDF_DEPARTMENTS: &[&str] = &["75", "92", "93", "94", "95", "78", "91", "77"];

/// Vintage of the DVF extract.
pub const DVF_YEAR: u16 = 2024;

/// Base URL of the per-department geo-DVF CSV extracts.
pub const DVF_BASE_URL: &str = "https://files.data.gouv.fr/geo-dvf/latest/csv";

/// Mutations priced outside this band are considered data noise
/// (parking-lot rounding errors, symbolic transfers) and dropped.
pub const PRIX_M2_MIN: f64 = 1000.0;
/// Upper bound of the accepted price band.
pub const PRIX_M2_MAX: f64 = 25_000.0;

/// Rows inserted per progress tick.
const INSERT_CHUNK: usize = 500;

/// Errors from the ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    /// HTTP download failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gzip decompression failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Db(#[from] DbError),
}

/// One residential sale row with every required column present.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleRecord {
    /// DVF mutation identifier.
    pub id_mutation: String,
    /// Mutation date (`YYYY-MM-DD`).
    pub date_mutation: String,
    /// Residential property type.
    pub type_local: PropertyType,
    /// Sale value of the whole mutation in euros.
    pub valeur_fonciere: f64,
    /// Built area of this row in square meters.
    pub surface_reelle_bati: f64,
    /// Number of main rooms.
    pub nombre_pieces_principales: f64,
    /// Postal code.
    pub code_postal: Option<String>,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Department code.
    pub departement: String,
}

/// Raw CSV row; only the columns the pipeline reads.
#[derive(Debug, Deserialize)]
struct DvfCsvRow {
    id_mutation: String,
    date_mutation: String,
    nature_mutation: String,
    valeur_fonciere: Option<f64>,
    type_local: String,
    surface_reelle_bati: Option<f64>,
    nombre_pieces_principales: Option<f64>,
    code_postal: Option<String>,
    longitude: Option<f64>,
    latitude: Option<f64>,
}

/// Options for a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Departments to ingest; all of Île-de-France when empty.
    pub departments: Vec<String>,
    /// Cap on kept rows per department (for testing).
    pub limit: Option<u64>,
}

/// Downloads and parses one department's CSV extract.
///
/// # Errors
///
/// Returns [`IngestError`] if the download, decompression, or CSV parsing
/// fails.
pub async fn fetch_department(
    client: &reqwest::Client,
    departement: &str,
    limit: Option<u64>,
) -> Result<Vec<SaleRecord>, IngestError> {
    let url = format!("{DVF_BASE_URL}/{DVF_YEAR}/departements/{departement}.csv.gz");
    log::info!("Downloading {url}");

    let response = client.get(&url).send().await?.error_for_status()?;
    let bytes = response.bytes().await?;
    log::debug!("Downloaded {} bytes for department {departement}", bytes.len());

    let mut decoder = flate2::read::GzDecoder::new(&bytes[..]);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;

    parse_department_csv(&decompressed, departement, limit)
}

/// Parses a decompressed department CSV, keeping residential sales with
/// complete rows.
///
/// # Errors
///
/// Returns [`IngestError::Csv`] if the CSV is structurally invalid.
pub fn parse_department_csv(
    csv_bytes: &[u8],
    departement: &str,
    limit: Option<u64>,
) -> Result<Vec<SaleRecord>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(csv_bytes);

    let mut records = Vec::new();

    for result in reader.deserialize::<DvfCsvRow>() {
        let row = result?;

        if row.nature_mutation != "Vente" {
            continue;
        }
        let Ok(type_local) = row.type_local.parse::<PropertyType>() else {
            continue;
        };
        // A row missing any selected column is discarded wholesale.
        let (Some(valeur_fonciere), Some(surface), Some(pieces), Some(latitude), Some(longitude)) = (
            row.valeur_fonciere,
            row.surface_reelle_bati,
            row.nombre_pieces_principales,
            row.latitude,
            row.longitude,
        ) else {
            continue;
        };
        if surface <= 0.0 {
            continue;
        }
        if NaiveDate::parse_from_str(&row.date_mutation, "%Y-%m-%d").is_err() {
            log::warn!(
                "Skipping mutation {} with malformed date {:?}",
                row.id_mutation,
                row.date_mutation
            );
            continue;
        }

        records.push(SaleRecord {
            id_mutation: row.id_mutation,
            date_mutation: row.date_mutation,
            type_local,
            valeur_fonciere,
            surface_reelle_bati: surface,
            nombre_pieces_principales: pieces,
            code_postal: row.code_postal,
            latitude,
            longitude,
            departement: departement.to_string(),
        });

        if let Some(max) = limit
            && records.len() as u64 >= max
        {
            log::info!("Reached limit ({max}) for department {departement}");
            break;
        }
    }

    log::info!(
        "Kept {} residential sale rows for department {departement}",
        records.len()
    );

    Ok(records)
}

/// Derives the price per m² for each mutation and keeps rows within the
/// accepted price band.
///
/// The mutation price is `max(valeur_fonciere) / sum(surface_reelle_bati)`
/// over the mutation's rows; every row of the mutation carries the same
/// derived price.
#[must_use]
pub fn derive_prices(records: Vec<SaleRecord>) -> Vec<NewPropertyRow> {
    let mut per_mutation: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    for record in &records {
        let entry = per_mutation
            .entry(record.id_mutation.as_str())
            .or_insert((0.0, 0.0));
        entry.0 = entry.0.max(record.valeur_fonciere);
        entry.1 += record.surface_reelle_bati;
    }

    let prices: BTreeMap<String, f64> = per_mutation
        .into_iter()
        .filter(|(_, (_, surface))| *surface > 0.0)
        .map(|(id, (valeur, surface))| (id.to_string(), valeur / surface))
        .collect();

    records
        .into_iter()
        .filter_map(|record| {
            let prix_m2 = *prices.get(&record.id_mutation)?;
            if !(PRIX_M2_MIN..=PRIX_M2_MAX).contains(&prix_m2) {
                return None;
            }
            Some(NewPropertyRow {
                id_mutation: record.id_mutation,
                date_mutation: record.date_mutation,
                type_local: record.type_local,
                latitude: record.latitude,
                longitude: record.longitude,
                prix_m2: Some(prix_m2),
                surface_reelle_bati: Some(record.surface_reelle_bati),
                nombre_pieces_principales: Some(record.nombre_pieces_principales),
                code_postal: record.code_postal,
                departement: record.departement,
            })
        })
        .collect()
}

/// Runs the full pipeline: download every requested department, derive
/// prices, and replace the transactions table contents.
///
/// # Errors
///
/// Returns [`IngestError`] if any download or database operation fails.
pub async fn run_ingestion(
    db: &dyn Database,
    options: &IngestOptions,
) -> Result<u64, IngestError> {
    let departments: Vec<String> = if options.departments.is_empty() {
        IDF_DEPARTMENTS.iter().map(ToString::to_string).collect()
    } else {
        options.departments.clone()
    };

    let client = reqwest::Client::new();
    let mut all_records = Vec::new();

    for departement in &departments {
        let records = fetch_department(&client, departement, options.limit).await?;
        all_records.extend(records);
    }

    let rows = derive_prices(all_records);
    log::info!("{} rows within the accepted price band", rows.len());

    queries::delete_all_properties(db).await?;

    let bar = ProgressBar::new(rows.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("  {msg} {wide_bar} {pos}/{len} [{eta}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message("Inserting rows");

    let mut inserted = 0u64;
    for chunk in rows.chunks(INSERT_CHUNK) {
        inserted += queries::insert_properties(db, chunk).await?;
        bar.inc(chunk.len() as u64);
    }
    bar.finish_with_message("Insert complete");

    let total = queries::count_properties(db).await?;
    log::info!("Ingestion complete: {inserted} rows inserted, {total} rows in table");

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV_HEADER: &str = "id_mutation,date_mutation,nature_mutation,valeur_fonciere,type_local,surface_reelle_bati,nombre_pieces_principales,code_postal,longitude,latitude\n";

    fn sale(id: &str, type_local: PropertyType, valeur: f64, surface: f64) -> SaleRecord {
        SaleRecord {
            id_mutation: id.to_string(),
            date_mutation: "2024-02-10".to_string(),
            type_local,
            valeur_fonciere: valeur,
            surface_reelle_bati: surface,
            nombre_pieces_principales: 3.0,
            code_postal: Some("75003".to_string()),
            latitude: 48.8673,
            longitude: 2.3632,
            departement: "75".to_string(),
        }
    }

    #[test]
    fn parses_and_filters_residential_sales() {
        let csv = format!(
            "{CSV_HEADER}\
             2024-1,2024-02-10,Vente,500000,Appartement,50,2,75003,2.3632,48.8673\n\
             2024-2,2024-02-11,Vente,800000,Local industriel,200,0,75011,2.38,48.86\n\
             2024-3,2024-02-12,Donation,300000,Maison,80,4,77100,2.9,48.95\n\
             2024-4,2024-02-13,Vente,,Maison,80,4,77100,2.9,48.95\n"
        );

        let records = parse_department_csv(csv.as_bytes(), "75", None).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id_mutation, "2024-1");
        assert_eq!(records[0].type_local, PropertyType::Appartement);
        assert_eq!(records[0].departement, "75");
    }

    #[test]
    fn skips_rows_with_malformed_dates() {
        let csv = format!(
            "{CSV_HEADER}\
             2024-1,10/02/2024,Vente,500000,Appartement,50,2,75003,2.3632,48.8673\n"
        );

        let records = parse_department_csv(csv.as_bytes(), "75", None).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn respects_row_limit() {
        let csv = format!(
            "{CSV_HEADER}\
             2024-1,2024-02-10,Vente,500000,Appartement,50,2,75003,2.3632,48.8673\n\
             2024-2,2024-02-11,Vente,600000,Appartement,60,3,75004,2.36,48.85\n"
        );

        let records = parse_department_csv(csv.as_bytes(), "75", Some(1)).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn multi_unit_mutation_shares_one_price() {
        // Two rows of the same mutation: price is max(valeur) / sum(surface).
        let records = vec![
            sale("2024-9", PropertyType::Appartement, 900_000.0, 60.0),
            sale("2024-9", PropertyType::Appartement, 900_000.0, 30.0),
        ];

        let rows = derive_prices(records);

        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.prix_m2, Some(10_000.0));
        }
    }

    #[test]
    fn drops_mutations_outside_price_band() {
        let records = vec![
            // 500 €/m²: below the band.
            sale("2024-1", PropertyType::Maison, 50_000.0, 100.0),
            // 30000 €/m²: above the band.
            sale("2024-2", PropertyType::Appartement, 1_500_000.0, 50.0),
            // 5000 €/m²: kept.
            sale("2024-3", PropertyType::Appartement, 250_000.0, 50.0),
        ];

        let rows = derive_prices(records);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id_mutation, "2024-3");
        assert_eq!(rows[0].prix_m2, Some(5000.0));
    }
}
