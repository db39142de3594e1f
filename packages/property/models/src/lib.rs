#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Property type taxonomy for the immo-map system.
//!
//! The DVF open data distinguishes several `type_local` values; the
//! ingestion pipeline only keeps residential sales, so the canonical
//! taxonomy is the two residential types. The string forms match the
//! `type_local` column verbatim (`"Maison"` / `"Appartement"`).

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Type of a residential property as recorded in the DVF `type_local`
/// column.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum PropertyType {
    /// Detached or semi-detached house.
    Maison,
    /// Apartment in a multi-unit building.
    Appartement,
}

impl PropertyType {
    /// All property types kept by the ingestion pipeline.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Maison, Self::Appartement]
    }
}
