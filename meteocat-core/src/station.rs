//! Station identity normalization.
//!
//! Upstream station metadata varies by API version: keys may be Catalan or
//! English, and coordinates may be flat or nested under `coordenades` /
//! `coordinates`. The candidate tables below encode the known variants in
//! priority order; codes take precedence over descriptive names.

use crate::{error::Error, extract};
use serde::Serialize;
use serde_json::Value;

const CODE_KEYS: &[&str] = &["codi", "codiEstacio", "codiXEMA", "code", "id"];
const NAME_KEYS: &[&str] = &["nom", "nomEstacio", "descripcio", "name"];
const MUNICIPALITY_KEYS: &[&str] = &["municipi", "municipio"];
const COUNTY_KEYS: &[&str] = &["comarca"];
const LATITUDE_KEYS: &[&str] = &[
    "latitud",
    "lat",
    "latitude",
    "coordenades.latitud",
    "coordinates.latitude",
];
const LONGITUDE_KEYS: &[&str] = &[
    "longitud",
    "lon",
    "lng",
    "longitude",
    "coordenades.longitud",
    "coordinates.longitude",
];
const ALTITUDE_KEYS: &[&str] = &["altitud", "alt", "quota", "elevation"];

/// Normalized representation of a Meteocat station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    pub code: String,
    pub name: Option<String>,
    pub municipality: Option<String>,
    pub county: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
}

/// Build a [`Station`] from an arbitrarily-shaped raw station record.
///
/// The only failure case is a record with no resolvable code; every other
/// field degrades to `None` (including geo fields whose value does not parse
/// as a number).
pub fn normalize_station(raw: &Value) -> Result<Station, Error> {
    let code = extract::required_match(raw, CODE_KEYS)?;
    let name = extract::first_match(raw, NAME_KEYS);
    let municipality = extract::nested_or_scalar(raw, MUNICIPALITY_KEYS, "nom");
    let county = extract::nested_or_scalar(raw, COUNTY_KEYS, "nom");
    let latitude = extract::parse_f64(extract::first_match(raw, LATITUDE_KEYS));
    let longitude = extract::parse_f64(extract::first_match(raw, LONGITUDE_KEYS));
    let altitude = extract::parse_f64(extract::first_match(raw, ALTITUDE_KEYS));

    Ok(Station {
        code,
        name,
        municipality,
        county,
        latitude,
        longitude,
        altitude,
    })
}
