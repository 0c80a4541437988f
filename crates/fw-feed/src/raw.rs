//! Lenient serde model of the feed payload.
//!
//! ```text
//! { "countries": [ {
//!   "booked_bikes": 310, "set_point_bikes": 4200, "available_bikes": 3890,
//!   "cities": [ { "uid": 362, "places": [ {
//!     "uid": 1234, "lat": 52.5, "lng": 13.4, "name": "Alexanderplatz",
//!     "spot": true, "bike": false, "terminal_type": "stele",
//!     "booked_bikes": 0, "bikes": 2, "bikes_available_to_rent": 2,
//!     "bike_racks": 10, "free_racks": 8, "special_racks": 0,
//!     "bike_numbers": ["184203", "184207"],
//!     "bike_list": [ { "number": "184203", "active": true }, … ]
//! } ] } ] } ] }
//! ```
//!
//! Every field is optional.  Mistyped scalars decode to their default, and
//! a malformed element of a list is skipped rather than failing the list.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawFeed {
    #[serde(deserialize_with = "lenient_vec")]
    pub countries: Vec<RawCountry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawCountry {
    #[serde(deserialize_with = "lenient_u64")]
    pub booked_bikes: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub set_point_bikes: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub available_bikes: u64,
    #[serde(deserialize_with = "lenient_vec")]
    pub cities: Vec<RawCity>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawCity {
    #[serde(deserialize_with = "lenient_u64")]
    pub uid: u64,
    #[serde(deserialize_with = "lenient_vec")]
    pub places: Vec<RawPlace>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawPlace {
    #[serde(deserialize_with = "lenient_u64")]
    pub uid: u64,
    #[serde(deserialize_with = "lenient_f64")]
    pub lat: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub lng: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub spot: Option<bool>,
    #[serde(deserialize_with = "lenient_bool")]
    pub bike: Option<bool>,
    #[serde(deserialize_with = "lenient_string")]
    pub terminal_type: Option<String>,
    #[serde(deserialize_with = "lenient_u64")]
    pub booked_bikes: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub bikes: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub bikes_available_to_rent: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub bike_racks: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub free_racks: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub special_racks: u64,
    #[serde(deserialize_with = "lenient_string_list")]
    pub bike_numbers: Vec<String>,
    #[serde(deserialize_with = "lenient_vec")]
    pub bike_list: Vec<RawBike>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawBike {
    #[serde(deserialize_with = "lenient_string")]
    pub number: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub active: Option<bool>,
}

// ── Lenient field decoders ────────────────────────────────────────────────────

fn lenient_vec<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(d)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

fn lenient_u64<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Bool(b) => Some(b),
        Value::Number(n) => n.as_u64().map(|v| v != 0),
        Value::String(s) => match s.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

fn scalar_string(v: Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(scalar_string(Value::deserialize(d)?))
}

fn lenient_string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let Value::Array(items) = Value::deserialize(d)? else {
        return Ok(Vec::new());
    };
    Ok(items.into_iter().filter_map(scalar_string).collect())
}
