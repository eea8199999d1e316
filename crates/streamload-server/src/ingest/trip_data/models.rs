//! Trip record model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of comma-separated columns in a trip line
pub const TRIP_DATA_FIELD_COUNT: usize = 24;

/// One for-hire-vehicle trip.
///
/// Every field is optional except the five flags, which default to `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripDataRow {
    pub hvfhs_license_num: Option<String>,
    pub dispatching_base_num: Option<String>,
    pub originating_base_num: Option<String>,
    pub request_datetime: Option<DateTime<Utc>>,
    pub on_scene_datetime: Option<DateTime<Utc>>,
    pub pickup_datetime: Option<DateTime<Utc>>,
    pub dropoff_datetime: Option<DateTime<Utc>>,
    #[serde(rename = "PULocationID")]
    pub pu_location_id: Option<i64>,
    #[serde(rename = "DOLocationID")]
    pub do_location_id: Option<i64>,
    pub trip_miles: Option<f64>,
    /// Seconds
    pub trip_time: Option<i64>,
    pub base_passenger_fare: Option<f64>,
    pub tolls: Option<f64>,
    pub bcf: Option<f64>,
    pub sales_tax: Option<f64>,
    pub congestion_surcharge: Option<f64>,
    pub airport_fee: Option<f64>,
    pub tips: Option<f64>,
    pub driver_pay: Option<f64>,
    pub shared_request_flag: bool,
    pub shared_match_flag: bool,
    pub access_a_ride_flag: bool,
    pub wav_request_flag: bool,
    pub wav_match_flag: bool,
}
