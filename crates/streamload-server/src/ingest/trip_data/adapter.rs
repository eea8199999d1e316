//! CSV line to [`TripDataRow`] conversion

use chrono::{DateTime, NaiveDateTime, Utc};
use std::str::FromStr;

use super::models::{TripDataRow, TRIP_DATA_FIELD_COUNT};
use crate::ingest::framework::{AdapterError, RecordAdapter};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn text(field: &str) -> Option<String> {
    let field = field.trim();
    (!field.is_empty()).then(|| field.to_string())
}

/// Naive timestamps are taken to be UTC
fn datetime(field: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(field.trim(), DATETIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

fn number<T: FromStr>(field: &str) -> Option<T> {
    field.trim().parse().ok()
}

/// Like [`number`], but `NaN` and infinities are absent too
fn amount(field: &str) -> Option<f64> {
    number::<f64>(field).filter(|value| value.is_finite())
}

fn flag(field: &str) -> bool {
    field.trim() == "Y"
}

/// Adapter for the 24-column high-volume FHV trip CSV.
///
/// Empty or unparseable values become `None`; only the column count is
/// enforced.
#[derive(Debug, Clone, Copy, Default)]
pub struct TripDataCsvAdapter;

impl RecordAdapter for TripDataCsvAdapter {
    type Record = TripDataRow;

    fn line_to_record(&self, line: &str) -> Result<TripDataRow, AdapterError> {
        let fields: Vec<&str> = line.trim().split(',').collect();
        let [
            hvfhs_license_num,
            dispatching_base_num,
            originating_base_num,
            request_datetime,
            on_scene_datetime,
            pickup_datetime,
            dropoff_datetime,
            pu_location_id,
            do_location_id,
            trip_miles,
            trip_time,
            base_passenger_fare,
            tolls,
            bcf,
            sales_tax,
            congestion_surcharge,
            airport_fee,
            tips,
            driver_pay,
            shared_request_flag,
            shared_match_flag,
            access_a_ride_flag,
            wav_request_flag,
            wav_match_flag,
        ] = <[&str; TRIP_DATA_FIELD_COUNT]>::try_from(fields.as_slice()).map_err(|_| {
            AdapterError::FieldCount {
                expected: TRIP_DATA_FIELD_COUNT,
                found: fields.len(),
            }
        })?;

        Ok(TripDataRow {
            hvfhs_license_num: text(hvfhs_license_num),
            dispatching_base_num: text(dispatching_base_num),
            originating_base_num: text(originating_base_num),
            request_datetime: datetime(request_datetime),
            on_scene_datetime: datetime(on_scene_datetime),
            pickup_datetime: datetime(pickup_datetime),
            dropoff_datetime: datetime(dropoff_datetime),
            pu_location_id: number(pu_location_id),
            do_location_id: number(do_location_id),
            trip_miles: amount(trip_miles),
            trip_time: number(trip_time),
            base_passenger_fare: amount(base_passenger_fare),
            tolls: amount(tolls),
            bcf: amount(bcf),
            sales_tax: amount(sales_tax),
            congestion_surcharge: amount(congestion_surcharge),
            airport_fee: amount(airport_fee),
            tips: amount(tips),
            driver_pay: amount(driver_pay),
            shared_request_flag: flag(shared_request_flag),
            shared_match_flag: flag(shared_match_flag),
            access_a_ride_flag: flag(access_a_ride_flag),
            wav_request_flag: flag(wav_request_flag),
            wav_match_flag: flag(wav_match_flag),
        })
    }
}
