// src/services/transport.rs
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::domain::transport::{
    gps_connection, validate_assignment, Driver, GpsConnection, Trip, TripAssignment, TripStatus,
    Validation, Vehicle, GPS_TIMEOUT_MS,
};
use crate::errors::MillError;
use crate::services::{decode_children, now_iso};
use crate::store::{child_path, TreeStore};

pub const TRIPS: &str = "trips";
pub const VEHICLES: &str = "vehicles";
pub const DRIVERS: &str = "drivers";
pub const TRANSPORT_HISTORY: &str = "transportHistory";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransportStats {
    pub total_trips: usize,
    pub completed_trips: usize,
    pub in_transit_trips: usize,
    /// Rounded percent of trips delivered.
    pub completion_rate: u32,
    pub total_distance_km: f64,
}

pub fn trip_stats(trips: &[Trip]) -> TransportStats {
    let total_trips = trips.len();
    let completed_trips = trips
        .iter()
        .filter(|t| t.status == TripStatus::Delivered)
        .count();

    TransportStats {
        total_trips,
        completed_trips,
        in_transit_trips: trips
            .iter()
            .filter(|t| t.status.is_moving())
            .count(),
        completion_rate: if total_trips > 0 {
            (completed_trips as f64 / total_trips as f64 * 100.0).round() as u32
        } else {
            0
        },
        total_distance_km: trips.iter().filter_map(|t| t.distance_km).sum::<f64>().round(),
    }
}

pub struct TransportService<'a> {
    store: &'a dyn TreeStore,
}

impl<'a> TransportService<'a> {
    pub fn new(store: &'a dyn TreeStore) -> Self {
        Self { store }
    }

    fn list<T>(
        &self,
        node: &str,
        what: &str,
        decode: impl Fn(&str, &Value) -> Result<T, MillError>,
    ) -> Result<Vec<T>, MillError> {
        Ok(self
            .store
            .get(node)?
            .map(|n| decode_children(&n, what, decode))
            .unwrap_or_default())
    }

    pub fn trips(&self) -> Result<Vec<Trip>, MillError> {
        self.list(TRIPS, "trip", Trip::from_raw)
    }

    pub fn vehicles(&self) -> Result<Vec<Vehicle>, MillError> {
        self.list(VEHICLES, "vehicle", Vehicle::from_raw)
    }

    pub fn drivers(&self) -> Result<Vec<Driver>, MillError> {
        self.list(DRIVERS, "driver", Driver::from_raw)
    }

    /// Validate an assignment against the current trips and, when it passes,
    /// store it as a new trip. Returns the trip key and any warnings.
    pub fn assign_trip(&self, assignment: &TripAssignment) -> Result<(String, Validation), MillError> {
        let trips = self.trips()?;

        let vehicle_id = assignment.vehicle_id.trim();
        let vehicle = match vehicle_id {
            "" => None,
            id => self
                .store
                .get(&child_path(VEHICLES, id))?
                .map(|raw| Vehicle::from_raw(id, &raw))
                .transpose()?,
        };
        let driver = self
            .drivers()?
            .into_iter()
            .find(|d| d.id == assignment.driver_id.trim());

        let validation = validate_assignment(assignment, &trips, vehicle.as_ref(), driver.as_ref());
        if !validation.is_valid() {
            return Err(MillError::BadRequest(validation.errors.join("; ")));
        }
        for warning in &validation.warnings {
            log::warn!("{warning}");
        }

        let key = self.store.new_key();
        self.store
            .set(&child_path(TRIPS, &key), &assignment.to_record(&key, &now_iso()))?;
        log::info!(
            "trip {key}: order {} on vehicle {} with driver {}",
            assignment.order_id,
            assignment.vehicle_id,
            assignment.driver_id
        );
        Ok((key, validation))
    }

    /// Mark a trip delivered and copy it into the transport history.
    pub fn complete_delivery(&self, trip_key: &str) -> Result<Trip, MillError> {
        let path = child_path(TRIPS, trip_key);
        let Some(Value::Object(mut record)) = self.store.get(&path)? else {
            return Err(MillError::NotFound(format!("trip {trip_key}")));
        };

        let now = now_iso();
        let mut fields = Map::new();
        fields.insert("status".into(), json!(TripStatus::Delivered.as_str()));
        fields.insert("completedAt".into(), json!(now));
        self.store.update(&path, &fields)?;

        record.extend(fields);
        let completed = Value::Object(record);
        self.store
            .set(&child_path(TRANSPORT_HISTORY, trip_key), &completed)?;

        log::info!("trip {trip_key} delivered");
        Trip::from_raw(trip_key, &completed)
    }

    pub fn stats(&self) -> Result<TransportStats, MillError> {
        Ok(trip_stats(&self.trips()?))
    }

    /// GPS link state of every active trip.
    pub fn live_status(&self, now_ms: i64) -> Result<Vec<(Trip, GpsConnection)>, MillError> {
        Ok(self
            .trips()?
            .into_iter()
            .filter(|t| t.status.is_active() || t.status.is_moving())
            .map(|t| {
                let link = gps_connection(t.last_gps_update, now_ms, GPS_TIMEOUT_MS);
                (t, link)
            })
            .collect())
    }
}
