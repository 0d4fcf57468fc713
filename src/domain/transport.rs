// src/domain/transport.rs
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::fmt;

use crate::domain::fields::{as_number, number_value, RawRecord};
use crate::errors::MillError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TripStatus {
    Scheduled,
    Assigned,
    #[serde(rename = "In Transit")]
    InTransit,
    Delivered,
    Cancelled,
    /// Legacy `pending`/`upcoming`: not yet scheduled, holds nothing.
    Pending,
    /// Legacy `active`: counted as moving, but holds nothing.
    Active,
}

impl TripStatus {
    /// Spelling used in `trips/*` records.
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Scheduled => "scheduled",
            TripStatus::Assigned => "assigned",
            TripStatus::InTransit => "in-transit",
            TripStatus::Delivered => "Delivered",
            TripStatus::Cancelled => "cancelled",
            TripStatus::Pending => "pending",
            TripStatus::Active => "active",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let key = s.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        let status = match key.as_str() {
            "scheduled" => TripStatus::Scheduled,
            "assigned" => TripStatus::Assigned,
            "in transit" => TripStatus::InTransit,
            "pending" | "upcoming" => TripStatus::Pending,
            "active" | "on delivery" => TripStatus::Active,
            "delivered" | "completed" => TripStatus::Delivered,
            "cancelled" | "canceled" => TripStatus::Cancelled,
            _ => return None,
        };
        Some(status)
    }

    /// Holds its vehicle, driver and order.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            TripStatus::Scheduled | TripStatus::Assigned | TripStatus::InTransit
        )
    }

    /// On the road, for the in-transit count and live tracking.
    pub fn is_moving(&self) -> bool {
        matches!(self, TripStatus::InTransit | TripStatus::Active)
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VehicleStatus {
    Available,
    Active,
    OnDelivery,
    Busy,
    Maintenance,
    Idle,
    Inactive,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Available => "Available",
            VehicleStatus::Active => "Active",
            VehicleStatus::OnDelivery => "On Delivery",
            VehicleStatus::Busy => "Busy",
            VehicleStatus::Maintenance => "Maintenance",
            VehicleStatus::Idle => "idle",
            VehicleStatus::Inactive => "Inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let key = s.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        let status = match key.as_str() {
            "available" => VehicleStatus::Available,
            "active" => VehicleStatus::Active,
            "on delivery" | "in transit" => VehicleStatus::OnDelivery,
            "busy" => VehicleStatus::Busy,
            "maintenance" | "under maintenance" => VehicleStatus::Maintenance,
            "idle" => VehicleStatus::Idle,
            "inactive" | "retired" => VehicleStatus::Inactive,
            _ => return None,
        };
        Some(status)
    }
}

/// Capacity in kg from a number or a label such as `"5 ton"` / `"3000kg"`.
pub fn parse_capacity(v: &Value) -> Option<f64> {
    if let Some(n) = as_number(v) {
        return (n > 0.0).then_some(n);
    }
    let s = v.as_str()?.trim().to_ascii_lowercase();
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (num, unit) = s.split_at(split);
    let value: f64 = num.parse().ok()?;
    let kg = match unit.trim() {
        "kg" | "kgs" => value,
        u if u.starts_with("ton") => value * 1000.0,
        _ => return None,
    };
    (kg > 0.0).then_some(kg)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vehicle {
    pub id: String,
    pub number: String,
    pub vehicle_type: Option<String>,
    pub capacity_kg: Option<f64>,
    pub driver_name: Option<String>,
    pub status: Option<VehicleStatus>,
    pub seed: bool,
}

impl Vehicle {
    pub fn from_raw(id: &str, raw: &Value) -> Result<Self, MillError> {
        let rec = RawRecord::new(id, raw)?;
        let status = match rec.text(&["status"]) {
            Some(s) => Some(
                VehicleStatus::parse(&s)
                    .ok_or_else(|| MillError::invalid(id, format!("unknown vehicle status '{s}'")))?,
            ),
            None => None,
        };

        Ok(Vehicle {
            id: id.to_string(),
            number: rec
                .text(&["vehicleNumber", "vehicle_number", "number", "plate"])
                .unwrap_or_else(|| id.to_string()),
            vehicle_type: rec.text(&["type", "vehicleType"]),
            capacity_kg: rec.raw(&["capacity", "capacityKg"]).and_then(parse_capacity),
            driver_name: rec.text(&["driverName", "driver_name"]),
            status,
            seed: rec.boolean(&["seed"]).unwrap_or(false),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Driver {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    /// `false` only when the driver was explicitly marked unavailable.
    pub is_available: Option<bool>,
}

impl Driver {
    pub fn from_raw(id: &str, raw: &Value) -> Result<Self, MillError> {
        let rec = RawRecord::new(id, raw)?;
        Ok(Driver {
            id: rec.text(&["id", "driverId"]).unwrap_or_else(|| id.to_string()),
            name: rec.text(&["name", "driverName"]).unwrap_or_else(|| id.to_string()),
            phone: rec.text(&["phone", "contact", "driverContact"]),
            is_available: rec.boolean(&["isAvailable", "is_available"]),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trip {
    /// Key under `trips/`.
    pub id: String,
    pub trip_id: String,
    pub order_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub driver_id: Option<String>,
    pub start_location: Option<String>,
    pub end_location: Option<String>,
    pub quantity_kg: Option<f64>,
    pub distance_km: Option<f64>,
    pub status: TripStatus,
    pub created_at: Option<String>,
    pub completed_at: Option<String>,
    /// Millisecond timestamp of the last GPS fix.
    pub last_gps_update: Option<i64>,
    pub seed: bool,
}

impl Trip {
    pub fn from_raw(id: &str, raw: &Value) -> Result<Self, MillError> {
        let rec = RawRecord::new(id, raw)?;
        let status = match rec.text(&["status"]) {
            Some(s) => TripStatus::parse(&s)
                .ok_or_else(|| MillError::invalid(id, format!("unknown trip status '{s}'")))?,
            None => TripStatus::Pending,
        };

        Ok(Trip {
            id: id.to_string(),
            trip_id: rec.text(&["tripId", "trip_id"]).unwrap_or_else(|| id.to_string()),
            order_id: rec.text(&["orderId", "order_id"]),
            vehicle_id: rec.text(&["vehicleId", "vehicle_id"]),
            driver_id: rec.text(&["driverId", "driver_id"]),
            start_location: rec.text(&["startLocation", "start_location"]),
            end_location: rec.text(&["endLocation", "end_location", "destination"]),
            quantity_kg: rec.number(&["quantity", "quantityKg"]),
            distance_km: rec.number(&["estimatedDistance", "distance"]),
            status,
            created_at: rec.text(&["createdAt", "created_at"]),
            completed_at: rec.text(&["completedAt", "completed_at"]),
            last_gps_update: rec
                .number(&["lastGpsUpdate", "lastLocationUpdate"])
                .map(|n| n as i64),
            seed: rec.boolean(&["seed"]).unwrap_or(false),
        })
    }
}

/// Form input for assigning an order to a vehicle and driver.
#[derive(Debug, Clone, Default)]
pub struct TripAssignment {
    pub order_id: String,
    pub vehicle_id: String,
    pub driver_id: String,
    pub start_location: Option<String>,
    pub end_location: String,
    pub quantity_kg: Option<f64>,
}

impl TripAssignment {
    pub fn to_record(&self, trip_id: &str, now: &str) -> Value {
        let mut rec = Map::new();
        rec.insert("tripId".into(), json!(trip_id));
        rec.insert("orderId".into(), json!(self.order_id));
        rec.insert("vehicleId".into(), json!(self.vehicle_id));
        rec.insert("driverId".into(), json!(self.driver_id));
        if let Some(start) = &self.start_location {
            rec.insert("startLocation".into(), json!(start));
        }
        rec.insert("endLocation".into(), json!(self.end_location.trim()));
        if let Some(q) = self.quantity_kg {
            rec.insert("quantity".into(), number_value(q));
        }
        rec.insert("status".into(), json!(TripStatus::Assigned.as_str()));
        rec.insert("createdAt".into(), json!(now));
        Value::Object(rec)
    }
}

/// Errors block an assignment; warnings are shown but let it through.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

fn active_trip_with<'a>(trips: &'a [Trip], holds: impl Fn(&Trip) -> bool) -> Option<&'a Trip> {
    trips.iter().find(|t| t.status.is_active() && holds(t))
}

pub fn check_vehicle_available(vehicle_id: &str, trips: &[Trip]) -> Result<(), String> {
    if vehicle_id.trim().is_empty() {
        return Err("Vehicle ID is required".into());
    }
    match active_trip_with(trips, |t| t.vehicle_id.as_deref() == Some(vehicle_id)) {
        Some(t) => Err(format!(
            "Vehicle is already assigned to trip {}. Status: {}",
            t.trip_id, t.status
        )),
        None => Ok(()),
    }
}

pub fn check_driver_available(driver_id: &str, trips: &[Trip]) -> Result<(), String> {
    if driver_id.trim().is_empty() {
        return Err("Driver ID is required".into());
    }
    match active_trip_with(trips, |t| t.driver_id.as_deref() == Some(driver_id)) {
        Some(t) => Err(format!(
            "Driver is already assigned to trip {}. Status: {}",
            t.trip_id, t.status
        )),
        None => Ok(()),
    }
}

pub fn check_order_unassigned(order_id: &str, trips: &[Trip]) -> Result<(), String> {
    if order_id.trim().is_empty() {
        return Err("Order ID is required".into());
    }
    match active_trip_with(trips, |t| t.order_id.as_deref() == Some(order_id)) {
        Some(t) => Err(format!("Order is already assigned to trip {}", t.trip_id)),
        None => Ok(()),
    }
}

pub const CAPACITY_WARN_PERCENT: f64 = 90.0;

#[derive(Debug, Clone, PartialEq)]
pub enum CapacityCheck {
    /// Capacity or quantity unknown; nothing to check.
    Unknown,
    Fits { percent: f64 },
    NearlyFull { percent: f64, message: String },
    Exceeded { percent: f64, message: String },
}

pub fn check_capacity(capacity_kg: Option<f64>, quantity_kg: Option<f64>) -> CapacityCheck {
    let (capacity, quantity) = match (capacity_kg, quantity_kg) {
        (Some(c), Some(q)) if c.is_finite() && c > 0.0 && q.is_finite() && q > 0.0 => (c, q),
        _ => return CapacityCheck::Unknown,
    };

    let percent = quantity / capacity * 100.0;
    if percent > 100.0 {
        CapacityCheck::Exceeded {
            percent,
            message: format!(
                "Order quantity ({quantity}kg) exceeds vehicle capacity ({capacity}kg)"
            ),
        }
    } else if percent > CAPACITY_WARN_PERCENT {
        CapacityCheck::NearlyFull {
            percent,
            message: format!(
                "Order will use {percent:.0}% of vehicle capacity ({quantity}kg / {capacity}kg)"
            ),
        }
    } else {
        CapacityCheck::Fits { percent }
    }
}

pub fn validate_assignment(
    assignment: &TripAssignment,
    trips: &[Trip],
    vehicle: Option<&Vehicle>,
    driver: Option<&Driver>,
) -> Validation {
    let mut v = Validation::default();
    let order_id = assignment.order_id.trim();
    let vehicle_id = assignment.vehicle_id.trim();
    let driver_id = assignment.driver_id.trim();

    if order_id.is_empty() {
        v.errors.push("Order is required".into());
    }
    if vehicle_id.is_empty() {
        v.errors.push("Vehicle is required".into());
    }
    if driver_id.is_empty() {
        v.errors.push("Driver is required".into());
    }
    if assignment.end_location.trim().is_empty() {
        v.errors.push("End location is required".into());
    }

    if !vehicle_id.is_empty() {
        if let Err(e) = check_vehicle_available(vehicle_id, trips) {
            v.errors.push(e);
        }
    }

    if !driver_id.is_empty() {
        match driver {
            Some(d) if d.is_available == Some(false) => v.errors.push(format!(
                "Driver {} is not available (marked as unavailable)",
                d.name
            )),
            _ => {
                if let Err(e) = check_driver_available(driver_id, trips) {
                    v.errors.push(e);
                }
            }
        }
    }

    if !order_id.is_empty() {
        if let Err(e) = check_order_unassigned(order_id, trips) {
            v.errors.push(e);
        }
    }

    if let Some(vehicle) = vehicle {
        match check_capacity(vehicle.capacity_kg, assignment.quantity_kg) {
            CapacityCheck::Exceeded { message, .. } => v.errors.push(message),
            CapacityCheck::NearlyFull { message, .. } => v.warnings.push(message),
            CapacityCheck::Fits { .. } | CapacityCheck::Unknown => {}
        }
    }

    v
}

/// Bounding box of the mill's delivery area (Sri Lanka).
pub const SERVICE_LAT: (f64, f64) = (5.8, 7.9);
pub const SERVICE_LNG: (f64, f64) = (79.6, 81.9);

#[derive(Debug, Clone, PartialEq)]
pub enum GpsCheck {
    Valid,
    /// Plausible coordinates, but outside the delivery area.
    OutsideServiceArea(String),
    Invalid(String),
}

pub fn check_gps(lat: f64, lng: f64) -> GpsCheck {
    if !lat.is_finite() || !lng.is_finite() {
        return GpsCheck::Invalid("Invalid GPS coordinates (not numbers)".into());
    }
    if !(-90.0..=90.0).contains(&lat) {
        return GpsCheck::Invalid(format!(
            "Invalid latitude: {lat} (must be between -90 and 90)"
        ));
    }
    if !(-180.0..=180.0).contains(&lng) {
        return GpsCheck::Invalid(format!(
            "Invalid longitude: {lng} (must be between -180 and 180)"
        ));
    }

    let inside = (SERVICE_LAT.0..=SERVICE_LAT.1).contains(&lat)
        && (SERVICE_LNG.0..=SERVICE_LNG.1).contains(&lng);
    if inside {
        GpsCheck::Valid
    } else {
        GpsCheck::OutsideServiceArea(format!(
            "GPS coordinates ({lat:.4}, {lng:.4}) appear to be outside Sri Lanka. Please verify."
        ))
    }
}

pub const GPS_TIMEOUT_MS: i64 = 90_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpsConnection {
    NeverConnected,
    Offline { since_ms: i64 },
    /// Still online, but past 70% of the timeout.
    Unstable { since_ms: i64 },
    Online { since_ms: i64 },
}

impl GpsConnection {
    pub fn as_str(&self) -> &'static str {
        match self {
            GpsConnection::NeverConnected => "never-connected",
            GpsConnection::Offline { .. } => "offline",
            GpsConnection::Unstable { .. } => "unstable",
            GpsConnection::Online { .. } => "online",
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, GpsConnection::Unstable { .. } | GpsConnection::Online { .. })
    }
}

pub fn gps_connection(last_update_ms: Option<i64>, now_ms: i64, timeout_ms: i64) -> GpsConnection {
    let Some(last) = last_update_ms.filter(|t| *t > 0) else {
        return GpsConnection::NeverConnected;
    };
    let since_ms = now_ms - last;
    if since_ms > timeout_ms {
        GpsConnection::Offline { since_ms }
    } else if since_ms as f64 > timeout_ms as f64 * 0.7 {
        GpsConnection::Unstable { since_ms }
    } else {
        GpsConnection::Online { since_ms }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip(id: &str, vehicle: &str, driver: &str, order: &str, status: &str) -> Trip {
        Trip::from_raw(
            id,
            &json!({"tripId": id, "vehicleId": vehicle, "driverId": driver, "orderId": order, "status": status}),
        )
        .unwrap()
    }

    #[test]
    fn busy_vehicle_is_rejected_only_for_active_trips() {
        let trips = vec![
            trip("T1", "veh_001", "drv_1", "ORD-1", "in-transit"),
            trip("T2", "veh_002", "drv_2", "ORD-2", "Delivered"),
        ];
        let err = check_vehicle_available("veh_001", &trips).unwrap_err();
        assert!(err.contains("T1"));
        assert!(check_vehicle_available("veh_002", &trips).is_ok());
        assert!(check_vehicle_available("", &trips).is_err());
    }

    #[test]
    fn capacity_bands() {
        assert_eq!(check_capacity(None, Some(100.0)), CapacityCheck::Unknown);
        assert_eq!(check_capacity(Some(1000.0), Some(0.0)), CapacityCheck::Unknown);
        assert!(matches!(check_capacity(Some(1000.0), Some(900.0)), CapacityCheck::Fits { .. }));
        assert!(matches!(
            check_capacity(Some(1000.0), Some(950.0)),
            CapacityCheck::NearlyFull { .. }
        ));
        assert!(matches!(
            check_capacity(Some(1000.0), Some(1200.0)),
            CapacityCheck::Exceeded { .. }
        ));
    }

    #[test]
    fn capacity_labels_parse() {
        assert_eq!(parse_capacity(&json!(5000)), Some(5000.0));
        assert_eq!(parse_capacity(&json!("5 ton")), Some(5000.0));
        assert_eq!(parse_capacity(&json!("3000kg")), Some(3000.0));
        assert_eq!(parse_capacity(&json!("big")), None);
    }

    #[test]
    fn assignment_collects_every_problem() {
        let trips = vec![trip("T1", "veh_001", "drv_1", "ORD-1", "assigned")];
        let vehicle = Vehicle::from_raw("veh_001", &json!({"vehicleNumber": "CAB-1234", "capacity": 1000})).unwrap();
        let driver = Driver::from_raw("drv_9", &json!({"name": "Sunil", "isAvailable": false})).unwrap();

        let a = TripAssignment {
            order_id: "ORD-1".into(),
            vehicle_id: "veh_001".into(),
            driver_id: "drv_9".into(),
            end_location: " ".into(),
            quantity_kg: Some(1500.0),
            ..Default::default()
        };
        let v = validate_assignment(&a, &trips, Some(&vehicle), Some(&driver));

        assert!(!v.is_valid());
        assert_eq!(v.errors.len(), 5, "{:?}", v.errors);
        assert!(v.errors.iter().any(|e| e.contains("Sunil")));
    }

    #[test]
    fn near_full_vehicle_only_warns() {
        let vehicle = Vehicle::from_raw("veh_003", &json!({"capacity": 1000, "status": "Available"})).unwrap();
        let a = TripAssignment {
            order_id: "ORD-5".into(),
            vehicle_id: "veh_003".into(),
            driver_id: "drv_3".into(),
            end_location: "Kandy".into(),
            quantity_kg: Some(950.0),
            ..Default::default()
        };
        let v = validate_assignment(&a, &[], Some(&vehicle), None);
        assert!(v.is_valid());
        assert_eq!(v.warnings.len(), 1);
    }

    #[test]
    fn gps_ranges() {
        assert_eq!(check_gps(6.9271, 79.8612), GpsCheck::Valid);
        assert!(matches!(check_gps(13.08, 80.27), GpsCheck::OutsideServiceArea(_)));
        assert!(matches!(check_gps(95.0, 80.0), GpsCheck::Invalid(_)));
        assert!(matches!(check_gps(f64::NAN, 80.0), GpsCheck::Invalid(_)));
    }

    #[test]
    fn gps_connection_states() {
        let now = 1_000_000;
        assert_eq!(gps_connection(None, now, GPS_TIMEOUT_MS), GpsConnection::NeverConnected);
        assert_eq!(
            gps_connection(Some(now - 100_000), now, GPS_TIMEOUT_MS).as_str(),
            "offline"
        );
        assert_eq!(
            gps_connection(Some(now - 70_000), now, GPS_TIMEOUT_MS).as_str(),
            "unstable"
        );
        assert_eq!(
            gps_connection(Some(now - 10_000), now, GPS_TIMEOUT_MS).as_str(),
            "online"
        );
    }

    #[test]
    fn trip_status_aliases() {
        assert_eq!(TripStatus::parse("In Transit"), Some(TripStatus::InTransit));
        assert_eq!(TripStatus::parse("active"), Some(TripStatus::Active));
        assert_eq!(TripStatus::parse("Completed"), Some(TripStatus::Delivered));
        assert!(!TripStatus::Delivered.is_active());
    }
}
