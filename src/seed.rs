// src/seed.rs

//! Generated demo data. Every record written here carries `seed: true`, which
//! is what `cleanup-workers --marker-only` looks for.
//!
//! Seeding merges record by record. A key that already exists is left alone
//! unless `force` is set, and nothing outside the seeded keys is touched.

use chrono::{Duration, NaiveDate};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Map, Value};

use crate::domain::inventory::NewInventoryItem;
use crate::domain::loan::{Loan, LoanStatus};
use crate::domain::worker::{Salary, Worker, WorkerStatus};
use crate::errors::MillError;
use crate::services::inventory::PRODUCTS;
use crate::services::loans::LOANS;
use crate::services::now_iso;
use crate::services::transport::{DRIVERS, TRIPS, VEHICLES};
use crate::services::workers::{SALARIES, WORKERS};
use crate::store::{child_path, TreeStore};

pub const SYSTEM_SETTINGS: &str = "system_settings";
const WORKING_DAYS: f64 = 26.0;

const PRODUCT_NAMES: &[(&str, &str)] = &[
    ("Nadu", "Nadu"),
    ("Keeri Samba", "Samba"),
    ("Suduru Samba", "Samba"),
    ("Red Raw Rice", "Red Rice"),
    ("Basmati Rice", "Basmati"),
    ("Rice Bran", "Bran"),
];
const WAREHOUSES: &[&str] = &["Warehouse A", "Warehouse B", "Warehouse C"];
const WORKER_NAMES: &[(&str, &str)] = &[
    ("Kamal Perera", "Machine Operator"),
    ("Sunil Fernando", "Loader"),
    ("Nimal Silva", "Driver"),
    ("Ruwan Jayasinghe", "Supervisor"),
    ("Chaminda Bandara", "Loader"),
    ("Priya Kumari", "Quality Checker"),
];
const CUSTOMERS: &[&str] = &["Dealer Ravi", "Perera Stores", "Silva Traders", "Lanka Grains"];

#[derive(Debug, Clone, Default)]
pub struct SeedOptions {
    /// Overwrite seeded keys that already exist.
    pub force: bool,
}

/// Record paths, e.g. `loans/LN-SEED01`.
#[derive(Debug, Default)]
pub struct SeedReport {
    pub written: Vec<String>,
    pub skipped: Vec<String>,
}

pub fn run(
    store: &dyn TreeStore,
    opts: &SeedOptions,
    today: NaiveDate,
    rng: &mut impl Rng,
) -> Result<SeedReport, MillError> {
    let now = now_iso();
    let month = today.format("%Y-%m").to_string();
    let workers = workers(rng);

    let nodes: Vec<(String, Value)> = vec![
        (PRODUCTS.to_string(), products(rng, &now)),
        (WORKERS.to_string(), keyed(workers.iter().map(|w| (w.key.clone(), w.to_record())))),
        (child_path(SALARIES, &month), salaries(&workers, &now)),
        (LOANS.to_string(), loans(rng, today)),
        (VEHICLES.to_string(), vehicles()),
        (DRIVERS.to_string(), drivers()),
        (TRIPS.to_string(), trips(today)),
        (SYSTEM_SETTINGS.to_string(), settings()?),
    ];

    let mut report = SeedReport::default();
    for (path, value) in nodes {
        let Value::Object(records) = value else {
            continue;
        };

        let mut updates = Map::new();
        for (key, record) in records {
            let record_path = child_path(&path, &key);
            if !opts.force && store.get(&record_path)?.is_some() {
                log::debug!("skipped {record_path} (exists)");
                report.skipped.push(record_path);
                continue;
            }
            updates.insert(key, record);
            report.written.push(record_path);
        }

        if updates.is_empty() {
            log::info!("{path}: nothing to seed");
            continue;
        }
        store.update(&path, &updates)?;
        log::info!("seeded {} records into {path}", updates.len());
    }
    Ok(report)
}

fn keyed(entries: impl Iterator<Item = (String, Value)>) -> Value {
    Value::Object(entries.collect::<Map<String, Value>>())
}

fn products(rng: &mut impl Rng, now: &str) -> Value {
    keyed(PRODUCT_NAMES.iter().enumerate().map(|(i, (name, rice_type))| {
        let bags = f64::from(rng.gen_range(0..120u32));
        let kg_per_bag = if rng.gen_bool(0.7) { 50.0 } else { 25.0 };
        let item = NewInventoryItem {
            name: name.to_string(),
            rice_type: rice_type.to_string(),
            grade: Some(["A", "B"].choose(rng).unwrap_or(&"A").to_string()),
            bags,
            kg_per_bag: Some(kg_per_bag),
            current_stock: None,
            min_stock_level: Some(f64::from(rng.gen_range(2..7u32)) * 500.0),
            warehouse: WAREHOUSES.choose(rng).map(|w| w.to_string()),
            price_per_kg: f64::from(rng.gen_range(36..85u32)) * 5.0,
            quality_score: Some(f64::from(rng.gen_range(85..100u32))),
            image: None,
            owner_email: None,
            seed: true,
        }
        .into_item(format!("prod_{:03}", i + 1), now);
        (item.id.clone(), item.to_record())
    }))
}

fn workers(rng: &mut impl Rng) -> Vec<Worker> {
    WORKER_NAMES
        .iter()
        .enumerate()
        .map(|(i, (name, role))| {
            let id = format!("W{:03}", i + 1);
            let daily_wage = f64::from(rng.gen_range(20..33u32)) * 50.0;
            Worker {
                key: id.clone(),
                id,
                name: Some(name.to_string()),
                email: None,
                phone: Some(format!("+9477{:07}", rng.gen_range(0..10_000_000u32))),
                role: Some(role.to_string()),
                status: Some(if rng.gen_bool(0.8) {
                    WorkerStatus::Present
                } else {
                    WorkerStatus::Absent
                }),
                salary: Salary::Amount(daily_wage * WORKING_DAYS),
                daily_wage: Some(daily_wage),
                photo: None,
                bank_account: Some(format!("{:010}", rng.gen_range(0..10_000_000_000u64))),
                present_days: rng.gen_range(15..24),
                absent_days: rng.gen_range(0..4),
                last_attendance: None,
                seed: true,
            }
        })
        .collect()
}

fn salaries(workers: &[Worker], now: &str) -> Value {
    keyed(workers.iter().map(|w| {
        let wage = w.daily_wage.unwrap_or(0.0);
        let basic = wage * WORKING_DAYS;
        let record = json!({
            "workerId": w.id,
            "name": w.name,
            "role": w.role,
            "bankAccount": w.bank_account,
            "dailyWage": wage,
            "workingDays": WORKING_DAYS,
            "basicSalary": basic,
            "netSalary": basic,
            "status": "unpaid",
            "attendance": { "presentDays": 0, "totalDays": WORKING_DAYS },
            "created_at": now,
            "updated_at": now,
            "seed": true,
        });
        (w.id.clone(), record)
    }))
}

fn loans(rng: &mut impl Rng, today: NaiveDate) -> Value {
    // (issued days ago, due in days, share repaid)
    let shapes = [(90, 90, 0.4), (60, -5, 0.0), (30, 60, 0.0), (120, -20, 1.0)];

    keyed(shapes.iter().enumerate().map(|(i, (ago, due_in, repaid))| {
        let amount = f64::from(rng.gen_range(5..26u32)) * 5000.0;
        let paid = (amount * repaid).round();
        let loan = Loan {
            id: format!("LN-SEED{:02}", i + 1),
            customer: CUSTOMERS[i % CUSTOMERS.len()].to_string(),
            rice_type: PRODUCT_NAMES.choose(rng).map(|(n, _)| n.to_string()),
            quantity: Some(f64::from(rng.gen_range(4..40u32)) * 50.0),
            amount,
            paid_amount: paid,
            issue_date: Some(today - Duration::days(*ago)),
            due_date: Some(today + Duration::days(*due_in)),
            status: if paid >= amount {
                LoanStatus::FullyRepaid
            } else if paid > 0.0 {
                LoanStatus::PartiallyRepaid
            } else {
                LoanStatus::Active
            },
            seed: true,
        };
        (loan.id.clone(), loan.to_record())
    }))
}

fn vehicles() -> Value {
    json!({
        "veh_001": {"vehicleNumber": "CAB-1234", "type": "Lorry", "capacity": 5000,
                    "driverName": "Kamal Silva", "status": "Available", "seed": true},
        "veh_002": {"vehicleNumber": "CAC-5678", "type": "Mini Truck", "capacity": 2000,
                    "driverName": "Nimal Fernando", "status": "On Delivery", "seed": true},
        "veh_003": {"vehicleNumber": "CAD-9012", "type": "Van", "capacity": "1 ton",
                    "driverName": "Sunil Jayawardena", "status": "Available", "seed": true},
    })
}

fn drivers() -> Value {
    json!({
        "drv_001": {"id": "drv_001", "name": "Kamal Silva", "phone": "+94771111111",
                    "isAvailable": true, "status": "Active", "seed": true},
        "drv_002": {"id": "drv_002", "name": "Nimal Fernando", "phone": "+94772222222",
                    "isAvailable": false, "status": "Active", "seed": true},
        "drv_003": {"id": "drv_003", "name": "Sunil Jayawardena", "phone": "+94773333333",
                    "isAvailable": true, "status": "Active", "seed": true},
    })
}

fn trips(today: NaiveDate) -> Value {
    let day = |offset: i64| (today - Duration::days(offset)).format("%Y-%m-%dT08:00:00.000Z").to_string();
    json!({
        "trip_001": {"tripId": "TRP-001", "orderId": "ORD-SEED01", "vehicleId": "veh_002",
                     "driverId": "drv_002", "startLocation": "Warehouse A",
                     "endLocation": "Kandy", "quantity": 1800, "estimatedDistance": 115,
                     "status": "in-transit", "createdAt": day(0), "seed": true},
        "trip_002": {"tripId": "TRP-002", "orderId": "ORD-SEED02", "vehicleId": "veh_001",
                     "driverId": "drv_001", "startLocation": "Warehouse B",
                     "endLocation": "Galle", "quantity": 4200, "estimatedDistance": 130,
                     "status": "Delivered", "createdAt": day(3), "completedAt": day(2),
                     "seed": true},
    })
}

fn settings() -> Result<Value, MillError> {
    let mut value = serde_json::to_value(crate::domain::settings::SystemSettings::default())?;
    if let Value::Object(map) = &mut value {
        map.insert("seed".into(), json!(true));
    }
    Ok(value)
}
