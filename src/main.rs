use chrono::{Local, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use crate::config::Config;
use crate::domain::dealer::CreditUpdate;
use crate::domain::format::{kg, rupees};
use crate::domain::inventory::{ItemUpdate, NewInventoryItem};
use crate::domain::loan::NewLoan;
use crate::domain::transport::{check_gps, GpsCheck, TripAssignment};
use crate::errors::MillError;
use crate::services::dealers::{BankStatementRequest, DealerService};
use crate::services::insights::{stock_snapshot, SnapshotSource};
use crate::services::inventory::InventoryService;
use crate::services::loans::LoanService;
use crate::services::products::ProductService;
use crate::services::transport::TransportService;
use crate::services::workers::WorkerService;
use crate::store::{DocumentStore, TreeStore};

mod cleanup;
mod config;
mod db;
mod domain;
mod errors;
mod fixtures;
mod remote;
mod seed;
mod services;
mod spreadsheets;
mod store;

#[cfg(test)]
mod tests;

#[derive(Parser)]
#[command(name = "millbook")]
#[command(about = "Rice mill inventory, loans, workforce and transport records")]
#[command(version)]
struct Cli {
    /// Config file (default: ./millbook.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Errors only
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Confirm both stores are reachable and count their records
    Check,

    #[command(subcommand)]
    Inventory(InventoryCmd),

    #[command(subcommand)]
    Loans(LoansCmd),

    #[command(subcommand)]
    Workers(WorkersCmd),

    #[command(subcommand)]
    Products(ProductsCmd),

    #[command(subcommand)]
    Transport(TransportCmd),

    #[command(subcommand)]
    Dealers(DealersCmd),

    /// Find seeded or test worker records; deletes only with --delete
    CleanupWorkers {
        /// Report only (the default)
        #[arg(long, conflicts_with = "delete")]
        dry_run: bool,

        #[arg(long)]
        delete: bool,

        /// Also delete salaries/<month>/<workerId> (YYYY-MM)
        #[arg(long)]
        month: Option<String>,

        /// Only trust the `seed` marker
        #[arg(long)]
        marker_only: bool,
    },

    /// Write demo records that are not there yet
    Seed {
        /// Also overwrite demo records that already exist
        #[arg(long)]
        force: bool,
    },

    /// Stock figures for forecasting
    Insights,

    /// Export inventory, loans and workers to an XLSX workbook
    Report {
        #[arg(long, default_value = "millbook-report.xlsx")]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum InventoryCmd {
    List,
    /// Add an item; stock is bags x kg per bag unless --stock is given
    Add {
        name: String,
        #[arg(long, default_value = "")]
        rice_type: String,
        #[arg(long)]
        grade: Option<String>,
        #[arg(long, default_value_t = 0.0)]
        bags: f64,
        #[arg(long)]
        kg_per_bag: Option<f64>,
        #[arg(long)]
        stock: Option<f64>,
        #[arg(long)]
        min_stock: Option<f64>,
        #[arg(long)]
        warehouse: Option<String>,
        #[arg(long)]
        price_per_kg: f64,
    },
    /// Change fields of an item; omitted fields keep their value
    Update {
        id: String,
        #[command(flatten)]
        fields: ItemFields,
    },
    Delete {
        id: String,
    },
    /// Latest stock movements
    Movements {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Stored KPIs and category distribution
    Stats,
    /// Recompute and store KPIs and the category distribution
    Refresh,
    /// Items expected to run out soon
    Predict,
}

#[derive(Args)]
struct ItemFields {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    bags: Option<f64>,
    #[arg(long)]
    stock: Option<f64>,
    #[arg(long)]
    min_stock: Option<f64>,
    #[arg(long)]
    warehouse: Option<String>,
    #[arg(long)]
    price_per_kg: Option<f64>,
}

impl From<ItemFields> for ItemUpdate {
    fn from(f: ItemFields) -> Self {
        ItemUpdate {
            name: f.name,
            bags: f.bags,
            current_stock: f.stock,
            min_stock_level: f.min_stock,
            warehouse: f.warehouse,
            price_per_kg: f.price_per_kg,
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
enum LoansCmd {
    List {
        /// Search customer or loan id
        #[arg(long, default_value = "")]
        search: String,
    },
    Summary,
    /// Issue a loan
    Add {
        customer: String,
        #[arg(long)]
        rice_type: String,
        /// Kilograms
        #[arg(long)]
        quantity: f64,
        #[arg(long)]
        amount: f64,
        /// YYYY-MM-DD
        #[arg(long)]
        due: NaiveDate,
        /// YYYY-MM-DD, defaults to today
        #[arg(long)]
        issued: Option<NaiveDate>,
    },
    /// Mark a loan fully repaid
    Repay { id: String },
    /// Record a partial payment
    Pay { id: String, amount: f64 },
}

#[derive(Subcommand)]
enum WorkersCmd {
    List,
    Attendance,
    /// Mark today's attendance for one worker
    Mark {
        key: String,
        #[arg(long)]
        absent: bool,
    },
}

#[derive(Subcommand)]
enum ProductsCmd {
    List,
    Show {
        id: String,
    },
    /// Order a product for a dealer and take it off the stock
    Order {
        product: String,
        quantity: f64,
        /// Dealer user id; the guest dealer when it matches none
        #[arg(long, default_value = "")]
        dealer: String,
    },
    /// A dealer's orders, newest first
    Orders {
        dealer: String,
    },
}

#[derive(Subcommand)]
enum DealersCmd {
    List,
    Show {
        uid: String,
    },
    /// Submit a bank statement for credit approval
    Statement {
        uid: String,
        #[arg(long)]
        bank: String,
        #[arg(long, default_value = "")]
        account: String,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        requested_limit: Option<f64>,
    },
    /// Set a dealer's credit limit and used credit
    Credit {
        uid: String,
        #[arg(long)]
        limit: f64,
        #[arg(long, default_value_t = 0.0)]
        used: f64,
    },
}

#[derive(Subcommand)]
enum TransportCmd {
    Stats,
    /// GPS link state of active trips
    Live,
    /// Assign an order to a vehicle and driver
    Assign {
        #[arg(long)]
        order: String,
        #[arg(long)]
        vehicle: String,
        #[arg(long)]
        driver: String,
        /// Destination
        #[arg(long)]
        to: String,
        #[arg(long)]
        from: Option<String>,
        /// Kilograms
        #[arg(long)]
        quantity: Option<f64>,
    },
    /// Mark a trip delivered
    Complete { trip: String },
    /// Check a GPS fix against the delivery area
    #[command(allow_negative_numbers = true)]
    Gps { lat: f64, lng: f64 },
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = Config::load(cli.config.as_deref()).and_then(|config| run(cli.command, &config));

    match result {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("❌ {e}");
            if let Some(hint) = e.remediation() {
                eprintln!("   {hint}");
            }
            process::exit(1);
        }
    }
}

fn run(command: Commands, config: &Config) -> Result<(), MillError> {
    let today = Local::now().date_naive();

    match command {
        Commands::Check => {
            let tree = config.open_tree()?;
            let docs = config.open_documents()?;
            handle_check(tree.as_ref(), docs.as_ref())
        }
        Commands::Inventory(cmd) => {
            let tree = config.open_tree()?;
            let inventory = InventoryService::new(tree.as_ref());
            match cmd {
                InventoryCmd::List => {
                    for item in inventory.list_all()? {
                        println!(
                            "{:<22} {:<12} {:>12} / {:>10}  {:<12} {}",
                            item.id,
                            item.name,
                            kg(item.current_stock),
                            kg(item.min_stock_level),
                            item.status.as_str(),
                            item.warehouse
                        );
                    }
                }
                InventoryCmd::Add {
                    name,
                    rice_type,
                    grade,
                    bags,
                    kg_per_bag,
                    stock,
                    min_stock,
                    warehouse,
                    price_per_kg,
                } => {
                    let item = inventory.add_item(NewInventoryItem {
                        name,
                        rice_type,
                        grade,
                        bags,
                        kg_per_bag,
                        current_stock: stock,
                        min_stock_level: min_stock,
                        warehouse,
                        price_per_kg,
                        ..Default::default()
                    })?;
                    println!("✅ added {} ({}, {})", item.id, item.name, kg(item.current_stock));
                }
                InventoryCmd::Update { id, fields } => {
                    let item = inventory.update_item(&id, fields.into())?;
                    println!("✅ {} now {}, {}", item.name, kg(item.current_stock), item.status.as_str());
                }
                InventoryCmd::Delete { id } => {
                    inventory.delete_item(&id)?;
                    println!("✅ deleted {id}");
                }
                InventoryCmd::Movements { limit } => {
                    for m in inventory.recent_movements(limit)? {
                        println!(
                            "{:<26} {:<8} {:<20} {:>12}  {}",
                            m.timestamp.as_deref().unwrap_or("-"),
                            m.kind,
                            m.item_name.as_deref().unwrap_or(&m.item_id),
                            kg(m.quantity),
                            m.user
                        );
                    }
                }
                InventoryCmd::Stats => {
                    let kpis = inventory.kpis()?;
                    println!(
                        "{} bags, {}, worth {}; {} low, {} out of stock",
                        kpis.total_bags,
                        kg(kpis.total_kg),
                        rupees(kpis.total_value),
                        kpis.low_stock_items,
                        kpis.out_of_stock_items
                    );
                    for share in inventory.distribution()? {
                        println!("   {:<16} {:>3}%  {}", share.category, share.percentage, share.quantity);
                    }
                }
                InventoryCmd::Refresh => {
                    let kpis = inventory.refresh_kpis()?;
                    let distribution = inventory.refresh_distribution()?;
                    println!(
                        "✅ {} bags, {}, worth {}; {} low, {} out of stock",
                        kpis.total_bags,
                        kg(kpis.total_kg),
                        rupees(kpis.total_value),
                        kpis.low_stock_items,
                        kpis.out_of_stock_items
                    );
                    for share in distribution {
                        println!("   {:<16} {:>3}%  {}", share.category, share.percentage, share.quantity);
                    }
                }
                InventoryCmd::Predict => {
                    for p in inventory.low_stock_predictions(today)? {
                        println!(
                            "{:<8} {:<20} {:>3} days (by {})",
                            p.risk.as_str(),
                            p.item.name,
                            p.days_to_out,
                            p.predicted_out_date
                        );
                    }
                }
            }
            Ok(())
        }
        Commands::Loans(cmd) => {
            let tree = config.open_tree()?;
            let loans = LoanService::new(tree.as_ref());
            match cmd {
                LoansCmd::List { search } => {
                    for v in loans.filter(&search, None, today)? {
                        println!(
                            "{:<14} {:<20} {:>14} outstanding {:>14}  due {}  {}",
                            v.loan.id,
                            v.loan.customer,
                            rupees(v.loan.amount),
                            rupees(v.outstanding),
                            v.loan.due_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
                            v.display_status
                        );
                    }
                }
                LoansCmd::Summary => {
                    let s = loans.summary(today)?;
                    println!(
                        "{} loans: {} active, {} overdue; issued {}, outstanding {}",
                        s.total,
                        s.active,
                        s.overdue,
                        rupees(s.total_amount),
                        rupees(s.total_outstanding)
                    );
                }
                LoansCmd::Add {
                    customer,
                    rice_type,
                    quantity,
                    amount,
                    due,
                    issued,
                } => {
                    let loan = loans.add_loan(
                        NewLoan {
                            customer,
                            rice_type,
                            quantity,
                            amount,
                            issue_date: issued,
                            due_date: Some(due),
                        },
                        today,
                    )?;
                    println!("✅ issued {} to {} for {}", loan.id, loan.customer, rupees(loan.amount));
                }
                LoansCmd::Repay { id } => {
                    let loan = loans.repay(&id)?;
                    println!("✅ {} is {}", loan.id, loan.status);
                }
                LoansCmd::Pay { id, amount } => {
                    let loan = loans.record_payment(&id, amount)?;
                    println!("✅ {} is {}, {} outstanding", loan.id, loan.status, rupees(loan.outstanding()));
                }
            }
            Ok(())
        }
        Commands::Workers(cmd) => {
            let tree = config.open_tree()?;
            let workers = WorkerService::new(tree.as_ref());
            match cmd {
                WorkersCmd::List => {
                    for w in workers.list()? {
                        println!(
                            "{:<10} {:<22} {:<18} {:<9} {:>3}P {:>3}A",
                            w.id,
                            w.display_name(),
                            w.role.as_deref().unwrap_or("-"),
                            w.status.map(|s| s.as_str()).unwrap_or("-"),
                            w.present_days,
                            w.absent_days
                        );
                    }
                }
                WorkersCmd::Attendance => {
                    let s = workers.attendance_summary()?;
                    println!(
                        "{} workers: {} present, {} absent, {} on leave; payroll {}",
                        s.headcount,
                        s.present,
                        s.absent,
                        s.on_leave,
                        rupees(s.monthly_payroll)
                    );
                }
                WorkersCmd::Mark { key, absent } => {
                    let w = workers.mark_attendance(&key, !absent, today)?;
                    println!("✅ {} marked {}", w.display_name(), if absent { "absent" } else { "present" });
                }
            }
            Ok(())
        }
        Commands::Products(cmd) => {
            let docs = config.open_documents()?;
            let products = ProductService::new(docs.as_ref());
            match cmd {
                ProductsCmd::List => {
                    for p in products.all()? {
                        println!(
                            "{:<12} {:<24} {:>12}  {:<12} {}",
                            p.id,
                            p.name,
                            kg(p.stock_quantity),
                            p.availability.as_str(),
                            rupees(p.price)
                        );
                    }
                }
                ProductsCmd::Show { id } => {
                    let p = products
                        .by_id(&id)?
                        .ok_or_else(|| MillError::NotFound(format!("product {id}")))?;
                    println!("{} ({})", p.name, p.id);
                    println!("   category  {}", p.category.as_deref().unwrap_or("-"));
                    println!("   stock     {} ({})", kg(p.stock_quantity), p.availability.as_str());
                    println!("   price     {}", rupees(p.price));
                }
                ProductsCmd::Order {
                    product,
                    quantity,
                    dealer,
                } => {
                    let dealer = DealerService::new(docs.as_ref()).by_uid(&dealer)?;
                    let id = products.place_order(&dealer, &product, quantity)?;
                    println!("✅ order {id} placed for {}", dealer.name);
                }
                ProductsCmd::Orders { dealer } => {
                    let orders = products.dealer_orders(&dealer)?;
                    for o in &orders {
                        println!(
                            "{:<14} {:<26} {:<10} {:>14}  {} lines",
                            o.id,
                            o.created_at.as_deref().unwrap_or("-"),
                            o.status.as_str(),
                            rupees(o.total_amount),
                            o.items.len()
                        );
                    }
                    let open = orders.iter().filter(|o| o.status.is_open()).count();
                    println!("{} orders, {open} open", orders.len());
                }
            }
            Ok(())
        }
        Commands::Dealers(cmd) => {
            let docs = config.open_documents()?;
            let dealers = DealerService::new(docs.as_ref());
            match cmd {
                DealersCmd::List => {
                    for d in dealers.all()? {
                        println!(
                            "{:<24} {:<14} limit {:>14}  remaining {:>14}",
                            d.name,
                            d.trust_level,
                            rupees(d.credit_limit),
                            rupees(d.credit_remaining)
                        );
                    }
                }
                DealersCmd::Show { uid } => {
                    let d = dealers.by_uid(&uid)?;
                    if d.is_guest() {
                        println!("(no dealer for {uid}, showing the guest dealer)");
                    }
                    println!("{} <{}>", d.name, d.email.as_deref().unwrap_or("-"));
                    println!(
                        "   credit {} used of {}, {} remaining",
                        rupees(d.credit_used),
                        rupees(d.credit_limit),
                        rupees(d.credit_remaining)
                    );
                }
                DealersCmd::Statement {
                    uid,
                    bank,
                    account,
                    url,
                    requested_limit,
                } => {
                    let id = dealers.submit_bank_statement(&BankStatementRequest {
                        dealer_id: uid,
                        bank_name: bank,
                        account_number: account,
                        statement_url: url,
                        requested_limit,
                    })?;
                    println!("✅ statement {id} submitted for review");
                }
                DealersCmd::Credit { uid, limit, used } => {
                    let d = dealers.update_credit(
                        &uid,
                        CreditUpdate {
                            credit_limit: limit,
                            credit_used: used,
                        },
                    )?;
                    println!("✅ {} now has {} remaining", d.name, rupees(d.credit_remaining));
                }
            }
            Ok(())
        }
        Commands::Transport(cmd) => {
            let tree = config.open_tree()?;
            let transport = TransportService::new(tree.as_ref());
            match cmd {
                TransportCmd::Stats => {
                    let s = transport.stats()?;
                    println!(
                        "{} trips: {} delivered ({}%), {} in transit, {} km",
                        s.total_trips,
                        s.completed_trips,
                        s.completion_rate,
                        s.in_transit_trips,
                        s.total_distance_km
                    );
                }
                TransportCmd::Live => {
                    let live = transport.live_status(Utc::now().timestamp_millis())?;
                    for (trip, link) in &live {
                        println!(
                            "{:<10} {:<12} {:<16} {}",
                            trip.trip_id,
                            trip.status.as_str(),
                            trip.end_location.as_deref().unwrap_or("-"),
                            link.as_str()
                        );
                    }
                    let online = live.iter().filter(|(_, link)| link.is_online()).count();
                    println!("{online} of {} active trips online", live.len());
                }
                TransportCmd::Assign {
                    order,
                    vehicle,
                    driver,
                    to,
                    from,
                    quantity,
                } => {
                    let (key, validation) = transport.assign_trip(&TripAssignment {
                        order_id: order,
                        vehicle_id: vehicle,
                        driver_id: driver,
                        start_location: from,
                        end_location: to,
                        quantity_kg: quantity,
                    })?;
                    for warning in &validation.warnings {
                        println!("⚠️ {warning}");
                    }
                    println!("✅ trip {key} assigned");
                }
                TransportCmd::Gps { lat, lng } => match check_gps(lat, lng) {
                    GpsCheck::Valid => println!("✅ ({lat}, {lng}) is inside the delivery area"),
                    GpsCheck::OutsideServiceArea(msg) => println!("⚠️ {msg}"),
                    GpsCheck::Invalid(msg) => return Err(MillError::BadRequest(msg)),
                },
                TransportCmd::Complete { trip } => {
                    let t = transport.complete_delivery(&trip)?;
                    println!("✅ {} delivered", t.trip_id);
                }
            }
            Ok(())
        }
        Commands::CleanupWorkers {
            dry_run,
            delete,
            month,
            marker_only,
        } => {
            let tree = config.open_tree()?;
            handle_cleanup(
                tree.as_ref(),
                &cleanup_options(dry_run, delete, month, marker_only),
            )
        }
        Commands::Seed { force } => {
            let tree = config.open_tree()?;
            let report = seed::run(
                tree.as_ref(),
                &seed::SeedOptions { force },
                today,
                &mut rand::thread_rng(),
            )?;
            for path in &report.skipped {
                println!("   skipped {path} (exists; use --force to overwrite)");
            }
            println!(
                "✅ seeded {} records, {} already present",
                report.written.len(),
                report.skipped.len()
            );
            Ok(())
        }
        Commands::Insights => {
            let tree = config.open_tree()?;
            let snapshot = stock_snapshot(tree.as_ref());
            if snapshot.source == SnapshotSource::Fixture {
                println!("(sample figures, live inventory unavailable)");
            }
            for row in snapshot.rows {
                let cover = row
                    .days_of_cover()
                    .map(|d| format!("{d} days"))
                    .unwrap_or_else(|| "-".into());
                println!(
                    "{:<20} {:<14} {:>12}  {:>8}/day  {}",
                    row.product,
                    row.category,
                    kg(row.current_stock),
                    row.daily_usage,
                    cover
                );
            }
            Ok(())
        }
        Commands::Report { out } => {
            let tree = config.open_tree()?;
            let counts = spreadsheets::export_report(tree.as_ref(), &out, today)?;
            println!(
                "✅ wrote {} ({} items, {} loans, {} workers)",
                out.display(),
                counts.inventory,
                counts.loans,
                counts.workers
            );
            Ok(())
        }
    }
}

const TREE_NODES: &[&str] = &[
    "products",
    "loans",
    "workers",
    "vehicles",
    "drivers",
    "trips",
    "stock_updates",
    "salaries",
    "system_settings",
];
const COLLECTIONS: &[&str] = &["products", "dealers", "dealer_orders", "bank_statements"];

fn handle_check(tree: &dyn TreeStore, docs: &dyn DocumentStore) -> Result<(), MillError> {
    for node in TREE_NODES {
        let count = tree
            .get(node)?
            .as_ref()
            .and_then(|v| v.as_object())
            .map_or(0, |m| m.len());
        println!("✅ {node:<16} {count}");
    }
    for collection in COLLECTIONS {
        let count = docs.list(collection)?.len();
        println!("✅ {collection:<16} {count} documents");
    }
    Ok(())
}

/// `--dry-run` always wins over `--delete`.
fn cleanup_options(
    dry_run: bool,
    delete: bool,
    month: Option<String>,
    marker_only: bool,
) -> cleanup::CleanupOptions {
    cleanup::CleanupOptions {
        delete: delete && !dry_run,
        month,
        marker_only,
    }
}

fn handle_cleanup(tree: &dyn TreeStore, opts: &cleanup::CleanupOptions) -> Result<(), MillError> {
    let report = cleanup::run(tree, opts)?;

    for candidate in &report.candidates {
        let reasons: Vec<String> = candidate.reasons.iter().map(|r| r.to_string()).collect();
        println!(
            "   {:<24} {:<22} {}",
            candidate.key,
            candidate.display_name(),
            reasons.join(", ")
        );
    }
    for key in &report.undecodable {
        println!("   {key:<24} (could not be read, left alone)");
    }

    if !opts.delete {
        println!(
            "{} of {} workers flagged. Dry run, nothing deleted; pass --delete to remove them.",
            report.candidates.len(),
            report.scanned
        );
        return Ok(());
    }

    println!(
        "✅ deleted {} workers and {} salary records",
        report.deleted.len(),
        report.salaries_deleted.len()
    );
    if report.failures.is_empty() {
        Ok(())
    } else {
        for (path, err) in &report.failures {
            println!("❌ {path}: {err}");
        }
        Err(MillError::PartialFailure {
            failed: report.failures.len(),
            attempted: report.candidates.len(),
        })
    }
}
