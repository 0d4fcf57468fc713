pub mod dealer;
pub mod fields;
pub mod format;
pub mod inventory;
pub mod loan;
pub mod order;
pub mod product;
pub mod settings;
pub mod stock;
pub mod transport;
pub mod worker;
