// src/services/products.rs
use chrono::Utc;
use serde_json::{json, Map};

use crate::domain::dealer::Dealer;
use crate::domain::fields::number_value;
use crate::domain::order::{NewOrder, Order, OrderLine};
use crate::domain::product::CatalogProduct;
use crate::domain::stock::CatalogAvailability;
use crate::errors::MillError;
use crate::services::{decode_docs, now_iso};
use crate::store::DocumentStore;

pub const PRODUCTS: &str = "products";
pub const DEALER_ORDERS: &str = "dealer_orders";
const GUEST_DEALER_ID: &str = "guest";

/// `ORD-` followed by the last eight digits of the millisecond clock.
pub fn order_id(now_millis: i64) -> String {
    let digits = now_millis.to_string();
    let tail = &digits[digits.len().saturating_sub(8)..];
    format!("ORD-{tail}")
}

pub struct ProductService<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> ProductService<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    pub fn all(&self) -> Result<Vec<CatalogProduct>, MillError> {
        Ok(decode_docs(
            self.store.list(PRODUCTS)?,
            "product",
            CatalogProduct::from_raw,
        ))
    }

    /// By document id, falling back to a document whose `id` field matches.
    pub fn by_id(&self, id: &str) -> Result<Option<CatalogProduct>, MillError> {
        if let Some(doc) = self.store.get(PRODUCTS, id)? {
            return CatalogProduct::from_raw(&doc.id, &doc.to_value()).map(Some);
        }
        match self
            .store
            .find_eq(PRODUCTS, "id", &json!(id))?
            .into_iter()
            .next()
        {
            Some(doc) => CatalogProduct::from_raw(&doc.id, &doc.to_value()).map(Some),
            None => Ok(None),
        }
    }

    /// Take `quantity_sold` units off a product and return the new stock.
    pub fn update_stock(&self, id: &str, quantity_sold: f64) -> Result<f64, MillError> {
        let product = self
            .by_id(id)?
            .ok_or_else(|| MillError::NotFound(format!("product {id}")))?;

        let new_stock = product.stock_quantity - quantity_sold;
        if new_stock < 0.0 {
            return Err(MillError::InsufficientStock {
                available: product.stock_quantity,
                requested: quantity_sold,
            });
        }

        let mut fields = Map::new();
        fields.insert("stock_quantity".into(), number_value(new_stock));
        fields.insert(
            "stock_status".into(),
            json!(CatalogAvailability::from_quantity(new_stock).as_str()),
        );
        fields.insert("updated_at".into(), json!(now_iso()));
        self.store.update(PRODUCTS, &product.doc_id, &fields)?;

        log::info!("{}: stock {} -> {new_stock}", product.name, product.stock_quantity);
        Ok(new_stock)
    }

    pub fn create_order(&self, order: &NewOrder) -> Result<String, MillError> {
        let id = order_id(Utc::now().timestamp_millis());
        let fields = order.to_fields(&id, &now_iso())?;
        self.store.set(DEALER_ORDERS, &id, &fields)?;
        log::info!("created order {id} for dealer {}", order.dealer_id);
        Ok(id)
    }

    /// Order `quantity` of one product for `dealer` and take it off the
    /// product's stock. Stock is checked before anything is written.
    pub fn place_order(
        &self,
        dealer: &Dealer,
        product_id: &str,
        quantity: f64,
    ) -> Result<String, MillError> {
        let product = self
            .by_id(product_id)?
            .ok_or_else(|| MillError::NotFound(format!("product {product_id}")))?;
        if quantity > product.stock_quantity {
            return Err(MillError::InsufficientStock {
                available: product.stock_quantity,
                requested: quantity,
            });
        }

        let order = NewOrder {
            dealer_id: dealer
                .uid
                .clone()
                .or_else(|| dealer.doc_id.clone())
                .unwrap_or_else(|| GUEST_DEALER_ID.to_string()),
            dealer_name: Some(dealer.name.clone()),
            dealer_email: dealer.email.clone(),
            items: vec![OrderLine {
                product_id: Some(product.id.clone()),
                name: product.name.clone(),
                quantity,
                unit_price: product.price,
            }],
        };
        let id = self.create_order(&order)?;
        self.update_stock(&product.doc_id, quantity)?;
        Ok(id)
    }

    /// Newest first.
    pub fn dealer_orders(&self, dealer_id: &str) -> Result<Vec<Order>, MillError> {
        let docs = self
            .store
            .find_eq(DEALER_ORDERS, "dealerId", &json!(dealer_id))?;
        let mut orders = decode_docs(docs, "order", Order::from_raw);
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}
