use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::{Product, ProductId};
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SaleId(pub i64);

/// One sold position. Prices are snapshots taken at sale time so later catalog
/// price changes never rewrite history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaleLineItem {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_sale_price: Decimal,
    pub unit_cost_price: Decimal,
}

impl SaleLineItem {
    pub fn subtotal(&self) -> Decimal {
        self.unit_sale_price * Decimal::from(self.quantity)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<SaleLineItem>,
    pub total: Decimal,
}

/// A sale that has been validated but not yet persisted. Construction is the
/// only place the quantity/stock invariant is checked in the domain layer; the
/// repository re-checks it inside the transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct SaleDraft {
    pub lines: Vec<SaleLineItem>,
}

impl SaleDraft {
    pub fn single_line(product: &Product, quantity: i64) -> Result<Self, DomainError> {
        if quantity <= 0 {
            return Err(DomainError::InvariantViolation(format!(
                "sale quantity must be positive, got {quantity}"
            )));
        }
        if !product.has_stock_for(quantity) {
            return Err(DomainError::InsufficientStock {
                product: product.name.clone(),
                requested: quantity,
                available: product.current_stock,
            });
        }

        Ok(Self {
            lines: vec![SaleLineItem {
                product_id: product.id,
                quantity,
                unit_sale_price: product.sale_price,
                unit_cost_price: product.cost_price,
            }],
        })
    }

    pub fn total(&self) -> Decimal {
        self.lines.iter().map(SaleLineItem::subtotal).sum()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::product::{Category, CategoryId, Product, ProductId};
    use crate::errors::DomainError;

    use super::SaleDraft;

    fn cuaderno(stock: i64) -> Product {
        Product {
            id: ProductId(1),
            name: "Cuaderno".to_string(),
            sale_price: Decimal::new(150, 2),
            cost_price: Decimal::new(90, 2),
            current_stock: stock,
            minimum_stock: 2,
            category: Category { id: CategoryId(1), name: "Papelería".to_string() },
            active: true,
        }
    }

    #[test]
    fn draft_total_is_quantity_times_snapshot_price() {
        let draft = SaleDraft::single_line(&cuaderno(10), 3).expect("draft");
        assert_eq!(draft.total(), Decimal::new(450, 2));
    }

    #[test]
    fn draft_snapshots_both_prices() {
        let product = cuaderno(10);
        let draft = SaleDraft::single_line(&product, 1).expect("draft");
        assert_eq!(draft.lines[0].unit_sale_price, product.sale_price);
        assert_eq!(draft.lines[0].unit_cost_price, product.cost_price);
    }

    #[test]
    fn draft_rejects_overdraw() {
        let error = SaleDraft::single_line(&cuaderno(10), 15).expect_err("overdraw");
        assert!(matches!(
            error,
            DomainError::InsufficientStock { requested: 15, available: 10, .. }
        ));
    }

    #[test]
    fn draft_rejects_non_positive_quantity() {
        assert!(SaleDraft::single_line(&cuaderno(10), 0).is_err());
        assert!(SaleDraft::single_line(&cuaderno(10), -2).is_err());
    }

    #[test]
    fn exact_stock_is_sellable() {
        let draft = SaleDraft::single_line(&cuaderno(3), 3).expect("exact stock");
        assert_eq!(draft.lines[0].quantity, 3);
    }
}
