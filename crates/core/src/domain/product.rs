use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(pub i64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub i64);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub sale_price: Decimal,
    pub cost_price: Decimal,
    pub current_stock: i64,
    pub minimum_stock: i64,
    pub category: Category,
    pub active: bool,
}

impl Product {
    /// Stock at or below the configured minimum means the shop should reorder.
    pub fn needs_restock(&self) -> bool {
        self.current_stock <= self.minimum_stock
    }

    pub fn has_stock_for(&self, quantity: i64) -> bool {
        self.current_stock >= quantity
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{Category, CategoryId, Product, ProductId};

    fn product(current_stock: i64, minimum_stock: i64) -> Product {
        Product {
            id: ProductId(1),
            name: "Cuaderno".to_string(),
            sale_price: Decimal::new(150, 2),
            cost_price: Decimal::new(90, 2),
            current_stock,
            minimum_stock,
            category: Category { id: CategoryId(1), name: "Papelería".to_string() },
            active: true,
        }
    }

    #[test]
    fn restock_triggers_at_or_below_minimum() {
        assert!(product(5, 5).needs_restock());
        assert!(product(2, 5).needs_restock());
        assert!(!product(6, 5).needs_restock());
    }

    #[test]
    fn stock_check_is_inclusive() {
        assert!(product(3, 0).has_stock_for(3));
        assert!(!product(3, 0).has_stock_for(4));
    }
}
