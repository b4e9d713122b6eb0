//! Server-side cart, keyed by session id.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::decimal_number;

fn default_quantity() -> i32 {
    1
}

/// Body of `POST /cart/add`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddToCart {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantite: i32,
    pub session_id: String,
}

/// Body of `PUT /cart/update`. A quantity of zero or less removes the line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCart {
    pub product_id: ProductId,
    pub quantite: i32,
    pub session_id: String,
}

/// A cart line joined with its product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub nom: String,
    #[serde(with = "decimal_number")]
    pub prix: Decimal,
    pub prix_texte: Option<String>,
    pub image: Option<String>,
    pub quantite: i32,
    #[serde(with = "decimal_number")]
    pub sous_total: Decimal,
}

impl CartItem {
    /// Line subtotal for a unit price and a quantity.
    #[must_use]
    pub fn subtotal(prix: Decimal, quantite: i32) -> Decimal {
        prix * Decimal::from(quantite)
    }
}

/// A session's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub panier: Vec<CartItem>,
    #[serde(with = "decimal_number")]
    pub total: Decimal,
    pub count: usize,
}

impl Cart {
    /// Build a cart from its lines, summing the subtotals.
    #[must_use]
    pub fn from_items(panier: Vec<CartItem>) -> Self {
        let total = panier.iter().map(|item| item.sous_total).sum();
        let count = panier.len();
        Self {
            panier,
            total,
            count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, prix: i64, quantite: i32) -> CartItem {
        let prix = Decimal::from(prix);
        CartItem {
            product_id: ProductId::new(id),
            nom: id.to_owned(),
            prix,
            prix_texte: None,
            image: None,
            quantite,
            sous_total: CartItem::subtotal(prix, quantite),
        }
    }

    #[test]
    fn test_cart_total_sums_subtotals() {
        let cart = Cart::from_items(vec![item("a", 1000, 2), item("b", 250, 4)]);
        assert_eq!(cart.total, Decimal::from(3000));
        assert_eq!(cart.count, 2);
    }

    #[test]
    fn test_empty_cart() {
        let cart = Cart::from_items(Vec::new());
        assert_eq!(cart.total, Decimal::ZERO);
        assert_eq!(cart.count, 0);
    }
}
