//! Shopping cart kept on the client until the order is placed

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{OrderCreate, OrderItemInput, OrderType};

use crate::storage::JsonFile;
use crate::{ClientError, ClientResult};

/// Largest quantity the server accepts for one line
pub const MAX_LINE_QUANTITY: i32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub menu_item_id: i64,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub special_instructions: Option<String>,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    fn same_entry(&self, menu_item_id: i64, instructions: &Option<String>) -> bool {
        self.menu_item_id == menu_item_id && &self.special_instructions == instructions
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub restaurant_id: Option<i64>,
    pub location_id: Option<i64>,
    pub lines: Vec<CartLine>,
}

fn normalize_instructions(instructions: Option<&str>) -> Option<String> {
    instructions
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

impl Cart {
    pub fn new(restaurant_id: i64, location_id: Option<i64>) -> Self {
        Self {
            restaurant_id: Some(restaurant_id),
            location_id,
            lines: Vec::new(),
        }
    }

    /// Add `quantity` of an item.
    ///
    /// Lines merge when item and instructions match. An empty cart adopts
    /// the restaurant of the first item; items of another restaurant are
    /// refused.
    pub fn add(
        &mut self,
        restaurant_id: i64,
        menu_item_id: i64,
        name: impl Into<String>,
        unit_price: Decimal,
        quantity: i32,
        special_instructions: Option<&str>,
    ) -> ClientResult<()> {
        if quantity <= 0 {
            return Err(ClientError::Validation("Quantity must be positive".into()));
        }
        match self.restaurant_id {
            Some(current) if current != restaurant_id && !self.lines.is_empty() => {
                return Err(ClientError::Validation(
                    "Cart already holds items from another restaurant".into(),
                ));
            }
            _ => self.restaurant_id = Some(restaurant_id),
        }

        let instructions = normalize_instructions(special_instructions);
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.same_entry(menu_item_id, &instructions))
        {
            line.quantity = (line.quantity + quantity).min(MAX_LINE_QUANTITY);
            line.unit_price = unit_price;
            return Ok(());
        }

        self.lines.push(CartLine {
            menu_item_id,
            name: name.into(),
            unit_price,
            quantity: quantity.min(MAX_LINE_QUANTITY),
            special_instructions: instructions,
        });
        Ok(())
    }

    /// Set the quantity of line `index`; zero or less removes it
    pub fn update_quantity(&mut self, index: usize, quantity: i32) -> ClientResult<()> {
        if index >= self.lines.len() {
            return Err(ClientError::Validation(format!("No cart line {index}")));
        }
        if quantity <= 0 {
            self.lines.remove(index);
        } else {
            self.lines[index].quantity = quantity.min(MAX_LINE_QUANTITY);
        }
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Option<CartLine> {
        (index < self.lines.len()).then(|| self.lines.remove(index))
    }

    /// Empty the cart; the restaurant is kept
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    pub fn item_count(&self) -> i32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn save(&self, file: &JsonFile) -> ClientResult<()> {
        file.save(self)
    }

    /// Stored cart, or an empty one
    pub fn load(file: &JsonFile) -> ClientResult<Self> {
        Ok(file.load()?.unwrap_or_default())
    }

    /// Order payload; prices are resolved by the server
    pub fn to_order(&self, order_type: OrderType, notes: Option<&str>) -> ClientResult<OrderCreate> {
        let restaurant_id = match self.restaurant_id {
            Some(id) if !self.lines.is_empty() => id,
            _ => return Err(ClientError::Validation("Cart is empty".into())),
        };
        Ok(OrderCreate {
            restaurant_id,
            location_id: self.location_id,
            order_type,
            items: self
                .lines
                .iter()
                .map(|l| OrderItemInput {
                    menu_item_id: l.menu_item_id,
                    quantity: l.quantity,
                    special_instructions: l.special_instructions.clone(),
                })
                .collect(),
            notes: notes.map(str::trim).filter(|n| !n.is_empty()).map(str::to_owned),
        })
    }
}
