//! Menu Models (categories, items, translations)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Menu category entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct MenuCategory {
    pub id: i64,
    pub restaurant_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub display_order: i32,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create category payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CategoryCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub display_order: Option<i32>,
}

/// Update category payload
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CategoryUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

/// One language's name/description for an item
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TranslationInput {
    #[validate(length(min = 2, max = 10))]
    pub language_code: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

/// Category association with its per-association order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryAssignment {
    pub category_id: i64,
    #[serde(default)]
    pub display_order: i32,
}

/// Create / update menu item payload
///
/// Translations and category associations are replaced wholesale on update.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MenuItemInput {
    pub base_price: Decimal,
    #[validate(range(min = 0, max = 600))]
    pub preparation_time: Option<i32>,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[validate(length(max = 2048))]
    pub image_url: Option<String>,
    #[validate(nested)]
    pub translations: Vec<TranslationInput>,
    #[serde(default)]
    pub categories: Vec<CategoryAssignment>,
}

fn default_true() -> bool {
    true
}

/// Category reference aggregated onto an item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MenuItemCategoryRef {
    pub id: i64,
    pub name: String,
    pub display_order: i32,
}

/// Menu item as read back, localized to one language
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct MenuItem {
    pub id: i64,
    pub restaurant_id: i64,
    pub base_price: Decimal,
    pub preparation_time: Option<i32>,
    pub is_available: bool,
    pub is_featured: bool,
    pub image_url: Option<String>,
    /// Translated name, or `Item #<id>` when no translation exists
    pub name: String,
    pub description: Option<String>,
    #[cfg_attr(feature = "db", sqlx(json))]
    pub categories: Vec<MenuItemCategoryRef>,
    /// Association order; only set when listing one category
    #[cfg_attr(feature = "db", sqlx(default))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_order: Option<i32>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Stored translation row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct MenuItemTranslation {
    pub id: i64,
    pub menu_item_id: i64,
    pub language_code: String,
    pub name: String,
    pub description: Option<String>,
}

/// Menu item list filters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MenuItemQuery {
    pub language: Option<String>,
    pub available: Option<bool>,
    pub featured: Option<bool>,
    pub category_id: Option<i64>,
}

/// Language selector for single-item reads
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanguageQuery {
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityUpdate {
    pub is_available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReorderEntry {
    pub menu_item_id: i64,
    pub display_order: i32,
}

/// Batch display-order update within one category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub items: Vec<ReorderEntry>,
}

/// Public menu of an active restaurant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicMenu {
    pub restaurant_id: i64,
    pub restaurant_name: String,
    pub url_slug: String,
    pub categories: Vec<MenuCategory>,
    pub items: Vec<MenuItem>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_menu_item_input_defaults() {
        let input: MenuItemInput = serde_json::from_str(
            r#"{"base_price":"12.50","translations":[{"language_code":"en","name":"Paella"}]}"#,
        )
        .unwrap();
        assert!(input.is_available);
        assert!(!input.is_featured);
        assert!(input.categories.is_empty());
        assert_eq!(input.base_price, Decimal::from_str("12.50").unwrap());
    }

    #[test]
    fn test_menu_item_input_accepts_numeric_price() {
        let input: MenuItemInput =
            serde_json::from_str(r#"{"base_price":9.5,"translations":[]}"#).unwrap();
        assert_eq!(input.base_price, Decimal::from_str("9.5").unwrap());
    }

    #[test]
    fn test_translation_validation() {
        let input = MenuItemInput {
            base_price: Decimal::ONE,
            preparation_time: Some(1000),
            is_available: true,
            is_featured: false,
            image_url: None,
            translations: vec![TranslationInput {
                language_code: "e".into(),
                name: "".into(),
                description: None,
            }],
            categories: vec![],
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.errors().contains_key("translations"));
        assert!(errors.errors().contains_key("preparation_time"));
    }

    #[test]
    fn test_category_order_skipped_when_absent() {
        let item = MenuItem {
            id: 1,
            restaurant_id: 1,
            base_price: Decimal::ONE,
            preparation_time: None,
            is_available: true,
            is_featured: false,
            image_url: None,
            name: "Item #1".into(),
            description: None,
            categories: vec![],
            category_order: None,
            created_at: 0,
            updated_at: 0,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("category_order").is_none());
    }
}
