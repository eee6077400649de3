//! Menu item persistence against a real PostgreSQL
//!
//! Runs only when `TEST_DATABASE_URL` points at a disposable database.

use std::str::FromStr;

use mesa_cloud::db::{menu_categories, menu_items, setup};
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    CategoryAssignment, CategoryCreate, MenuItemInput, ReorderEntry, TranslationInput,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

async fn pool() -> Option<PgPool> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping database test");
        return None;
    };
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .expect("connect to TEST_DATABASE_URL");
    setup::run_migrations(&pool).await.expect("migrations");
    Some(pool)
}

/// A fresh active restaurant with a unique slug
async fn restaurant(pool: &PgPool) -> i64 {
    let tag = uuid::Uuid::new_v4().simple().to_string();
    sqlx::query_scalar(
        "INSERT INTO restaurants
             (name, url_slug, business_type, owner_name, owner_email, status, created_at, updated_at)
         VALUES ('Test', $1, 'restaurant', 'Owner', $2, 'active', 0, 0)
         RETURNING id",
    )
    .bind(format!("t-{}", &tag[..12]))
    .bind(format!("{tag}@test.local"))
    .fetch_one(pool)
    .await
    .expect("insert restaurant")
}

async fn category(pool: &PgPool, restaurant_id: i64, name: &str) -> i64 {
    let data = CategoryCreate {
        name: name.to_string(),
        description: None,
        display_order: None,
    };
    menu_categories::create(pool, restaurant_id, &data, 0)
        .await
        .map_err(AppError::from)
        .expect("create category")
        .id
}

fn translation(language_code: &str, name: &str) -> TranslationInput {
    TranslationInput {
        language_code: language_code.to_string(),
        name: name.to_string(),
        description: None,
    }
}

fn item(translations: Vec<TranslationInput>, categories: Vec<CategoryAssignment>) -> MenuItemInput {
    MenuItemInput {
        base_price: Decimal::from_str("12.50").unwrap(),
        preparation_time: Some(15),
        is_available: true,
        is_featured: false,
        image_url: None,
        translations,
        categories,
    }
}

async fn item_count(pool: &PgPool, restaurant_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM menu_items WHERE restaurant_id = $1")
        .bind(restaurant_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_create_reads_back_localized() {
    let Some(pool) = pool().await else { return };
    let restaurant_id = restaurant(&pool).await;
    let mains = category(&pool, restaurant_id, "Mains").await;

    let input = item(
        vec![translation("en", "Paella"), translation("es", "Paella valenciana")],
        vec![CategoryAssignment {
            category_id: mains,
            display_order: 10,
        }],
    );
    let id = menu_items::create(&pool, restaurant_id, &input, 1).await.unwrap();

    let spanish = menu_items::get_by_id(&pool, restaurant_id, id, Some("es"))
        .await
        .unwrap();
    assert_eq!(spanish.name, "Paella valenciana");
    assert_eq!(spanish.categories.len(), 1);
    assert_eq!(spanish.categories[0].id, mains);

    // No German translation: synthesized label
    let german = menu_items::get_by_id(&pool, restaurant_id, id, Some("de"))
        .await
        .unwrap();
    assert_eq!(german.name, format!("Item #{id}"));
    assert_eq!(german.description, None);
}

#[tokio::test]
async fn test_untranslated_item_gets_synthetic_name() {
    let Some(pool) = pool().await else { return };
    let restaurant_id = restaurant(&pool).await;

    let id = menu_items::create(&pool, restaurant_id, &item(vec![], vec![]), 1)
        .await
        .unwrap();
    let found = menu_items::get_by_id(&pool, restaurant_id, id, None)
        .await
        .unwrap();
    assert_eq!(found.name, format!("Item #{id}"));
    assert!(found.categories.is_empty());
}

#[tokio::test]
async fn test_foreign_category_rolls_back_everything() {
    let Some(pool) = pool().await else { return };
    let restaurant_id = restaurant(&pool).await;
    let other_restaurant = restaurant(&pool).await;
    let foreign = category(&pool, other_restaurant, "Theirs").await;

    let input = item(
        vec![translation("en", "Ghost")],
        vec![CategoryAssignment {
            category_id: foreign,
            display_order: 0,
        }],
    );
    let err: AppError = menu_items::create(&pool, restaurant_id, &input, 1)
        .await
        .unwrap_err()
        .into();

    assert_eq!(err.code, ErrorCode::CategoryNotFound);
    assert_eq!(item_count(&pool, restaurant_id).await, 0);
}

#[tokio::test]
async fn test_duplicate_translation_rolls_back_everything() {
    let Some(pool) = pool().await else { return };
    let restaurant_id = restaurant(&pool).await;

    let input = item(
        vec![translation("en", "One"), translation("en", "Two")],
        vec![],
    );
    assert!(menu_items::create(&pool, restaurant_id, &input, 1).await.is_err());
    assert_eq!(item_count(&pool, restaurant_id).await, 0);

    let orphans: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM menu_item_translations t
         WHERE NOT EXISTS (SELECT 1 FROM menu_items mi WHERE mi.id = t.menu_item_id)",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(orphans, 0);
}

#[tokio::test]
async fn test_failed_update_keeps_previous_state() {
    let Some(pool) = pool().await else { return };
    let restaurant_id = restaurant(&pool).await;
    let id = menu_items::create(
        &pool,
        restaurant_id,
        &item(vec![translation("en", "Original")], vec![]),
        1,
    )
    .await
    .unwrap();

    let broken = item(
        vec![translation("en", "Changed")],
        vec![CategoryAssignment {
            category_id: i64::MAX,
            display_order: 0,
        }],
    );
    assert!(menu_items::update(&pool, restaurant_id, id, &broken, 2).await.is_err());

    let found = menu_items::get_by_id(&pool, restaurant_id, id, Some("en"))
        .await
        .unwrap();
    assert_eq!(found.name, "Original");
    assert_eq!(found.updated_at, 1);
}

#[tokio::test]
async fn test_category_listing_reports_category_order() {
    let Some(pool) = pool().await else { return };
    let restaurant_id = restaurant(&pool).await;
    let starters = category(&pool, restaurant_id, "Starters").await;

    let assign = |display_order| {
        vec![CategoryAssignment {
            category_id: starters,
            display_order,
        }]
    };
    let first = menu_items::create(
        &pool,
        restaurant_id,
        &item(vec![translation("en", "Bravas")], assign(10)),
        1,
    )
    .await
    .unwrap();
    let second = menu_items::create(
        &pool,
        restaurant_id,
        &item(vec![translation("en", "Croquetas")], assign(20)),
        1,
    )
    .await
    .unwrap();

    let items = menu_items::get_by_category(&pool, restaurant_id, starters, None, false)
        .await
        .unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, first);
    assert_eq!(items[0].category_order, Some(10));

    menu_items::reorder_in_category(
        &pool,
        restaurant_id,
        starters,
        &[
            ReorderEntry {
                menu_item_id: first,
                display_order: 30,
            },
            ReorderEntry {
                menu_item_id: second,
                display_order: 5,
            },
        ],
    )
    .await
    .unwrap();

    let items = menu_items::get_by_category(&pool, restaurant_id, starters, None, false)
        .await
        .unwrap();
    assert_eq!(items[0].id, second);
    assert_eq!(items[0].category_order, Some(5));
    assert_eq!(items[1].category_order, Some(30));
}

#[tokio::test]
async fn test_item_in_two_categories_reports_each_order() {
    let Some(pool) = pool().await else { return };
    let restaurant_id = restaurant(&pool).await;
    let lunch = category(&pool, restaurant_id, "Lunch").await;
    let dinner = category(&pool, restaurant_id, "Dinner").await;

    let id = menu_items::create(
        &pool,
        restaurant_id,
        &item(
            vec![translation("en", "Gazpacho")],
            vec![
                CategoryAssignment {
                    category_id: lunch,
                    display_order: 10,
                },
                CategoryAssignment {
                    category_id: dinner,
                    display_order: 20,
                },
            ],
        ),
        1,
    )
    .await
    .unwrap();

    let at_lunch = menu_items::get_by_category(&pool, restaurant_id, lunch, None, false)
        .await
        .unwrap();
    assert_eq!(at_lunch.len(), 1);
    assert_eq!(at_lunch[0].id, id);
    assert_eq!(at_lunch[0].category_order, Some(10));
    assert_eq!(at_lunch[0].categories.len(), 2);

    let at_dinner = menu_items::get_by_category(&pool, restaurant_id, dinner, None, false)
        .await
        .unwrap();
    assert_eq!(at_dinner[0].category_order, Some(20));
}

#[tokio::test]
async fn test_reorder_with_unknown_item_changes_nothing() {
    let Some(pool) = pool().await else { return };
    let restaurant_id = restaurant(&pool).await;
    let desserts = category(&pool, restaurant_id, "Desserts").await;
    let id = menu_items::create(
        &pool,
        restaurant_id,
        &item(
            vec![translation("en", "Flan")],
            vec![CategoryAssignment {
                category_id: desserts,
                display_order: 1,
            }],
        ),
        1,
    )
    .await
    .unwrap();

    let err: AppError = menu_items::reorder_in_category(
        &pool,
        restaurant_id,
        desserts,
        &[
            ReorderEntry {
                menu_item_id: id,
                display_order: 9,
            },
            ReorderEntry {
                menu_item_id: i64::MAX,
                display_order: 2,
            },
        ],
    )
    .await
    .unwrap_err()
    .into();
    assert_eq!(err.code, ErrorCode::MenuItemNotFound);

    let items = menu_items::get_by_category(&pool, restaurant_id, desserts, None, false)
        .await
        .unwrap();
    assert_eq!(items[0].category_order, Some(1));
}
