//! Repository behavior against a real `PostgreSQL`.
//!
//! Each test gets a fresh database with the API migrations applied. Run with
//! a server reachable through `DATABASE_URL`:
//!
//! ```bash
//! DATABASE_URL=postgres://localhost/marketplace cargo test -p marketplace-integration-tests -- --ignored
//! ```

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use marketplace_api::db::{
    BoutiqueRepository, CartRepository, ProductRepository, PublishContext, RepositoryError,
    SaleRepository,
};
use marketplace_core::{
    BoutiqueId, ProductId, ProductInput, ProductQuery, ProductStatus, PublishRequest, SaleFilter,
    SaleInput, WriteMode,
};
use rust_decimal::Decimal;
use sqlx::PgPool;

const SESSION: &str = "session_1717236000000_abc123def";

fn request(nom: &str, prix: i64, categories: &[&str]) -> PublishRequest {
    PublishRequest {
        produit: ProductInput {
            nom: nom.to_owned(),
            prix: Some(Decimal::from(prix)),
            lien: Some(format!("https://www.jumia.sn/{}", nom.to_lowercase())),
            categories: categories.iter().map(|c| (*c).to_owned()).collect(),
            ..ProductInput::default()
        },
        ..PublishRequest::default()
    }
}

async fn publish(pool: &PgPool, request: &PublishRequest) -> ProductId {
    let product_id = request.produit.product_id();
    ProductRepository::new(pool)
        .upsert(
            &product_id,
            &request.to_write(WriteMode::Publish),
            PublishContext::default(),
        )
        .await
        .unwrap();
    product_id
}

async fn default_boutique(pool: &PgPool) -> BoutiqueId {
    BoutiqueRepository::new(pool).list().await.unwrap()[0].id
}

fn sale(boutique_id: BoutiqueId, date: &str, produit: &str, prix: i64, quantite: i32) -> SaleInput {
    SaleInput {
        boutique_id,
        date_vente: date.to_owned(),
        produit_nom: produit.to_owned(),
        prix: Decimal::from(prix),
        quantite,
        localisation: Some("Dakar".to_owned()),
        client_info: None,
        notes: None,
    }
}

async fn record(pool: &PgPool, input: &SaleInput) {
    SaleRepository::new(pool)
        .create(input, input.sale_date().unwrap())
        .await
        .unwrap();
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_cart_add_increments_existing_line(pool: PgPool) {
    let lampe = publish(&pool, &request("Lampe", 3000, &[])).await;
    let cart = CartRepository::new(&pool);

    cart.add(SESSION, &lampe, 2).await.unwrap();
    cart.add(SESSION, &lampe, 3).await.unwrap();

    let panier = cart.get(SESSION).await.unwrap();
    assert_eq!(panier.count, 1);
    assert_eq!(panier.panier[0].quantite, 5);
    assert_eq!(panier.panier[0].sous_total, Decimal::from(15_000));
    assert_eq!(panier.total, Decimal::from(15_000));
    assert_eq!(cart.get("other-session").await.unwrap().count, 0);
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_cart_quantity_zero_removes_line(pool: PgPool) {
    let lampe = publish(&pool, &request("Lampe", 3000, &[])).await;
    let table = publish(&pool, &request("Table", 12_000, &[])).await;
    let cart = CartRepository::new(&pool);
    cart.add(SESSION, &lampe, 1).await.unwrap();
    cart.add(SESSION, &table, 1).await.unwrap();

    cart.set_quantity(SESSION, &table, 4).await.unwrap();
    assert_eq!(cart.get(SESSION).await.unwrap().total, Decimal::from(51_000));

    cart.set_quantity(SESSION, &lampe, 0).await.unwrap();
    let panier = cart.get(SESSION).await.unwrap();
    assert_eq!(panier.count, 1);
    assert_eq!(panier.panier[0].product_id, table);

    assert!(matches!(
        cart.set_quantity(SESSION, &lampe, 2).await,
        Err(RepositoryError::NotFound)
    ));
    assert_eq!(cart.clear(SESSION).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_cart_unknown_product_is_not_found(pool: PgPool) {
    let err = CartRepository::new(&pool)
        .add(SESSION, &ProductId::new("0123456789abcdef0123456789abcdef"), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound));
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_republish_refreshes_without_reactivating(pool: PgPool) {
    let products = ProductRepository::new(&pool);
    let first = request("Lampe", 3000, &["Maison & Cuisine"]);
    let id = publish(&pool, &first).await;
    let published_at = products.get(&id).await.unwrap().unwrap().published_at;

    products.set_status(&id, ProductStatus::Inactive).await.unwrap();

    let mut again = first.clone();
    again.produit.prix = Some(Decimal::from(2500));
    assert_eq!(publish(&pool, &again).await, id);

    let (rows, total) = products.list(&ProductQuery::default()).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(rows.len(), 1);
    let stored = &rows[0];
    assert_eq!(stored.prix, Decimal::from(2500));
    assert_eq!(stored.status, ProductStatus::Inactive);
    assert_eq!(stored.published_at, published_at);
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_list_without_limit_returns_every_match(pool: PgPool) {
    for (nom, prix) in [("Lampe", 3000), ("Table", 12_000), ("Tapis", 8000)] {
        publish(&pool, &request(nom, prix, &[])).await;
    }
    let products = ProductRepository::new(&pool);

    let (all, total) = products.list(&ProductQuery::default()).await.unwrap();
    assert_eq!((all.len(), total), (3, 3));

    let page = ProductQuery {
        limit: Some(2),
        offset: Some(2),
        ..ProductQuery::default()
    };
    let (rows, total) = products.list(&page).await.unwrap();
    assert_eq!((rows.len(), total), (1, 3));
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_by_category_matches_text_name_and_slug(pool: PgPool) {
    let linked = publish(&pool, &request("Lampe", 3000, &["Maison & Cuisine"])).await;
    let mut legacy = request("Table", 12_000, &[]);
    legacy.produit.categorie = Some("Maison & Cuisine".to_owned());
    let legacy = publish(&pool, &legacy).await;
    let hidden = publish(&pool, &request("Tapis", 8000, &["Maison & Cuisine"])).await;
    publish(&pool, &request("Ballon", 5000, &["Sport & Loisirs"])).await;

    let products = ProductRepository::new(&pool);
    products.set_status(&hidden, ProductStatus::Inactive).await.unwrap();

    // The legacy text is split and linked too, so the slug finds both.
    let mut expected = vec![linked, legacy];
    expected.sort();
    for key in ["Maison & Cuisine", "maison-cuisine"] {
        let mut ids: Vec<ProductId> = products
            .by_category(key, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.product_id)
            .collect();
        ids.sort();
        assert_eq!(ids, expected, "category key {key}");
    }
    assert!(products.by_category("Mode & Beauté", 10).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_sales_totals_and_statistics(pool: PgPool) {
    let boutique = default_boutique(&pool).await;
    let sales = SaleRepository::new(&pool);

    let first = sale(boutique, "2025-03-02", "Sac", 5000, 2);
    let created = sales
        .create(&first, first.sale_date().unwrap())
        .await
        .unwrap();
    assert_eq!(created.total, Decimal::from(10_000));
    assert_eq!(created.boutique_nom.as_deref(), Some("Boutique Principale"));

    let mut thies = sale(boutique, "2025-03-15", "Sac", 5000, 1);
    thies.localisation = Some("Thiès".to_owned());
    record(&pool, &thies).await;
    record(&pool, &sale(boutique, "2025-03-20", "Montre", 20_000, 1)).await;
    record(&pool, &sale(boutique, "2024-12-31", "Montre", 20_000, 5)).await;

    let march = SaleFilter::for_period(2025, Some(3), None).unwrap();
    let stats = sales.stats(&march).await.unwrap();
    assert_eq!(stats.nb_ventes, 3);
    assert_eq!(stats.ca_total, Decimal::from(35_000));
    assert_eq!(stats.quantite_totale, 4);
    assert_eq!(stats.prix_moyen, Decimal::from(10_000));
    assert_eq!(stats.top_produits[0].produit, "Montre");
    assert_eq!(stats.top_produits[1].ca, Decimal::from(15_000));
    assert_eq!(stats.top_produits[1].quantite, 3);
    assert_eq!(stats.top_localisations[0].localisation, "Dakar");
    assert_eq!(stats.top_localisations[0].nb_ventes, 2);

    let year = SaleFilter::for_period(2025, Some(0), None).unwrap();
    assert_eq!(sales.list(&year).await.unwrap().len(), 3);
}

#[sqlx::test(migrations = "../api/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_top_products_are_capped_at_ten(pool: PgPool) {
    let boutique = default_boutique(&pool).await;
    for n in 1..=12 {
        record(
            &pool,
            &sale(boutique, "2025-06-01", &format!("Produit {n}"), 1000 * n, 1),
        )
        .await;
    }

    let stats = SaleRepository::new(&pool)
        .stats(&SaleFilter::default())
        .await
        .unwrap();
    assert_eq!(stats.nb_ventes, 12);
    assert_eq!(stats.top_produits.len(), 10);
    assert_eq!(stats.top_produits[0].produit, "Produit 12");
    assert_eq!(stats.top_localisations.len(), 1);
}
