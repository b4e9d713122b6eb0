//! Marketplace product model and publication payloads.
//!
//! Products arrive from the sourcing tools as loosely-typed JSON (prices as
//! numbers or strings, categories as a single string or a list). The input
//! types here accept that shape and resolve it into a [`ProductWrite`], the
//! normalized row the API persists.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use super::id::ProductId;
use super::price::{decimal_number, opt_decimal_number, price_label};
use super::status::ProductStatus;

/// Source recorded when a publish request does not name one.
pub const DEFAULT_PUBLISH_SOURCE: &str = "Jumia";
/// Source recorded when an update request does not name one.
pub const DEFAULT_UPDATE_SOURCE: &str = "Manuel";
/// Category assigned by the admin form when none is picked.
pub const UNCATEGORIZED: &str = "Non catégorisé";

/// A product as stored and served by the marketplace API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: ProductId,
    pub nom: String,
    pub description_seo: Option<String>,
    pub meta_description: Option<String>,
    pub mots_cles: Option<String>,
    #[serde(with = "decimal_number")]
    pub prix: Decimal,
    pub prix_texte: Option<String>,
    pub image: Option<String>,
    pub lien: Option<String>,
    /// Categories joined with `", "`.
    pub categorie: Option<String>,
    pub marque: Option<String>,
    pub note: Option<String>,
    pub remise: Option<String>,
    /// `Jumia`, `Alibaba` or `Manuel`.
    pub source: Option<String>,
    /// Google Trends score.
    pub validation_score: Option<i32>,
    #[serde(default)]
    pub validated: bool,
    pub niche_score: Option<f64>,
    pub niche_level: Option<String>,
    #[serde(default)]
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    /// `web`, `api` or `import`.
    pub source_channel: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    /// `{validation, niche, original_product}` as captured at publish time.
    #[serde(default)]
    pub features: Value,
}

impl Product {
    /// Price label, falling back to `"<prix> FCFA"`.
    #[must_use]
    pub fn display_price(&self) -> String {
        self.prix_texte
            .as_deref()
            .filter(|label| !label.is_empty())
            .map_or_else(|| price_label(self.prix), str::to_owned)
    }

    /// Category names, split back out of the stored text.
    #[must_use]
    pub fn category_names(&self) -> Vec<&str> {
        self.categorie
            .as_deref()
            .map(|text| {
                text.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Product payload sent by the sourcing tools and the admin form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default)]
    pub nom: String,
    #[serde(default, with = "opt_decimal_number")]
    pub prix: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prix_texte: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lien: Option<String>,
    /// Single category (legacy shape).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categorie: Option<String>,
    /// Multiple categories; takes precedence over `categorie` when non-empty.
    #[serde(
        default,
        deserialize_with = "string_or_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marque: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remise: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl ProductInput {
    /// Category component of the product id: the sorted list joined with `,`,
    /// or the single `categorie` string.
    #[must_use]
    pub fn category_key(&self) -> String {
        if self.categories.is_empty() {
            self.categorie.clone().unwrap_or_default()
        } else {
            let mut sorted = self.categories.clone();
            sorted.sort();
            sorted.join(",")
        }
    }

    /// Category text stored on the product row (list joined with `", "`).
    #[must_use]
    pub fn category_text(&self) -> String {
        if self.categories.is_empty() {
            self.categorie.clone().unwrap_or_default()
        } else {
            self.categories.join(", ")
        }
    }

    /// Content-derived id of this product.
    #[must_use]
    pub fn product_id(&self) -> ProductId {
        ProductId::derive(
            &self.nom,
            self.lien.as_deref().unwrap_or_default(),
            &self.category_key(),
        )
    }

    /// Price label, falling back to `"<prix> FCFA"`.
    #[must_use]
    pub fn price_text(&self) -> String {
        match self.prix_texte.as_deref() {
            Some(label) if !label.trim().is_empty() => label.to_owned(),
            _ => price_label(self.prix.unwrap_or_default()),
        }
    }
}

/// Accept `"a"`, `["a", "b"]` or `null` for a list of strings.
fn string_or_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(single)) if single.trim().is_empty() => Vec::new(),
        Some(OneOrMany::One(single)) => vec![single],
        Some(OneOrMany::Many(many)) => many
            .into_iter()
            .filter(|name| !name.trim().is_empty())
            .collect(),
    })
}

/// Accept `"a, b"` or `["a", "b"]` as a comma-separated string.
fn joined_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextOrList {
        Text(String),
        List(Vec<String>),
    }

    Ok(
        Option::<TextOrList>::deserialize(deserializer)?.map(|value| match value {
            TextOrList::Text(text) => text,
            TextOrList::List(list) => list.join(", "),
        }),
    )
}

/// Generated SEO copy attached to a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeoDescription {
    #[serde(default)]
    pub description_seo: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default, deserialize_with = "joined_text")]
    pub mots_cles: Option<String>,
}

impl SeoDescription {
    /// Whether there is any description text worth sending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.description_seo
            .as_deref()
            .is_none_or(|text| text.trim().is_empty())
    }
}

/// Google Trends validation result captured at publish time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationData {
    #[serde(default)]
    pub score: Option<i32>,
    #[serde(default)]
    pub validated: bool,
    /// Anything else the validator returned, kept for the features blob.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Niche analysis result captured at publish time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NicheData {
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `POST /publish-product` and `PUT /products/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub produit: ProductInput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_seo: Option<SeoDescription>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_data: Option<ValidationData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub niche_data: Option<NicheData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Reasons a product payload is refused before it reaches the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProductValidationError {
    #[error("Le nom du produit est obligatoire")]
    MissingName,
    #[error("Le prix est obligatoire")]
    MissingPrice,
}

/// Whether a write creates/refreshes a product or edits an existing one.
///
/// The two paths differ in their defaults (`source`, validation score).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Publish,
    Update,
}

/// Normalized column values for inserting or updating a product row.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductWrite {
    pub nom: String,
    pub description_seo: Option<String>,
    pub meta_description: Option<String>,
    pub mots_cles: Option<String>,
    pub prix: Decimal,
    pub prix_texte: String,
    pub image: String,
    pub lien: String,
    pub categorie: String,
    pub marque: String,
    pub note: String,
    pub remise: String,
    pub source: String,
    pub validation_score: Option<i32>,
    pub validated: bool,
    pub niche_score: Option<f64>,
    pub niche_level: Option<String>,
    pub features: Value,
    /// Category names to link, empty when only the legacy `categorie` was given.
    pub categories: Vec<String>,
}

impl PublishRequest {
    /// Check the fields the admin form insists on.
    ///
    /// # Errors
    ///
    /// Returns [`ProductValidationError`] for a blank name or when neither
    /// `prix` nor `prix_texte` is given.
    pub fn validate(&self) -> Result<(), ProductValidationError> {
        if self.produit.nom.trim().is_empty() {
            return Err(ProductValidationError::MissingName);
        }
        let has_text = self
            .produit
            .prix_texte
            .as_deref()
            .is_some_and(|label| !label.trim().is_empty());
        if self.produit.prix.is_none() && !has_text {
            return Err(ProductValidationError::MissingPrice);
        }
        Ok(())
    }

    /// Resolve the payload into the column values to persist.
    #[must_use]
    pub fn to_write(&self, mode: WriteMode) -> ProductWrite {
        let produit = &self.produit;
        let seo = self.description_seo.clone().unwrap_or_default();
        let default_source = match mode {
            WriteMode::Publish => DEFAULT_PUBLISH_SOURCE,
            WriteMode::Update => DEFAULT_UPDATE_SOURCE,
        };
        let validation_score = self.validation_data.as_ref().and_then(|data| match mode {
            WriteMode::Publish => Some(data.score.unwrap_or(0)),
            WriteMode::Update => data.score,
        });

        ProductWrite {
            nom: produit.nom.clone(),
            description_seo: seo.description_seo,
            meta_description: seo.meta_description,
            mots_cles: seo.mots_cles,
            prix: produit.prix.unwrap_or_default(),
            prix_texte: produit.price_text(),
            image: produit.image.clone().unwrap_or_default(),
            lien: produit.lien.clone().unwrap_or_default(),
            categorie: produit.category_text(),
            marque: produit.marque.clone().unwrap_or_default(),
            note: produit.note.clone().unwrap_or_default(),
            remise: produit.remise.clone().unwrap_or_default(),
            source: produit
                .source
                .clone()
                .filter(|source| !source.is_empty())
                .unwrap_or_else(|| default_source.to_owned()),
            validation_score,
            validated: self
                .validation_data
                .as_ref()
                .is_some_and(|data| data.validated),
            niche_score: self.niche_data.as_ref().and_then(|data| data.score),
            niche_level: self.niche_data.as_ref().and_then(|data| data.level.clone()),
            features: json!({
                "validation": self.validation_data,
                "niche": self.niche_data,
                "original_product": produit,
            }),
            categories: produit.categories.clone(),
        }
    }
}

/// Body of `PATCH /products/{id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// Listing filters for `GET /products`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProductStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categorie: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

/// One page of products with the unpaginated total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    pub produits: Vec<Product>,
    pub count: usize,
    pub total: u64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input(value: Value) -> ProductInput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_categories_accept_string_or_list() {
        let single = input(json!({"nom": "Sac", "categories": "Mode & Beauté"}));
        assert_eq!(single.categories, vec!["Mode & Beauté"]);

        let many = input(json!({"nom": "Sac", "categories": ["B", "A"]}));
        assert_eq!(many.categories, vec!["B", "A"]);

        let none = input(json!({"nom": "Sac", "categories": null}));
        assert!(none.categories.is_empty());
    }

    #[test]
    fn test_product_id_ignores_category_order() {
        let a = input(json!({"nom": "Sac", "lien": "https://x/sac", "categories": ["B", "A"]}));
        let b = input(json!({"nom": "Sac", "lien": "https://x/sac", "categories": ["A", "B"]}));
        assert_eq!(a.product_id(), b.product_id());
        assert_eq!(a.category_key(), "A,B");
        assert_eq!(a.category_text(), "B, A");
    }

    #[test]
    fn test_product_id_falls_back_to_single_category() {
        let legacy = input(json!({"nom": "Sac", "lien": "l", "categorie": "A"}));
        let listed = input(json!({"nom": "Sac", "lien": "l", "categories": ["A"]}));
        assert_eq!(legacy.product_id(), listed.product_id());
        assert_eq!(legacy.product_id(), ProductId::derive("Sac", "l", "A"));
    }

    #[test]
    fn test_validate_requires_name_and_price() {
        let mut req = PublishRequest::default();
        assert_eq!(req.validate(), Err(ProductValidationError::MissingName));

        req.produit.nom = "  ".to_owned();
        assert_eq!(req.validate(), Err(ProductValidationError::MissingName));

        req.produit.nom = "Montre".to_owned();
        assert_eq!(req.validate(), Err(ProductValidationError::MissingPrice));
        assert_eq!(
            ProductValidationError::MissingPrice.to_string(),
            "Le prix est obligatoire"
        );

        req.produit.prix_texte = Some("12 000 FCFA".to_owned());
        assert_eq!(req.validate(), Ok(()));

        req.produit.prix_texte = None;
        req.produit.prix = Some(Decimal::from(12_000));
        assert_eq!(req.validate(), Ok(()));
    }

    #[test]
    fn test_write_defaults_on_publish() {
        let req: PublishRequest = serde_json::from_value(json!({
            "produit": {"nom": "Montre", "prix": 15000},
            "validation_data": {"validated": true, "trend": "up"}
        }))
        .unwrap();
        let write = req.to_write(WriteMode::Publish);
        assert_eq!(write.source, "Jumia");
        assert_eq!(write.prix_texte, "15000 FCFA");
        assert_eq!(write.validation_score, Some(0));
        assert!(write.validated);
        assert_eq!(write.features["validation"]["trend"], "up");
        assert_eq!(write.features["original_product"]["nom"], "Montre");
    }

    #[test]
    fn test_write_defaults_on_update() {
        let req: PublishRequest = serde_json::from_value(json!({
            "produit": {"nom": "Montre", "prix": "15000", "prix_texte": "15 000 F"},
            "validation_data": {}
        }))
        .unwrap();
        let write = req.to_write(WriteMode::Update);
        assert_eq!(write.source, "Manuel");
        assert_eq!(write.prix_texte, "15 000 F");
        assert_eq!(write.validation_score, None);
        assert!(!write.validated);
    }

    #[test]
    fn test_seo_keywords_accept_list() {
        let seo: SeoDescription = serde_json::from_value(json!({
            "description_seo": "Une montre",
            "mots_cles": ["montre", "luxe"]
        }))
        .unwrap();
        assert_eq!(seo.mots_cles.as_deref(), Some("montre, luxe"));
        assert!(!seo.is_empty());
        assert!(SeoDescription::default().is_empty());
    }

    #[test]
    fn test_product_category_names() {
        let product: Product = serde_json::from_value(json!({
            "product_id": "abc",
            "nom": "Montre",
            "description_seo": null,
            "meta_description": null,
            "mots_cles": null,
            "prix": 1000,
            "prix_texte": "",
            "image": null,
            "lien": null,
            "categorie": "A, B",
            "marque": null,
            "note": null,
            "remise": null,
            "source": "Jumia",
            "validation_score": null,
            "niche_score": null,
            "niche_level": null,
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-01T00:00:00Z",
            "published_at": null,
            "source_channel": "web",
            "user_id": null,
            "session_id": null
        }))
        .unwrap();
        assert_eq!(product.category_names(), vec!["A", "B"]);
        assert_eq!(product.display_price(), "1000 FCFA");
        assert_eq!(product.status, ProductStatus::Active);
    }
}
