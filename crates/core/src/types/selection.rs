//! Entries of the locally persisted product selections.
//!
//! The shop builder ("boutique") and the marketing campaign page both keep a
//! list of hand-picked products on the client. Entries are a trimmed-down
//! product shape with every field filled in.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::price::{decimal_number, opt_decimal_number, price_label};
use super::product::{ProductInput, PublishRequest};

/// Prefix of images embedded inline as base64.
pub const INLINE_IMAGE_PREFIX: &str = "data:image/";
/// Inline images longer than this are dropped when an entry is added.
pub const MAX_INLINE_IMAGE_CHARS: usize = 100_000;
/// Name given to entries that arrive without one.
pub const UNNAMED_PRODUCT: &str = "Produit sans nom";
/// Rating shown when the source had none.
pub const MISSING_RATING: &str = "N/A";
/// Source assumed for entries that do not name one.
pub const DEFAULT_SELECTION_SOURCE: &str = "Jumia";

/// Whether `image` is an inline `data:image/...` URL.
#[must_use]
pub fn is_inline_image(image: &str) -> bool {
    image.starts_with(INLINE_IMAGE_PREFIX)
}

/// A product as scraped or picked, before normalization.
///
/// Every field is optional; [`SelectedProduct::from_raw`] fills the gaps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProduct {
    #[serde(default)]
    pub nom: Option<String>,
    #[serde(default, with = "opt_decimal_number")]
    pub prix: Option<Decimal>,
    #[serde(default)]
    pub prix_texte: Option<String>,
    #[serde(default)]
    pub lien: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub marque: Option<String>,
    #[serde(default)]
    pub categorie: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub remise: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// A normalized selection entry, as persisted under `boutique_produits`
/// and `campagne_produits`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedProduct {
    pub nom: String,
    #[serde(with = "decimal_number")]
    pub prix: Decimal,
    pub prix_texte: String,
    #[serde(default)]
    pub lien: String,
    /// Empty when the image was dropped or never existed.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,
    #[serde(default)]
    pub marque: String,
    #[serde(default)]
    pub categorie: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub remise: String,
    #[serde(default)]
    pub source: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.is_empty())
}

impl SelectedProduct {
    /// Normalize a raw product into a selection entry.
    ///
    /// Oversized inline images are dropped here, before the entry is stored.
    #[must_use]
    pub fn from_raw(raw: RawProduct) -> Self {
        let prix = raw.prix.unwrap_or_default();
        let image = non_empty(raw.image)
            .filter(|image| !(is_inline_image(image) && image.len() > MAX_INLINE_IMAGE_CHARS))
            .unwrap_or_default();

        Self {
            nom: non_empty(raw.nom).unwrap_or_else(|| UNNAMED_PRODUCT.to_owned()),
            prix_texte: non_empty(raw.prix_texte).unwrap_or_else(|| price_label(prix)),
            prix,
            lien: raw.lien.unwrap_or_default(),
            image,
            marque: raw.marque.unwrap_or_default(),
            categorie: raw.categorie.unwrap_or_default(),
            note: non_empty(raw.note).unwrap_or_else(|| MISSING_RATING.to_owned()),
            remise: raw.remise.unwrap_or_default(),
            source: non_empty(raw.source)
                .unwrap_or_else(|| DEFAULT_SELECTION_SOURCE.to_owned()),
        }
    }

    /// Whether two entries refer to the same product.
    ///
    /// Compared by `lien` when both have one, otherwise by `nom`.
    #[must_use]
    pub fn is_same_as(&self, other: &Self) -> bool {
        if !self.lien.is_empty() && !other.lien.is_empty() {
            return self.lien == other.lien;
        }
        !self.nom.is_empty() && self.nom == other.nom
    }

    /// Whether the entry carries an inline base64 image.
    #[must_use]
    pub fn has_inline_image(&self) -> bool {
        is_inline_image(&self.image)
    }

    /// Drop the image if it is inline. Returns whether anything was removed.
    pub fn strip_inline_image(&mut self) -> bool {
        if self.has_inline_image() {
            self.image.clear();
            true
        } else {
            false
        }
    }

    /// Convert into a publish payload for the marketplace API.
    #[must_use]
    pub fn to_publish_request(&self) -> PublishRequest {
        PublishRequest {
            produit: ProductInput {
                nom: self.nom.clone(),
                prix: Some(self.prix),
                prix_texte: Some(self.prix_texte.clone()),
                image: non_empty(Some(self.image.clone())),
                lien: non_empty(Some(self.lien.clone())),
                categorie: non_empty(Some(self.categorie.clone())),
                marque: non_empty(Some(self.marque.clone())),
                note: non_empty(Some(self.note.clone())),
                remise: non_empty(Some(self.remise.clone())),
                source: non_empty(Some(self.source.clone())),
                ..ProductInput::default()
            },
            ..PublishRequest::default()
        }
    }
}

impl From<RawProduct> for SelectedProduct {
    fn from(raw: RawProduct) -> Self {
        Self::from_raw(raw)
    }
}

/// Strip inline images from every entry. Returns how many were removed.
pub fn strip_inline_images(entries: &mut [SelectedProduct]) -> usize {
    entries
        .iter_mut()
        .map(SelectedProduct::strip_inline_image)
        .filter(|stripped| *stripped)
        .count()
}

/// A marketing campaign: a name, its products and the generated copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketingCampaign {
    pub nom: String,
    pub produits: Vec<SelectedProduct>,
    /// Generated descriptions, as returned by the copy generator.
    #[serde(default)]
    pub descriptions: Vec<Value>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(nom: &str, lien: &str) -> SelectedProduct {
        SelectedProduct::from_raw(RawProduct {
            nom: Some(nom.to_owned()),
            lien: Some(lien.to_owned()),
            ..RawProduct::default()
        })
    }

    #[test]
    fn test_fallbacks() {
        let product = SelectedProduct::from_raw(RawProduct::default());
        assert_eq!(product.nom, "Produit sans nom");
        assert_eq!(product.prix, Decimal::ZERO);
        assert_eq!(product.prix_texte, "0 FCFA");
        assert_eq!(product.note, "N/A");
        assert_eq!(product.source, "Jumia");
        assert_eq!(product.lien, "");
        assert_eq!(product.marque, "");
    }

    #[test]
    fn test_price_text_derived_from_price() {
        let product = SelectedProduct::from_raw(RawProduct {
            prix: Some(Decimal::from(4500)),
            ..RawProduct::default()
        });
        assert_eq!(product.prix_texte, "4500 FCFA");
    }

    #[test]
    fn test_oversized_inline_image_dropped() {
        let big = format!("data:image/png;base64,{}", "A".repeat(MAX_INLINE_IMAGE_CHARS));
        let product = SelectedProduct::from_raw(RawProduct {
            image: Some(big),
            ..RawProduct::default()
        });
        assert!(product.image.is_empty());

        let small = "data:image/png;base64,AAAA".to_owned();
        let product = SelectedProduct::from_raw(RawProduct {
            image: Some(small.clone()),
            ..RawProduct::default()
        });
        assert_eq!(product.image, small);
    }

    #[test]
    fn test_remote_images_are_never_dropped() {
        let url = format!("https://cdn.example/{}", "a".repeat(MAX_INLINE_IMAGE_CHARS));
        let product = SelectedProduct::from_raw(RawProduct {
            image: Some(url.clone()),
            ..RawProduct::default()
        });
        assert_eq!(product.image, url);
    }

    #[test]
    fn test_identity_by_link_then_name() {
        assert!(entry("A", "https://x/1").is_same_as(&entry("B", "https://x/1")));
        assert!(!entry("A", "https://x/1").is_same_as(&entry("A", "https://x/2")));
        assert!(entry("A", "").is_same_as(&entry("A", "https://x/2")));
        assert!(!entry("A", "").is_same_as(&entry("B", "")));
    }

    #[test]
    fn test_strip_inline_images() {
        let mut entries = vec![entry("A", "1"), entry("B", "2")];
        entries[0].image = "data:image/jpeg;base64,xyz".to_owned();
        entries[1].image = "https://cdn/x.jpg".to_owned();
        assert_eq!(strip_inline_images(&mut entries), 1);
        assert!(entries[0].image.is_empty());
        assert_eq!(entries[1].image, "https://cdn/x.jpg");
    }

    #[test]
    fn test_stripped_image_is_omitted_from_json() {
        let product = entry("A", "1");
        let value = serde_json::to_value(&product).unwrap();
        assert!(value.get("image").is_none());
        let back: SelectedProduct = serde_json::from_value(value).unwrap();
        assert_eq!(back, product);
    }

    #[test]
    fn test_raw_accepts_string_price() {
        let raw: RawProduct =
            serde_json::from_value(json!({"nom": "Lampe", "prix": "3000"})).unwrap();
        assert_eq!(SelectedProduct::from(raw).prix, Decimal::from(3000));
    }

    #[test]
    fn test_publish_request_from_selection() {
        let req = entry("Lampe", "https://x/lampe").to_publish_request();
        assert_eq!(req.produit.nom, "Lampe");
        assert_eq!(req.produit.lien.as_deref(), Some("https://x/lampe"));
        assert_eq!(req.produit.image, None);
        assert_eq!(req.validate(), Ok(()));
    }
}
