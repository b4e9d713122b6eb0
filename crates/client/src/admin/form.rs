//! Admin product form: add and edit.
//!
//! Fields are kept as typed text. [`ProductForm::to_request`] validates them
//! and builds the payload; nothing goes over the network when validation
//! fails.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;

use marketplace_core::{
    Product, ProductId, ProductInput, ProductValidationError, PublishRequest, SeoDescription,
    UNCATEGORIZED, price_label,
};

use crate::api::{ApiClient, PublishOutcome};
use crate::error::ClientError;

/// Source recorded for products entered by hand.
const MANUAL_SOURCE: &str = "Manuel";

/// Values of the product form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductForm {
    pub nom: String,
    pub prix: String,
    pub prix_texte: String,
    pub image: String,
    /// Picked categories.
    pub categories: Vec<String>,
    /// Category typed in when none is picked.
    pub new_category: String,
    pub marque: String,
    pub lien: String,
    pub description_seo: String,
    pub meta_description: String,
    pub mots_cles: String,
}

#[derive(Deserialize)]
struct GeneratedSeo {
    #[serde(default)]
    description: Option<SeoDescription>,
}

fn trimmed(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

impl ProductForm {
    /// Form pre-filled for editing `product`.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            nom: product.nom.clone(),
            prix: product.prix.normalize().to_string(),
            prix_texte: product.prix_texte.clone().unwrap_or_default(),
            image: product.image.clone().unwrap_or_default(),
            categories: product
                .category_names()
                .into_iter()
                .map(str::to_owned)
                .collect(),
            new_category: String::new(),
            marque: product.marque.clone().unwrap_or_default(),
            lien: product.lien.clone().unwrap_or_default(),
            description_seo: product.description_seo.clone().unwrap_or_default(),
            meta_description: product.meta_description.clone().unwrap_or_default(),
            mots_cles: product.mots_cles.clone().unwrap_or_default(),
        }
    }

    /// Categories to send: the picked ones, else the typed one, else
    /// `Non catégorisé`.
    #[must_use]
    pub fn resolved_categories(&self) -> Vec<String> {
        let picked: Vec<String> = self.categories.iter().filter_map(|c| trimmed(c)).collect();
        if !picked.is_empty() {
            return picked;
        }
        trimmed(&self.new_category).map_or_else(|| vec![UNCATEGORIZED.to_owned()], |c| vec![c])
    }

    /// SEO block, sent only when a description was written.
    #[must_use]
    pub fn seo(&self, categories: &[String]) -> Option<SeoDescription> {
        let description = trimmed(&self.description_seo)?;
        Some(SeoDescription {
            description_seo: Some(description),
            meta_description: trimmed(&self.meta_description)
                .or_else(|| trimmed(&self.nom)),
            mots_cles: trimmed(&self.mots_cles).or_else(|| trimmed(&categories.join(", "))),
        })
    }

    /// Validate the form and build the publish payload.
    ///
    /// # Errors
    ///
    /// Returns [`ProductValidationError::MissingName`] for a blank name and
    /// [`ProductValidationError::MissingPrice`] when neither price field is
    /// filled.
    pub fn to_request(&self, session_id: &str) -> Result<PublishRequest, ProductValidationError> {
        let nom = trimmed(&self.nom).ok_or(ProductValidationError::MissingName)?;
        let prix_input = trimmed(&self.prix);
        let prix_texte = trimmed(&self.prix_texte);
        if prix_input.is_none() && prix_texte.is_none() {
            return Err(ProductValidationError::MissingPrice);
        }

        let prix = prix_input
            .and_then(|text| text.replace(',', ".").parse::<Decimal>().ok())
            .unwrap_or_default();
        let categories = self.resolved_categories();

        Ok(PublishRequest {
            produit: ProductInput {
                nom,
                prix: Some(prix),
                prix_texte: Some(prix_texte.unwrap_or_else(|| price_label(prix))),
                image: Some(self.image.trim().to_owned()),
                lien: Some(self.lien.trim().to_owned()),
                categorie: Some(categories.join(", ")),
                marque: Some(self.marque.trim().to_owned()),
                source: Some(MANUAL_SOURCE.to_owned()),
                categories: categories.clone(),
                ..ProductInput::default()
            },
            description_seo: self.seo(&categories),
            session_id: Some(session_id.to_owned()),
            ..PublishRequest::default()
        })
    }

    /// Publish the form as a new product.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] without any request when the form
    /// is invalid, otherwise the API error.
    pub async fn submit(&self, client: &ApiClient) -> Result<PublishOutcome, ClientError> {
        let request = self.to_request(&format!("admin_{}", Utc::now().timestamp_millis()))?;
        let outcome = client.publish_product(&request).await?;
        tracing::info!(product_id = %outcome.product_id, "Product published from form");
        Ok(outcome)
    }

    /// Save the form over an existing product.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] without any request when the form
    /// is invalid, otherwise the API error.
    pub async fn submit_update(
        &self,
        client: &ApiClient,
        id: &ProductId,
    ) -> Result<ProductId, ClientError> {
        let request =
            self.to_request(&format!("admin_edit_{}", Utc::now().timestamp_millis()))?;
        client.update_product(id, &request).await
    }

    /// Fill the SEO fields with generated copy for the name and brand.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] when the name is empty and
    /// [`ClientError::Parse`] when the generator returned no description.
    pub async fn fill_seo(&mut self, client: &ApiClient) -> Result<(), ClientError> {
        let Some(nom) = trimmed(&self.nom) else {
            return Err(ClientError::Validation(
                "Veuillez d'abord saisir le nom du produit".to_owned(),
            ));
        };
        let texte = match trimmed(&self.marque) {
            Some(marque) => format!("{nom} {marque}"),
            None => nom,
        };

        let generated: GeneratedSeo = serde_json::from_value(client.generate_seo(&texte).await?)
            .map_err(|e| ClientError::Parse(e.to_string()))?;
        let seo = generated
            .description
            .ok_or_else(|| ClientError::Parse("Aucune description générée".to_owned()))?;

        self.description_seo = seo.description_seo.unwrap_or_default();
        self.meta_description = seo.meta_description.unwrap_or_default();
        self.mots_cles = seo.mots_cles.unwrap_or_default();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(nom: &str, prix: &str) -> ProductForm {
        ProductForm {
            nom: nom.to_owned(),
            prix: prix.to_owned(),
            ..ProductForm::default()
        }
    }

    #[test]
    fn test_missing_name() {
        assert_eq!(
            form("  ", "1000").to_request("s").unwrap_err(),
            ProductValidationError::MissingName
        );
    }

    #[test]
    fn test_missing_price() {
        let err = form("Lampe", "").to_request("s").unwrap_err();
        assert_eq!(err.to_string(), "Le prix est obligatoire");

        let with_label = ProductForm {
            prix_texte: "Prix sur demande".to_owned(),
            ..form("Lampe", "")
        };
        let request = with_label.to_request("s").unwrap();
        assert_eq!(request.produit.prix, Some(Decimal::ZERO));
        assert_eq!(request.produit.prix_texte.as_deref(), Some("Prix sur demande"));
    }

    #[test]
    fn test_defaults() {
        let request = form("Lampe", "2500").to_request("admin_1").unwrap();
        assert_eq!(request.produit.categories, vec!["Non catégorisé".to_owned()]);
        assert_eq!(request.produit.prix_texte.as_deref(), Some("2500 FCFA"));
        assert_eq!(request.produit.source.as_deref(), Some("Manuel"));
        assert_eq!(request.session_id.as_deref(), Some("admin_1"));
        assert!(request.description_seo.is_none());
        assert_eq!(request.validate(), Ok(()));
    }

    #[test]
    fn test_typed_category_when_none_picked() {
        let picked = ProductForm {
            new_category: " Jardin ".to_owned(),
            ..form("Pelle", "10")
        };
        assert_eq!(picked.resolved_categories(), vec!["Jardin".to_owned()]);

        let both = ProductForm {
            categories: vec!["Maison".to_owned(), "Déco".to_owned()],
            ..picked
        };
        let request = both.to_request("s").unwrap();
        assert_eq!(request.produit.categorie.as_deref(), Some("Maison, Déco"));
    }

    #[test]
    fn test_seo_block_defaults() {
        let with_seo = ProductForm {
            description_seo: "Une lampe douce".to_owned(),
            categories: vec!["Maison".to_owned()],
            ..form("Lampe", "2500")
        };
        let seo = with_seo.to_request("s").unwrap().description_seo.unwrap();
        assert_eq!(seo.meta_description.as_deref(), Some("Lampe"));
        assert_eq!(seo.mots_cles.as_deref(), Some("Maison"));
    }

    #[tokio::test]
    async fn test_invalid_form_sends_nothing() {
        let config = crate::config::ClientConfig::new(
            url::Url::parse("http://127.0.0.1:1").unwrap(),
            url::Url::parse("http://127.0.0.1:1").unwrap(),
        );
        let client = ApiClient::new(&config).unwrap();
        let err = form("", "100").submit(&client).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(ref m) if m == "Le nom du produit est obligatoire"));
    }
}
