//! Main backend endpoints: sourcing, trends, copy generation and agents.
//!
//! The backend owns these schemas; answers come back as raw JSON.

use serde::Serialize;
use serde_json::{Value, json};

use marketplace_core::SelectedProduct;

use super::ApiClient;
use crate::error::ClientError;

/// Products needed before a niche can be assessed.
pub const MIN_NICHE_PRODUCTS: usize = 3;

/// Copy style asked for when generating campaign descriptions.
const CAMPAIGN_STYLE: &str = "attractif";

/// CSV layout produced by `generate-boutique-csv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CsvExport {
    Wordpress,
    Shopify,
}

/// Autonomous agents exposed by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Agent {
    Sourcing,
    Seo,
    Marketing,
    Price,
}

impl Agent {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sourcing => "sourcing",
            Self::Seo => "seo",
            Self::Marketing => "marketing",
            Self::Price => "price",
        }
    }

    /// Parameters the dashboard sends with a run.
    #[must_use]
    pub fn default_params(self) -> Value {
        match self {
            Self::Sourcing | Self::Seo => json!({"limit": 5}),
            Self::Price => json!({"limit": 10}),
            Self::Marketing => json!({}),
        }
    }
}

#[derive(Serialize)]
struct TrendsBody<'a> {
    keywords: &'a [String],
    timeframe: &'a str,
    geo: &'a str,
}

#[derive(Serialize)]
struct ProductsBody<'a, T: Serialize> {
    produits: &'a [T],
}

impl ApiClient {
    /// Alibaba categories.
    ///
    /// # Errors
    ///
    /// Returns error if the backend request fails.
    pub async fn alibaba_categories(&self) -> Result<Value, ClientError> {
        self.get(self.backend_url(&["categories-alibaba"])?).await
    }

    /// Jumia competitive watch for a category.
    ///
    /// # Errors
    ///
    /// Returns error if the backend request fails.
    pub async fn competitive_watch(
        &self,
        categorie: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Value, ClientError> {
        #[derive(Serialize)]
        struct Query<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            categorie: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            limit: Option<u32>,
        }

        self.get_query(
            self.backend_url(&["veille-concurrentielle"])?,
            &Query { categorie, limit },
        )
        .await
    }

    /// Alibaba watch, filtered by category, search term and sort order.
    ///
    /// # Errors
    ///
    /// Returns error if the backend request fails.
    pub async fn alibaba_watch(
        &self,
        categorie: Option<&str>,
        terme: Option<&str>,
        tri: Option<&str>,
    ) -> Result<Value, ClientError> {
        #[derive(Serialize)]
        struct Query<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            categorie: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            terme: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            tri: Option<&'a str>,
        }

        let terme = terme.map(str::trim).filter(|term| !term.is_empty());
        self.get_query(
            self.backend_url(&["veille-alibaba"])?,
            &Query {
                categorie,
                terme,
                tri,
            },
        )
        .await
    }

    /// Analyse a product and find look-alikes.
    ///
    /// # Errors
    ///
    /// Returns error if the backend request fails.
    pub async fn analyse_product(
        &self,
        nom_produit: &str,
        lien: Option<&str>,
    ) -> Result<Value, ClientError> {
        self.post(
            self.backend_url(&["analyse"])?,
            &json!({"nom_produit": nom_produit, "lien": lien}),
        )
        .await
    }

    /// WordPress CSV of analysed products.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] for an empty list.
    pub async fn generate_csv(&self, produits: &[Value]) -> Result<Vec<u8>, ClientError> {
        require_products(produits.len())?;
        self.post_bytes(
            self.backend_url(&["generate-csv"])?,
            &ProductsBody { produits },
        )
        .await
    }

    /// CSV export of the boutique selection.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] for an empty list.
    pub async fn generate_boutique_csv(
        &self,
        produits: &[SelectedProduct],
        export_type: CsvExport,
    ) -> Result<Vec<u8>, ClientError> {
        require_products(produits.len())?;
        self.post_bytes(
            self.backend_url(&["generate-boutique-csv"])?,
            &json!({"produits": produits, "export_type": export_type}),
        )
        .await
    }

    /// Coherence analysis of the boutique selection.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] with fewer than three products,
    /// without sending anything.
    pub async fn validate_niche(&self, produits: &[SelectedProduct]) -> Result<Value, ClientError> {
        if produits.len() < MIN_NICHE_PRODUCTS {
            return Err(ClientError::Validation(
                "Il faut au moins 3 produits pour valider la niche".to_owned(),
            ));
        }
        self.post(
            self.backend_url(&["boutique", "valider-niche"])?,
            &ProductsBody { produits },
        )
        .await
    }

    /// SEO descriptions for every product of the boutique selection.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] for an empty list.
    pub async fn generate_descriptions(
        &self,
        produits: &[SelectedProduct],
    ) -> Result<Value, ClientError> {
        require_products(produits.len())?;
        self.post(
            self.backend_url(&["boutique", "generate-descriptions-batch"])?,
            &ProductsBody { produits },
        )
        .await
    }

    /// Advertising copy for every product of a campaign.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] for an empty list.
    pub async fn generate_campaign_copy(
        &self,
        produits: &[SelectedProduct],
    ) -> Result<Value, ClientError> {
        require_products(produits.len())?;
        self.post(
            self.backend_url(&["marketing", "generate-batch"])?,
            &json!({"produits": produits, "style": CAMPAIGN_STYLE}),
        )
        .await
    }

    /// Save a campaign with its products and copy.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] for a blank name or no products.
    pub async fn save_campaign(
        &self,
        nom: &str,
        produits: &[SelectedProduct],
        descriptifs: &[Value],
    ) -> Result<Value, ClientError> {
        let nom = nom.trim();
        if nom.is_empty() {
            return Err(ClientError::Validation(
                "Veuillez entrer un nom de campagne".to_owned(),
            ));
        }
        if produits.is_empty() {
            return Err(ClientError::Validation(
                "Aucun produit dans la campagne".to_owned(),
            ));
        }
        self.post(
            self.backend_url(&["marketing", "campaign"])?,
            &json!({"nom_campagne": nom, "produits": produits, "descriptifs": descriptifs}),
        )
        .await
    }

    /// Google Trends interest for keywords.
    ///
    /// # Errors
    ///
    /// Returns error if the backend request fails.
    pub async fn trends(
        &self,
        keywords: &[String],
        timeframe: &str,
        geo: &str,
    ) -> Result<Value, ClientError> {
        self.post(
            self.backend_url(&["trends"])?,
            &TrendsBody {
                keywords,
                timeframe,
                geo,
            },
        )
        .await
    }

    /// Compare keywords on Google Trends.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] with fewer than two keywords.
    pub async fn compare_trends(
        &self,
        keywords: &[String],
        timeframe: &str,
        geo: &str,
    ) -> Result<Value, ClientError> {
        if keywords.len() < 2 {
            return Err(ClientError::Validation(
                "Veuillez entrer au moins 2 mots-clés pour comparer".to_owned(),
            ));
        }
        self.post(
            self.backend_url(&["trends", "compare"])?,
            &TrendsBody {
                keywords,
                timeframe,
                geo,
            },
        )
        .await
    }

    /// Validate one product against Google Trends.
    ///
    /// # Errors
    ///
    /// Returns error if the backend request fails.
    pub async fn validate_trend_product(
        &self,
        produit: &Value,
        timeframe: &str,
        geo: &str,
    ) -> Result<Value, ClientError> {
        self.post(
            self.backend_url(&["trends", "validate-product"])?,
            &json!({"produit": produit, "timeframe": timeframe, "geo": geo}),
        )
        .await
    }

    /// Validate several products against Google Trends.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] for an empty list.
    pub async fn validate_trend_products(
        &self,
        produits: &[Value],
        timeframe: &str,
        geo: &str,
    ) -> Result<Value, ClientError> {
        require_products(produits.len())?;
        self.post(
            self.backend_url(&["trends", "validate-products"])?,
            &json!({"produits": produits, "timeframe": timeframe, "geo": geo}),
        )
        .await
    }

    /// Run an agent. `params` defaults to what the dashboard sends.
    ///
    /// # Errors
    ///
    /// Returns error if the backend request fails.
    pub async fn run_agent(&self, agent: Agent, params: Option<Value>) -> Result<Value, ClientError> {
        let params = params.unwrap_or_else(|| agent.default_params());
        tracing::info!(agent = agent.as_str(), "Running agent");
        self.post(self.backend_url(&["agents", agent.as_str(), "run"])?, &params)
            .await
    }
}

fn require_products(count: usize) -> Result<(), ClientError> {
    if count == 0 {
        return Err(ClientError::Validation("Aucun produit à exporter".to_owned()));
    }
    Ok(())
}
