//! Sales journal and boutique endpoints.

use serde::{Deserialize, Serialize};

use marketplace_core::{
    Boutique, BoutiqueId, BoutiqueInput, Sale, SaleFilter, SaleId, SaleInput, SaleUpdate,
    SalesStats, parse_sale_date,
};

use super::{ApiClient, MessageEnvelope};
use crate::error::ClientError;

#[derive(Deserialize)]
struct BoutiquesEnvelope {
    boutiques: Vec<Boutique>,
}

#[derive(Deserialize)]
struct BoutiqueEnvelope {
    boutique: Boutique,
}

#[derive(Deserialize)]
struct SalesEnvelope {
    ventes: Vec<Sale>,
}

#[derive(Deserialize)]
struct SaleEnvelope {
    vente: Sale,
}

#[derive(Deserialize)]
struct StatsEnvelope {
    statistiques: SalesStats,
}

#[derive(Serialize)]
struct PeriodQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    mois: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    boutique_id: Option<BoutiqueId>,
}

impl ApiClient {
    /// All boutiques.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn boutiques(&self) -> Result<Vec<Boutique>, ClientError> {
        let envelope: BoutiquesEnvelope = self.get(self.api_url(&["boutiques"])?).await?;
        Ok(envelope.boutiques)
    }

    /// A single boutique.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] for an unknown id.
    pub async fn boutique(&self, id: BoutiqueId) -> Result<Boutique, ClientError> {
        let envelope: BoutiqueEnvelope = self
            .get(self.api_url(&["boutiques", &id.to_string()])?)
            .await?;
        Ok(envelope.boutique)
    }

    /// Create a boutique.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] for a blank name and
    /// [`ClientError::Api`] (409) when the name is taken.
    pub async fn create_boutique(&self, input: &BoutiqueInput) -> Result<Boutique, ClientError> {
        require_boutique_name(input)?;
        let envelope: BoutiqueEnvelope = self.post(self.api_url(&["boutiques"])?, input).await?;
        Ok(envelope.boutique)
    }

    /// Replace a boutique's fields.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] for an unknown id.
    pub async fn update_boutique(
        &self,
        id: BoutiqueId,
        input: &BoutiqueInput,
    ) -> Result<Boutique, ClientError> {
        require_boutique_name(input)?;
        let envelope: BoutiqueEnvelope = self
            .put(self.api_url(&["boutiques", &id.to_string()])?, input)
            .await?;
        Ok(envelope.boutique)
    }

    /// Delete a boutique and its sales.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] for an unknown id.
    pub async fn delete_boutique(&self, id: BoutiqueId) -> Result<(), ClientError> {
        let _: MessageEnvelope = self
            .delete(self.api_url(&["boutiques", &id.to_string()])?)
            .await?;
        Ok(())
    }

    /// Sales matching `filter`, most recent first.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn sales(&self, filter: &SaleFilter) -> Result<Vec<Sale>, ClientError> {
        let envelope: SalesEnvelope = self
            .get_query(self.api_url(&["journal-vente"])?, filter)
            .await?;
        Ok(envelope.ventes)
    }

    /// A single sale.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] for an unknown id.
    pub async fn sale(&self, id: SaleId) -> Result<Sale, ClientError> {
        let envelope: SaleEnvelope = self
            .get(self.api_url(&["journal-vente", &id.to_string()])?)
            .await?;
        Ok(envelope.vente)
    }

    /// Record a sale.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] for a malformed date, without
    /// sending anything.
    pub async fn create_sale(&self, input: &SaleInput) -> Result<Sale, ClientError> {
        parse_sale_date(&input.date_vente).map_err(|e| ClientError::Validation(e.to_string()))?;
        let envelope: SaleEnvelope = self
            .post(self.api_url(&["journal-vente"])?, input)
            .await?;
        Ok(envelope.vente)
    }

    /// Apply a partial update to a sale and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] for a malformed date and
    /// [`ClientError::NotFound`] for an unknown id.
    pub async fn update_sale(&self, id: SaleId, update: &SaleUpdate) -> Result<Sale, ClientError> {
        update
            .sale_date()
            .map_err(|e| ClientError::Validation(e.to_string()))?;
        let envelope: SaleEnvelope = self
            .put(self.api_url(&["journal-vente", &id.to_string()])?, update)
            .await?;
        Ok(envelope.vente)
    }

    /// Delete a sale.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotFound`] for an unknown id.
    pub async fn delete_sale(&self, id: SaleId) -> Result<(), ClientError> {
        let _: MessageEnvelope = self
            .delete(self.api_url(&["journal-vente", &id.to_string()])?)
            .await?;
        Ok(())
    }

    /// Totals and rankings over the sales matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn sales_stats(&self, filter: &SaleFilter) -> Result<SalesStats, ClientError> {
        let envelope: StatsEnvelope = self
            .get_query(self.api_url(&["journal-vente", "statistiques"])?, filter)
            .await?;
        Ok(envelope.statistiques)
    }

    /// Sales of a year, or of one month of it.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails.
    pub async fn sales_for_period(
        &self,
        annee: i32,
        mois: Option<u32>,
        boutique_id: Option<BoutiqueId>,
    ) -> Result<Vec<Sale>, ClientError> {
        let envelope: SalesEnvelope = self
            .get_query(
                self.api_url(&["journal-vente", "periode", &annee.to_string()])?,
                &PeriodQuery { mois, boutique_id },
            )
            .await?;
        Ok(envelope.ventes)
    }
}

fn require_boutique_name(input: &BoutiqueInput) -> Result<(), ClientError> {
    if input.nom.trim().is_empty() {
        return Err(ClientError::Validation(
            "Le nom de la boutique est obligatoire".to_owned(),
        ));
    }
    Ok(())
}
