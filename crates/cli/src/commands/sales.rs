//! Sales journal commands.
//!
//! # Usage
//!
//! ```bash
//! # Figures for one boutique since March
//! mkt sales stats --boutique 1 --from 2025-03-01
//!
//! # Sales of April 2025
//! mkt sales period 2025 --month 4
//! ```

use chrono::NaiveDate;
use marketplace_client::{ApiClient, ClientError};
use marketplace_core::{BoutiqueId, SaleFilter};

/// Print the aggregated figures matching the filter.
///
/// # Errors
///
/// Returns the API error.
pub async fn stats(
    client: &ApiClient,
    boutique: Option<i32>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<(), ClientError> {
    let filter = SaleFilter {
        boutique_id: boutique.map(BoutiqueId::new),
        date_debut: from,
        date_fin: to,
        ..SaleFilter::default()
    };
    let stats = client.sales_stats(&filter).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("Ventes: {}", stats.nb_ventes);
        println!("Chiffre d'affaires: {} FCFA", stats.ca_total.round_dp(2).normalize());
        println!("Prix moyen: {} FCFA", stats.prix_moyen.round_dp(2).normalize());
        println!("Quantité totale: {}", stats.quantite_totale);
        for top in &stats.top_produits {
            println!("  {}\t{}\t{}", top.produit, top.quantite, top.ca.normalize());
        }
        for top in &stats.top_localisations {
            println!("  {}\t{}\t{}", top.localisation, top.nb_ventes, top.ca.normalize());
        }
    }
    Ok(())
}

/// Print the sales of a year, or of one of its months.
///
/// # Errors
///
/// Returns the API error.
pub async fn period(
    client: &ApiClient,
    annee: i32,
    mois: Option<u32>,
    boutique: Option<i32>,
) -> Result<(), ClientError> {
    let sales = client
        .sales_for_period(annee, mois, boutique.map(BoutiqueId::new))
        .await?;

    #[allow(clippy::print_stdout)]
    {
        for sale in &sales {
            println!(
                "{}\t{}\t{} x {}\t{}",
                sale.date_vente,
                sale.produit_nom,
                sale.quantite,
                sale.prix.normalize(),
                sale.total.normalize()
            );
        }
        println!("{} vente(s)", sales.len());
    }
    Ok(())
}
