//! Product categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::CategoryId;

/// A browsable product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub nom: String,
    pub slug: String,
    pub description: Option<String>,
    /// Emoji shown next to the name.
    pub icone: Option<String>,
}

/// A category ranked for the storefront home page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturedCategory {
    pub nom: String,
    pub nombre_produits: i64,
    /// Mean validation score, rounded to one decimal.
    pub score_moyen: f64,
    pub produits_valides: i64,
    pub derniere_publication: Option<DateTime<Utc>>,
}

/// URL slug for a category name.
///
/// Lowercases, turns spaces into `-` and folds `é`, `è`, `ê` to `e`. Other
/// characters are kept as they are.
#[must_use]
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' => '-',
            'é' | 'è' | 'ê' => 'e',
            other => other,
        })
        .collect()
}

/// Round a mean score to one decimal place.
#[must_use]
pub fn round_score(score: f64) -> f64 {
    (score * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Beauté Naturelle"), "beaute-naturelle");
        assert_eq!(slugify("Électroménager"), "electromenager");
        assert_eq!(slugify("Fête des Mères"), "fete-des-meres");
        assert_eq!(slugify("Sport & Loisirs"), "sport-&-loisirs");
    }

    #[test]
    fn test_round_score() {
        assert!((round_score(72.349) - 72.3).abs() < f64::EPSILON);
        assert!((round_score(0.0)).abs() < f64::EPSILON);
    }
}
