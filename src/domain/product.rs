use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::errors::DomainError;
use super::money::Money;
use super::validation::Validator;

pub const PAGE_SIZE: i64 = 12;
pub const IMAGE_FOLDER: &str = "products";

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub public_id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    #[schema(value_type = String, example = "130.00")]
    pub price: Money,
    pub description: String,
    pub ratings: i32,
    pub category: String,
    pub seller: String,
    pub stock: i32,
    pub num_of_reviews: i32,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub images: Vec<Image>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Vec<Review>>,
}

/// Catalog fields accepted from an administrator. Ratings and the review
/// count are derived and never part of this.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductInput {
    pub name: String,
    pub price: Money,
    pub description: String,
    pub category: String,
    pub seller: String,
    pub stock: i32,
}

impl ProductInput {
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut v = Validator::new();
        v.require(&self.name, "name", "name field is empty");
        v.require(&self.description, "description", "description field is empty");
        v.require(&self.seller, "seller", "seller field is empty");
        v.check(self.stock >= 0, "stock", "stock must not be negative");
        v.finish()
    }
}

/// Row data for a product about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub id: Uuid,
    pub user_id: Uuid,
    pub fields: ProductInput,
    pub images: Vec<Image>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub rating: i32,
    pub comment: String,
}

impl NewReview {
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut v = Validator::new();
        v.check(
            (1..=5).contains(&self.rating),
            "rating",
            "rating must be between 1 and 5",
        );
        v.require(&self.comment, "comment", "comment field is empty");
        v.finish()
    }
}

/// Derived rating figures of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewSummary {
    pub ratings: i32,
    pub num_of_reviews: i32,
}

impl ReviewSummary {
    /// Truncated integer mean. No reviews means a rating of zero.
    pub fn from_ratings(ratings: &[i32]) -> Self {
        if ratings.is_empty() {
            return ReviewSummary {
                ratings: 0,
                num_of_reviews: 0,
            };
        }
        let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
        let count = ratings.len() as i64;
        ReviewSummary {
            ratings: (sum / count) as i32,
            num_of_reviews: count as i32,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    pub keyword: Option<String>,
    pub page: i64,
}

impl ProductQuery {
    pub fn offset(&self) -> i64 {
        page_offset(self.page)
    }

    /// `ILIKE` pattern for the keyword, or `None` when no filtering applies.
    pub fn name_pattern(&self) -> Option<String> {
        self.keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(keyword_pattern)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductPage {
    pub total: i64,
    pub products: Vec<Product>,
}

/// Offset of a 1-based page. Pages below 1 are treated as page 1.
pub fn page_offset(page: i64) -> i64 {
    (page.max(1) - 1).saturating_mul(PAGE_SIZE)
}

/// Substring pattern with the `LIKE` metacharacters escaped.
pub fn keyword_pattern(keyword: &str) -> String {
    let mut pattern = String::with_capacity(keyword.len() + 2);
    pattern.push('%');
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_of_no_reviews_is_zero() {
        assert_eq!(
            ReviewSummary::from_ratings(&[]),
            ReviewSummary {
                ratings: 0,
                num_of_reviews: 0
            }
        );
    }

    #[test]
    fn summary_truncates_mean() {
        let summary = ReviewSummary::from_ratings(&[5, 4, 4]);
        assert_eq!(summary.ratings, 4);
        assert_eq!(summary.num_of_reviews, 3);

        assert_eq!(ReviewSummary::from_ratings(&[1, 2]).ratings, 1);
    }

    #[test]
    fn summary_tracks_each_insertion() {
        let ratings = [3, 5, 1, 4, 2, 5];
        for n in 1..=ratings.len() {
            let seen = &ratings[..n];
            let summary = ReviewSummary::from_ratings(seen);
            let expected = seen.iter().sum::<i32>() / n as i32;
            assert_eq!(summary.ratings, expected);
            assert_eq!(summary.num_of_reviews, n as i32);
        }
    }

    #[test]
    fn page_offset_clamps_to_first_page() {
        assert_eq!(page_offset(1), 0);
        assert_eq!(page_offset(3), 24);
        assert_eq!(page_offset(0), 0);
        assert_eq!(page_offset(-5), 0);
    }

    #[test]
    fn keyword_pattern_escapes_wildcards() {
        assert_eq!(keyword_pattern("phone"), "%phone%");
        assert_eq!(keyword_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn blank_keyword_means_no_filter() {
        let query = ProductQuery {
            keyword: Some("  ".to_string()),
            page: 1,
        };
        assert_eq!(query.name_pattern(), None);

        let query = ProductQuery {
            keyword: Some(" Lamp ".to_string()),
            page: 1,
        };
        assert_eq!(query.name_pattern().as_deref(), Some("%Lamp%"));
    }

    #[test]
    fn review_rating_must_be_in_range() {
        let mut review = NewReview {
            product_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Ama".to_string(),
            rating: 6,
            comment: "great".to_string(),
        };
        assert!(matches!(review.validate(), Err(DomainError::Validation(_))));

        review.rating = 5;
        assert!(review.validate().is_ok());
    }

    #[test]
    fn product_input_requires_text_fields() {
        let input = ProductInput {
            name: String::new(),
            price: Money::from_minor(100),
            description: "desc".to_string(),
            category: "Electronics".to_string(),
            seller: " ".to_string(),
            stock: 1,
        };
        match input.validate() {
            Err(DomainError::Validation(errors)) => {
                assert!(errors.contains_key("name"));
                assert!(errors.contains_key("seller"));
                assert!(!errors.contains_key("description"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
