use chrono::{DateTime, Utc};
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::ProductRepository;
use crate::domain::product::{
    Image, NewProduct, NewReview, Product, ProductInput, ProductPage, ProductQuery, Review,
    ReviewSummary, PAGE_SIZE,
};
use crate::schema::{images, products, reviews};

use super::models::{ImageRow, ProductChangeset, ProductRow, ReviewRow};

pub struct DieselProductRepository {
    pool: DbPool,
}

impl DieselProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

// ── Query helpers ────────────────────────────────────────────────────────────

fn matching(pattern: Option<String>) -> products::BoxedQuery<'static, Pg> {
    let mut query = products::table.into_boxed();
    if let Some(pattern) = pattern {
        query = query.filter(products::name.ilike(pattern));
    }
    query
}

fn with_images(
    conn: &mut PgConnection,
    rows: Vec<ProductRow>,
) -> Result<Vec<Product>, DomainError> {
    let grouped = ImageRow::belonging_to(&rows)
        .select(ImageRow::as_select())
        .order(images::created_at.asc())
        .load(conn)?
        .grouped_by(&rows);

    Ok(rows
        .into_iter()
        .zip(grouped)
        .map(|(row, images)| row.into_product(images, None))
        .collect())
}

fn lock_product(conn: &mut PgConnection, id: Uuid) -> Result<ProductRow, DomainError> {
    products::table
        .find(id)
        .select(ProductRow::as_select())
        .for_update()
        .get_result(conn)
        .optional()?
        .ok_or_else(|| DomainError::not_found("product"))
}

/// Recompute and store the rating figures from the reviews currently on
/// the product. The caller holds the product row lock.
fn refresh_summary(conn: &mut PgConnection, product_id: Uuid) -> Result<ReviewSummary, DomainError> {
    let ratings: Vec<i32> = reviews::table
        .filter(reviews::product_id.eq(product_id))
        .select(reviews::rating)
        .load(conn)?;
    let summary = ReviewSummary::from_ratings(&ratings);

    diesel::update(products::table.find(product_id))
        .set((
            products::ratings.eq(summary.ratings),
            products::num_of_reviews.eq(summary.num_of_reviews),
        ))
        .execute(conn)?;

    Ok(summary)
}

fn image_rows(product_id: Uuid, images: &[Image], now: DateTime<Utc>) -> Vec<ImageRow> {
    images
        .iter()
        .map(|i| ImageRow {
            public_id: i.public_id.clone(),
            url: i.url.clone(),
            product_id,
            created_at: now,
        })
        .collect()
}

impl ProductRepository for DieselProductRepository {
    fn create(&self, product: &NewProduct) -> Result<Product, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let f = &product.fields;
            let row = ProductRow {
                id: product.id,
                name: f.name.clone(),
                price: f.price.minor_units(),
                description: f.description.clone(),
                ratings: 0,
                category: f.category.clone(),
                seller: f.seller.clone(),
                stock: f.stock,
                num_of_reviews: 0,
                user_id: product.user_id,
                created_at: product.created_at,
            };
            diesel::insert_into(products::table)
                .values(&row)
                .execute(conn)?;

            let stored = image_rows(product.id, &product.images, product.created_at);
            if !stored.is_empty() {
                diesel::insert_into(images::table)
                    .values(&stored)
                    .execute(conn)?;
            }

            Ok(row.into_product(stored, None))
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = products::table
            .find(id)
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(row) = row else {
            return Ok(None);
        };

        let image_list = ImageRow::belonging_to(&row)
            .select(ImageRow::as_select())
            .order(images::created_at.asc())
            .load(&mut conn)?;
        let review_list = ReviewRow::belonging_to(&row)
            .select(ReviewRow::as_select())
            .order((reviews::created_at.asc(), reviews::id.asc()))
            .load(&mut conn)?;

        Ok(Some(row.into_product(image_list, Some(review_list))))
    }

    fn search(&self, query: &ProductQuery) -> Result<ProductPage, DomainError> {
        let mut conn = self.pool.get()?;
        let pattern = query.name_pattern();
        let offset = query.offset();

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = matching(pattern.clone()).count().get_result(conn)?;

            let rows = matching(pattern)
                .select(ProductRow::as_select())
                .order((products::created_at.asc(), products::id.asc()))
                .limit(PAGE_SIZE)
                .offset(offset)
                .load(conn)?;

            Ok(ProductPage {
                total,
                products: with_images(conn, rows)?,
            })
        })
    }

    fn list_all(&self) -> Result<Vec<Product>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let rows = products::table
                .select(ProductRow::as_select())
                .order((products::created_at.asc(), products::id.asc()))
                .load(conn)?;
            with_images(conn, rows)
        })
    }

    fn update(
        &self,
        id: Uuid,
        fields: &ProductInput,
        images: Option<Vec<Image>>,
    ) -> Result<Product, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            lock_product(conn, id)?;

            let row = diesel::update(products::table.find(id))
                .set(&ProductChangeset {
                    name: &fields.name,
                    price: fields.price.minor_units(),
                    description: &fields.description,
                    category: &fields.category,
                    seller: &fields.seller,
                    stock: fields.stock,
                })
                .returning(ProductRow::as_returning())
                .get_result(conn)?;

            if let Some(replacement) = images {
                diesel::delete(images::table.filter(images::product_id.eq(id))).execute(conn)?;
                if !replacement.is_empty() {
                    diesel::insert_into(images::table)
                        .values(&image_rows(id, &replacement, Utc::now()))
                        .execute(conn)?;
                }
            }

            let mut products = with_images(conn, vec![row])?;
            products
                .pop()
                .ok_or_else(|| DomainError::not_found("product"))
        })
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(products::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }

    fn add_review(
        &self,
        review: &NewReview,
        now: DateTime<Utc>,
    ) -> Result<ReviewSummary, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            lock_product(conn, review.product_id)?;

            diesel::insert_into(reviews::table)
                .values(&ReviewRow {
                    id: Uuid::new_v4(),
                    name: review.name.clone(),
                    rating: review.rating,
                    comment: review.comment.clone(),
                    user_id: review.user_id,
                    product_id: review.product_id,
                    created_at: now,
                })
                .execute(conn)?;

            refresh_summary(conn, review.product_id)
        })
    }

    fn list_reviews(&self, product_id: Uuid) -> Result<Vec<Review>, DomainError> {
        let mut conn = self.pool.get()?;

        let rows = reviews::table
            .filter(reviews::product_id.eq(product_id))
            .select(ReviewRow::as_select())
            .order((reviews::created_at.asc(), reviews::id.asc()))
            .load(&mut conn)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn find_review(
        &self,
        product_id: Uuid,
        review_id: Uuid,
    ) -> Result<Option<Review>, DomainError> {
        let mut conn = self.pool.get()?;

        let row = reviews::table
            .filter(reviews::id.eq(review_id))
            .filter(reviews::product_id.eq(product_id))
            .select(ReviewRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(row.map(Into::into))
    }

    fn delete_review(
        &self,
        product_id: Uuid,
        review_id: Uuid,
    ) -> Result<ReviewSummary, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            lock_product(conn, product_id)?;

            let deleted = diesel::delete(
                reviews::table
                    .filter(reviews::id.eq(review_id))
                    .filter(reviews::product_id.eq(product_id)),
            )
            .execute(conn)?;
            if deleted == 0 {
                return Err(DomainError::not_found("review"));
            }

            refresh_summary(conn, product_id)
        })
    }
}
