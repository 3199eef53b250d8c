use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::ports::{ImageStore, ProductRepository};
use crate::domain::product::{
    Image, NewProduct, NewReview, Product, ProductInput, ProductPage, ProductQuery, Review,
    ReviewSummary, IMAGE_FOLDER,
};
use crate::domain::user::Principal;

pub struct ProductService<R, S> {
    repo: R,
    images: S,
}

impl<R: ProductRepository, S: ImageStore> ProductService<R, S> {
    pub fn new(repo: R, images: S) -> Self {
        Self { repo, images }
    }

    /// Upload every image, or none: a failure part-way destroys what was
    /// already stored.
    fn upload_all(&self, sources: &[String]) -> Result<Vec<Image>, DomainError> {
        let mut stored = Vec::with_capacity(sources.len());
        for source in sources {
            match self.images.upload(IMAGE_FOLDER, source) {
                Ok(image) => stored.push(Image::from(image)),
                Err(e) => {
                    self.discard(&stored);
                    return Err(e);
                }
            }
        }
        Ok(stored)
    }

    /// Best-effort removal from the image store.
    fn discard(&self, images: &[Image]) {
        for image in images {
            if let Err(e) = self.images.destroy(&image.public_id) {
                log::warn!("failed to destroy image {}: {}", image.public_id, e);
            }
        }
    }

    pub fn create_product(
        &self,
        principal: &Principal,
        input: ProductInput,
        image_sources: &[String],
    ) -> Result<Product, DomainError> {
        input.validate()?;
        let images = self.upload_all(image_sources)?;

        let new = NewProduct {
            id: Uuid::new_v4(),
            user_id: principal.id,
            fields: input,
            images,
            created_at: Utc::now(),
        };
        match self.repo.create(&new) {
            Ok(product) => {
                log::info!("product created: id={}", product.id);
                Ok(product)
            }
            Err(e) => {
                self.discard(&new.images);
                Err(e)
            }
        }
    }

    pub fn get_product(&self, id: Uuid) -> Result<Product, DomainError> {
        self.repo
            .find_by_id(id)?
            .ok_or_else(|| DomainError::not_found("product"))
    }

    pub fn search(&self, query: &ProductQuery) -> Result<ProductPage, DomainError> {
        self.repo.search(query)
    }

    pub fn list_all(&self) -> Result<Vec<Product>, DomainError> {
        self.repo.list_all()
    }

    /// Replace the catalog fields. When `image_sources` is non-empty the
    /// stored images are swapped for freshly uploaded ones.
    pub fn update_product(
        &self,
        id: Uuid,
        input: ProductInput,
        image_sources: Option<&[String]>,
    ) -> Result<Product, DomainError> {
        input.validate()?;
        let existing = self.get_product(id)?;

        let replacement = match image_sources.filter(|s| !s.is_empty()) {
            Some(sources) => Some(self.upload_all(sources)?),
            None => None,
        };

        match self.repo.update(id, &input, replacement.clone()) {
            Ok(product) => {
                if replacement.is_some() {
                    self.discard(&existing.images);
                }
                log::info!("product updated: id={}", id);
                Ok(product)
            }
            Err(e) => {
                if let Some(uploaded) = &replacement {
                    self.discard(uploaded);
                }
                Err(e)
            }
        }
    }

    pub fn delete_product(&self, id: Uuid) -> Result<(), DomainError> {
        let existing = self.get_product(id)?;
        if !self.repo.delete(id)? {
            return Err(DomainError::not_found("product"));
        }
        self.discard(&existing.images);
        log::info!("product deleted: id={}", id);
        Ok(())
    }

    pub fn add_review(
        &self,
        principal: &Principal,
        product_id: Uuid,
        rating: i32,
        comment: String,
    ) -> Result<ReviewSummary, DomainError> {
        let review = NewReview {
            product_id,
            user_id: principal.id,
            name: principal.name.clone(),
            rating,
            comment,
        };
        review.validate()?;

        let summary = self.repo.add_review(&review, Utc::now())?;
        log::info!(
            "review added: product={} ratings={} reviews={}",
            product_id,
            summary.ratings,
            summary.num_of_reviews
        );
        Ok(summary)
    }

    pub fn list_reviews(&self, product_id: Uuid) -> Result<Vec<Review>, DomainError> {
        self.repo.list_reviews(product_id)
    }

    /// Authors may delete their own reviews; administrators any review.
    pub fn delete_review(
        &self,
        principal: &Principal,
        product_id: Uuid,
        review_id: Uuid,
    ) -> Result<ReviewSummary, DomainError> {
        let review = self
            .repo
            .find_review(product_id, review_id)?
            .ok_or_else(|| DomainError::not_found("review"))?;
        principal.ensure_owner_or_admin(review.user_id)?;

        let summary = self.repo.delete_review(product_id, review_id)?;
        log::info!("review deleted: product={} review={}", product_id, review_id);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::Money;
    use crate::domain::ports::{MockImageStore, MockProductRepository, StoredImage};
    use crate::domain::user::Role;

    fn principal(role: Role) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            name: "Kofi".to_string(),
            email: "kofi@example.com".to_string(),
            role,
        }
    }

    fn input() -> ProductInput {
        ProductInput {
            name: "Kettle".to_string(),
            price: Money::from_minor(4_999),
            description: "Boils water".to_string(),
            category: "Home".to_string(),
            seller: "Acme".to_string(),
            stock: 5,
        }
    }

    fn product(id: Uuid, images: Vec<Image>) -> Product {
        let fields = input();
        Product {
            id,
            name: fields.name,
            price: fields.price,
            description: fields.description,
            ratings: 0,
            category: fields.category,
            seller: fields.seller,
            stock: fields.stock,
            num_of_reviews: 0,
            user_id: Uuid::new_v4(),
            created_at: Utc::now(),
            images,
            reviews: None,
        }
    }

    fn image(id: &str) -> Image {
        Image {
            public_id: id.to_string(),
            url: format!("https://img.example/{id}"),
        }
    }

    fn uploading_store() -> MockImageStore {
        let mut store = MockImageStore::new();
        let mut n = 0;
        store.expect_upload().returning(move |folder, _| {
            n += 1;
            Ok(StoredImage {
                public_id: format!("{folder}/{n}"),
                url: format!("https://img.example/{folder}/{n}"),
            })
        });
        store
    }

    #[test]
    fn create_uploads_images_into_product_folder() {
        let mut repo = MockProductRepository::new();
        repo.expect_create()
            .withf(|p| p.images.len() == 2 && p.images[0].public_id == "products/1")
            .returning(|p| Ok(product(p.id, p.images.clone())));
        let service = ProductService::new(repo, uploading_store());

        let created = service
            .create_product(
                &principal(Role::Admin),
                input(),
                &["data:a".to_string(), "data:b".to_string()],
            )
            .unwrap();

        assert_eq!(created.images.len(), 2);
    }

    #[test]
    fn failed_insert_destroys_uploaded_images() {
        let mut repo = MockProductRepository::new();
        repo.expect_create()
            .returning(|_| Err(DomainError::Internal("insert failed".to_string())));
        let mut store = uploading_store();
        store
            .expect_destroy()
            .withf(|id| id == "products/1")
            .times(1)
            .returning(|_| Ok(()));
        let service = ProductService::new(repo, store);

        let err = service
            .create_product(&principal(Role::Admin), input(), &["data:a".to_string()])
            .unwrap_err();

        assert!(matches!(err, DomainError::Internal(_)));
    }

    #[test]
    fn invalid_product_is_rejected_before_upload() {
        let mut store = MockImageStore::new();
        store.expect_upload().never();
        let service = ProductService::new(MockProductRepository::new(), store);

        let mut bad = input();
        bad.name = " ".to_string();

        assert!(matches!(
            service.create_product(&principal(Role::Admin), bad, &["data:a".to_string()]),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn update_with_images_replaces_and_destroys_old_ones() {
        let id = Uuid::new_v4();
        let mut repo = MockProductRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(product(id, vec![image("products/old")]))));
        repo.expect_update()
            .withf(|_, _, images| images.as_ref().map(Vec::len) == Some(1))
            .returning(|id, _, images| Ok(product(id, images.unwrap_or_default())));
        let mut store = uploading_store();
        store
            .expect_destroy()
            .withf(|id| id == "products/old")
            .times(1)
            .returning(|_| Ok(()));
        let service = ProductService::new(repo, store);

        let sources = vec!["data:new".to_string()];
        let updated = service.update_product(id, input(), Some(sources.as_slice())).unwrap();

        assert_eq!(updated.images[0].public_id, "products/1");
    }

    #[test]
    fn update_without_images_keeps_them() {
        let id = Uuid::new_v4();
        let mut repo = MockProductRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(product(id, vec![image("products/old")]))));
        repo.expect_update()
            .withf(|_, _, images| images.is_none())
            .returning(move |_, _, _| Ok(product(id, vec![image("products/old")])));
        let mut store = MockImageStore::new();
        store.expect_upload().never();
        store.expect_destroy().never();
        let service = ProductService::new(repo, store);

        let none: Vec<String> = Vec::new();
        assert!(service.update_product(id, input(), Some(none.as_slice())).is_ok());
    }

    #[test]
    fn delete_destroys_stored_images() {
        let id = Uuid::new_v4();
        let mut repo = MockProductRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(product(id, vec![image("products/a"), image("products/b")]))));
        repo.expect_delete().returning(|_| Ok(true));
        let mut store = MockImageStore::new();
        store.expect_destroy().times(2).returning(|_| Ok(()));
        let service = ProductService::new(repo, store);

        assert!(service.delete_product(id).is_ok());
    }

    #[test]
    fn delete_of_missing_product_is_not_found() {
        let mut repo = MockProductRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));
        let service = ProductService::new(repo, MockImageStore::new());

        assert!(matches!(
            service.delete_product(Uuid::new_v4()),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn review_is_written_under_the_callers_name() {
        let caller = principal(Role::User);
        let expected_user = caller.id;
        let mut repo = MockProductRepository::new();
        repo.expect_add_review()
            .withf(move |r, _| r.name == "Kofi" && r.user_id == expected_user && r.rating == 4)
            .returning(|_, _| {
                Ok(ReviewSummary {
                    ratings: 4,
                    num_of_reviews: 1,
                })
            });
        let service = ProductService::new(repo, MockImageStore::new());

        let summary = service
            .add_review(&caller, Uuid::new_v4(), 4, "Great".to_string())
            .unwrap();

        assert_eq!(summary.num_of_reviews, 1);
    }

    #[test]
    fn out_of_range_rating_is_rejected() {
        let mut repo = MockProductRepository::new();
        repo.expect_add_review().never();
        let service = ProductService::new(repo, MockImageStore::new());

        let err = service
            .add_review(&principal(Role::User), Uuid::new_v4(), 6, "Too good".to_string())
            .unwrap_err();
        match err {
            DomainError::Validation(fields) => assert!(fields.contains_key("rating")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn only_author_or_admin_may_delete_a_review() {
        let author = principal(Role::User);
        let product_id = Uuid::new_v4();
        let review_id = Uuid::new_v4();
        let review = Review {
            id: review_id,
            product_id,
            user_id: author.id,
            name: author.name.clone(),
            rating: 3,
            comment: "Fine".to_string(),
            created_at: Utc::now(),
        };

        let mut repo = MockProductRepository::new();
        repo.expect_find_review()
            .returning(move |_, _| Ok(Some(review.clone())));
        repo.expect_delete_review().times(2).returning(|_, _| {
            Ok(ReviewSummary {
                ratings: 0,
                num_of_reviews: 0,
            })
        });
        let service = ProductService::new(repo, MockImageStore::new());

        assert!(matches!(
            service.delete_review(&principal(Role::User), product_id, review_id),
            Err(DomainError::Forbidden(_))
        ));
        assert!(service.delete_review(&author, product_id, review_id).is_ok());
        assert!(service
            .delete_review(&principal(Role::Admin), product_id, review_id)
            .is_ok());
    }

    #[test]
    fn deleting_unknown_review_is_not_found() {
        let mut repo = MockProductRepository::new();
        repo.expect_find_review().returning(|_, _| Ok(None));
        let service = ProductService::new(repo, MockImageStore::new());

        assert!(matches!(
            service.delete_review(&principal(Role::Admin), Uuid::new_v4(), Uuid::new_v4()),
            Err(DomainError::NotFound(_))
        ));
    }
}
