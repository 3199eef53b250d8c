use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{plan_status_change, Order};
use crate::domain::ports::OrderRepository;
use crate::schema::{order_items, orders, payments, products, shippings};

use super::models::{OrderItemRow, OrderRow, PaymentRow, ShippingRow};

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Attach dependents to their headers, keyed by order id.
fn assemble(conn: &mut PgConnection, headers: Vec<OrderRow>) -> Result<Vec<Order>, DomainError> {
    let shippings = ShippingRow::belonging_to(&headers)
        .select(ShippingRow::as_select())
        .load(conn)?
        .grouped_by(&headers);
    let items = OrderItemRow::belonging_to(&headers)
        .select(OrderItemRow::as_select())
        .order((order_items::created_at.asc(), order_items::id.asc()))
        .load(conn)?
        .grouped_by(&headers);
    let payments = PaymentRow::belonging_to(&headers)
        .select(PaymentRow::as_select())
        .load(conn)?
        .grouped_by(&headers);

    headers
        .into_iter()
        .zip(shippings)
        .zip(items)
        .zip(payments)
        .map(|(((header, shipping), items), payment)| {
            header.into_order(shipping.into_iter().next(), items, payment.into_iter().next())
        })
        .collect()
}

fn load_one(conn: &mut PgConnection, id: Uuid) -> Result<Option<Order>, DomainError> {
    let header = orders::table
        .find(id)
        .select(OrderRow::as_select())
        .first(conn)
        .optional()?;

    let Some(header) = header else {
        return Ok(None);
    };

    Ok(assemble(conn, vec![header])?.pop())
}

impl OrderRepository for DieselOrderRepository {
    fn create(&self, order: &Order) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            diesel::insert_into(orders::table)
                .values(&OrderRow::from_order(order))
                .execute(conn)?;

            diesel::insert_into(shippings::table)
                .values(&ShippingRow::from(&order.shipping))
                .execute(conn)?;

            let items: Vec<OrderItemRow> = order.items.iter().map(OrderItemRow::from).collect();
            diesel::insert_into(order_items::table)
                .values(&items)
                .execute(conn)?;

            diesel::insert_into(payments::table)
                .values(&PaymentRow::from(&order.payment))
                .execute(conn)?;

            Ok(())
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;
        load_one(&mut conn, id)
    }

    fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let headers = orders::table
                .filter(orders::user_id.eq(user_id))
                .select(OrderRow::as_select())
                .order((orders::created_at.asc(), orders::id.asc()))
                .load(conn)?;
            assemble(conn, headers)
        })
    }

    fn list_all(&self) -> Result<Vec<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let headers = orders::table
                .select(OrderRow::as_select())
                .order((orders::created_at.asc(), orders::id.asc()))
                .load(conn)?;
            assemble(conn, headers)
        })
    }

    fn update_status(
        &self,
        id: Uuid,
        status: &str,
        now: DateTime<Utc>,
    ) -> Result<Order, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let header = orders::table
                .find(id)
                .select(OrderRow::as_select())
                .for_update()
                .get_result(conn)
                .optional()?
                .ok_or_else(|| DomainError::not_found("order"))?;

            let change = plan_status_change(&header.order_status, status, now)?;

            let items = OrderItemRow::belonging_to(&header)
                .select(OrderItemRow::as_select())
                .load(conn)?;

            for item in &items {
                let stock: Option<i32> = products::table
                    .find(item.product_id)
                    .select(products::stock)
                    .for_update()
                    .get_result(conn)
                    .optional()?;

                match stock {
                    None => log::warn!(
                        "order {}: product {} no longer exists, stock not adjusted",
                        id,
                        item.product_id
                    ),
                    Some(available) if available < item.quantity => {
                        return Err(DomainError::Conflict(format!(
                            "insufficient stock for product {}: {} available, {} ordered",
                            item.product_id, available, item.quantity
                        )));
                    }
                    Some(_) => {
                        diesel::update(products::table.find(item.product_id))
                            .set(products::stock.eq(products::stock - item.quantity))
                            .execute(conn)?;
                    }
                }
            }

            diesel::update(orders::table.find(id))
                .set((
                    orders::order_status.eq(&change.status),
                    orders::delivered_at.eq(change.delivered_at),
                ))
                .execute(conn)?;

            load_one(conn, id)?.ok_or_else(|| DomainError::not_found("order"))
        })
    }

    fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(orders::table.find(id)).execute(&mut conn)?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use diesel::prelude::*;
    use uuid::Uuid;

    use super::DieselOrderRepository;
    use crate::domain::errors::DomainError;
    use crate::domain::money::Money;
    use crate::domain::order::fixtures::order_input;
    use crate::domain::order::{Order, STATUS_DELIVERED, STATUS_PROCESSING};
    use crate::domain::ports::OrderRepository;
    use crate::infrastructure::test_support::{insert_product, insert_user, product_stock, setup_db};
    use crate::schema::{order_items, orders, payments, shippings};

    fn order_for(user_id: Uuid, product_id: Uuid, quantity: i32) -> Order {
        let mut input = order_input();
        input.items[0].product_id = product_id;
        input.items[0].quantity = quantity;
        input.into_order(user_id, Utc::now())
    }

    #[tokio::test]
    #[ignore = "requires a container runtime for Postgres"]
    async fn create_and_find_by_id_roundtrip() {
        let (_container, pool) = setup_db().await;
        let user_id = insert_user(&pool, "buyer@example.com");
        let repo = DieselOrderRepository::new(pool);
        let order = order_for(user_id, Uuid::new_v4(), 1);

        repo.create(&order).expect("create failed");

        let found = repo
            .find_by_id(order.id)
            .expect("find failed")
            .expect("order should exist");

        assert_eq!(found.id, order.id);
        assert_eq!(found.order_status, STATUS_PROCESSING);
        assert!(found.delivered_at.is_none());
        assert_eq!(found.items.len(), 1);
        assert_eq!(found.shipping.order_id, order.id);
        assert_eq!(found.payment.order_id, order.id);
        assert_eq!(found.items_price, Money::from_minor(10_000));
        assert_eq!(found.total_price, Money::from_minor(13_000));
    }

    #[tokio::test]
    #[ignore = "requires a container runtime for Postgres"]
    async fn failed_dependent_insert_leaves_nothing_behind() {
        let (_container, pool) = setup_db().await;
        let user_id = insert_user(&pool, "buyer@example.com");
        let repo = DieselOrderRepository::new(pool.clone());
        let mut order = order_for(user_id, Uuid::new_v4(), 1);
        // Rejected by the shipping CHECK constraint after the header insert.
        order.shipping.city = String::new();

        let err = repo.create(&order).expect_err("create should fail");
        assert!(matches!(err, DomainError::InvalidInput(_)));

        assert!(repo.find_by_id(order.id).expect("find failed").is_none());
        let mut conn = pool.get().expect("Failed to get connection");
        let orphans: i64 = order_items::table
            .filter(order_items::order_id.eq(order.id))
            .count()
            .get_result(&mut conn)
            .expect("count failed");
        assert_eq!(orphans, 0);
        let header_count: i64 = orders::table.count().get_result(&mut conn).expect("count failed");
        assert_eq!(header_count, 0);
    }

    #[tokio::test]
    #[ignore = "requires a container runtime for Postgres"]
    async fn find_by_id_returns_none_for_unknown_id() {
        let (_container, pool) = setup_db().await;
        let repo = DieselOrderRepository::new(pool);

        let result = repo.find_by_id(Uuid::new_v4()).expect("find should not error");

        assert!(result.is_none());
    }

    #[tokio::test]
    #[ignore = "requires a container runtime for Postgres"]
    async fn list_all_attaches_dependents_by_order_id() {
        let (_container, pool) = setup_db().await;
        let alice = insert_user(&pool, "alice@example.com");
        let bob = insert_user(&pool, "bob@example.com");
        let repo = DieselOrderRepository::new(pool);

        let first = order_for(alice, Uuid::new_v4(), 1);
        let mut second = order_for(bob, Uuid::new_v4(), 2);
        second.shipping.city = "Kumasi".to_string();
        repo.create(&first).expect("create failed");
        repo.create(&second).expect("create failed");

        let all = repo.list_all().expect("list failed");
        assert_eq!(all.len(), 2);
        for order in &all {
            assert_eq!(order.shipping.order_id, order.id);
            assert_eq!(order.payment.order_id, order.id);
            assert!(order.items.iter().all(|i| i.order_id == order.id));
        }
        let kumasi = all.iter().find(|o| o.id == second.id).expect("second order");
        assert_eq!(kumasi.shipping.city, "Kumasi");
        assert_eq!(kumasi.items[0].quantity, 2);

        let mine = repo.list_by_user(alice).expect("list failed");
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, first.id);
    }

    #[tokio::test]
    #[ignore = "requires a container runtime for Postgres"]
    async fn delivering_an_order_decrements_stock_and_stamps_time() {
        let (_container, pool) = setup_db().await;
        let user_id = insert_user(&pool, "buyer@example.com");
        let product_id = insert_product(&pool, "Kettle", 5);
        let repo = DieselOrderRepository::new(pool.clone());
        let order = order_for(user_id, product_id, 2);
        repo.create(&order).expect("create failed");

        let updated = repo
            .update_status(order.id, STATUS_DELIVERED, Utc::now())
            .expect("update failed");

        assert_eq!(updated.order_status, STATUS_DELIVERED);
        assert!(updated.delivered_at.is_some());
        assert_eq!(product_stock(&pool, product_id), 3);
    }

    #[tokio::test]
    #[ignore = "requires a container runtime for Postgres"]
    async fn delivered_order_rejects_further_transitions() {
        let (_container, pool) = setup_db().await;
        let user_id = insert_user(&pool, "buyer@example.com");
        let product_id = insert_product(&pool, "Kettle", 5);
        let repo = DieselOrderRepository::new(pool.clone());
        let order = order_for(user_id, product_id, 1);
        repo.create(&order).expect("create failed");
        repo.update_status(order.id, STATUS_DELIVERED, Utc::now())
            .expect("update failed");

        let err = repo
            .update_status(order.id, "Shipped", Utc::now())
            .expect_err("second transition should fail");

        assert!(matches!(err, DomainError::Conflict(_)));
        let stored = repo.find_by_id(order.id).expect("find failed").expect("exists");
        assert_eq!(stored.order_status, STATUS_DELIVERED);
        assert_eq!(product_stock(&pool, product_id), 4);
    }

    #[tokio::test]
    #[ignore = "requires a container runtime for Postgres"]
    async fn insufficient_stock_rolls_back_the_transition() {
        let (_container, pool) = setup_db().await;
        let user_id = insert_user(&pool, "buyer@example.com");
        let product_id = insert_product(&pool, "Kettle", 1);
        let repo = DieselOrderRepository::new(pool.clone());
        let order = order_for(user_id, product_id, 3);
        repo.create(&order).expect("create failed");

        let err = repo
            .update_status(order.id, "Shipped", Utc::now())
            .expect_err("transition should fail");

        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(product_stock(&pool, product_id), 1);
        let stored = repo.find_by_id(order.id).expect("find failed").expect("exists");
        assert_eq!(stored.order_status, STATUS_PROCESSING);
    }

    #[tokio::test]
    #[ignore = "requires a container runtime for Postgres"]
    async fn non_delivered_status_clears_delivery_time() {
        let (_container, pool) = setup_db().await;
        let user_id = insert_user(&pool, "buyer@example.com");
        let repo = DieselOrderRepository::new(pool);
        let order = order_for(user_id, Uuid::new_v4(), 1);
        repo.create(&order).expect("create failed");

        let updated = repo
            .update_status(order.id, "Shipped", Utc::now())
            .expect("update failed");

        assert_eq!(updated.order_status, "Shipped");
        assert!(updated.delivered_at.is_none());
    }

    #[tokio::test]
    #[ignore = "requires a container runtime for Postgres"]
    async fn delete_cascades_to_dependents() {
        let (_container, pool) = setup_db().await;
        let user_id = insert_user(&pool, "buyer@example.com");
        let repo = DieselOrderRepository::new(pool.clone());
        let order = order_for(user_id, Uuid::new_v4(), 1);
        repo.create(&order).expect("create failed");

        assert!(repo.delete(order.id).expect("delete failed"));
        assert!(!repo.delete(order.id).expect("second delete failed"));

        let mut conn = pool.get().expect("Failed to get connection");
        let shipping_rows: i64 = shippings::table.count().get_result(&mut conn).expect("count");
        let payment_rows: i64 = payments::table.count().get_result(&mut conn).expect("count");
        assert_eq!(shipping_rows, 0);
        assert_eq!(payment_rows, 0);
    }
}
