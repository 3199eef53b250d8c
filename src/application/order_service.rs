use chrono::Utc;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::money::Money;
use crate::domain::order::{total_amount, Order, OrderInput};
use crate::domain::ports::OrderRepository;
use crate::domain::user::Principal;

/// Every order together with the sum of their totals.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderOverview {
    pub orders: Vec<Order>,
    pub total_amount: Money,
}

pub struct OrderService<R> {
    repo: R,
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_order(&self, principal: &Principal, input: OrderInput) -> Result<Order, DomainError> {
        input.validate()?;
        let order = input.into_order(principal.id, Utc::now());
        self.repo.create(&order)?;
        log::info!("order created: id={} user={}", order.id, principal.id);
        Ok(order)
    }

    /// Owners and administrators only.
    pub fn get_order(&self, principal: &Principal, id: Uuid) -> Result<Order, DomainError> {
        let order = self
            .repo
            .find_by_id(id)?
            .ok_or_else(|| DomainError::not_found("order"))?;
        principal.ensure_owner_or_admin(order.user_id)?;
        Ok(order)
    }

    pub fn my_orders(&self, principal: &Principal) -> Result<Vec<Order>, DomainError> {
        self.repo.list_by_user(principal.id)
    }

    pub fn all_orders(&self) -> Result<OrderOverview, DomainError> {
        let orders = self.repo.list_all()?;
        let total_amount = total_amount(&orders)?;
        Ok(OrderOverview {
            orders,
            total_amount,
        })
    }

    pub fn update_status(&self, id: Uuid, status: &str) -> Result<Order, DomainError> {
        let order = self.repo.update_status(id, status, Utc::now())?;
        log::info!("order status changed: id={} status={}", id, order.order_status);
        Ok(order)
    }

    pub fn delete_order(&self, id: Uuid) -> Result<(), DomainError> {
        if !self.repo.delete(id)? {
            return Err(DomainError::not_found("order"));
        }
        log::info!("order deleted: id={}", id);
        Ok(())
    }
}
