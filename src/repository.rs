//! Data access seam between the HTTP layer and the store.
//!
//! Each method is one unit of work: implementations open a single store
//! session for it and release that session before returning, whatever the
//! outcome.

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{
    Address, AddressOwnership, Customer, CustomerFilter, CustomerUpdate, CustomerWithAddresses,
    NewAddress, NewCustomer, Page,
};

#[async_trait]
pub trait CustomerRepository: Send + Sync {
    /// Inserts a customer. `CustomerExists` if the email or phone is taken.
    async fn create_customer(&self, new: &NewCustomer) -> Result<Customer, AppError>;

    /// Filtered page of customers, ordered by id ascending.
    async fn list_customers(
        &self,
        filter: &CustomerFilter,
        page: Page,
    ) -> Result<Vec<Customer>, AppError>;

    /// A customer and all of its addresses. `CustomerNotFound` if absent.
    async fn get_customer(&self, customer_id: i64) -> Result<CustomerWithAddresses, AppError>;

    /// Applies `name`/`phone` changes. `CustomerNotFound` if absent,
    /// `PhoneInUse` if another customer owns the phone.
    async fn update_customer(
        &self,
        customer_id: i64,
        update: &CustomerUpdate,
    ) -> Result<Customer, AppError>;

    /// Removes the customer and, with it, its addresses.
    async fn delete_customer(&self, customer_id: i64) -> Result<(), AppError>;

    /// Addresses of one customer, ordered by id. `CustomerNotFound` if absent.
    async fn list_addresses(&self, customer_id: i64) -> Result<Vec<Address>, AppError>;

    /// Inserts an address owned by `customer_id`. `CustomerNotFound` if absent.
    async fn create_address(
        &self,
        customer_id: i64,
        new: &NewAddress,
    ) -> Result<Address, AppError>;

    /// Ownership check used by the internal validation endpoint.
    async fn check_address_ownership(
        &self,
        customer_id: i64,
        address_id: i64,
    ) -> Result<AddressOwnership, AppError>;

    /// Number of stored customers.
    async fn count_customers(&self) -> Result<i64, AppError>;
}
