use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Mutex, MutexGuard};

use crate::errors::AppError;
use crate::models::{
    Address, AddressOwnership, Customer, CustomerFilter, CustomerUpdate, CustomerWithAddresses,
    NewAddress, NewCustomer, Page, ValidationReason,
};
use crate::repository::CustomerRepository;

#[derive(Debug)]
struct Tables {
    customers: Vec<Customer>,
    addresses: Vec<Address>,
    next_customer_id: i64,
    next_address_id: i64,
}

/// In-process customer storage for local development and tests.
///
/// Rows are kept in id order, mirroring the ordering of the SQL store. The
/// mutex makes every operation atomic, so uniqueness checks cannot race.
#[derive(Debug)]
pub struct InMemoryCustomerRepository {
    tables: Mutex<Tables>,
}

impl Default for InMemoryCustomerRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCustomerRepository {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables {
                customers: Vec::new(),
                addresses: Vec::new(),
                next_customer_id: 1,
                next_address_id: 1,
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|_| AppError::InternalError("in-memory store lock poisoned".to_string()))
    }
}

impl Tables {
    fn customer(&self, customer_id: i64) -> Option<&Customer> {
        self.customers.iter().find(|c| c.customer_id == customer_id)
    }

    fn addresses_of(&self, customer_id: i64) -> Vec<Address> {
        self.addresses
            .iter()
            .filter(|a| a.customer_id == customer_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn create_customer(&self, new: &NewCustomer) -> Result<Customer, AppError> {
        let mut tables = self.lock()?;

        if tables
            .customers
            .iter()
            .any(|c| c.email == new.email || c.phone == new.phone)
        {
            return Err(AppError::CustomerExists);
        }

        let customer = Customer {
            customer_id: tables.next_customer_id,
            name: new.name.clone(),
            email: new.email.clone(),
            phone: new.phone.clone(),
            created_at: Utc::now(),
        };
        tables.next_customer_id += 1;
        tables.customers.push(customer.clone());

        Ok(customer)
    }

    async fn list_customers(
        &self,
        filter: &CustomerFilter,
        page: Page,
    ) -> Result<Vec<Customer>, AppError> {
        let tables = self.lock()?;
        let offset = usize::try_from(page.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(page.limit).unwrap_or(0);

        Ok(tables
            .customers
            .iter()
            .filter(|c| filter.matches(c))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_customer(&self, customer_id: i64) -> Result<CustomerWithAddresses, AppError> {
        let tables = self.lock()?;
        let customer = tables
            .customer(customer_id)
            .cloned()
            .ok_or(AppError::CustomerNotFound)?;

        Ok(CustomerWithAddresses {
            addresses: tables.addresses_of(customer_id),
            customer,
        })
    }

    async fn update_customer(
        &self,
        customer_id: i64,
        update: &CustomerUpdate,
    ) -> Result<Customer, AppError> {
        let mut tables = self.lock()?;

        if tables.customer(customer_id).is_none() {
            return Err(AppError::CustomerNotFound);
        }

        if let Some(phone) = &update.phone {
            if tables
                .customers
                .iter()
                .any(|c| &c.phone == phone && c.customer_id != customer_id)
            {
                return Err(AppError::PhoneInUse);
            }
        }

        let customer = tables
            .customers
            .iter_mut()
            .find(|c| c.customer_id == customer_id)
            .ok_or(AppError::CustomerNotFound)?;

        if let Some(name) = &update.name {
            customer.name = name.clone();
        }
        if let Some(phone) = &update.phone {
            customer.phone = phone.clone();
        }

        Ok(customer.clone())
    }

    async fn delete_customer(&self, customer_id: i64) -> Result<(), AppError> {
        let mut tables = self.lock()?;

        let before = tables.customers.len();
        tables.customers.retain(|c| c.customer_id != customer_id);
        if tables.customers.len() == before {
            return Err(AppError::CustomerNotFound);
        }

        tables.addresses.retain(|a| a.customer_id != customer_id);
        Ok(())
    }

    async fn list_addresses(&self, customer_id: i64) -> Result<Vec<Address>, AppError> {
        let tables = self.lock()?;
        if tables.customer(customer_id).is_none() {
            return Err(AppError::CustomerNotFound);
        }
        Ok(tables.addresses_of(customer_id))
    }

    async fn create_address(
        &self,
        customer_id: i64,
        new: &NewAddress,
    ) -> Result<Address, AppError> {
        let mut tables = self.lock()?;
        if tables.customer(customer_id).is_none() {
            return Err(AppError::CustomerNotFound);
        }

        let address = Address {
            address_id: tables.next_address_id,
            customer_id,
            line1: new.line1.clone(),
            area: new.area.clone(),
            city: new.city.clone(),
            pincode: new.pincode.clone(),
            created_at: Utc::now(),
        };
        tables.next_address_id += 1;
        tables.addresses.push(address.clone());

        Ok(address)
    }

    async fn check_address_ownership(
        &self,
        customer_id: i64,
        address_id: i64,
    ) -> Result<AddressOwnership, AppError> {
        let tables = self.lock()?;
        if tables.customer(customer_id).is_none() {
            return Ok(AddressOwnership::Rejected(
                ValidationReason::CustomerNotFound,
            ));
        }

        let owned = tables
            .addresses
            .iter()
            .any(|a| a.address_id == address_id && a.customer_id == customer_id);

        Ok(if owned {
            AddressOwnership::Owned
        } else {
            AddressOwnership::Rejected(ValidationReason::AddressNotOwned)
        })
    }

    async fn count_customers(&self) -> Result<i64, AppError> {
        let tables = self.lock()?;
        Ok(tables.customers.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_customer(email: &str, phone: &str) -> NewCustomer {
        NewCustomer {
            name: "Test".into(),
            email: email.into(),
            phone: phone.into(),
        }
    }

    fn new_address() -> NewAddress {
        NewAddress {
            line1: "Main St".into(),
            area: None,
            city: "X".into(),
            pincode: "00000".into(),
        }
    }

    #[tokio::test]
    async fn ids_are_sequential_and_never_reused() {
        let repo = InMemoryCustomerRepository::new();
        let a = repo.create_customer(&new_customer("a@x.com", "1")).await.unwrap();
        let b = repo.create_customer(&new_customer("b@x.com", "2")).await.unwrap();
        assert_eq!((a.customer_id, b.customer_id), (1, 2));

        repo.delete_customer(b.customer_id).await.unwrap();
        let c = repo.create_customer(&new_customer("c@x.com", "3")).await.unwrap();
        assert_eq!(c.customer_id, 3);
    }

    #[tokio::test]
    async fn duplicate_phone_is_rejected_without_insert() {
        let repo = InMemoryCustomerRepository::new();
        repo.create_customer(&new_customer("a@x.com", "1")).await.unwrap();
        let err = repo
            .create_customer(&new_customer("other@x.com", "1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CustomerExists));
        assert_eq!(repo.count_customers().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_cascades_to_addresses() {
        let repo = InMemoryCustomerRepository::new();
        let customer = repo.create_customer(&new_customer("a@x.com", "1")).await.unwrap();
        let address = repo
            .create_address(customer.customer_id, &new_address())
            .await
            .unwrap();

        repo.delete_customer(customer.customer_id).await.unwrap();

        let tables = repo.lock().unwrap();
        assert!(tables
            .addresses
            .iter()
            .all(|a| a.address_id != address.address_id));
    }

    #[tokio::test]
    async fn ownership_reasons() {
        let repo = InMemoryCustomerRepository::new();
        let first = repo.create_customer(&new_customer("a@x.com", "1")).await.unwrap();
        let second = repo.create_customer(&new_customer("b@x.com", "2")).await.unwrap();
        let address = repo
            .create_address(second.customer_id, &new_address())
            .await
            .unwrap();

        assert_eq!(
            repo.check_address_ownership(second.customer_id, address.address_id)
                .await
                .unwrap(),
            AddressOwnership::Owned
        );
        assert_eq!(
            repo.check_address_ownership(first.customer_id, address.address_id)
                .await
                .unwrap(),
            AddressOwnership::Rejected(ValidationReason::AddressNotOwned)
        );
        assert_eq!(
            repo.check_address_ownership(99, address.address_id)
                .await
                .unwrap(),
            AddressOwnership::Rejected(ValidationReason::CustomerNotFound)
        );
    }
}
