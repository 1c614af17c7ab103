use async_trait::async_trait;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::{
    Address, AddressOwnership, Customer, CustomerFilter, CustomerUpdate, CustomerWithAddresses,
    NewAddress, NewCustomer, Page, ValidationReason,
};
use crate::repository::CustomerRepository;

const CUSTOMER_COLUMNS: &str = "customer_id, name, email, phone, created_at";
const ADDRESS_COLUMNS: &str = "address_id, customer_id, line1, area, city, pincode, created_at";

/// PostgreSQL-backed customer storage.
///
/// Every operation holds one pooled connection (or one transaction for
/// writes) and gives it back to the pool when it goes out of scope.
#[derive(Clone)]
pub struct PgCustomerRepository {
    pool: PgPool,
}

impl PgCustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Unique-constraint violations are the storage-level guard against concurrent
/// duplicate writes that passed the pre-check.
fn unique_violation_as(err: sqlx::Error, conflict: AppError) -> AppError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return conflict;
        }
    }
    AppError::DatabaseError(err)
}

/// Escapes LIKE wildcards so a name filter is a literal substring match.
fn like_pattern(fragment: &str) -> String {
    let escaped = fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl CustomerRepository for PgCustomerRepository {
    async fn create_customer(&self, new: &NewCustomer) -> Result<Customer, AppError> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<(i64,)> = sqlx::query_as(
            "SELECT customer_id FROM customers WHERE email = $1 OR phone = $2 LIMIT 1",
        )
        .bind(&new.email)
        .bind(&new.phone)
        .fetch_optional(&mut *tx)
        .await?;

        if existing.is_some() {
            return Err(AppError::CustomerExists);
        }

        let customer = sqlx::query_as::<_, Customer>(&format!(
            "INSERT INTO customers (name, email, phone) VALUES ($1, $2, $3) RETURNING {}",
            CUSTOMER_COLUMNS
        ))
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.phone)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_violation_as(e, AppError::CustomerExists))?;

        tx.commit().await?;
        Ok(customer)
    }

    async fn list_customers(
        &self,
        filter: &CustomerFilter,
        page: Page,
    ) -> Result<Vec<Customer>, AppError> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            r#"
            SELECT {}
            FROM customers
            WHERE ($1::text IS NULL OR name ILIKE $1 ESCAPE '\')
              AND ($2::text IS NULL OR email = $2)
              AND ($3::text IS NULL OR phone = $3)
            ORDER BY customer_id ASC
            LIMIT $4 OFFSET $5
            "#,
            CUSTOMER_COLUMNS
        ))
        .bind(filter.name.as_deref().map(like_pattern))
        .bind(filter.email.as_deref())
        .bind(filter.phone.as_deref())
        .bind(page.limit)
        .bind(page.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    async fn get_customer(&self, customer_id: i64) -> Result<CustomerWithAddresses, AppError> {
        let mut conn = self.pool.acquire().await?;

        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {} FROM customers WHERE customer_id = $1",
            CUSTOMER_COLUMNS
        ))
        .bind(customer_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(AppError::CustomerNotFound)?;

        let addresses = sqlx::query_as::<_, Address>(&format!(
            "SELECT {} FROM addresses WHERE customer_id = $1 ORDER BY address_id ASC",
            ADDRESS_COLUMNS
        ))
        .bind(customer_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(CustomerWithAddresses {
            customer,
            addresses,
        })
    }

    async fn update_customer(
        &self,
        customer_id: i64,
        update: &CustomerUpdate,
    ) -> Result<Customer, AppError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {} FROM customers WHERE customer_id = $1 FOR UPDATE",
            CUSTOMER_COLUMNS
        ))
        .bind(customer_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::CustomerNotFound)?;

        if update.is_empty() {
            return Ok(current);
        }

        if let Some(phone) = &update.phone {
            let taken: Option<(i64,)> = sqlx::query_as(
                "SELECT customer_id FROM customers WHERE phone = $1 AND customer_id <> $2 LIMIT 1",
            )
            .bind(phone)
            .bind(customer_id)
            .fetch_optional(&mut *tx)
            .await?;

            if taken.is_some() {
                return Err(AppError::PhoneInUse);
            }
        }

        let customer = sqlx::query_as::<_, Customer>(&format!(
            r#"
            UPDATE customers
            SET name = COALESCE($2, name),
                phone = COALESCE($3, phone)
            WHERE customer_id = $1
            RETURNING {}
            "#,
            CUSTOMER_COLUMNS
        ))
        .bind(customer_id)
        .bind(update.name.as_deref())
        .bind(update.phone.as_deref())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_violation_as(e, AppError::PhoneInUse))?;

        tx.commit().await?;
        Ok(customer)
    }

    async fn delete_customer(&self, customer_id: i64) -> Result<(), AppError> {
        // Addresses go with it through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM customers WHERE customer_id = $1")
            .bind(customer_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::CustomerNotFound);
        }
        Ok(())
    }

    async fn list_addresses(&self, customer_id: i64) -> Result<Vec<Address>, AppError> {
        let mut conn = self.pool.acquire().await?;

        let exists: Option<(i64,)> =
            sqlx::query_as("SELECT customer_id FROM customers WHERE customer_id = $1")
                .bind(customer_id)
                .fetch_optional(&mut *conn)
                .await?;
        if exists.is_none() {
            return Err(AppError::CustomerNotFound);
        }

        let addresses = sqlx::query_as::<_, Address>(&format!(
            "SELECT {} FROM addresses WHERE customer_id = $1 ORDER BY address_id ASC",
            ADDRESS_COLUMNS
        ))
        .bind(customer_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(addresses)
    }

    async fn create_address(
        &self,
        customer_id: i64,
        new: &NewAddress,
    ) -> Result<Address, AppError> {
        let mut tx = self.pool.begin().await?;

        // KEY SHARE blocks a concurrent delete of the parent until we commit.
        let exists: Option<(i64,)> = sqlx::query_as(
            "SELECT customer_id FROM customers WHERE customer_id = $1 FOR KEY SHARE",
        )
        .bind(customer_id)
        .fetch_optional(&mut *tx)
        .await?;
        if exists.is_none() {
            return Err(AppError::CustomerNotFound);
        }

        let address = sqlx::query_as::<_, Address>(&format!(
            r#"
            INSERT INTO addresses (customer_id, line1, area, city, pincode)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            ADDRESS_COLUMNS
        ))
        .bind(customer_id)
        .bind(&new.line1)
        .bind(new.area.as_deref())
        .bind(&new.city)
        .bind(&new.pincode)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::CustomerNotFound
            }
            other => AppError::DatabaseError(other),
        })?;

        tx.commit().await?;
        Ok(address)
    }

    async fn check_address_ownership(
        &self,
        customer_id: i64,
        address_id: i64,
    ) -> Result<AddressOwnership, AppError> {
        let mut conn = self.pool.acquire().await?;

        let customer: Option<(i64,)> =
            sqlx::query_as("SELECT customer_id FROM customers WHERE customer_id = $1")
                .bind(customer_id)
                .fetch_optional(&mut *conn)
                .await?;
        if customer.is_none() {
            return Ok(AddressOwnership::Rejected(
                ValidationReason::CustomerNotFound,
            ));
        }

        let address: Option<(i64,)> = sqlx::query_as(
            "SELECT address_id FROM addresses WHERE address_id = $1 AND customer_id = $2",
        )
        .bind(address_id)
        .bind(customer_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(match address {
            Some(_) => AddressOwnership::Owned,
            None => AddressOwnership::Rejected(ValidationReason::AddressNotOwned),
        })
    }

    async fn count_customers(&self) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ann"), "%ann%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn non_database_errors_stay_database_errors() {
        let mapped = unique_violation_as(sqlx::Error::RowNotFound, AppError::CustomerExists);
        assert!(matches!(mapped, AppError::DatabaseError(_)));
    }
}
