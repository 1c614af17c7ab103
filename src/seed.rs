//! Initial data load for empty stores.
//!
//! The seed file is a JSON array of customers, each with optional nested
//! addresses. A store that already holds customers is never re-seeded.

use serde::Deserialize;
use std::path::Path;

use crate::errors::AppError;
use crate::models::{NewAddress, NewCustomer};
use crate::repository::CustomerRepository;
use crate::validation;

#[derive(Debug, Clone, Deserialize)]
pub struct SeedCustomer {
    #[serde(flatten)]
    pub customer: NewCustomer,
    #[serde(default)]
    pub addresses: Vec<NewAddress>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub customers: usize,
    pub addresses: usize,
    pub skipped: usize,
}

/// Reads and parses a seed file.
pub async fn load_seed_file(path: &Path) -> anyhow::Result<Vec<SeedCustomer>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow::anyhow!("failed to read seed file {}: {}", path.display(), e))?;
    let records = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("failed to parse seed file {}: {}", path.display(), e))?;
    Ok(records)
}

/// Inserts `records` when the store is empty. Returns `None` if seeding was skipped.
///
/// Invalid or duplicate entries are skipped with a warning; storage failures abort.
pub async fn seed_if_empty(
    repo: &dyn CustomerRepository,
    records: &[SeedCustomer],
) -> Result<Option<SeedReport>, AppError> {
    let existing = repo.count_customers().await?;
    if existing > 0 {
        tracing::info!(existing, "Customer table already seeded. Skipping.");
        return Ok(None);
    }

    let mut report = SeedReport::default();

    for (idx, record) in records.iter().enumerate() {
        if let Err(e) = validation::validate_new_customer(&record.customer) {
            tracing::warn!(index = idx, "Skipping seed customer: {}", e);
            report.skipped += 1;
            continue;
        }

        let customer = match repo.create_customer(&record.customer).await {
            Ok(customer) => customer,
            Err(AppError::CustomerExists) => {
                tracing::warn!(index = idx, "Skipping duplicate seed customer");
                report.skipped += 1;
                continue;
            }
            Err(e) => return Err(e),
        };
        report.customers += 1;

        for address in &record.addresses {
            if let Err(e) = validation::validate_new_address(address) {
                tracing::warn!(
                    customer_id = customer.customer_id,
                    "Skipping seed address: {}",
                    e
                );
                report.skipped += 1;
                continue;
            }
            repo.create_address(customer.customer_id, address).await?;
            report.addresses += 1;
        }
    }

    tracing::info!(
        customers = report.customers,
        addresses = report.addresses,
        skipped = report.skipped,
        "Seeded customer store"
    );
    Ok(Some(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_storage::InMemoryCustomerRepository;
    use crate::models::{CustomerFilter, Page};

    fn records() -> Vec<SeedCustomer> {
        serde_json::from_value(serde_json::json!([
            {
                "name": "Asha",
                "email": "asha@example.com",
                "phone": "100",
                "addresses": [
                    {"line1": "1 Lake Rd", "city": "Pune", "pincode": "411001"},
                    {"line1": "", "city": "Pune", "pincode": "411001"}
                ]
            },
            {"name": "Dup", "email": "asha@example.com", "phone": "200"},
            {"name": "Bad", "email": "not-an-email", "phone": "300"},
            {"name": "Ravi", "email": "ravi@example.com", "phone": "400"}
        ]))
        .unwrap()
    }

    #[tokio::test]
    async fn seeds_valid_records_and_skips_the_rest() {
        let repo = InMemoryCustomerRepository::new();
        let report = seed_if_empty(&repo, &records()).await.unwrap().unwrap();

        assert_eq!(
            report,
            SeedReport {
                customers: 2,
                addresses: 1,
                skipped: 3
            }
        );

        let all = repo
            .list_customers(&CustomerFilter::default(), Page::default())
            .await
            .unwrap();
        let names: Vec<_> = all.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Asha", "Ravi"]);
    }

    #[tokio::test]
    async fn populated_store_is_not_reseeded() {
        let repo = InMemoryCustomerRepository::new();
        seed_if_empty(&repo, &records()).await.unwrap();
        assert_eq!(seed_if_empty(&repo, &records()).await.unwrap(), None);
        assert_eq!(repo.count_customers().await.unwrap(), 2);
    }
}
