use std::env;
use std::sync::Arc;
use uuid::Uuid;

use customer_service::db::{Database, DatabaseOptions};
use customer_service::db_storage::PgCustomerRepository;
use customer_service::errors::AppError;
use customer_service::models::{
    AddressOwnership, CustomerFilter, CustomerUpdate, NewAddress, NewCustomer, Page,
    ValidationReason,
};
use customer_service::repository::CustomerRepository;

/// Integration smoke test for the PostgreSQL repository.
/// Marked ignored to avoid running against production by accident; set TEST_DATABASE_URL to run.
#[tokio::test]
#[ignore]
async fn postgres_repository_smoke_test() -> anyhow::Result<()> {
    let db_url = env::var("TEST_DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL to run this test"))?;

    let options = DatabaseOptions {
        connect_retries: 1,
        ..DatabaseOptions::default()
    };
    let db = Database::connect(&db_url, &options).await?;
    let repo = PgCustomerRepository::new(db.pool.clone());

    // Unique values avoid conflicts on repeated runs.
    let tag = Uuid::new_v4().simple().to_string();
    let phone = format!("9{}", &tag[..12]);
    let new = NewCustomer {
        name: format!("Smoke {}", tag),
        email: format!("smoke-{}@example.com", tag),
        phone: phone.clone(),
    };

    let customer = repo.create_customer(&new).await.map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert!(customer.customer_id > 0);

    let duplicate = repo.create_customer(&new).await;
    assert!(matches!(duplicate, Err(AppError::CustomerExists)));

    let filter = CustomerFilter {
        phone: Some(phone.clone()),
        ..Default::default()
    };
    let found = repo
        .list_customers(&filter, Page::default())
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(found.len(), 1);

    let updated = repo
        .update_customer(
            customer.customer_id,
            &CustomerUpdate {
                name: Some("Renamed".to_string()),
                phone: Some(phone.clone()),
            },
        )
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.email, customer.email);

    let address = repo
        .create_address(
            customer.customer_id,
            &NewAddress {
                line1: "1 Test Lane".to_string(),
                area: None,
                city: "Testville".to_string(),
                pincode: "00000".to_string(),
            },
        )
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let ownership = repo
        .check_address_ownership(customer.customer_id, address.address_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(ownership, AddressOwnership::Owned);

    repo.delete_customer(customer.customer_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let ownership = repo
        .check_address_ownership(customer.customer_id, address.address_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(
        ownership,
        AddressOwnership::Rejected(ValidationReason::CustomerNotFound)
    );

    let (orphans,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM addresses WHERE address_id = $1")
            .bind(address.address_id)
            .fetch_one(&db.pool)
            .await?;
    assert_eq!(orphans, 0, "addresses must be removed with their customer");

    // Concurrent creates with one email: the unique index decides the winner.
    let repo = Arc::new(repo);
    let race_email = format!("race-{}@example.com", tag);
    let mut creates = Vec::new();
    for i in 0..16 {
        let repo = Arc::clone(&repo);
        let new = NewCustomer {
            name: format!("Race {}", i),
            email: race_email.clone(),
            phone: format!("7{}{:02}", &tag[..12], i),
        };
        creates.push(tokio::spawn(async move { repo.create_customer(&new).await }));
    }

    let mut created = 0;
    for handle in creates {
        match handle.await? {
            Ok(_) => created += 1,
            Err(AppError::CustomerExists) => {}
            Err(other) => anyhow::bail!("unexpected create error: {}", other),
        }
    }
    assert_eq!(created, 1, "exactly one concurrent create must win");

    // Two customers racing for the same new phone.
    let first = repo
        .create_customer(&NewCustomer {
            name: "Phone A".to_string(),
            email: format!("phone-a-{}@example.com", tag),
            phone: format!("6{}01", &tag[..12]),
        })
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let second = repo
        .create_customer(&NewCustomer {
            name: "Phone B".to_string(),
            email: format!("phone-b-{}@example.com", tag),
            phone: format!("6{}02", &tag[..12]),
        })
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let contested = format!("5{}00", &tag[..12]);
    let mut updates = Vec::new();
    for id in [first.customer_id, second.customer_id] {
        let repo = Arc::clone(&repo);
        let update = CustomerUpdate {
            name: None,
            phone: Some(contested.clone()),
        };
        updates.push(tokio::spawn(async move { repo.update_customer(id, &update).await }));
    }

    let mut updated = 0;
    for handle in updates {
        match handle.await? {
            Ok(customer) => {
                assert_eq!(customer.phone, contested);
                updated += 1;
            }
            Err(AppError::PhoneInUse) => {}
            Err(other) => anyhow::bail!("unexpected update error: {}", other),
        }
    }
    assert_eq!(updated, 1, "exactly one concurrent phone update must win");

    // LIKE wildcards in the name filter match literally.
    for (name, suffix) in [(format!("Promo 50% {}", tag), "31"), (format!("Promo 500 {}", tag), "32")] {
        repo.create_customer(&NewCustomer {
            name,
            email: format!("promo-{}-{}@example.com", suffix, tag),
            phone: format!("4{}{}", &tag[..12], suffix),
        })
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    }
    let literal = repo
        .list_customers(
            &CustomerFilter {
                name: Some(format!("50% {}", tag)),
                ..Default::default()
            },
            Page::default(),
        )
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let names: Vec<_> = literal.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec![format!("Promo 50% {}", tag).as_str()]);

    Ok(())
}
