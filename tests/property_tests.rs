/// Property-based tests using proptest
/// Tests invariants of payload validation and pagination that should hold for all inputs
use customer_service::models::{ListCustomersParams, NewCustomer, Page};
use customer_service::validation::{is_valid_email, parse_list_params, validate_new_customer};
use proptest::prelude::*;

// Property: Email validation should never panic
proptest! {
    #[test]
    fn email_validation_never_panics(email in "\\PC*") {
        let _ = is_valid_email(&email);
    }

    #[test]
    fn well_formed_emails_accepted(
        local in "[a-z][a-z0-9._+-]{0,15}",
        domain in "[a-z][a-z0-9]{0,15}",
        tld in "[a-z]{2,6}"
    ) {
        let email = format!("{}@{}.{}", local, domain, tld);
        prop_assert!(is_valid_email(&email), "rejected well-formed email: {}", email);
    }

    #[test]
    fn emails_without_at_rejected(s in "[a-zA-Z0-9.]{0,40}") {
        prop_assert!(!is_valid_email(&s));
    }
}

// Property: Pagination bounds
proptest! {
    #[test]
    fn limits_in_range_accepted(limit in 1i64..=200, offset in 0i64..1_000_000) {
        let params = ListCustomersParams {
            limit: Some(limit),
            offset: Some(offset),
            ..Default::default()
        };
        let (_, page) = parse_list_params(params).unwrap();
        prop_assert_eq!(page, Page { limit, offset });
    }

    #[test]
    fn limits_out_of_range_rejected(limit in prop_oneof![i64::MIN..1i64, 201i64..i64::MAX]) {
        let params = ListCustomersParams {
            limit: Some(limit),
            ..Default::default()
        };
        prop_assert!(parse_list_params(params).is_err());
    }

    #[test]
    fn negative_offsets_rejected(offset in i64::MIN..0i64) {
        let params = ListCustomersParams {
            offset: Some(offset),
            ..Default::default()
        };
        prop_assert!(parse_list_params(params).is_err());
    }
}

// Property: Phone length bound
proptest! {
    #[test]
    fn phones_longer_than_column_rejected(phone in "[0-9]{21,40}") {
        let payload = NewCustomer {
            name: "A".to_string(),
            email: "a@x.com".to_string(),
            phone,
        };
        prop_assert!(validate_new_customer(&payload).is_err());
    }
}
