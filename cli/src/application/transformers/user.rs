use smarter_common::kinds::UserSpec;
use smarter_common::{FieldError, Kind, ManifestDocument};

use super::{Transformer, example_metadata};
use crate::domain::{BrokerError, Caller};

pub struct UserTransformer;

impl Transformer for UserTransformer {
    type Spec = UserSpec;

    const KIND: Kind = Kind::User;
    const ADMIN_ONLY: bool = true;

    fn example() -> ManifestDocument<UserSpec> {
        ManifestDocument::new(
            Kind::User,
            example_metadata("mcdaniel", "Account administrator"),
            UserSpec {
                email: "mcdaniel@example.com".to_string(),
                first_name: Some("Lawrence".to_string()),
                last_name: Some("McDaniel".to_string()),
                is_admin: true,
                is_active: true,
            },
        )
    }

    fn check(spec: &UserSpec) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if !is_email(&spec.email) {
            errors.push(FieldError::new(
                "spec.email",
                format!("'{}' is not an email address", spec.email),
            ));
        }
        errors
    }

    fn authorize_delete(caller: &Caller, name: &str) -> Result<(), BrokerError> {
        if caller.username == name {
            Err(BrokerError::Permission(format!(
                "user '{name}' cannot delete themselves"
            )))
        } else {
            Ok(())
        }
    }
}

fn is_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
