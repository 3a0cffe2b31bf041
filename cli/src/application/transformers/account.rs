use smarter_common::kinds::AccountSpec;
use smarter_common::{FieldError, Kind, ManifestDocument};

use super::{Transformer, example_metadata};
use crate::domain::manifest::ValidatedManifest;
use crate::domain::{BrokerError, Caller};

pub struct AccountTransformer;

impl Transformer for AccountTransformer {
    type Spec = AccountSpec;

    const KIND: Kind = Kind::Account;
    const ADMIN_ONLY: bool = true;

    fn example() -> ManifestDocument<AccountSpec> {
        ManifestDocument::new(
            Kind::Account,
            example_metadata("3141-5926-5359", "Stackademy customer account"),
            AccountSpec {
                company_name: "Stackademy".to_string(),
                phone: Some("+1 617 555 0100".to_string()),
                address1: Some("1 Main St".to_string()),
                address2: None,
                city: Some("Boston".to_string()),
                state: Some("MA".to_string()),
                postal_code: Some("02108".to_string()),
                country: Some("US".to_string()),
                language: "en-US".to_string(),
                timezone: "America/New_York".to_string(),
                currency: "USD".to_string(),
            },
        )
    }

    fn check(spec: &AccountSpec) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if spec.company_name.trim().is_empty() {
            errors.push(FieldError::new("spec.companyName", "must not be empty"));
        }
        errors
    }

    fn authorize_apply(
        caller: &Caller,
        manifest: &ValidatedManifest<AccountSpec>,
    ) -> Result<(), BrokerError> {
        if manifest.name() == caller.account {
            Ok(())
        } else {
            Err(BrokerError::Permission(format!(
                "cannot apply account '{}' from account '{}'",
                manifest.name(),
                caller.account
            )))
        }
    }

    fn authorize_delete(_caller: &Caller, name: &str) -> Result<(), BrokerError> {
        Err(BrokerError::Permission(format!(
            "account '{name}' cannot be deleted through the broker"
        )))
    }
}
