use smarter_common::kinds::ApiKeySpec;
use smarter_common::{Kind, ManifestDocument};

use super::{FieldRef, Transformer, example_metadata};

/// The token itself is issued by the broker on creation and never stored.
pub struct ApiKeyTransformer;

impl Transformer for ApiKeyTransformer {
    type Spec = ApiKeySpec;

    const KIND: Kind = Kind::ApiKey;
    const ADMIN_ONLY: bool = true;
    const ISSUES_CREDENTIAL: bool = true;

    fn example() -> ManifestDocument<ApiKeySpec> {
        ManifestDocument::new(
            Kind::ApiKey,
            example_metadata("ci-deploy", "Key used by the CI pipeline"),
            ApiKeySpec {
                user: "mcdaniel".to_string(),
                is_active: true,
            },
        )
    }

    fn references(spec: &ApiKeySpec) -> Vec<FieldRef> {
        vec![FieldRef::apply("spec.user", Kind::User, &spec.user)]
    }
}
