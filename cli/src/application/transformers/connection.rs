use smarter_common::kinds::{ApiConnectionSpec, AuthMethod, DbEngine, SqlConnectionSpec};
use smarter_common::{FieldError, Kind, ManifestDocument};

use super::{FieldRef, Transformer, check_name_ref, check_positive, example_metadata};

pub struct SqlConnectionTransformer;

impl Transformer for SqlConnectionTransformer {
    type Spec = SqlConnectionSpec;

    const KIND: Kind = Kind::SqlConnection;

    fn example() -> ManifestDocument<SqlConnectionSpec> {
        ManifestDocument::new(
            Kind::SqlConnection,
            example_metadata("stackademy-sql", "Stackademy course catalog (read-only)"),
            SqlConnectionSpec {
                db_engine: DbEngine::Mysql,
                hostname: "sql.lawrencemcdaniel.com".to_string(),
                port: 3306,
                database: "smarter_test_db".to_string(),
                username: "smarter_test_user".to_string(),
                password: "stackademy-db-password".to_string(),
                timeout: 30,
                use_ssl: false,
            },
        )
    }

    fn check(spec: &SqlConnectionSpec) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if spec.hostname.trim().is_empty() {
            errors.push(FieldError::new("spec.hostname", "must not be empty"));
        }
        if spec.port == 0 {
            errors.push(FieldError::new("spec.port", "must be between 1 and 65535"));
        }
        if spec.database.trim().is_empty() {
            errors.push(FieldError::new("spec.database", "must not be empty"));
        }
        check_positive(&mut errors, "spec.timeout", spec.timeout);
        check_name_ref(&mut errors, "spec.password", Kind::Secret, &spec.password);
        errors
    }

    fn references(spec: &SqlConnectionSpec) -> Vec<FieldRef> {
        vec![FieldRef::apply("spec.password", Kind::Secret, &spec.password)]
    }
}

pub struct ApiConnectionTransformer;

impl Transformer for ApiConnectionTransformer {
    type Spec = ApiConnectionSpec;

    const KIND: Kind = Kind::ApiConnection;

    fn example() -> ManifestDocument<ApiConnectionSpec> {
        ManifestDocument::new(
            Kind::ApiConnection,
            example_metadata("weather-api", "Public weather service"),
            ApiConnectionSpec {
                base_url: "https://api.weather.example.com".to_string(),
                auth_method: AuthMethod::Token,
                api_key: Some("weather-api-key".to_string()),
                timeout: 30,
            },
        )
    }

    fn check(spec: &ApiConnectionSpec) -> Vec<FieldError> {
        let mut errors = Vec::new();
        let host = spec
            .base_url
            .strip_prefix("https://")
            .or_else(|| spec.base_url.strip_prefix("http://"));
        if host.is_none_or(str::is_empty) {
            errors.push(FieldError::new(
                "spec.baseUrl",
                format!("'{}' must be an http:// or https:// URL", spec.base_url),
            ));
        }
        match (&spec.auth_method, &spec.api_key) {
            (AuthMethod::None, _) => {}
            (_, None) => errors.push(FieldError::new(
                "spec.apiKey",
                "is required when authMethod is basic or token",
            )),
            (_, Some(secret)) => check_name_ref(&mut errors, "spec.apiKey", Kind::Secret, secret),
        }
        check_positive(&mut errors, "spec.timeout", spec.timeout);
        errors
    }

    fn references(spec: &ApiConnectionSpec) -> Vec<FieldRef> {
        spec.api_key
            .iter()
            .map(|secret| FieldRef::apply("spec.apiKey", Kind::Secret, secret))
            .collect()
    }
}
