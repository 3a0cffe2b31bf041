//! Plugin variant transformers: `static`, `sql` and `api`.
//!
//! Each variant is a full transformer of its own; `PluginController` picks
//! one per request.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;
use smarter_common::kinds::{
    ApiData, ApiPluginData, ApiPluginSpec, HttpMethod, ParameterType, PluginClass,
    PluginParameter, PluginPrompt, PluginSelector, PluginSpec, SelectorDirective, SqlData,
    SqlPluginData, SqlPluginSpec, StaticPluginData, StaticPluginSpec, TestValue,
};
use smarter_common::{FieldError, Kind, ManifestDocument};

use super::{FieldRef, Transformer, check_name_ref, check_positive, check_range, example_metadata};

/// `{name}` placeholders in SQL queries and API endpoints.
static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex")
});

pub struct StaticPluginTransformer;
pub struct SqlPluginTransformer;
pub struct ApiPluginTransformer;

impl Transformer for StaticPluginTransformer {
    type Spec = StaticPluginSpec;

    const KIND: Kind = Kind::Plugin;
    const VARIANT: Option<&'static str> = Some("static");

    fn example() -> ManifestDocument<StaticPluginSpec> {
        ManifestDocument::new(
            Kind::Plugin,
            example_metadata("everlasting-gobstopper", "Facts about the Everlasting Gobstopper"),
            PluginSpec {
                selector: PluginSelector {
                    directive: SelectorDirective::SearchTerms,
                    search_terms: vec!["gobstopper".to_string(), "candy".to_string()],
                },
                prompt: example_prompt("You are a helpful marketing agent for Willy Wonka's candy factory."),
                data: StaticPluginData {
                    class: PluginClass::Static,
                    description: "Product facts for the Everlasting Gobstopper".to_string(),
                    static_data: json!({
                        "contributor": "Willy Wonka",
                        "flavors": ["peppermint", "lime", "cherry"],
                        "shelfLifeYears": 100
                    }),
                },
            },
        )
    }

    fn check(spec: &StaticPluginSpec) -> Vec<FieldError> {
        let mut errors = check_common(spec, PluginClass::Static, spec.data.class);
        if spec.data.static_data.is_null() {
            errors.push(FieldError::new("spec.data.staticData", "must not be null"));
        }
        errors
    }
}

impl Transformer for SqlPluginTransformer {
    type Spec = SqlPluginSpec;

    const KIND: Kind = Kind::Plugin;
    const VARIANT: Option<&'static str> = Some("sql");

    fn example() -> ManifestDocument<SqlPluginSpec> {
        ManifestDocument::new(
            Kind::Plugin,
            example_metadata("stackademy-sql", "Query the Stackademy course catalog"),
            PluginSpec {
                selector: PluginSelector {
                    directive: SelectorDirective::SearchTerms,
                    search_terms: vec!["course".to_string(), "stackademy".to_string()],
                },
                prompt: example_prompt("You are a helpful course advisor for Stackademy."),
                data: SqlPluginData {
                    class: PluginClass::Sql,
                    description: "Look up courses by keyword".to_string(),
                    sql_data: SqlData {
                        connection: "stackademy-sql".to_string(),
                        sql_query: "SELECT title, description FROM courses WHERE title LIKE '%{keyword}%'".to_string(),
                        parameters: vec![PluginParameter {
                            name: "keyword".to_string(),
                            param_type: ParameterType::String,
                            description: Some("Keyword to search course titles for".to_string()),
                            required: true,
                            default: None,
                        }],
                        test_values: vec![TestValue {
                            name: "keyword".to_string(),
                            value: json!("python"),
                        }],
                        limit: Some(10),
                    },
                },
            },
        )
    }

    fn check(spec: &SqlPluginSpec) -> Vec<FieldError> {
        let sql = &spec.data.sql_data;
        let mut errors = check_common(spec, PluginClass::Sql, spec.data.class);
        check_name_ref(&mut errors, "spec.data.sqlData.connection", Kind::SqlConnection, &sql.connection);
        if sql.sql_query.trim().is_empty() {
            errors.push(FieldError::new("spec.data.sqlData.sqlQuery", "must not be empty"));
        }
        check_parameters(
            &mut errors,
            "spec.data.sqlData",
            &sql.parameters,
            &sql.test_values,
            &[("sqlQuery", sql.sql_query.as_str())],
        );
        if let Some(limit) = sql.limit {
            check_positive(&mut errors, "spec.data.sqlData.limit", limit);
        }
        errors
    }

    fn references(spec: &SqlPluginSpec) -> Vec<FieldRef> {
        vec![FieldRef::apply(
            "spec.data.sqlData.connection",
            Kind::SqlConnection,
            &spec.data.sql_data.connection,
        )]
    }
}

impl Transformer for ApiPluginTransformer {
    type Spec = ApiPluginSpec;

    const KIND: Kind = Kind::Plugin;
    const VARIANT: Option<&'static str> = Some("api");

    fn example() -> ManifestDocument<ApiPluginSpec> {
        ManifestDocument::new(
            Kind::Plugin,
            example_metadata("weather-forecast", "Current forecast for a city"),
            PluginSpec {
                selector: PluginSelector {
                    directive: SelectorDirective::SearchTerms,
                    search_terms: vec!["weather".to_string(), "forecast".to_string()],
                },
                prompt: example_prompt("You are a helpful weather assistant."),
                data: ApiPluginData {
                    class: PluginClass::Api,
                    description: "Fetch the forecast for a city".to_string(),
                    api_data: ApiData {
                        connection: "weather-api".to_string(),
                        endpoint: "/v1/forecast/{city}".to_string(),
                        method: HttpMethod::Get,
                        headers: BTreeMap::from([("Accept".to_string(), "application/json".to_string())]),
                        body: None,
                        parameters: vec![PluginParameter {
                            name: "city".to_string(),
                            param_type: ParameterType::String,
                            description: Some("City name".to_string()),
                            required: true,
                            default: None,
                        }],
                        test_values: vec![TestValue {
                            name: "city".to_string(),
                            value: json!("Boston"),
                        }],
                        limit: None,
                    },
                },
            },
        )
    }

    fn check(spec: &ApiPluginSpec) -> Vec<FieldError> {
        let api = &spec.data.api_data;
        let mut errors = check_common(spec, PluginClass::Api, spec.data.class);
        check_name_ref(&mut errors, "spec.data.apiData.connection", Kind::ApiConnection, &api.connection);
        if !api.endpoint.starts_with('/') {
            errors.push(FieldError::new(
                "spec.data.apiData.endpoint",
                format!("'{}' must start with '/'", api.endpoint),
            ));
        }
        check_parameters(
            &mut errors,
            "spec.data.apiData",
            &api.parameters,
            &api.test_values,
            &[("endpoint", api.endpoint.as_str())],
        );
        if let Some(limit) = api.limit {
            check_positive(&mut errors, "spec.data.apiData.limit", limit);
        }
        errors
    }

    fn references(spec: &ApiPluginSpec) -> Vec<FieldRef> {
        vec![FieldRef::apply(
            "spec.data.apiData.connection",
            Kind::ApiConnection,
            &spec.data.api_data.connection,
        )]
    }
}

fn example_prompt(system_role: &str) -> PluginPrompt {
    PluginPrompt {
        provider: "openai".to_string(),
        system_role: system_role.to_string(),
        model: "gpt-4o-mini".to_string(),
        temperature: 0.0,
        max_tokens: 256,
    }
}

/// Rules shared by every variant.
fn check_common<D>(spec: &PluginSpec<D>, expected: PluginClass, actual: PluginClass) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if actual != expected {
        errors.push(FieldError::new(
            "spec.data.type",
            format!("expected '{expected}', found '{actual}'"),
        ));
    }
    if spec.selector.directive == SelectorDirective::SearchTerms
        && spec.selector.search_terms.iter().all(|t| t.trim().is_empty())
    {
        errors.push(FieldError::new(
            "spec.selector.searchTerms",
            "must not be empty when directive is search_terms",
        ));
    }
    if spec.prompt.model.trim().is_empty() {
        errors.push(FieldError::new("spec.prompt.model", "must not be empty"));
    }
    check_range(&mut errors, "spec.prompt.temperature", spec.prompt.temperature, 0.0, 2.0);
    check_positive(&mut errors, "spec.prompt.maxTokens", spec.prompt.max_tokens);
    errors
}

/// Parameter names are unique, every placeholder is declared, and every
/// test value names a declared parameter.
fn check_parameters(
    errors: &mut Vec<FieldError>,
    base: &str,
    parameters: &[PluginParameter],
    test_values: &[TestValue],
    templates: &[(&str, &str)],
) {
    let mut declared = BTreeSet::new();
    for (i, param) in parameters.iter().enumerate() {
        if !declared.insert(param.name.as_str()) {
            errors.push(FieldError::new(
                format!("{base}.parameters[{i}].name"),
                format!("duplicate parameter '{}'", param.name),
            ));
        }
    }
    for (field, template) in templates {
        for placeholder in placeholders(template) {
            if !declared.contains(placeholder) {
                errors.push(FieldError::new(
                    format!("{base}.{field}"),
                    format!("placeholder '{{{placeholder}}}' is not a declared parameter"),
                ));
            }
        }
    }
    for (i, test) in test_values.iter().enumerate() {
        if !declared.contains(test.name.as_str()) {
            errors.push(FieldError::new(
                format!("{base}.testValues[{i}].name"),
                format!("'{}' is not a declared parameter", test.name),
            ));
        }
    }
}

fn placeholders(template: &str) -> Vec<&str> {
    PLACEHOLDER_RE
        .captures_iter(template)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect()
}
