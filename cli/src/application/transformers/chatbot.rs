use smarter_common::kinds::{BUILTIN_FUNCTIONS, ChatBotConfig, ChatBotSpec};
use smarter_common::{FieldError, Kind, ManifestDocument};

use super::{FieldRef, Transformer, check_name_ref, check_positive, check_range, example_metadata};
use crate::domain::names::is_dns_label;

pub struct ChatBotTransformer;

impl Transformer for ChatBotTransformer {
    type Spec = ChatBotSpec;

    const KIND: Kind = Kind::ChatBot;

    fn example() -> ManifestDocument<ChatBotSpec> {
        ManifestDocument::new(
            Kind::ChatBot,
            example_metadata("stackademy-sql", "Course advisor backed by the Stackademy catalog"),
            ChatBotSpec {
                config: ChatBotConfig {
                    custom_domain: None,
                    app_name: Some("Stackademy Course Advisor".to_string()),
                    app_assistant: Some("Professor Stack".to_string()),
                    app_welcome_message: Some("Welcome! Ask me about our courses.".to_string()),
                    app_example_prompts: vec![
                        "What Python courses do you offer?".to_string(),
                        "Is there a course on databases?".to_string(),
                    ],
                    app_placeholder: Some("Ask me anything...".to_string()),
                    app_info_url: Some("https://stackademy.example.com/".to_string()),
                    provider: "openai".to_string(),
                    default_model: Some("gpt-4o-mini".to_string()),
                    default_system_role: Some("You are a helpful course advisor.".to_string()),
                    default_temperature: 0.5,
                    default_max_tokens: 2048,
                },
                plugins: vec!["stackademy-sql".to_string()],
                functions: vec!["get_current_weather".to_string()],
            },
        )
    }

    fn check(spec: &ChatBotSpec) -> Vec<FieldError> {
        let config = &spec.config;
        let mut errors = Vec::new();
        if let Some(domain) = &config.custom_domain {
            if !is_hostname(domain) {
                errors.push(FieldError::new(
                    "spec.config.customDomain",
                    format!("'{domain}' is not a fully qualified host name"),
                ));
            }
        }
        check_range(&mut errors, "spec.config.defaultTemperature", config.default_temperature, 0.0, 2.0);
        check_positive(&mut errors, "spec.config.defaultMaxTokens", config.default_max_tokens);
        for (i, plugin) in spec.plugins.iter().enumerate() {
            check_name_ref(&mut errors, &format!("spec.plugins[{i}]"), Kind::Plugin, plugin);
        }
        for (i, function) in spec.functions.iter().enumerate() {
            if !BUILTIN_FUNCTIONS.contains(&function.as_str()) {
                errors.push(FieldError::new(
                    format!("spec.functions[{i}]"),
                    format!(
                        "unknown function '{function}', expected one of: {}",
                        BUILTIN_FUNCTIONS.join(", ")
                    ),
                ));
            }
        }
        errors
    }

    /// Plugins only need to exist once the ChatBot is deployed.
    fn references(spec: &ChatBotSpec) -> Vec<FieldRef> {
        spec.plugins
            .iter()
            .enumerate()
            .map(|(i, plugin)| FieldRef::deploy(format!("spec.plugins[{i}]"), Kind::Plugin, plugin))
            .collect()
    }
}

fn is_hostname(value: &str) -> bool {
    let labels: Vec<&str> = value.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| is_dns_label(label))
}
