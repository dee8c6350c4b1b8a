use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::config::Config;
use crate::error::GenerationError;
use crate::providers::{LLMProvider, ProviderOptions};
use crate::render::{PromptRenderer, RenderContext, Value};
use crate::template::TemplateStore;

const GENERATION_PROMPT: &str = r#"You are an expert software developer. Generate clean,
well-documented and efficient code based on the user's requirements.
Follow best practices and include appropriate comments.
Respond with the code only, without surrounding explanation."#;

const EXPLAIN_PROMPT: &str = r#"You are an expert software developer and technical writer.
Explain the given code in clear, understandable language. Break down
complex concepts and describe what each part does."#;

const REVIEW_PROMPT: &str = r#"You are an expert code reviewer. Review the given code and
provide constructive feedback including code quality issues, performance
improvements, security concerns and suggestions for improvement.
Only report issues that actually exist in the code."#;

const DEFAULT_COMPONENTS: &[&str] = &["main", "utils", "tests", "readme"];

/// Input record for one end-to-end generation call. Immutable once built.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub language: String,
    pub template_name: Option<String>,
    pub extra_options: HashMap<String, String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            language: language.into(),
            template_name: None,
            extra_options: HashMap::new(),
        }
    }

    pub fn with_template(mut self, name: impl Into<String>) -> Self {
        self.template_name = Some(name.into());
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_options.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct GenerationMetadata {
    pub model_used: String,
    pub token_count: usize,
    pub timestamp: DateTime<Utc>,
}

/// Output record of one generation call. The caller owns persistence.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub source_text: String,
    pub language: String,
    pub metadata: Option<GenerationMetadata>,
}

/// Orchestrates provider calls and template rendering.
///
/// One request runs to completion (or failure) at a time; the provider call
/// is the only operation that blocks. Validation failures are raised before
/// the provider is ever invoked.
pub struct CodeGenerator {
    config: Config,
    provider: Box<dyn LLMProvider>,
    templates: TemplateStore,
    renderer: PromptRenderer,
}

impl CodeGenerator {
    pub fn new(config: Config, provider: Box<dyn LLMProvider>) -> Self {
        let templates = TemplateStore::new(config.codegen.template_dir.clone());
        Self {
            config,
            provider,
            templates,
            renderer: PromptRenderer::new(),
        }
    }

    /// Generate code for a single request.
    pub async fn generate_code(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerationError> {
        self.validate(request)?;
        let options = self.build_options(&request.extra_options)?;

        info!(
            "Requesting generation from {} ({})",
            self.provider.name(),
            options.model
        );
        let prompt = format!(
            "{}\n\nGenerate {} code for the following requirement: {}",
            GENERATION_PROMPT, request.language, request.prompt
        );
        let generated = self.provider.generate(&prompt, &options).await?;

        let source_text = match &request.template_name {
            Some(name) => {
                info!("Applying template {}/{}", request.language, name);
                let template = self.templates.load(&request.language, name)?;
                let context = derive_context(&request.prompt, &generated);
                self.renderer.render(&template, &context)?
            }
            None => generated.clone(),
        };

        info!("Generation complete ({} bytes)", source_text.len());
        Ok(GenerationResult {
            source_text,
            language: request.language.clone(),
            metadata: Some(GenerationMetadata {
                model_used: options.model,
                // Rough estimate: 1 token ≈ 4 characters
                token_count: (prompt.len() + generated.len()) / 4,
                timestamp: Utc::now(),
            }),
        })
    }

    /// Generate a set of project files from a high-level description.
    /// Returns relative path → content; the caller persists the mapping.
    pub async fn generate_project(
        &self,
        description: &str,
        name: &str,
        components: &[String],
    ) -> Result<BTreeMap<String, String>, GenerationError> {
        let language = &self.config.codegen.default_language;
        let components: Vec<String> = if components.is_empty() {
            DEFAULT_COMPONENTS.iter().map(|s| s.to_string()).collect()
        } else {
            components.to_vec()
        };

        let mut files = BTreeMap::new();
        for component in &components {
            info!("Generating {} component", component);
            let prompt = format!(
                "Generate the {} component for a project called '{}'.\n\
                 Project description: {}\n\
                 Target language: {}",
                component, name, description, language
            );
            let request = GenerationRequest::new(prompt, language.clone());
            let result = self.generate_code(&request).await?;

            let filename = if component == "readme" {
                "README.md".to_string()
            } else {
                format!("{}.{}", component, file_extension(language))
            };
            files.insert(filename, result.source_text);
        }

        Ok(files)
    }

    /// Ask the provider to explain a piece of code.
    pub async fn explain_code(&self, code: &str) -> Result<String, GenerationError> {
        let options = self.build_options(&HashMap::new())?;
        let prompt = format!("{}\n\nExplain this code:\n\n{}", EXPLAIN_PROMPT, code);
        Ok(self.provider.generate(&prompt, &options).await?)
    }

    /// Ask the provider to review a piece of code.
    pub async fn review_code(&self, code: &str) -> Result<String, GenerationError> {
        let options = self.build_options(&HashMap::new())?;
        let prompt = format!("{}\n\nReview this code:\n\n{}", REVIEW_PROMPT, code);
        Ok(self.provider.generate(&prompt, &options).await?)
    }

    fn validate(&self, request: &GenerationRequest) -> Result<(), GenerationError> {
        if request.prompt.trim().is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }
        if !self
            .config
            .codegen
            .supported_languages
            .iter()
            .any(|l| l == &request.language)
        {
            return Err(GenerationError::UnsupportedLanguage(
                request.language.clone(),
            ));
        }
        Ok(())
    }

    fn build_options(
        &self,
        extra: &HashMap<String, String>,
    ) -> Result<ProviderOptions, GenerationError> {
        let mut options = ProviderOptions {
            model: self.config.provider.model.clone(),
            temperature: self.config.provider.temperature,
            max_tokens: self.config.provider.max_tokens,
        };
        for (key, value) in extra {
            match key.as_str() {
                "model" => options.model = value.clone(),
                "temperature" => options.temperature = parse_option(key, value)?,
                "max_tokens" => options.max_tokens = parse_option(key, value)?,
                other => debug!("Ignoring unrecognized option: {}", other),
            }
        }
        Ok(options)
    }
}

fn parse_option<T: FromStr>(name: &str, value: &str) -> Result<T, GenerationError> {
    value.parse().map_err(|_| GenerationError::InvalidOption {
        name: name.to_string(),
        value: value.to_string(),
    })
}

/// Build the render context for a templated generation. `generated_code`
/// carries the raw provider output; name and description fields come from
/// the prompt text ahead of the first sentence break. Fields that cannot be
/// derived are left unset so template defaults apply.
fn derive_context(prompt: &str, generated: &str) -> RenderContext {
    let mut context = RenderContext::new();
    context.insert(
        "generated_code".to_string(),
        Value::Text(generated.to_string()),
    );

    let sentence = first_sentence(prompt);
    if !sentence.is_empty() {
        context.insert("description".to_string(), Value::Text(sentence.to_string()));
        if let Some(name) = named_identifier(sentence) {
            context.insert(
                "class_name".to_string(),
                Value::Text(to_pascal_case(&name)),
            );
            context.insert(
                "module_name".to_string(),
                Value::Text(to_snake_case(&name)),
            );
        }
    }

    context
}

fn first_sentence(text: &str) -> &str {
    let text = text.trim();
    let end = text.find(['.', '!', '?', '\n']).unwrap_or(text.len());
    text[..end].trim()
}

/// Look for a name following "class", "called" or "named" in the sentence.
fn named_identifier(sentence: &str) -> Option<String> {
    let words: Vec<&str> = sentence.split_whitespace().collect();
    for (i, word) in words.iter().enumerate() {
        let keyword = word.to_lowercase();
        if matches!(keyword.as_str(), "class" | "called" | "named") {
            if let Some(next) = words.get(i + 1) {
                let candidate: String = next
                    .chars()
                    .filter(|c| c.is_alphanumeric() || *c == '_')
                    .collect();
                // "class named Foo": the keyword after "class" is not the name
                if matches!(candidate.to_lowercase().as_str(), "class" | "called" | "named") {
                    continue;
                }
                if candidate.chars().next().is_some_and(|c| c.is_alphabetic()) {
                    return Some(candidate);
                }
            }
        }
    }
    None
}

fn to_pascal_case(name: &str) -> String {
    name.split(['_', '-', ' '])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::new();
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else if c == '-' || c == ' ' {
            if !out.ends_with('_') {
                out.push('_');
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// File extension for a target language, `txt` when unknown.
pub fn file_extension(language: &str) -> &'static str {
    match language {
        "python" => "py",
        "javascript" => "js",
        "typescript" => "ts",
        "java" => "java",
        "cpp" => "cpp",
        "csharp" => "cs",
        "go" => "go",
        "rust" => "rs",
        _ => "txt",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tempfile::tempdir;

    use crate::error::ProviderError;

    struct StubProvider {
        response: String,
        calls: Arc<AtomicUsize>,
    }

    impl StubProvider {
        fn new(response: &str) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    response: response.to_string(),
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl LLMProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn generate(
            &self,
            _prompt: &str,
            _options: &ProviderOptions,
        ) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    fn generator_with(response: &str, config: Config) -> (CodeGenerator, Arc<AtomicUsize>) {
        let (stub, calls) = StubProvider::new(response);
        (CodeGenerator::new(config, Box::new(stub)), calls)
    }

    #[tokio::test]
    async fn test_pass_through_without_template() {
        let response = "def fibonacci(n):\n    ...\n";
        let (generator, _calls) = generator_with(response, Config::default());
        let request = GenerationRequest::new("Create a fibonacci function", "python");

        let result = generator.generate_code(&request).await.unwrap();
        assert_eq!(result.source_text, response);
        assert_eq!(result.language, "python");
        assert!(result.metadata.is_some());
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected_before_provider_call() {
        let (generator, calls) = generator_with("anything", Config::default());

        for prompt in ["", "   \n\t "] {
            let request = GenerationRequest::new(prompt, "python");
            let err = generator.generate_code(&request).await.unwrap_err();
            assert!(matches!(err, GenerationError::EmptyPrompt));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unsupported_language_rejected_before_provider_call() {
        let (generator, calls) = generator_with("anything", Config::default());
        let request = GenerationRequest::new("Create a thing", "cobol77");

        let err = generator.generate_code(&request).await.unwrap_err();
        assert!(matches!(err, GenerationError::UnsupportedLanguage(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_template_applied_with_defaults() {
        let dir = tempdir().unwrap();
        let python_dir = dir.path().join("python");
        fs::create_dir_all(&python_dir).unwrap();
        fs::write(
            python_dir.join("class.tmpl"),
            "class {{ class_name || \"Gen\" }}:\n    {{ generated_code | indent(4) }}",
        )
        .unwrap();

        let mut config = Config::default();
        config.codegen.template_dir = dir.path().to_string_lossy().into_owned();
        let (generator, calls) = generator_with("pass", config);

        let request =
            GenerationRequest::new("Give me a placeholder body", "python").with_template("class");
        let result = generator.generate_code(&request).await.unwrap();

        assert_eq!(result.source_text, "class Gen:\n    pass");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_template_fails_after_generation() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("python")).unwrap();

        let mut config = Config::default();
        config.codegen.template_dir = dir.path().to_string_lossy().into_owned();
        let (generator, _calls) = generator_with("pass", config);

        let request = GenerationRequest::new("A thing", "python").with_template("nonexistent");
        let err = generator.generate_code(&request).await.unwrap_err();
        assert!(matches!(err, GenerationError::TemplateNotFound { .. }));
    }

    #[tokio::test]
    async fn test_invalid_option_value_is_rejected() {
        let (generator, calls) = generator_with("anything", Config::default());
        let request = GenerationRequest::new("A thing", "python")
            .with_option("temperature", "not-a-number");

        let err = generator.generate_code(&request).await.unwrap_err();
        assert!(matches!(err, GenerationError::InvalidOption { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_extra_options_override_config() {
        let (generator, _calls) = generator_with("x", Config::default());
        let extra = HashMap::from([
            ("model".to_string(), "gpt-4o".to_string()),
            ("max_tokens".to_string(), "2048".to_string()),
        ]);
        let options = generator.build_options(&extra).unwrap();
        assert_eq!(options.model, "gpt-4o");
        assert_eq!(options.max_tokens, 2048);
        assert_eq!(options.temperature, 0.7);
    }

    #[tokio::test]
    async fn test_project_file_naming() {
        let (generator, calls) = generator_with("# content", Config::default());
        let components = vec!["main".to_string(), "utils".to_string(), "readme".to_string()];

        let files = generator
            .generate_project("A calculator app", "calculator", &components)
            .await
            .unwrap();

        assert_eq!(files.len(), 3);
        assert_eq!(files["main.py"], "# content");
        assert_eq!(files["utils.py"], "# content");
        assert_eq!(files["README.md"], "# content");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_project_default_components() {
        let (generator, _calls) = generator_with("# content", Config::default());
        let files = generator
            .generate_project("An app", "app", &[])
            .await
            .unwrap();

        assert_eq!(files.len(), 4);
        assert!(files.contains_key("main.py"));
        assert!(files.contains_key("utils.py"));
        assert!(files.contains_key("tests.py"));
        assert!(files.contains_key("README.md"));
    }

    #[test]
    fn test_derive_context_without_name_keywords() {
        let context = derive_context("Build a helper", "pass");
        assert!(matches!(
            context.get("generated_code"),
            Some(Value::Text(text)) if text == "pass"
        ));
        assert!(context.get("class_name").is_none());
        assert!(matches!(
            context.get("description"),
            Some(Value::Text(text)) if text == "Build a helper"
        ));
    }

    #[test]
    fn test_derive_context_with_named_class() {
        let context =
            derive_context("Create a class named shopping_cart. It holds items.", "pass");
        assert!(matches!(
            context.get("class_name"),
            Some(Value::Text(text)) if text == "ShoppingCart"
        ));
        assert!(matches!(
            context.get("module_name"),
            Some(Value::Text(text)) if text == "shopping_cart"
        ));
        assert!(matches!(
            context.get("description"),
            Some(Value::Text(text)) if text == "Create a class named shopping_cart"
        ));
    }

    #[test]
    fn test_first_sentence_breaks() {
        assert_eq!(first_sentence("One. Two."), "One");
        assert_eq!(first_sentence("Line one\nline two"), "Line one");
        assert_eq!(first_sentence("  no break  "), "no break");
    }

    #[test]
    fn test_file_extension_mapping() {
        assert_eq!(file_extension("python"), "py");
        assert_eq!(file_extension("javascript"), "js");
        assert_eq!(file_extension("rust"), "rs");
        assert_eq!(file_extension("unknown"), "txt");
    }

    #[test]
    fn test_case_conversions() {
        assert_eq!(to_pascal_case("shopping_cart"), "ShoppingCart");
        assert_eq!(to_pascal_case("Widget"), "Widget");
        assert_eq!(to_snake_case("ShoppingCart"), "shopping_cart");
        assert_eq!(to_snake_case("widget"), "widget");
    }
}
