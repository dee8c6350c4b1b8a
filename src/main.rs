use std::fs;
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

mod analyzer;
mod config;
mod error;
mod generator;
mod logger;
mod output;
mod providers;
mod render;
mod template;

use analyzer::CodeAnalyzer;
use config::Config;
use generator::{CodeGenerator, GenerationRequest};
use output::OutputWriter;

#[derive(Parser)]
#[command(
    name = "aiforge",
    version,
    about = "AI-powered code generation from natural language prompts"
)]
struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<String>,
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate code from a natural language prompt
    Generate {
        prompt: String,
        /// Output file path, relative to the output directory
        #[arg(short, long)]
        output: Option<String>,
        /// Template to apply to the generated code
        #[arg(short, long)]
        template: Option<String>,
        /// Target programming language
        #[arg(short, long)]
        language: Option<String>,
        /// Model override for this call
        #[arg(long)]
        model: Option<String>,
        /// Temperature override for this call
        #[arg(long)]
        temperature: Option<f32>,
        /// Max tokens override for this call
        #[arg(long)]
        max_tokens: Option<u32>,
    },
    /// Generate a complete project structure
    Project {
        description: String,
        name: String,
        /// Component to generate (repeatable; defaults to main, utils, tests, readme)
        #[arg(short = 'C', long = "component")]
        components: Vec<String>,
        /// Output directory override
        #[arg(short, long)]
        output_dir: Option<String>,
    },
    /// Analyze code structure of a source file
    Analyze {
        path: String,
    },
    /// Explain a source file using the AI provider
    Explain {
        path: String,
    },
    /// Review a source file using the AI provider
    Review {
        path: String,
    },
    /// Show the resolved configuration
    ConfigShow,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {:#}", "Error:".bright_red().bold(), e);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let mut config = Config::load(&args.config)?;
    if args.debug {
        config.debug = true;
    }
    logger::init(config.debug);

    match args.command {
        Command::Generate {
            prompt,
            output,
            template,
            language,
            model,
            temperature,
            max_tokens,
        } => {
            if let Some(language) = language {
                config.codegen.default_language = language;
            }
            let generator = build_generator(config.clone())?;

            let mut request =
                GenerationRequest::new(prompt, config.codegen.default_language.clone());
            if let Some(template) = template {
                request = request.with_template(template);
            }
            if let Some(model) = model {
                request = request.with_option("model", model);
            }
            if let Some(temperature) = temperature {
                request = request.with_option("temperature", temperature.to_string());
            }
            if let Some(max_tokens) = max_tokens {
                request = request.with_option("max_tokens", max_tokens.to_string());
            }

            let spinner = start_spinner("Generating code...");
            let result = generator.generate_code(&request).await;
            spinner.finish_and_clear();
            let result = result?;

            match output {
                Some(relative) => {
                    let path = OutputWriter::new(&config.codegen.output_dir)
                        .save(&relative, &result.source_text)?;
                    println!(
                        "{} Code saved to {}",
                        "Done:".bright_green().bold(),
                        path.display()
                    );
                }
                None => {
                    println!("\n{}", "Generated code:".bright_green().bold());
                    println!("{}", result.source_text);
                }
            }
            if let Some(metadata) = result.metadata {
                println!(
                    "{}",
                    format!(
                        "model: {}  tokens: ~{}",
                        metadata.model_used, metadata.token_count
                    )
                    .dimmed()
                );
            }
        }
        Command::Project {
            description,
            name,
            components,
            output_dir,
        } => {
            if let Some(dir) = output_dir {
                config.codegen.output_dir = dir;
            }
            let generator = build_generator(config.clone())?;

            let spinner = start_spinner(&format!("Generating project {}...", name));
            let files = generator
                .generate_project(&description, &name, &components)
                .await;
            spinner.finish_and_clear();
            let files = files?;

            let project_dir =
                OutputWriter::new(&config.codegen.output_dir).save_project(&name, &files)?;
            println!(
                "{} {} files written to {}",
                "Done:".bright_green().bold(),
                files.len(),
                project_dir.display()
            );
            for filename in files.keys() {
                println!("  {}", filename);
            }
        }
        Command::Analyze { path } => {
            let code =
                fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path))?;
            let language = analyzer::language_from_extension(&path);
            let analyzer = CodeAnalyzer::new();

            let counts = analyzer.count_lines(&code);
            println!("{}", format!("Analysis: {}", path).bright_blue().bold());
            println!("  {:<10} {}", "language", language);
            println!("  {:<10} {}", "total", counts.total);
            println!("  {:<10} {}", "blank", counts.blank);
            println!("  {:<10} {}", "comment", counts.comment);
            println!("  {:<10} {}", "code", counts.code);

            let functions = analyzer.extract_functions(&code, language);
            if !functions.is_empty() {
                println!("\n{}", "Functions:".bright_blue().bold());
                for function in &functions {
                    println!("  {:<5} {}", function.line, function.name);
                }
            }
        }
        Command::Explain { path } => {
            let code =
                fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path))?;
            let generator = build_generator(config.clone())?;

            let spinner = start_spinner("Explaining code...");
            let explanation = generator.explain_code(&code).await;
            spinner.finish_and_clear();

            println!(
                "\n{}",
                format!("Explanation for {}:", path).bright_blue().bold()
            );
            println!("{}", explanation?);
        }
        Command::Review { path } => {
            let code =
                fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path))?;
            let generator = build_generator(config.clone())?;

            let spinner = start_spinner("Reviewing code...");
            let review = generator.review_code(&code).await;
            spinner.finish_and_clear();

            println!("\n{}", format!("Review for {}:", path).bright_blue().bold());
            println!("{}", review?);
        }
        Command::ConfigShow => print_config(&config),
    }

    Ok(())
}

fn build_generator(config: Config) -> Result<CodeGenerator> {
    let provider = providers::create_provider(&config.provider)?;
    Ok(CodeGenerator::new(config, provider))
}

fn start_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn print_config(config: &Config) {
    println!("{}", "aiforge configuration".bright_blue().bold());
    println!("  {:<26} {}", "provider.name", config.provider.name);
    println!("  {:<26} {}", "provider.model", config.provider.model);
    println!(
        "  {:<26} {}",
        "provider.api_key",
        if config.provider.api_key.is_some() { "set" } else { "unset" }
    );
    println!("  {:<26} {}", "provider.max_tokens", config.provider.max_tokens);
    println!("  {:<26} {}", "provider.temperature", config.provider.temperature);
    println!("  {:<26} {}", "codegen.output_dir", config.codegen.output_dir);
    println!("  {:<26} {}", "codegen.template_dir", config.codegen.template_dir);
    println!(
        "  {:<26} {}",
        "codegen.default_language", config.codegen.default_language
    );
    println!(
        "  {:<26} {}",
        "codegen.supported_languages",
        config.codegen.supported_languages.join(", ")
    );
    println!("  {:<26} {}", "debug", config.debug);
}
