//! Command-line front end for the flagd configuration store.
//!
//! # Commands
//!
//! - `init`: create or check the document behind a URI
//! - `show`: print the raw document
//! - `exists`: report whether a document can be loaded
//! - `validate`: check content without writing it anywhere
//! - `flags`: list, read, write and delete single flags

use clap::{Parser, Subcommand};
use colored::Colorize;
use flagd_admin::{AdminConfig, ContentValidator, DocumentUri, FlagRequest, StoreError, Targeting};
use indexmap::IndexMap;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Manage flagd flag configuration documents
#[derive(Parser)]
#[command(name = "flagd-admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the default document, or validate the one already there
    Init {
        /// Document URI, e.g. file:///etc/flagd/flags.json
        uri: String,

        /// Write this content instead (inline JSON or @file.json)
        #[arg(long)]
        content: Option<String>,
    },

    /// Print the raw document
    Show { uri: String },

    /// Report whether the document can be loaded
    Exists { uri: String },

    /// Validate content without storing it (inline JSON or @file.json)
    Validate { content: String },

    /// Work with single flags
    Flags {
        #[command(subcommand)]
        command: FlagCommands,
    },
}

#[derive(Subcommand)]
enum FlagCommands {
    /// List all flags in document order
    List {
        uri: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print one flag
    Get { uri: String, flag_id: String },

    /// Add a flag or replace it entirely
    Set {
        uri: String,
        flag_id: String,

        #[arg(long)]
        state: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        default_variant: Option<String>,

        /// Variants as a JSON object, e.g. '{"on": true, "off": false}'
        #[arg(long)]
        variants: Option<String>,

        /// Attribute type hints as a JSON object, e.g. '{"email": "string"}'
        #[arg(long)]
        targeting_key: Option<String>,

        #[arg(long)]
        rule: Option<String>,
    },

    /// Remove a flag
    Delete { uri: String, flag_id: String },
}

fn describe(err: StoreError) -> String {
    format!("{} [{}]", err.message, err.code())
}

fn parse_uri(raw: &str) -> Result<DocumentUri, String> {
    DocumentUri::parse(raw).map_err(describe)
}

/// Inline text, or the content of a file when prefixed with `@`.
fn load_text(input: &str) -> Result<String, String> {
    match input.strip_prefix('@') {
        Some(file_path) => {
            let path = Path::new(file_path);
            if !path.exists() {
                return Err(format!("File not found: {}", file_path));
            }
            fs::read_to_string(path)
                .map_err(|e| format!("Failed to read file '{}': {}", file_path, e))
        }
        None => Ok(input.to_string()),
    }
}

fn parse_json_arg<T: serde::de::DeserializeOwned>(flag: &str, raw: &str) -> Result<T, String> {
    serde_json::from_str(raw).map_err(|e| format!("Invalid JSON for --{}: {}", flag, e))
}

fn pretty(value: &impl serde::Serialize) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn run_init(config: &AdminConfig, uri: &str, content: Option<&str>) -> Result<(), String> {
    let uri = parse_uri(uri)?;
    let store = config.build_store();

    match content {
        Some(input) => {
            let text = load_text(input)?;
            store.initialize_content(&uri, &text).map_err(describe)?;
            println!("{} Wrote {}", "✓".green(), uri);
        }
        None => {
            let existed = store.content_exists(&uri);
            store.initialize_content_with_config(&uri).map_err(describe)?;
            if existed {
                println!("{} Existing content at {} is valid", "✓".green(), uri);
            } else {
                println!("{} Created default content at {}", "✓".green(), uri);
            }
        }
    }
    Ok(())
}

fn run_show(config: &AdminConfig, uri: &str) -> Result<(), String> {
    let uri = parse_uri(uri)?;
    let content = config.build_store().load_content(&uri).map_err(describe)?;
    println!("{}", content);
    Ok(())
}

fn run_exists(config: &AdminConfig, uri: &str) -> Result<(), String> {
    let uri = parse_uri(uri)?;
    if config.build_store().content_exists(&uri) {
        println!("{} {} exists", "✓".green(), uri);
    } else {
        println!("{} {} does not exist", "✗".red(), uri);
    }
    Ok(())
}

fn run_validate(config: &AdminConfig, input: &str) -> Result<(), String> {
    let text = load_text(input)?;
    let mut validator = flagd_admin::EngineValidator::new(config.validation_mode);
    if let Some(dir) = &config.scratch_dir {
        validator = validator.with_scratch_dir(dir);
    }

    match validator.validate(&text) {
        Ok(()) => {
            println!("{} Content is valid", "✓".green());
            Ok(())
        }
        Err(err) => {
            println!("{} Content is invalid", "✗".red());
            for detail in &err.details {
                let path = if detail.path.is_empty() { "/" } else { &detail.path };
                println!("  {} {}", path.dimmed(), detail.message);
            }
            Err(describe(err))
        }
    }
}

fn run_flags(config: &AdminConfig, command: FlagCommands) -> Result<(), String> {
    let service = config.build_service();

    match command {
        FlagCommands::List { uri, json } => {
            let uri = parse_uri(&uri)?;
            let flags = service.list_flags(&uri).map_err(describe)?;
            if json {
                println!("{}", pretty(&flags));
                return Ok(());
            }
            if flags.is_empty() {
                println!("No flags in {}", uri);
            }
            for flag in &flags {
                let state = flag.state.as_deref().unwrap_or("-");
                let state = if state == "ENABLED" {
                    state.green()
                } else {
                    state.yellow()
                };
                println!(
                    "{}  {}  {}",
                    flag.key.bold(),
                    state,
                    flag.name.as_deref().unwrap_or("").dimmed()
                );
            }
            Ok(())
        }
        FlagCommands::Get { uri, flag_id } => {
            let uri = parse_uri(&uri)?;
            match service.get_flag(&uri, &flag_id).map_err(describe)? {
                Some(flag) => {
                    println!("{}", pretty(&flag));
                    Ok(())
                }
                None => Err(format!("Flag not found: {}", flag_id)),
            }
        }
        FlagCommands::Set {
            uri,
            flag_id,
            state,
            name,
            description,
            default_variant,
            variants,
            targeting_key,
            rule,
        } => {
            let uri = parse_uri(&uri)?;
            let variants: Option<IndexMap<String, Value>> = variants
                .as_deref()
                .map(|raw| parse_json_arg("variants", raw))
                .transpose()?;
            let targeting_key: Option<IndexMap<String, String>> = targeting_key
                .as_deref()
                .map(|raw| parse_json_arg("targeting-key", raw))
                .transpose()?;
            let targeting = (targeting_key.is_some() || rule.is_some()).then(|| Targeting {
                targeting_key,
                rule: rule.map(Value::String),
            });

            let request = FlagRequest {
                state,
                name,
                description,
                default_variant,
                variants,
                targeting,
            };
            service
                .upsert_flag(&uri, &flag_id, &request)
                .map_err(describe)?;
            println!("{} Saved flag {}", "✓".green(), flag_id.bold());
            Ok(())
        }
        FlagCommands::Delete { uri, flag_id } => {
            let uri = parse_uri(&uri)?;
            if service.delete_flag(&uri, &flag_id).map_err(describe)? {
                println!("{} Deleted flag {}", "✓".green(), flag_id.bold());
            } else {
                println!("Flag {} not present, nothing to do", flag_id.bold());
            }
            Ok(())
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match AdminConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}: {}", "Error".red().bold(), e);
                std::process::exit(1);
            }
        },
        None => AdminConfig::default(),
    };
    init_logging(&config.log_level);

    let result = match cli.command {
        Commands::Init { uri, content } => run_init(&config, &uri, content.as_deref()),
        Commands::Show { uri } => run_show(&config, &uri),
        Commands::Exists { uri } => run_exists(&config, &uri),
        Commands::Validate { content } => run_validate(&config, &content),
        Commands::Flags { command } => run_flags(&config, command),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}
