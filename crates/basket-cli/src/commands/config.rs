//! Config command - manage configuration.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use tracing::debug;

use basket_core::BasketConfig;

use super::Preset;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Initialize a new configuration file from the selected preset
    Init(InitArgs),

    /// Get a specific configuration value
    Get {
        /// Configuration key (e.g., "signature.min_rows")
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// New value (JSON, or a bare string)
        value: String,
    },

    /// Check a configuration file for errors
    Validate {
        /// File to check (default: the configuration file)
        path: Option<PathBuf>,
    },

    /// Show configuration file path
    Path,
}

#[derive(Args)]
struct InitArgs {
    /// Output path for configuration file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite existing file
    #[arg(long)]
    force: bool,
}

pub async fn run(args: ConfigArgs, preset: Preset) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(preset),
        ConfigCommand::Init(init_args) => init_config(init_args, preset),
        ConfigCommand::Get { key } => get_config(&key, preset),
        ConfigCommand::Set { key, value } => set_config(&key, &value, preset),
        ConfigCommand::Validate { path } => validate_config(path),
        ConfigCommand::Path => show_path(),
    }
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("basket")
        .join("config.json")
}

/// Resolve the configuration for a command.
///
/// An explicit path must exist; otherwise the default file is used when
/// present, and the preset when not.
pub fn load(path: Option<&str>, preset: Preset) -> anyhow::Result<BasketConfig> {
    let config = match path {
        Some(path) => BasketConfig::from_file(Path::new(path))?,
        None => {
            let default_path = default_config_path();
            if default_path.exists() {
                debug!("Using config file {}", default_path.display());
                BasketConfig::from_file(&default_path)?
            } else {
                preset.config()
            }
        }
    };
    config.validate()?;
    Ok(config)
}

fn current_config(preset: Preset) -> anyhow::Result<BasketConfig> {
    let config_path = default_config_path();
    if config_path.exists() {
        Ok(BasketConfig::from_file(&config_path)?)
    } else {
        Ok(preset.config())
    }
}

fn show_config(preset: Preset) -> anyhow::Result<()> {
    if !default_config_path().exists() {
        println!(
            "{} No config file found, showing {:?} preset.",
            style("ℹ").blue(),
            preset
        );
    }

    let config = current_config(preset)?;
    println!("{}", serde_json::to_string_pretty(&config)?);

    Ok(())
}

fn init_config(args: InitArgs, preset: Preset) -> anyhow::Result<()> {
    let output_path = args.output.unwrap_or_else(default_config_path);

    if output_path.exists() && !args.force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            output_path.display()
        );
    }

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    preset.config().save(&output_path)?;

    println!(
        "{} Created configuration file at {}",
        style("✓").green(),
        output_path.display()
    );

    Ok(())
}

fn get_config(key: &str, preset: Preset) -> anyhow::Result<()> {
    let json = serde_json::to_value(current_config(preset)?)?;

    let mut current = &json;
    for part in key.split('.') {
        current = lookup(current, part)
            .ok_or_else(|| anyhow::anyhow!("Configuration key not found: {}", key))?;
    }

    println!("{}", serde_json::to_string_pretty(current)?);

    Ok(())
}

/// Object member by name, or array element by index.
fn lookup<'a>(value: &'a serde_json::Value, part: &str) -> Option<&'a serde_json::Value> {
    match value {
        serde_json::Value::Array(items) => items.get(part.parse::<usize>().ok()?),
        _ => value.get(part),
    }
}

fn set_config(key: &str, value: &str, preset: Preset) -> anyhow::Result<()> {
    let config_path = default_config_path();
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let parsed_value: serde_json::Value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));

    let mut json = serde_json::to_value(current_config(preset)?)?;
    set_path(&mut json, key, parsed_value.clone())?;

    let config: BasketConfig = serde_json::from_value(json)?;
    config.validate()?;
    config.save(&config_path)?;

    println!(
        "{} Set {} = {}",
        style("✓").green(),
        key,
        serde_json::to_string(&parsed_value)?
    );

    Ok(())
}

fn set_path(json: &mut serde_json::Value, key: &str, value: serde_json::Value) -> anyhow::Result<()> {
    let parts: Vec<&str> = key.split('.').collect();
    let Some((last, parents)) = parts.split_last() else {
        anyhow::bail!("Empty configuration key");
    };

    let mut current = json;
    for part in parents {
        current = current
            .get_mut(*part)
            .ok_or_else(|| anyhow::anyhow!("Configuration path not found: {}", key))?;
    }

    match current.as_object_mut() {
        Some(obj) if obj.contains_key(*last) => {
            obj.insert((*last).to_string(), value);
            Ok(())
        }
        Some(_) => anyhow::bail!("Configuration key not found: {}", key),
        None => anyhow::bail!("Cannot set value at non-object path"),
    }
}

fn validate_config(path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(default_config_path);
    let config = BasketConfig::from_file(&path)?;
    config.validate()?;

    println!("{} {} is valid", style("✓").green(), path.display());
    println!(
        "   {} signature keywords, {} column fields",
        config.signature.keywords.len(),
        config.columns.fields.len()
    );

    Ok(())
}

fn show_path() -> anyhow::Result<()> {
    let config_path = default_config_path();

    println!("Configuration file: {}", config_path.display());

    if config_path.exists() {
        println!("Status: {}", style("exists").green());
    } else {
        println!("Status: {}", style("not created").yellow());
        println!();
        println!("Run 'basket config init' to create a configuration file.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_path_replaces_known_key() {
        let mut value = json!({ "signature": { "min_rows": 2, "keywords": ["area"] } });
        set_path(&mut value, "signature.min_rows", json!(5)).unwrap();
        assert_eq!(value["signature"]["min_rows"], json!(5));
    }

    #[test]
    fn test_set_path_rejects_unknown_key() {
        let mut value = json!({ "signature": { "min_rows": 2 } });
        assert!(set_path(&mut value, "signature.min_row", json!(5)).is_err());
        assert!(set_path(&mut value, "scan.cell_gap", json!(1.0)).is_err());
    }

    #[test]
    fn test_lookup_indexes_arrays() {
        let value = json!({ "keywords": ["area", "rice"] });
        let keywords = lookup(&value, "keywords").unwrap();
        assert_eq!(lookup(keywords, "1"), Some(&json!("rice")));
        assert_eq!(lookup(keywords, "x"), None);
    }
}
