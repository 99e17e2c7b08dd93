//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use booklist_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "autosave_interval_secs": config.autosave_interval_secs,
                    "resize_covers": config.resize_covers,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:               {}", config.data_dir.display());
            println!(
                "  autosave_interval_secs: {}",
                config.autosave_interval_secs
            );
            println!("  resize_covers:          {}", config.resize_covers);
            println!(
                "  log_file:               {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "autosave_interval_secs" => {
            let secs: u64 = value
                .parse()
                .context("Invalid value for autosave_interval_secs. Use a whole number of seconds.")?;
            if secs == 0 {
                bail!("autosave_interval_secs must be at least 1");
            }
            config.autosave_interval_secs = secs;
        }
        "resize_covers" => {
            config.resize_covers = value
                .parse()
                .context("Invalid value for resize_covers. Use 'true' or 'false'.")?;
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.into())
            };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, autosave_interval_secs, resize_covers, log_file",
                key
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_known_keys() {
        let mut config = Config::with_data_dir("/tmp/booklist");

        apply(&mut config, "autosave_interval_secs", "10").unwrap();
        apply(&mut config, "resize_covers", "false").unwrap();
        apply(&mut config, "log_file", "/tmp/booklist.log").unwrap();
        apply(&mut config, "data_dir", "/srv/books").unwrap();

        assert_eq!(config.autosave_interval_secs, 10);
        assert!(!config.resize_covers);
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/booklist.log")));
        assert_eq!(config.data_dir, PathBuf::from("/srv/books"));

        apply(&mut config, "log_file", "none").unwrap();
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_apply_rejects_bad_values() {
        let mut config = Config::with_data_dir("/tmp/booklist");

        assert!(apply(&mut config, "autosave_interval_secs", "0").is_err());
        assert!(apply(&mut config, "autosave_interval_secs", "soon").is_err());
        assert!(apply(&mut config, "resize_covers", "maybe").is_err());
        assert!(apply(&mut config, "sync_url", "ws://x").is_err());
    }
}
