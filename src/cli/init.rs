//! kogura init and config command implementation
//!
//! `init` creates the data directory and a default `kogura.toml`; `config`
//! shows what a session would use.

use std::path::{Path, PathBuf};

use crate::config::{Config, CONFIG_FILE};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::storage::{FileStore, COLLAPSE_KEY, TASKS_KEY};

use super::CommonOptions;

#[derive(serde::Serialize)]
struct InitReport {
    data_dir: PathBuf,
    created: InitCreated,
}

#[derive(serde::Serialize)]
struct InitCreated {
    data_dir: bool,
    config: bool,
}

#[derive(serde::Serialize)]
struct ConfigReport {
    data_dir: PathBuf,
    config_file: PathBuf,
    config_file_exists: bool,
    tasks_file: PathBuf,
    collapse_file: PathBuf,
    api_key_set: bool,
    config: Config,
}

pub(crate) fn run_init(common: CommonOptions) -> Result<()> {
    let data_dir = common.resolve_data_dir()?;

    let created_data_dir = ensure_dir(&data_dir)?;
    let created_config = ensure_config(&data_dir)?;

    let report = InitReport {
        data_dir: data_dir.clone(),
        created: InitCreated {
            data_dir: created_data_dir,
            config: created_config,
        },
    };

    let mut created_items = Vec::new();
    if created_data_dir {
        created_items.push("data dir");
    }
    if created_config {
        created_items.push(CONFIG_FILE);
    }

    let header = if created_items.is_empty() {
        "kogura init: nothing to do".to_string()
    } else {
        "kogura init: initialized data directory".to_string()
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("data dir", data_dir.display().to_string());
    human.push_summary(
        "created",
        if created_items.is_empty() {
            "none".to_string()
        } else {
            created_items.join(", ")
        },
    );
    human.push_next_step("kogura add \"明日14時 会議\"");

    emit_success(common.output(), "init", &report, Some(&human))
}

pub(crate) fn run_config(common: CommonOptions) -> Result<()> {
    let data_dir = common.resolve_data_dir()?;
    let config = Config::load_or_default(&data_dir)?;
    let store = FileStore::new(&data_dir);
    let config_file = data_dir.join(CONFIG_FILE);
    let api_key_set = std::env::var(&config.interpreter.api_key_env)
        .map(|key| !key.trim().is_empty())
        .unwrap_or(false);

    let mut human = HumanOutput::new("kogura config");
    human.push_summary("data dir", data_dir.display().to_string());
    human.push_summary("utc offset", config.schedule.utc_offset.clone());
    human.push_summary("endpoint", config.interpreter.endpoint.clone());
    human.push_summary("model", config.interpreter.model.clone());
    human.push_summary(
        "api key",
        format!(
            "{} ({})",
            config.interpreter.api_key_env,
            if api_key_set { "set" } else { "not set" }
        ),
    );
    human.push_summary("timeout", format!("{}s", config.interpreter.timeout_secs));
    if !config_file.exists() {
        human.push_warning(format!("{CONFIG_FILE} not found; using defaults"));
        human.push_next_step("kogura init");
    }
    if !api_key_set {
        human.push_warning(format!(
            "{} is not set; requests go out unauthenticated",
            config.interpreter.api_key_env
        ));
    }

    let report = ConfigReport {
        config_file_exists: config_file.exists(),
        config_file,
        tasks_file: store.path_for(TASKS_KEY),
        collapse_file: store.path_for(COLLAPSE_KEY),
        data_dir,
        api_key_set,
        config,
    };

    emit_success(common.output(), "config", &report, Some(&human))
}

fn ensure_dir(path: &Path) -> Result<bool> {
    if path.exists() {
        if !path.is_dir() {
            return Err(Error::DataDir(path.to_path_buf()));
        }
        return Ok(false);
    }
    std::fs::create_dir_all(path)?;
    Ok(true)
}

fn ensure_config(data_dir: &Path) -> Result<bool> {
    let config_path = data_dir.join(CONFIG_FILE);
    if config_path.exists() {
        if !config_path.is_file() {
            return Err(Error::InvalidConfig(format!(
                "{} exists but is not a file",
                config_path.display()
            )));
        }
        return Ok(false);
    }

    Config::default().save(&config_path)?;
    Ok(true)
}
