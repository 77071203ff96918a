use std::path::{Path, PathBuf};

use log::{info, warn};
use toml_edit::{value, DocumentMut, Item, Table};

use crate::config::{sanitize_config, Config};

const CONFIG_DIR_NAME: &str = "game_lookup";
const CONFIG_FILE_NAME: &str = "game_lookup.toml";

/// Location of the config file under the user's config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

fn set_table_value_preserving_decor(table: &mut Table, key: &str, item: Item) {
    let existing_value_decor = table
        .get(key)
        .and_then(|current| current.as_value().map(|value| value.decor().clone()));
    table[key] = item;
    if let Some(existing_value_decor) = existing_value_decor {
        if let Some(next_value) = table[key].as_value_mut() {
            *next_value.decor_mut() = existing_value_decor;
        }
    }
}

fn set_table_scalar_if_changed<T, F>(
    table: &mut Table,
    key: &str,
    previous_value: T,
    next_value: T,
    to_item: F,
) where
    T: PartialEq,
    F: FnOnce(T) -> Item,
{
    if table.contains_key(key) && previous_value == next_value {
        return;
    }
    set_table_value_preserving_decor(table, key, to_item(next_value));
}

fn section_table<'a>(document: &'a mut DocumentMut, key: &str) -> &'a mut Table {
    let root = document.as_table_mut();
    let should_replace = !matches!(root.get(key), Some(item) if item.is_table());
    if should_replace {
        root.insert(key, Item::Table(Table::new()));
    }
    root[key]
        .as_table_mut()
        .unwrap_or_else(|| unreachable!("section {key} was just ensured to be a table"))
}

fn write_config_to_document(document: &mut DocumentMut, previous: &Config, config: &Config) {
    let igdb = section_table(document, "igdb");
    set_table_scalar_if_changed(
        igdb,
        "client_id",
        previous.igdb.client_id.as_str(),
        config.igdb.client_id.as_str(),
        value,
    );
    set_table_scalar_if_changed(
        igdb,
        "api_base_url",
        previous.igdb.api_base_url.as_str(),
        config.igdb.api_base_url.as_str(),
        value,
    );
    set_table_scalar_if_changed(
        igdb,
        "result_limit",
        i64::from(previous.igdb.result_limit),
        i64::from(config.igdb.result_limit),
        value,
    );
    set_table_scalar_if_changed(
        igdb,
        "storefront_category",
        i64::from(previous.igdb.storefront_category),
        i64::from(config.igdb.storefront_category),
        value,
    );
    set_table_scalar_if_changed(
        igdb,
        "request_interval_ms",
        previous.igdb.request_interval_ms as i64,
        config.igdb.request_interval_ms as i64,
        value,
    );

    let twitch = section_table(document, "twitch");
    set_table_scalar_if_changed(
        twitch,
        "token_url",
        previous.twitch.token_url.as_str(),
        config.twitch.token_url.as_str(),
        value,
    );

    let sheets = section_table(document, "sheets");
    set_table_scalar_if_changed(
        sheets,
        "range",
        previous.sheets.range.as_str(),
        config.sheets.range.as_str(),
        value,
    );
    set_table_scalar_if_changed(
        sheets,
        "sheets_api_base_url",
        previous.sheets.sheets_api_base_url.as_str(),
        config.sheets.sheets_api_base_url.as_str(),
        value,
    );
    set_table_scalar_if_changed(
        sheets,
        "drive_api_base_url",
        previous.sheets.drive_api_base_url.as_str(),
        config.sheets.drive_api_base_url.as_str(),
        value,
    );
}

/// Re-serializes `config` into `existing_text`, keeping comments and layout.
pub fn serialize_config_with_preserved_comments(
    existing_text: &str,
    config: &Config,
) -> Result<String, String> {
    let mut document = existing_text
        .parse::<DocumentMut>()
        .map_err(|err| format!("failed to parse existing config: {err}"))?;
    let previous = toml::from_str::<Config>(existing_text).unwrap_or_default();
    write_config_to_document(&mut document, &previous, config);
    Ok(document.to_string())
}

pub fn persist_config_file(config: &Config, path: &Path) {
    let existing_text = std::fs::read_to_string(path).ok();
    let config_text = if let Some(existing_text) = existing_text {
        match serialize_config_with_preserved_comments(&existing_text, config) {
            Ok(updated_text) => Some(updated_text),
            Err(err) => {
                warn!(
                    "Failed to preserve config comments for {} ({}). Falling back to plain serialization.",
                    path.display(),
                    err
                );
                toml::to_string(config).ok()
            }
        }
    } else {
        toml::to_string(config).ok()
    };

    let Some(config_text) = config_text else {
        log::error!("Failed to serialize config for {}", path.display());
        return;
    };

    if let Some(parent) = path.parent() {
        if let Err(err) = std::fs::create_dir_all(parent) {
            log::error!("Failed to create config dir {}: {}", parent.display(), err);
            return;
        }
    }
    if let Err(err) = std::fs::write(path, config_text) {
        log::error!("Failed to persist config to {}: {}", path.display(), err);
    }
}

/// Applies `update` to the config stored at `path` and writes it back,
/// keeping the file's comments and layout.
pub fn update_config_file<F>(path: &Path, update: F) -> Config
where
    F: FnOnce(&mut Config),
{
    let mut config = load_config_file(path);
    update(&mut config);
    let config = sanitize_config(config);
    persist_config_file(&config, path);
    info!("Updated config file {}", path.display());
    config
}

/// Loads the config file, writing defaults when it does not exist yet.
pub fn load_config_file(path: &Path) -> Config {
    let config_content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            info!(
                "Config file not found. Creating default config. path={}",
                path.display()
            );
            let default_config = Config::default();
            persist_config_file(&default_config, path);
            return default_config;
        }
        Err(err) => {
            warn!(
                "Failed to read config file {}. Using defaults. error={}",
                path.display(),
                err
            );
            return Config::default();
        }
    };

    match toml::from_str::<Config>(&config_content) {
        Ok(config) => sanitize_config(config),
        Err(err) => {
            warn!(
                "Failed to parse config file {}. Using defaults. error={}",
                path.display(),
                err
            );
            Config::default()
        }
    }
}
