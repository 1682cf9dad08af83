// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./boardq.toml` > `~/.config/boardq/boardq.toml` > `/etc/boardq/boardq.toml`,
//! with `BOARDQ_*` environment variable overrides on top.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::BoardqConfig;

/// Sections that env var names are split on, in match order.
const ENV_SECTIONS: &[&str] = &[
    "processor",
    "executor",
    "queue",
    "storage",
    "interpreter",
    "log",
];

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/boardq/boardq.toml`
/// 3. `~/.config/boardq/boardq.toml`
/// 4. `./boardq.toml`
/// 5. `BOARDQ_*` environment variables
pub fn load_config() -> Result<BoardqConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<BoardqConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BoardqConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<BoardqConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(BoardqConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The figment behind [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(BoardqConfig::default()))
        .merge(Toml::file("/etc/boardq/boardq.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("boardq/boardq.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("boardq.toml"))
        .merge(env_provider())
}

/// `BOARDQ_PROCESSOR_CLAIM_DELAY_MS` maps to `processor.claim_delay_ms`.
///
/// Uses `Env::map` instead of `Env::split("_")` because key names contain
/// underscores themselves.
fn env_provider() -> Env {
    Env::prefixed("BOARDQ_").map(|key| map_env_key(key.as_str()).into())
}

/// Turns a lowercased, prefix-stripped env var name into a dotted config path.
pub fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(section)
            && let Some(field) = rest.strip_prefix('_')
        {
            return format!("{section}.{field}");
        }
    }
    key.to_string()
}
