// SPDX-FileCopyrightText: 2026 Boardq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the boardq command queue.
//!
//! TOML files layered through Figment with `BOARDQ_*` environment overrides,
//! strict `deny_unknown_fields` parsing, post-parse validation, and miette
//! diagnostics with typo suggestions.
//!
//! ```no_run
//! use boardq_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("claim delay: {:?}", config.processor.claim_delay());
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::BoardqConfig;

/// Load configuration from the standard hierarchy and validate it.
pub fn load_and_validate() -> Result<BoardqConfig, Vec<ConfigError>> {
    finish(loader::load_config(), collect_toml_sources)
}

/// Load configuration from an explicit file and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<BoardqConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_path(path), || {
        std::fs::read_to_string(path)
            .map(|content| vec![(path.display().to_string(), content)])
            .unwrap_or_default()
    })
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<BoardqConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_str(toml_content), || {
        vec![("<inline>".to_string(), toml_content.to_string())]
    })
}

#[allow(clippy::result_large_err)]
fn finish(
    loaded: Result<BoardqConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<(String, String)>,
) -> Result<BoardqConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &sources())),
    }
}

/// Read the TOML files in the lookup hierarchy so errors can point into them.
fn collect_toml_sources() -> Vec<(String, String)> {
    let mut candidates = vec![std::path::PathBuf::from("/etc/boardq/boardq.toml")];
    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join("boardq/boardq.toml"));
    }
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join("boardq.toml"));
    }

    candidates
        .into_iter()
        .filter_map(|path| {
            std::fs::read_to_string(&path)
                .ok()
                .map(|content| (path.display().to_string(), content))
        })
        .collect()
}
