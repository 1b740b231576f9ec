// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./parley.toml` > `~/.config/parley/parley.toml` > `/etc/parley/parley.toml`,
//! with environment variable overrides via the `PARLEY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::ParleyConfig;

/// Config sections reachable through `PARLEY_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: &[&str] = &["logging", "platform", "acquire", "sign_in", "delivery"];

/// Load configuration from the XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/parley/parley.toml`
/// 3. `~/.config/parley/parley.toml`
/// 4. `./parley.toml`
/// 5. `PARLEY_*` environment variables
pub fn load_config() -> Result<ParleyConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from an inline TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<ParleyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ParleyConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ParleyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ParleyConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment behind [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ParleyConfig::default()))
        .merge(Toml::file("/etc/parley/parley.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("parley/parley.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("parley.toml"))
        .merge(env_provider())
}

/// Environment provider mapping `PARLEY_SIGN_IN_TIMEOUT_SECS` to
/// `sign_in.timeout_secs`.
///
/// Only variables naming a known section are considered, so unrelated
/// `PARLEY_*` variables (such as `PARLEY_PASSWORD`) never reach the
/// strict deserializer. Keys keep their underscores: mapping is by section
/// prefix, never by splitting on `_`.
fn env_provider() -> Env {
    Env::prefixed("PARLEY_")
        .filter(|key| section_key(key.as_str()).is_some())
        .map(|key| {
            section_key(key.as_str())
                .unwrap_or_else(|| key.as_str().to_string())
                .into()
        })
}

/// Rewrites `section_key_name` into `section.key_name` for known sections.
fn section_key(key: &str) -> Option<String> {
    let key = key.to_ascii_lowercase();
    ENV_SECTIONS.iter().find_map(|section| {
        key.strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
            .filter(|rest| !rest.is_empty())
            .map(|rest| format!("{section}.{rest}"))
    })
}
