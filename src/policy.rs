//! Moderation policy: named thresholds and toggles controlling rule sensitivity.
//!
//! TOML shape (every key optional, missing keys keep their defaults):
//! ```toml
//! min_words_for_approve = 5
//! min_chars_for_approve = 20
//! caps_ratio_human = 0.70
//! excessive_exclamations_human = 5
//! excessive_question_human = 5
//! max_repeated_char_run = 6
//! max_repeated_word_ratio = 0.35
//! deny_if_contains_url = true
//! deny_if_contains_email = true
//! deny_if_contains_phone = true
//! deny_if_duplicate = true
//! ```
//!
//! Values are not validated: an odd threshold just moves the rule boundary.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
    time::SystemTime,
};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

pub const DEFAULT_POLICY_PATH: &str = "config/policy.toml";
pub const ENV_POLICY_PATH: &str = "MODERATOR_POLICY_PATH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    pub min_words_for_approve: usize,
    pub min_chars_for_approve: usize,
    pub caps_ratio_human: f32,
    pub excessive_exclamations_human: usize,
    pub excessive_question_human: usize,
    pub max_repeated_char_run: usize,
    pub max_repeated_word_ratio: f32,
    pub deny_if_contains_url: bool,
    pub deny_if_contains_email: bool,
    pub deny_if_contains_phone: bool,
    pub deny_if_duplicate: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            min_words_for_approve: 5,
            min_chars_for_approve: 20,
            caps_ratio_human: 0.70,
            excessive_exclamations_human: 5,
            excessive_question_human: 5,
            max_repeated_char_run: 6,
            max_repeated_word_ratio: 0.35,
            deny_if_contains_url: true,
            deny_if_contains_email: true,
            deny_if_contains_phone: true,
            deny_if_duplicate: true,
        }
    }
}

impl Policy {
    /// Apply caller overrides by option name. Unknown names and values of the
    /// wrong type are ignored; integer options truncate floats.
    pub fn with_overrides(mut self, overrides: &Map<String, Value>) -> Self {
        for (name, value) in overrides {
            let applied = match name.as_str() {
                "min_words_for_approve" => set_count(&mut self.min_words_for_approve, value),
                "min_chars_for_approve" => set_count(&mut self.min_chars_for_approve, value),
                "caps_ratio_human" => set_ratio(&mut self.caps_ratio_human, value),
                "excessive_exclamations_human" => {
                    set_count(&mut self.excessive_exclamations_human, value)
                }
                "excessive_question_human" => set_count(&mut self.excessive_question_human, value),
                "max_repeated_char_run" => set_count(&mut self.max_repeated_char_run, value),
                "max_repeated_word_ratio" => set_ratio(&mut self.max_repeated_word_ratio, value),
                "deny_if_contains_url" => set_flag(&mut self.deny_if_contains_url, value),
                "deny_if_contains_email" => set_flag(&mut self.deny_if_contains_email, value),
                "deny_if_contains_phone" => set_flag(&mut self.deny_if_contains_phone, value),
                "deny_if_duplicate" => set_flag(&mut self.deny_if_duplicate, value),
                _ => continue,
            };
            if !applied {
                warn!(option = %name, value = %value, "ignoring policy override with unexpected type");
            }
        }
        self
    }

    /// Parse a TOML policy document.
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load from `$MODERATOR_POLICY_PATH` or `config/policy.toml`.
    /// A missing file means defaults; an unreadable or malformed one is an error.
    pub fn from_toml() -> anyhow::Result<Self> {
        let path = policy_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        load_policy_file(&path)
    }
}

pub fn policy_path() -> PathBuf {
    std::env::var(ENV_POLICY_PATH)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_POLICY_PATH))
}

pub fn load_policy_file(path: &Path) -> anyhow::Result<Policy> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading policy from {}", path.display()))?;
    Policy::from_toml_str(&content).with_context(|| format!("parsing policy {}", path.display()))
}

fn set_count(slot: &mut usize, v: &Value) -> bool {
    if let Some(n) = v.as_u64() {
        *slot = n as usize;
    } else if let Some(f) = v.as_f64() {
        // negative values saturate to zero
        *slot = f.max(0.0) as usize;
    } else {
        return false;
    }
    true
}

fn set_ratio(slot: &mut f32, v: &Value) -> bool {
    match v.as_f64() {
        Some(f) => {
            *slot = f as f32;
            true
        }
        None => false,
    }
}

fn set_flag(slot: &mut bool, v: &Value) -> bool {
    match v.as_bool() {
        Some(b) => {
            *slot = b;
            true
        }
        None => false,
    }
}

/// Policy handle that re-reads its TOML file whenever the file's mtime changes.
/// Parse errors keep the last good policy.
#[derive(Debug)]
pub struct HotPolicy {
    path: PathBuf,
    inner: RwLock<State>,
}

#[derive(Debug)]
struct State {
    policy: Policy,
    last_modified: Option<SystemTime>,
}

impl HotPolicy {
    /// Create with a path (defaults to [`policy_path`] if `None`).
    pub fn new(path: Option<&Path>) -> Self {
        let path = path.map(Path::to_path_buf).unwrap_or_else(policy_path);
        Self {
            path,
            inner: RwLock::new(State {
                policy: Policy::default(),
                last_modified: None,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Latest policy, reloading if the file changed since the last call.
    pub fn current(&self) -> Policy {
        let mtime = match fs::metadata(&self.path).and_then(|m| m.modified()) {
            Ok(m) => m,
            Err(_) => return self.read_state(|s| s.policy.clone()),
        };
        if self.read_state(|s| s.last_modified == Some(mtime)) {
            return self.read_state(|s| s.policy.clone());
        }

        let mut guard = match self.inner.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.last_modified != Some(mtime) {
            match load_policy_file(&self.path) {
                Ok(policy) => guard.policy = policy,
                Err(e) => {
                    let msg = format!("{e:#}");
                    warn!(error = %msg, "policy reload failed; keeping previous");
                }
            }
            guard.last_modified = Some(mtime);
        }
        guard.policy.clone()
    }

    fn read_state<T>(&self, f: impl FnOnce(&State) -> T) -> T {
        match self.inner.read() {
            Ok(g) => f(&g),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }
}
