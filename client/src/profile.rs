//! Local profile storage: the chosen display name and avatar snapshot.
//!
//! There is no account system. "Logging in" is writing a name and an avatar
//! data-URI here; every outgoing event carries a copy of both, and renaming
//! simply creates a new identity going forward.

use anyhow::{Context, Result};
use classchat_protocol::SenderIdentity;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    /// Avatar as a data-URI, or a plain URL.
    pub photo_url: String,
}

impl Profile {
    pub fn new(name: impl Into<String>, photo_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            photo_url: photo_url.into(),
        }
    }

    /// The identity stamped onto every outgoing event.
    pub fn identity(&self) -> SenderIdentity {
        SenderIdentity::new(self.name.clone(), self.photo_url.clone())
    }
}

fn profile_path(data_dir: &Path) -> PathBuf {
    data_dir.join("profile.json")
}

pub fn profile_exists(data_dir: &Path) -> bool {
    profile_path(data_dir).exists()
}

pub fn load_profile(data_dir: &Path) -> Result<Option<Profile>> {
    let path = profile_path(data_dir);
    if !path.exists() {
        return Ok(None);
    }
    let json = fs::read_to_string(&path).context("failed to read profile file")?;
    let profile: Profile = serde_json::from_str(&json).context("failed to parse profile")?;
    Ok(Some(profile))
}

pub fn save_profile(data_dir: &Path, profile: &Profile) -> Result<()> {
    fs::create_dir_all(data_dir).context("failed to create profile directory")?;
    let json = serde_json::to_string_pretty(profile)?;
    fs::write(profile_path(data_dir), json).context("failed to save profile")?;
    Ok(())
}

pub fn clear_profile(data_dir: &Path) -> Result<()> {
    let path = profile_path(data_dir);
    if path.exists() {
        fs::remove_file(&path).context("failed to remove profile file")?;
    }
    Ok(())
}
