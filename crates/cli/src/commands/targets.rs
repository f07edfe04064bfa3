//! Targets Command

use anyhow::{Context, Result};
use serde::Serialize;

use chatprobe_capture::TargetProfile;
use chatprobe_common::ProbeConfig;

use crate::output::{print_list, OutputFormat, TableDisplay};

/// Target profile display wrapper for serialization
#[derive(Serialize)]
pub struct TargetDisplay {
    pub name: String,
    pub url: String,
    pub workbook: String,
    pub setup_steps: usize,
    pub description: String,
}

impl From<TargetProfile> for TargetDisplay {
    fn from(profile: TargetProfile) -> Self {
        Self {
            name: profile.name,
            url: profile.url,
            workbook: profile.workbook.display().to_string(),
            setup_steps: profile.setup.len(),
            description: profile.description,
        }
    }
}

impl TableDisplay for TargetDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "URL", "Workbook", "Setup", "Description"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.url.clone(),
            self.workbook.clone(),
            self.setup_steps.to_string(),
            self.description.clone(),
        ]
    }
}

pub fn execute(config: &ProbeConfig, format: OutputFormat) -> Result<()> {
    let profiles = TargetProfile::available(config.profiles_dir.as_deref())
        .context("Failed to load target profiles")?;

    let displays: Vec<TargetDisplay> = profiles.into_iter().map(Into::into).collect();
    print_list(&displays, format);
    Ok(())
}
