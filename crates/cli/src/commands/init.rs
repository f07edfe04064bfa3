//! Init Command

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;

use chatprobe_common::ProbeConfig;

use crate::output::print_success;

#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}

pub fn execute(args: InitArgs, path: &Path) -> Result<()> {
    if path.exists() && !args.force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    ProbeConfig::default()
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    print_success(&format!("Wrote default configuration to {}", path.display()));
    Ok(())
}
