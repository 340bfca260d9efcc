//! `kaizen validate`: check a review config and list its domains.

use std::path::Path;

use kaizen_core::workflow::{load_config, ReviewConfig};

use super::CommandResult;

pub fn run(config_path: &Path) -> CommandResult {
    let config = load_config(config_path)?;
    print!("{}", describe(&config));
    Ok(())
}

pub fn describe(config: &ReviewConfig) -> String {
    let settings = &config.global_settings;
    let mut out = format!(
        "Config version {}: {} domain(s)\n",
        config.version,
        config.domains.len()
    );
    for domain in &config.domains {
        out.push_str(&format!(
            "  {:<16} {} ({} target pattern(s))\n",
            domain.id,
            domain.name,
            domain.target_files.len()
        ));
    }
    out.push_str(&format!(
        "Settings: max_search_results={}, analysis_temperature={}, issue_labels=[{}]\n",
        settings.max_search_results,
        settings.analysis_temperature,
        settings.issue_labels.join(", ")
    ));
    out
}
