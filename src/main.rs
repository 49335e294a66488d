//! docmeta - metadata and structured data for documentation sites.

use anyhow::{Context, Result, bail};
use clap::Parser;
use docmeta::{
    batch::process_site,
    cli::{Cli, Commands},
    config::MetaConfig,
    document::SiteContext,
    log,
};
use std::fs;

fn main() -> Result<()> {
    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));
    let config: &'static MetaConfig = Box::leak(Box::new(load_config(cli)?));

    match &cli.command {
        Commands::Init => write_default_config(config),
        Commands::Process { site_dir, .. } => {
            let site = SiteContext::new(config.site_url.as_deref())?;
            process_site(site_dir, &site, config).map(|_| ())
        }
    }
}

/// Load and validate configuration from CLI arguments
fn load_config(cli: &'static Cli) -> Result<MetaConfig> {
    let exists = cli.config.exists();
    if cli.is_init() {
        if exists {
            bail!("Config file already exists. Remove it manually or init in a different path.");
        }
        return Ok(MetaConfig {
            config_path: cli.config.clone(),
            ..MetaConfig::default()
        });
    }

    let mut config = if exists {
        MetaConfig::from_path(&cli.config)?
    } else {
        log!("warn"; "{} not found, using defaults", cli.config.display());
        MetaConfig::default()
    };
    config.update_with_cli(cli);
    config.validate()?;
    Ok(config)
}

fn write_default_config(config: &MetaConfig) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    let path = &config.config_path;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create `{}`", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write `{}`", path.display()))?;
    log!("init"; "wrote {}", path.display());
    Ok(())
}
