//! `rebound config` – show where the config lives and the effective retry settings.

use anyhow::Result;
use rebound_core::config::{self, ReboundConfig};

pub fn run_config(cfg: &ReboundConfig) -> Result<()> {
    let path = config::config_path()?;
    let options = cfg.retry_config().to_options()?;
    println!("config file:    {}", path.display());
    println!("max attempts:   {}", options.max_attempts());
    println!("period:         {:?}", options.period());
    println!("backoff factor: {}", options.backoff_factor());
    println!("jitter:         {}", options.jitter());
    println!("reset after:    {:?}", options.reset_duration());
    println!("sliding:        {}", options.sliding());
    println!("latest only:    {}", options.return_latest_only());
    match cfg.timeout()? {
        Some(t) => println!("timeout:        {:?}", t),
        None => println!("timeout:        none"),
    }
    Ok(())
}
