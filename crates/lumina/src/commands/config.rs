use anyhow::Result;
use colored::Colorize;

use crate::cli::ConfigCommands;
use crate::config::Config;

pub fn run(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => show(),
        ConfigCommands::Set { key, value } => set(&key, &value),
    }
}

fn show() -> Result<()> {
    let path = Config::path()?;
    let config = Config::load_or_default();

    println!("{} {}", "Config file:".bold(), path.display());
    if !path.exists() {
        println!("{}", "(not created yet, showing defaults)".dimmed());
    }
    println!();

    let api_key = match config.ai.as_ref().and_then(|ai| ai.api_key.as_deref()) {
        Some(key) => mask(key),
        None if config.resolve_api_key().is_some() => "(from environment)".to_string(),
        None => "(not set)".dimmed().to_string(),
    };
    println!("  {:<14} {api_key}", "ai.api_key");
    println!("  {:<14} {}", "ai.model", config.model());

    match config.slots_dir() {
        Ok(dir) => println!("  {:<14} {}", "storage.dir", dir.display()),
        Err(e) => println!("  {:<14} {}", "storage.dir", e.to_string().red()),
    }
    Ok(())
}

fn set(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load_or_default();
    config.set(key, value)?;
    let path = config.save()?;
    println!("{} {key} saved to {}", "\u{2713}".green(), path.display());
    Ok(())
}

/// Show only the last four characters of a secret.
pub(crate) fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{tail}", "*".repeat(8))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_hides_all_but_tail() {
        assert_eq!(mask("AIzaSyExample1234"), "********1234");
        assert_eq!(mask("abc"), "***");
    }
}
