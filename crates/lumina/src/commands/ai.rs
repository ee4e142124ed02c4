use anyhow::{Context, Result};
use colored::Colorize;
use inquire::{Confirm, Password, PasswordDisplayMode, Select};

use crate::cli::AiCommands;
use crate::commands::config::mask;
use crate::config::{API_KEY_ENV_VARS, Config, DEFAULT_MODEL};
use crate::gemini::GeminiClient;

const MODELS: &[&str] = &[DEFAULT_MODEL, "gemini-2.5-pro", "gemini-2.0-flash"];

pub fn run(command: AiCommands) -> Result<()> {
    match command {
        AiCommands::Init => init(),
        AiCommands::Status => status(),
        AiCommands::Remove => remove(),
    }
}

fn init() -> Result<()> {
    let mut config = Config::load_or_default();

    println!("{}", "Gemini setup".bold());
    println!(
        "Lumina uses Gemini to look up verses outside the offline library and to write\n\
         short insights for the operator. Without a key it still works from the public sources.\n"
    );

    let api_key = Password::new("Gemini API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Setup cancelled")?;
    let model = Select::new("Model:", MODELS.to_vec())
        .prompt()
        .context("Setup cancelled")?;

    config.set("ai.api_key", &api_key)?;
    config.set("ai.model", model)?;

    let check = Confirm::new("Send a test request now?")
        .with_default(true)
        .prompt()
        .unwrap_or(false);
    if check {
        verify(&GeminiClient::new(api_key.trim(), model))?;
    }

    let path = config.save()?;
    println!("{} Saved to {}", "\u{2713}".green(), path.display());
    Ok(())
}

fn verify(client: &GeminiClient) -> Result<()> {
    #[derive(serde::Deserialize)]
    struct Pong {
        ok: bool,
    }

    let schema = serde_json::json!({
        "type": "OBJECT",
        "properties": { "ok": { "type": "BOOLEAN" } },
        "required": ["ok"]
    });
    let pong: Pong = client
        .generate_json("Reply with {\"ok\": true}.", schema)
        .context("Test request failed; check the key and try again")?;
    if pong.ok {
        println!("{} {} answered", "\u{2713}".green(), client.model());
    } else {
        println!("{} {} answered unexpectedly", "!".yellow(), client.model());
    }
    Ok(())
}

fn status() -> Result<()> {
    let config = Config::load_or_default();
    let configured = config.ai.as_ref().and_then(|ai| ai.api_key.as_deref());

    match (configured, config.resolve_api_key()) {
        (Some(key), _) => {
            println!("{} Gemini configured", "\u{2713}".green());
            println!("  {:<8} {}", "key", mask(key));
        }
        (None, Some(_)) => {
            println!("{} Gemini key taken from the environment", "\u{2713}".green());
            println!("  {:<8} {}", "source", API_KEY_ENV_VARS.join(" or "));
        }
        (None, None) => {
            println!("{} No Gemini key", "\u{2717}".red());
            println!(
                "  Run {} or set {}.",
                "lumina ai init".cyan(),
                API_KEY_ENV_VARS[0]
            );
            return Ok(());
        }
    }
    println!("  {:<8} {}", "model", config.model());
    Ok(())
}

fn remove() -> Result<()> {
    let mut config = Config::load_or_default();
    if config.ai.is_none() {
        println!("No AI configuration to remove.");
        return Ok(());
    }
    let confirmed = Confirm::new("Remove the Gemini key and model from the config?")
        .with_default(false)
        .prompt()
        .context("Cancelled")?;
    if !confirmed {
        return Ok(());
    }
    config.ai = None;
    let path = config.save()?;
    println!("{} AI configuration removed from {}", "\u{2713}".green(), path.display());
    Ok(())
}
