use anyhow::Result;
use colored::Colorize;

use crate::commentary;
use crate::config::Config;
use crate::gemini::GeminiClient;
use crate::resolver::Resolver;

pub fn run(query: &str, insights: bool) -> Result<()> {
    let config = Config::load_or_default();
    let resolver = Resolver::from_config(&config);
    let slide = resolver.resolve(query)?;

    println!("{}", slide.reference.bold().cyan());
    println!("{}", slide.body);
    println!("{}", slide.source_label.to_uppercase().dimmed());
    if !slide.tags.is_empty() {
        println!("{}", slide.tags.join(" \u{00b7} ").dimmed());
    }

    if insights {
        let client = GeminiClient::from_config(&config);
        let insight = commentary::generate(client.as_ref(), &slide.reference, &slide.body);
        println!();
        for (title, text) in insight.sections() {
            println!("{}", title.to_uppercase().bold());
            println!("  {text}");
        }
    }
    Ok(())
}
