use clap::{ArgAction, Parser, Subcommand, ValueEnum};

use crate::model::{Role, StylePatch};

#[derive(Parser)]
#[command(name = "lumina")]
#[command(author, version, about)]
#[command(long_about = "A scripture presenter with an operator console and a live display.\n\n\
    The console looks up verses and drives every open display window; displays\n\
    follow it in real time and recover from missed messages on their own.\n\n\
    Examples:\n  \
    lumina                          Open the operator console\n  \
    lumina --mode live              Open a display (fullscreen)\n  \
    lumina --mode live --windowed   Open a display in a window\n  \
    lumina --style theme=dark       Start the console with a style override\n  \
    lumina lookup \"Alma 32:21\"      Print a verse in the terminal")]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Which window to open
    #[arg(long, value_enum, default_value_t = Mode::Operator, global = false)]
    pub mode: Mode,

    /// Open the display in a window instead of fullscreen
    #[arg(long, global = false)]
    pub windowed: bool,

    /// Style override applied when the console starts (repeatable),
    /// e.g. theme=nature, alignment=left, font-size=4.5, show-reference=false
    #[arg(long = "style", value_name = "KEY=VALUE", global = false)]
    pub style: Vec<String>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Operator console
    Operator,
    /// Live display for the projector
    Live,
}

impl From<Mode> for Role {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Operator => Role::Operator,
            Mode::Live => Role::Display,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configure Gemini for AI lookups and insights
    Ai {
        #[command(subcommand)]
        command: AiCommands,
    },

    /// View and modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Look up a verse and print it
    Lookup {
        /// Reference such as "1 Nephi 3:7" or "jn 3:16"
        query: String,

        /// Also print context, theology and application notes
        #[arg(long)]
        insights: bool,
    },

    /// Show or clear the operator's recent verses
    History {
        /// Forget all recent verses
        #[arg(long)]
        clear: bool,
    },

    /// Generate shell completions
    Completion {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum AiCommands {
    /// Set up the Gemini API key and model
    Init,

    /// Show current AI configuration
    Status,

    /// Remove AI configuration
    Remove,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Display current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (ai.api_key, ai.model, storage.dir)
        key: String,

        /// Value to set
        value: String,
    },
}

#[derive(Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        match self.command {
            Some(Commands::Ai { command }) => crate::commands::ai::run(command),
            Some(Commands::Config { command }) => crate::commands::config::run(command),
            Some(Commands::Lookup { query, insights }) => {
                crate::commands::lookup::run(&query, insights)
            }
            Some(Commands::History { clear }) => crate::commands::history::run(clear),
            Some(Commands::Completion { shell }) => {
                crate::commands::completion::run(shell);
                Ok(())
            }
            Some(Commands::Version) => {
                println!("lumina {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
            None => {
                let style = StylePatch::parse_assignments(&self.style)?;
                if self.mode == Mode::Live && !style.is_empty() {
                    anyhow::bail!(
                        "--style only applies to the operator console; displays follow the operator"
                    );
                }
                crate::app::run(self.mode.into(), self.windowed, style)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mode_is_operator() {
        let cli = Cli::try_parse_from(["lumina"]).unwrap();
        assert_eq!(cli.mode, Mode::Operator);
        assert!(cli.command.is_none());
        assert_eq!(Role::from(cli.mode), Role::Operator);
    }

    #[test]
    fn test_live_mode_selects_display() {
        let cli = Cli::try_parse_from(["lumina", "--mode", "live", "--windowed"]).unwrap();
        assert_eq!(Role::from(cli.mode), Role::Display);
        assert!(cli.windowed);
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(Cli::try_parse_from(["lumina", "--mode", "projector"]).is_err());
    }

    #[test]
    fn test_repeated_style_flags() {
        let cli = Cli::try_parse_from([
            "lumina",
            "--style",
            "theme=dark",
            "--style",
            "alignment=left",
        ])
        .unwrap();
        let patch = StylePatch::parse_assignments(&cli.style).unwrap();
        assert!(patch.theme.is_some());
        assert!(patch.alignment.is_some());
    }

    #[test]
    fn test_lookup_subcommand() {
        let cli = Cli::try_parse_from(["lumina", "lookup", "1 Nephi 3:7", "--insights"]).unwrap();
        match cli.command {
            Some(Commands::Lookup { query, insights }) => {
                assert_eq!(query, "1 Nephi 3:7");
                assert!(insights);
            }
            _ => panic!("expected lookup"),
        }
    }
}
