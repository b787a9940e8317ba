//! Command-line argument definitions.

use clap::{Args, Parser, Subcommand};
use forge_core::Mood;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "forge")]
#[command(about = "Generate policy-compliant UI components", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Generate a component from a description")]
    Generate(GenerateArgs),

    #[command(about = "Validate an existing component file against the default policy")]
    Validate {
        #[arg(help = "Component source file")]
        file: PathBuf,

        #[arg(short, long, default_value = "default", help = "Tenant whose rules apply")]
        tenant: String,
    },
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    #[arg(help = "What the component should do")]
    pub prompt: String,

    #[arg(short, long, default_value = "default", help = "Tenant whose rules apply")]
    pub tenant: String,

    #[arg(short, long, default_value = "cli", help = "User issuing the request")]
    pub user: String,

    #[arg(long, default_value = "balanced", help = "balanced, focused or exploratory")]
    pub mood: Mood,

    #[arg(long, help = "Run the streaming pipeline and trace code chunks as they arrive")]
    pub stream: bool,

    #[arg(long, help = "Use a scripted offline model instead of OpenRouter")]
    pub mock: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_defaults() {
        let cli = Cli::try_parse_from(["forge", "generate", "a tip calculator"]).unwrap();
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.prompt, "a tip calculator");
        assert_eq!(args.tenant, "default");
        assert_eq!(args.mood, Mood::Balanced);
        assert!(!args.stream);
        assert!(!args.mock);
    }

    #[test]
    fn test_generate_flags() {
        let cli = Cli::try_parse_from([
            "forge",
            "generate",
            "--stream",
            "--mock",
            "--tenant",
            "acme",
            "--mood",
            "exploratory",
            "a chart",
        ])
        .unwrap();
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert!(args.stream && args.mock);
        assert_eq!(args.tenant, "acme");
        assert_eq!(args.mood, Mood::Exploratory);
    }

    #[test]
    fn test_unknown_mood_is_rejected() {
        Cli::try_parse_from(["forge", "generate", "--mood", "grumpy", "x"]).unwrap_err();
    }

    #[test]
    fn test_validate_takes_a_file() {
        let cli = Cli::try_parse_from(["forge", "validate", "Widget.tsx"]).unwrap();
        let Commands::Validate { file, tenant } = cli.command else {
            panic!("expected validate");
        };
        assert_eq!(file, PathBuf::from("Widget.tsx"));
        assert_eq!(tenant, "default");
    }
}
