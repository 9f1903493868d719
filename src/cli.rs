use clap::{Args, Parser, Subcommand};
use mdpress::PageSize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Markdown files to convert
    #[clap(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output PDF path (only valid with a single input; defaults to the input with a .pdf extension)
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    /// Options file to load instead of ./mdpress.toml
    #[clap(short, long, env = "MDPRESS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Document title shown on the title page and in page headers
    #[clap(long)]
    pub title: Option<String>,

    /// Syntax highlighting theme (see `mdpress themes`)
    #[clap(long)]
    pub theme: Option<String>,

    /// Don't generate a table of contents
    #[clap(long)]
    pub no_toc: bool,

    /// Page size (A4 or Letter)
    #[clap(long)]
    pub page_size: Option<PageSize>,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Where to write the options file
    #[clap(default_value = "mdpress.toml")]
    pub path: PathBuf,

    /// Overwrite the file if it already exists
    #[clap(short, long)]
    pub force: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Converts Markdown files into PDFs
    Convert(ConvertArgs),
    /// Lists the available syntax highlighting themes
    Themes,
    /// Generates a default mdpress.toml options file
    Config(ConfigArgs),
}

#[derive(Parser, Debug)]
#[clap(author, version, about)]
pub struct Cli {
    /// Increase log output (-v for info, -vv for debug)
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[clap(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_parse_convert_args() {
        let cli = Cli::try_parse_from([
            "mdpress", "-vv", "convert", "a.md", "b.md", "--no-toc", "--page-size", "letter",
        ])
        .expect("can parse arguments");
        assert_eq!(cli.verbose, 2);
        let Commands::Convert(args) = cli.command else {
            panic!("expected convert command");
        };
        assert_eq!(args.inputs.len(), 2);
        assert!(args.no_toc);
        assert_eq!(args.page_size, Some(PageSize::Letter));
    }

    #[test]
    fn can_default_config_path() {
        let cli = Cli::try_parse_from(["mdpress", "config"]).expect("can parse arguments");
        let Commands::Config(args) = cli.command else {
            panic!("expected config command");
        };
        assert_eq!(args.path, PathBuf::from("mdpress.toml"));
        assert!(!args.force);
    }
}
