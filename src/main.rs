use anyhow::{anyhow, bail, Context, Result};
use cli::{Cli, Commands, ConfigArgs, ConvertArgs};
use indicatif::{ProgressBar, ProgressStyle};
use mdpress::{convert_markdown_to_pdf, ConversionOptions, RenderStats};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod cli;

const DEFAULT_CONFIG: &str = "mdpress.toml";

fn main() -> ExitCode {
    if let Err(e) = try_main() {
        eprintln!("{}: {e:#}", console::style("Error").red());
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn try_main() -> Result<()> {
    use clap::Parser;
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Convert(args) => convert(args),
        Commands::Themes => {
            for theme in mdpress::highlight::available_themes() {
                println!("{theme}");
            }
            Ok(())
        }
        Commands::Config(args) => write_config(args),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

/// Options from the config file (explicit, or ./mdpress.toml if present),
/// overridden by any command line flags.
fn load_options(args: &ConvertArgs) -> Result<ConversionOptions> {
    let mut opts = match &args.config {
        Some(path) => ConversionOptions::load(path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => {
            log::info!("loading options from {DEFAULT_CONFIG}");
            ConversionOptions::load(DEFAULT_CONFIG)?
        }
        None => ConversionOptions::default(),
    };

    if let Some(title) = &args.title {
        opts.title = title.clone();
    }
    if let Some(theme) = &args.theme {
        opts.syntax_theme = theme.clone();
    }
    if let Some(page_size) = args.page_size {
        opts.page_size = page_size;
    }
    if args.no_toc {
        opts.generate_toc = false;
    }
    Ok(opts)
}

fn output_path(args: &ConvertArgs, input: &Path) -> PathBuf {
    match &args.output {
        Some(output) => output.clone(),
        None => input.with_extension("pdf"),
    }
}

fn print_stats(stats: &RenderStats) {
    println!(
        "  {} ({} pages, {} contents)",
        stats.output.display(),
        stats.page_count,
        stats.contents_pages
    );
}

fn convert(args: &ConvertArgs) -> Result<()> {
    if args.output.is_some() && args.inputs.len() > 1 {
        bail!("--output can only be used with a single input file");
    }
    let opts = load_options(args)?;

    if let [input] = args.inputs.as_slice() {
        let stats = convert_markdown_to_pdf(input, output_path(args, input), &opts)
            .with_context(|| format!("Failed to convert {}", input.display()))?;
        print_stats(&stats);
        return Ok(());
    }

    let progress = ProgressBar::new(args.inputs.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .with_context(|| "Failed to parse progress style")?
            .progress_chars("#>-"),
    );

    let mut converted = Vec::with_capacity(args.inputs.len());
    let mut failed = 0;
    for input in args.inputs.iter() {
        progress.set_message(input.display().to_string());
        match convert_markdown_to_pdf(input, output_path(args, input), &opts) {
            Ok(stats) => converted.push(stats),
            Err(e) => {
                failed += 1;
                progress.suspend(|| {
                    eprintln!(
                        "{}: {}: {e:#}",
                        console::style("Error").red(),
                        input.display()
                    )
                });
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    for stats in converted.iter() {
        print_stats(stats);
    }
    if failed > 0 {
        return Err(anyhow!(
            "{failed} of {} files failed to convert",
            args.inputs.len()
        ));
    }
    Ok(())
}

fn write_config(args: &ConfigArgs) -> Result<()> {
    if args.path.exists() && !args.force {
        bail!(
            "{} already exists, use --force to overwrite it",
            args.path.display()
        );
    }
    let contents = ConversionOptions::default().to_toml()?;
    std::fs::write(&args.path, contents)
        .with_context(|| format!("Failed to write {}", args.path.display()))?;
    println!("Wrote default options to {}", args.path.display());
    Ok(())
}
