//! mdocx CLI - Markdown to Word conversion tool

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use mdocx::convert::{batch_output_path, markdown_files};
use mdocx::{convert_file, render_str, ConfigLoader, ConvertOptions, RenderStats};

#[derive(Parser)]
#[command(name = "mdocx")]
#[command(version)]
#[command(about = "Convert Markdown to styled Word documents", long_about = None)]
struct Cli {
    /// Input Markdown file
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output .docx file
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Directory holding style.yaml and themes/
    #[arg(long, global = true, value_name = "DIR", env = "MDOCX_CONFIG_DIR", default_value = "config")]
    config_dir: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    style: StyleArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Clone, Default)]
struct StyleArgs {
    /// Theme name from the themes directory
    #[arg(long)]
    theme: Option<String>,

    /// Style overrides as a JSON object
    #[arg(long, value_name = "JSON", conflicts_with = "style_file")]
    style_json: Option<String>,

    /// Style overrides from a JSON or YAML file
    #[arg(long, value_name = "FILE")]
    style_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one Markdown file to .docx
    Convert {
        /// Input Markdown file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (named after the first heading if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        style: StyleArgs,

        /// Chart specifications (JSON, optionally fenced)
        #[arg(long, value_name = "FILE")]
        charts: Option<PathBuf>,

        /// Document title
        #[arg(long)]
        title: Option<String>,

        /// Document author
        #[arg(long)]
        author: Option<String>,

        /// Document subject
        #[arg(long)]
        subject: Option<String>,

        /// Comma-separated document keywords
        #[arg(long, value_delimiter = ',')]
        keywords: Vec<String>,

        /// Width of embedded images in centimeters
        #[arg(long, value_name = "CM")]
        image_width: Option<f64>,
    },

    /// Convert every Markdown file in a directory
    Batch {
        /// Input directory
        #[arg(value_name = "DIR")]
        input: PathBuf,

        /// Output directory
        #[arg(value_name = "OUT_DIR")]
        output: PathBuf,

        #[command(flatten)]
        style: StyleArgs,
    },

    /// Show document statistics without writing output
    Info {
        /// Input Markdown file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// List available themes
    Themes,

    /// Print the effective style configuration as YAML
    Config {
        #[command(flatten)]
        style: StyleArgs,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config_dir = cli.config_dir;
    let result = match cli.command {
        Some(Commands::Convert {
            input,
            output,
            style,
            charts,
            title,
            author,
            subject,
            keywords,
            image_width,
        }) => build_options(&config_dir, &style)
            .and_then(|options| with_charts(options, charts.as_deref()))
            .and_then(|mut options| {
                if let Some(title) = title {
                    options.render = options.render.with_title(title);
                }
                if let Some(author) = author {
                    options.render = options.render.with_author(author);
                }
                if let Some(subject) = subject {
                    options.render = options.render.with_subject(subject);
                }
                if !keywords.is_empty() {
                    options.render = options.render.with_keywords(keywords);
                }
                if let Some(cm) = image_width {
                    options.render = options.render.with_image_width(cm);
                }
                cmd_convert(&input, output.as_deref(), &options)
            }),
        Some(Commands::Batch {
            input,
            output,
            style,
        }) => build_options(&config_dir, &style)
            .and_then(|options| cmd_batch(&input, &output, &options)),
        Some(Commands::Info { input }) => build_options(&config_dir, &cli.style)
            .and_then(|options| cmd_info(&input, &options)),
        Some(Commands::Themes) => {
            cmd_themes(&config_dir);
            Ok(())
        }
        Some(Commands::Config { style }) => {
            build_options(&config_dir, &style).and_then(|options| cmd_config(&options))
        }
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: convert if input is provided
            if let Some(input) = cli.input {
                build_options(&config_dir, &cli.style)
                    .and_then(|options| cmd_convert(&input, cli.output.as_deref(), &options))
            } else {
                println!("{}", "Usage: mdocx <FILE> [OUTPUT]".yellow());
                println!("       mdocx --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn build_options(
    config_dir: &Path,
    style: &StyleArgs,
) -> Result<ConvertOptions, Box<dyn std::error::Error>> {
    let mut options = ConvertOptions::new().with_config_dir(config_dir);
    if let Some(theme) = &style.theme {
        options = options.with_theme(theme.clone());
    }
    if let Some(json) = &style.style_json {
        options = options.with_style_json(json.clone());
    }
    if let Some(path) = &style.style_file {
        options = options.with_style_json(read_style_file(path)?);
    }
    Ok(options)
}

/// Style files may be YAML; the loader takes JSON, so YAML is converted.
fn read_style_file(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    let is_yaml = path
        .extension()
        .map(|ext| ext == "yaml" || ext == "yml")
        .unwrap_or(false);
    if is_yaml {
        let value: serde_json::Value = serde_yaml::from_str(&text)?;
        Ok(serde_json::to_string(&value)?)
    } else {
        Ok(text)
    }
}

fn with_charts(
    options: ConvertOptions,
    charts: Option<&Path>,
) -> Result<ConvertOptions, Box<dyn std::error::Error>> {
    match charts {
        Some(path) => {
            let raw = fs::read_to_string(path)?;
            let options = options.with_charts_json(&raw)?;
            log::info!("Loaded {} chart(s) from {}", options.charts.len(), path.display());
            Ok(options)
        }
        None => Ok(options),
    }
}

fn cmd_convert(
    input: &Path,
    output: Option<&Path>,
    options: &ConvertOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(format!("Converting {}...", input.display()));

    let result = convert_file(input, output, options);
    pb.finish_and_clear();
    let result = result?;

    println!("{} {}", "Created".green().bold(), result.output.display());
    print_stats(&result.stats);
    Ok(())
}

fn cmd_batch(
    input: &Path,
    output: &Path,
    options: &ConvertOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    if !input.is_dir() {
        return Err(format!("Not a directory: {}", input.display()).into());
    }
    let files = markdown_files(input);
    if files.is_empty() {
        println!("{}", "No Markdown files found.".yellow());
        return Ok(());
    }
    fs::create_dir_all(output)?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut failures = Vec::new();
    let mut converted = Vec::new();
    for file in &files {
        let name = file.strip_prefix(input).unwrap_or(file);
        pb.set_message(name.display().to_string());
        let target = batch_output_path(input, output, file);
        match convert_file(file, Some(&target), options) {
            Ok(result) => converted.push((name.to_path_buf(), result.output)),
            Err(e) => failures.push((name.to_path_buf(), e.to_string())),
        }
        pb.inc(1);
    }
    pb.finish_with_message("Done!");

    println!();
    for (name, out) in &converted {
        println!("  {} {} -> {}", "✓".green(), name.display(), out.display());
    }
    for (name, error) in &failures {
        println!("  {} {}: {}", "✗".red(), name.display(), error);
    }
    println!(
        "\n{}: {} converted, {} failed",
        "Summary".bold(),
        converted.len().to_string().green(),
        failures.len().to_string().red()
    );

    if failures.is_empty() {
        Ok(())
    } else {
        Err(format!("{} of {} files failed", failures.len(), files.len()).into())
    }
}

fn cmd_info(input: &Path, options: &ConvertOptions) -> Result<(), Box<dyn std::error::Error>> {
    let markdown = fs::read_to_string(input)?;
    let result = render_str(&markdown, options)?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "File".bold(), input.display());
    if let Some(ref title) = result.document.metadata.title {
        println!("{}: {}", "Title".bold(), title);
    }
    println!(
        "{}: {}",
        "Suggested name".bold(),
        mdocx::suggest_filename(&markdown)
    );
    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    print_stats(&result.stats);
    Ok(())
}

fn print_stats(stats: &RenderStats) {
    println!("{}: {}", "Headings".bold(), stats.heading_count);
    println!("{}: {}", "Paragraphs".bold(), stats.paragraph_count);
    println!("{}: {}", "Tables".bold(), stats.table_count);
    println!("{}: {}", "List items".bold(), stats.list_item_count);
    println!("{}: {}", "Code blocks".bold(), stats.code_block_count);
    println!(
        "{}: {} ({} missing)",
        "Images".bold(),
        stats.image_count,
        stats.missing_image_count
    );
    println!(
        "{}: {} anchored, {} appended",
        "Charts".bold(),
        stats.charts_anchored,
        stats.charts_appended
    );
    println!("{}: {}", "Words".bold(), stats.word_count);
}

fn cmd_themes(config_dir: &Path) {
    let loader = ConfigLoader::new(config_dir);
    println!("{}", "Available themes".cyan().bold());
    println!("  {} {}", "─".dimmed(), "default".bold());
    for theme in loader.list_themes() {
        println!("  {} {}", "─".dimmed(), theme);
    }
    println!("\n{}: {}", "Themes directory".dimmed(), loader.themes_dir().display());
}

fn cmd_config(options: &ConvertOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = options.load_config();
    print!("{}", config.to_yaml()?);
    Ok(())
}

fn cmd_version() {
    println!("{} {}", "mdocx".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Markdown to Word conversion tool");
    println!();
    println!("Library: {}", mdocx::VERSION);
    println!("License: MIT");
}
