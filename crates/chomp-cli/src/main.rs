//! Chomp CLI - turn web pages into clean Markdown

use chomp::{Chomp, ChompResponse, Config};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::fmt::Display;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Output format for fetch subcommand
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// Markdown with YAML frontmatter
    #[default]
    Md,
    /// JSON format
    Json,
}

/// Chomp - strip page chrome and convert HTML to Markdown
#[derive(Parser, Debug)]
#[command(name = "chomp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    options: ConvertOptions,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert an HTML file (or stdin) to Markdown
    Convert {
        /// HTML file, `-` or omitted for stdin
        file: Option<PathBuf>,

        /// Base URL for resolving relative image sources
        #[arg(long)]
        base_url: Option<Url>,
    },
    /// Clean an HTML file (or stdin) and print the remaining HTML
    Clean {
        /// HTML file, `-` or omitted for stdin
        file: Option<PathBuf>,

        /// Base URL for resolving relative image sources
        #[arg(long)]
        base_url: Option<Url>,
    },
    /// Fetch URL and output as markdown with metadata frontmatter
    Fetch {
        /// URL to fetch
        url: String,

        /// Output format
        #[arg(long, short, default_value = "md")]
        output: OutputFormat,

        /// Custom User-Agent
        #[arg(long)]
        user_agent: Option<String>,
    },
}

/// Conversion flags shared by every subcommand
#[derive(Args, Debug, Default)]
struct ConvertOptions {
    /// JSON config file; flags below override it
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Keep images in the output
    #[arg(long, global = true)]
    retain_images: bool,

    /// Minimum characters for a token to count as a word
    #[arg(long, global = true, value_name = "N")]
    min_word_length: Option<usize>,

    /// Exempt a tag from noise removal (repeatable)
    #[arg(long = "retain-tag", global = true, value_name = "TAG")]
    retain_tags: Vec<String>,

    /// Keep elements mentioning a keyword (repeatable)
    #[arg(long = "retain-keyword", global = true, value_name = "KEYWORD")]
    retain_keywords: Vec<String>,

    /// Separate blocks with two blank lines
    #[arg(long, global = true)]
    double_space: bool,

    /// More logging on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

impl ConvertOptions {
    /// Config file (if any) with command line flags layered on top
    fn to_config(&self) -> Result<Config, String> {
        let mut config = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
                Config::from_json(&json)
                    .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?
            }
            None => Config::default(),
        };

        if self.retain_images {
            config.retain_images = true;
        }
        if let Some(len) = self.min_word_length {
            config.min_word_length = len;
        }
        for tag in &self.retain_tags {
            config = config.with_retain_tag(tag.as_str());
        }
        for keyword in &self.retain_keywords {
            config = config.with_retain_keyword(keyword.as_str());
        }
        if self.double_space {
            config.double_space = true;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.options.verbose);

    let config = cli.options.to_config().unwrap_or_else(|e| fail(e));
    tracing::debug!(?config, "Resolved configuration");

    match cli.command {
        Commands::Convert { file, base_url } => {
            run_convert(file.as_deref(), base_url.as_ref(), config, false);
        }
        Commands::Clean { file, base_url } => {
            run_convert(file.as_deref(), base_url.as_ref(), config, true);
        }
        Commands::Fetch {
            url,
            output,
            user_agent,
        } => {
            run_fetch(&url, output, user_agent, config).await;
        }
    }
}

/// Log to stderr; `RUST_LOG` applies unless `-v` is given
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("chomp=info"),
        _ => EnvFilter::new("chomp=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run_convert(file: Option<&Path>, base_url: Option<&Url>, config: Config, clean: bool) {
    let html = read_input(file).unwrap_or_else(|e| fail(e));
    let chomp = Chomp::builder().config(config).build();

    let result = if clean {
        chomp.clean_html(&html, base_url)
    } else {
        chomp.convert_html(&html, base_url)
    };

    match result {
        Ok(output) => writeln_safe(&output),
        Err(e) => fail(e),
    }
}

async fn run_fetch(url: &str, output: OutputFormat, user_agent: Option<String>, config: Config) {
    let mut builder = Chomp::builder().config(config);

    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua);
    }

    let chomp = builder.build();

    match chomp.fetch_markdown(url).await {
        Ok(response) => match output {
            OutputFormat::Md => writeln_safe(&format_md_with_frontmatter(&response)),
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&response)
                    .unwrap_or_else(|e| fail(format!("Error serializing response: {}", e)));
                writeln_safe(&json);
            }
        },
        Err(e) => fail(e),
    }
}

/// Read a file, or stdin when no file (or `-`) is given
fn read_input(file: Option<&Path>) -> Result<String, String> {
    match file {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {}", path.display(), e)),
        _ => {
            let mut html = String::new();
            io::stdin()
                .read_to_string(&mut html)
                .map_err(|e| format!("Cannot read stdin: {}", e))?;
            Ok(html)
        }
    }
}

/// Format response as markdown with YAML frontmatter
fn format_md_with_frontmatter(response: &ChompResponse) -> String {
    let mut output = String::new();

    // Build frontmatter
    output.push_str("---\n");
    output.push_str(&format!("url: {}\n", response.url));
    output.push_str(&format!("status_code: {}\n", response.status_code));
    if let Some(ref ct) = response.content_type {
        output.push_str(&format!("source_content_type: {}\n", ct));
    }
    output.push_str(&format!("source_size: {}\n", response.size));
    output.push_str(&format!("format: {}\n", response.format));
    if response.truncated == Some(true) {
        output.push_str("truncated: true\n");
    }
    output.push_str("---\n");

    output.push_str(&response.content);
    output
}

fn fail(message: impl Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chomp::Format;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_format_md_basic() {
        let response = ChompResponse {
            url: "https://example.com".to_string(),
            status_code: 200,
            content_type: Some("text/html".to_string()),
            size: 512,
            content: "# Hello World".to_string(),
            ..Default::default()
        };

        let output = format_md_with_frontmatter(&response);

        assert!(output.starts_with("---\n"));
        assert!(output.contains("url: https://example.com\n"));
        assert!(output.contains("status_code: 200\n"));
        assert!(output.contains("source_content_type: text/html\n"));
        assert!(output.contains("source_size: 512\n"));
        assert!(output.contains("format: markdown\n"));
        assert!(output.ends_with("---\n# Hello World"));
    }

    #[test]
    fn test_format_md_truncated() {
        let response = ChompResponse {
            url: "https://example.com/data.txt".to_string(),
            status_code: 200,
            format: Format::Raw,
            truncated: Some(true),
            content: "partial".to_string(),
            ..Default::default()
        };

        let output = format_md_with_frontmatter(&response);

        assert!(output.contains("format: raw\n"));
        assert!(output.contains("truncated: true\n"));
        assert!(!output.contains("source_content_type"));
    }

    #[test]
    fn test_format_md_truncated_false_omitted() {
        let response = ChompResponse {
            url: "https://example.com".to_string(),
            status_code: 200,
            truncated: Some(false),
            content: "Content".to_string(),
            ..Default::default()
        };

        let output = format_md_with_frontmatter(&response);

        // truncated: false should not appear
        assert!(!output.contains("truncated"));
    }

    #[test]
    fn test_shared_flags_layer_onto_defaults() {
        let cli = Cli::try_parse_from([
            "chomp",
            "convert",
            "page.html",
            "--retain-images",
            "--retain-tag",
            "NAV",
            "--retain-tag",
            "aside",
            "--retain-keyword",
            "pricing",
            "--min-word-length",
            "2",
            "--double-space",
            "-vv",
        ])
        .unwrap();

        let config = cli.options.to_config().unwrap();
        assert!(config.retain_images);
        assert!(config.retains_tag("nav"));
        assert!(config.retains_tag("aside"));
        assert!(config.retain_keywords.contains("pricing"));
        assert_eq!(config.min_word_length, 2);
        assert!(config.double_space);
        assert_eq!(cli.options.verbose, 2);

        match cli.command {
            Commands::Convert { file, base_url } => {
                assert_eq!(file, Some(PathBuf::from("page.html")));
                assert!(base_url.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_no_flags_give_default_config() {
        let cli = Cli::try_parse_from(["chomp", "clean"]).unwrap();
        assert_eq!(cli.options.to_config().unwrap(), Config::default());
    }

    #[test]
    fn test_base_url_must_be_absolute() {
        let cli = Cli::try_parse_from(["chomp", "convert", "--base-url", "https://ex.com/blog/"])
            .unwrap();
        match cli.command {
            Commands::Convert { base_url, .. } => {
                assert_eq!(base_url.unwrap().as_str(), "https://ex.com/blog/");
            }
            other => panic!("unexpected command: {:?}", other),
        }

        assert!(Cli::try_parse_from(["chomp", "convert", "--base-url", "blog/"]).is_err());
    }

    #[test]
    fn test_fetch_output_format() {
        let cli = Cli::try_parse_from(["chomp", "fetch", "https://example.com", "-o", "json"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Fetch {
                output: OutputFormat::Json,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_config_file_is_reported() {
        let options = ConvertOptions {
            config: Some(PathBuf::from("/nonexistent/chomp.json")),
            ..Default::default()
        };
        let err = options.to_config().unwrap_err();
        assert!(err.contains("Cannot read config"));
    }

    #[test]
    fn test_read_input_from_missing_file() {
        let err = read_input(Some(Path::new("/nonexistent/page.html"))).unwrap_err();
        assert!(err.contains("/nonexistent/page.html"));
    }
}
