use clap::{Parser, Subcommand};
use folio::render::RenderError;
use folio::{BuildError, BuildOptions, config, output};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Static site generator for serialized books")]
#[command(long_about = "\
Static site generator for serialized books

A content directory of TOML documents and markdown chapters becomes a
static site with one page per book and per chapter.

Content structure:

  content/
  ├── folio.toml                   # Site: title, url, language_code, favicon, [build]
  ├── layout/                      # Templates + static files (copied to output root)
  │   ├── index.html               # Site index
  │   ├── _book.html               # One page per book
  │   ├── _chapter.html            # One page per chapter
  │   ├── _profile.html            # Optional: one page per author/contributor/publisher
  │   ├── _series.html             # Optional: one page per series
  │   └── _tag.html                # Optional: one page per tag
  └── books/
      └── dawn/                    # Directory name = default book ID
          ├── book.toml            # Title, authors, series, tags, status, dates, ...
          ├── nav.toml             # [[chapters]] tree, nested via [[chapters.chapters]]
          ├── images/              # Cover and assets named in book.toml
          └── chapters/
              └── arrival.md       # Chapter text (markdown)

Output:

  dist/index.html
  dist/books/<book>/index.html
  dist/books/<book>/chapters/<chapter>.html

IDs and tags become path segments: they must not contain '/' or '\\' or
be '.' or '..'. Book IDs are unique across the site, chapter IDs within
their book.

A page whose template fails is replaced by an error page and the build
exits non-zero after writing every other page.

Run 'folio gen-config' to print a documented [build] table.")]
#[command(version)]
struct Cli {
    /// Content directory
    #[arg(long, default_value = "content", global = true)]
    source: PathBuf,

    /// Output directory
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Layouts directory (default: build.layouts_dir inside the content directory)
    #[arg(long, global = true)]
    layouts: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load, validate and render the site
    Build,
    /// Load and validate the content directory without rendering
    Check,
    /// Print a stock [build] table with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(BuildError::Render(RenderError::Pages(summary))) => {
            output::print_render_summary(&summary, &cli.output);
            eprintln!("==> Build failed: {} page(s) could not be rendered", summary.failures.len());
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), BuildError> {
    match cli.command {
        Command::Build => {
            let build_config = config::load_config(&cli.source)?;
            init_thread_pool(&build_config);
            println!("==> Building {} → {}", cli.source.display(), cli.output.display());
            let summary = folio::build_site(&BuildOptions {
                source: cli.source.clone(),
                output: cli.output.clone(),
                layouts: cli.layouts.clone(),
            })?;
            output::print_render_summary(&summary, &cli.output);
            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Check => {
            let build_config = config::load_config(&cli.source)?;
            init_thread_pool(&build_config);
            println!("==> Checking {}", cli.source.display());
            let index = folio::load_site(&cli.source)?;
            output::print_site(&index);
            println!("==> Content is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }
    Ok(())
}

/// `RUST_LOG` wins over `-v` when set.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool from the build config.
///
/// Caps at the number of available CPU cores.
fn init_thread_pool(build_config: &config::BuildConfig) {
    let threads = config::effective_threads(build_config);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
