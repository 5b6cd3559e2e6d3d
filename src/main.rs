use bookc::compile::{self, BuildOptions, CompileError};
use bookc::{config, output};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "bookc")]
#[command(about = "Compile a directory of Markdown chapters into one HTML book (and PDF)")]
#[command(long_about = "\
Compile a directory of Markdown chapters into one HTML book (and PDF)

Chapters are Markdown files named NN_Title.md, ordered by their numeric
prefix. Everything else in the source directory is left alone, except the
assets/ directory, which is copied verbatim next to the output.

Source structure:

  book/
  ├── book.toml                  # Book config (optional)
  ├── 01_Intro.md                # Chapter 1
  ├── 02_Retrieval_Basics.md     # Chapter 2
  ├── 10_War-Stories.md          # Chapter 10 (numeric order, not lexical)
  └── assets/                    # Copied verbatim (SQL, images, locales)

Blocks beyond plain Markdown:

  > **Key Takeaways**           Highlighted summary box (list lines become a list)
  > **War Story**               Bordered narrative box
  > [!NOTE]                     Note box
  ```mermaid                    Diagram, rendered client-side

Run 'bookc gen-config' to generate a documented book.toml.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Flags shared by commands that build the document.
#[derive(clap::Args, Clone)]
struct BuildArgs {
    /// Treat every warning as a fatal error
    #[arg(long)]
    strict: bool,

    /// Parallel parse/render workers (default: config, then CPU cores)
    #[arg(long, short = 'j')]
    jobs: Option<usize>,

    /// Config file to use instead of <SOURCE_DIR>/book.toml
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Compile the book to HTML (and optionally PDF)
    Compile {
        /// Directory containing the NN_Title.md chapters
        source_dir: PathBuf,
        /// Directory to write the book into
        output_dir: PathBuf,
        /// Also export a PDF with headless Chrome
        #[arg(long)]
        pdf: bool,
        /// Leave out the build-time meta tag (byte-identical rebuilds)
        #[arg(long)]
        no_timestamp: bool,
        #[command(flatten)]
        build: BuildArgs,
    },
    /// Build everything in memory and report warnings, writing nothing
    Check {
        source_dir: PathBuf,
        #[command(flatten)]
        build: BuildArgs,
    },
    /// Print the parsed blocks of every chapter as JSON
    Parse {
        source_dir: PathBuf,
        /// Config file to use instead of <SOURCE_DIR>/book.toml
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print a stock book.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Compile {
            source_dir,
            output_dir,
            pdf,
            no_timestamp,
            build,
        } => {
            let config = compile::prepare_config(&source_dir, build.config.as_deref(), build.jobs)?;
            init_thread_pool(&config.processing);
            let options = BuildOptions {
                strict: build.strict,
                timestamp: !no_timestamp,
                pdf,
            };
            println!("==> Compiling {}", source_dir.display());
            let report = compile::compile(&source_dir, &output_dir, &config, &options)
                .inspect_err(print_strict_warnings)?;
            output::print_warnings(&report.warnings);
            output::print_build_report(&report, &output_dir);
            println!("==> Book written to {}", output_dir.display());
        }
        Command::Check { source_dir, build } => {
            let config = compile::prepare_config(&source_dir, build.config.as_deref(), build.jobs)?;
            init_thread_pool(&config.processing);
            let options = BuildOptions {
                strict: build.strict,
                timestamp: false,
                pdf: false,
            };
            println!("==> Checking {}", source_dir.display());
            let result =
                compile::build(&source_dir, &config, &options).inspect_err(print_strict_warnings)?;
            output::print_warnings(&result.warnings);
            output::print_check_report(&result);
            println!("==> Book is valid");
        }
        Command::Parse { source_dir, config } => {
            let config = compile::prepare_config(&source_dir, config.as_deref(), None)?;
            init_thread_pool(&config.processing);
            let book = compile::parse_book(&source_dir, &config)?;
            output::print_warnings(&book.warnings);
            println!("{}", serde_json::to_string_pretty(&book.chapters)?);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Show the warnings behind a `--strict` failure before the error itself.
fn print_strict_warnings(error: &CompileError) {
    if let CompileError::Strict(warnings) = error {
        output::print_warnings(warnings);
    }
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
