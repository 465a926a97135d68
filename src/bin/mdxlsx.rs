//! mdxlsx CLI - Markdown to Excel converter

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use mdxlsx::{
    extract_excel_fences, ConversionMode, Converter, ConverterBuilder, DiagramSupport,
    MdToXlsxError, RenderConfig,
};

#[derive(Parser)]
#[command(name = "mdxlsx")]
#[command(version)]
#[command(about = "Convert Markdown documents into formatted Excel workbooks", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input Markdown file
    input: Option<PathBuf>,

    /// Output workbook path (.xlsx)
    output: Option<PathBuf>,

    /// Write the whole input into cell A1 without parsing
    #[arg(long)]
    raw: bool,

    #[command(flatten)]
    render: RenderArgs,
}

#[derive(Args)]
struct RenderArgs {
    /// Write mermaid fences as code blocks instead of rendering them
    #[arg(long)]
    no_diagrams: bool,

    /// Render all charts and diagrams concurrently before layout
    #[arg(long)]
    parallel: bool,

    /// Name of the directory (next to the workbook) that receives rendered images
    #[arg(long, value_name = "NAME")]
    sidecar_dir: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract ```excel fences into separate workbooks
    Extract {
        /// Input Markdown file
        input: PathBuf,

        /// Directory for the generated workbooks
        #[arg(long, value_name = "DIR")]
        out_dir: PathBuf,

        /// File name prefix (<NAME>_excel_<n>.xlsx)
        #[arg(long, value_name = "NAME")]
        base_name: String,

        /// Replace each extracted fence with a short notice
        #[arg(long)]
        placeholders: bool,

        /// Write the filtered Markdown here (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        render: RenderArgs,
    },
}

impl RenderArgs {
    fn builder(&self) -> ConverterBuilder {
        let mut render = RenderConfig::from_env();
        if self.no_diagrams {
            render.diagram_support = DiagramSupport::Disabled;
        }

        let mut builder = ConverterBuilder::new()
            .with_render_config(render)
            .with_parallel_rendering(self.parallel);
        if let Some(name) = &self.sidecar_dir {
            builder = builder.with_sidecar_dir_name(name.clone());
        }
        builder
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), MdToXlsxError> {
    match cli.command {
        Some(Commands::Extract {
            input,
            out_dir,
            base_name,
            placeholders,
            output,
            render,
        }) => {
            let converter = render.builder().build()?;
            extract(&converter, &input, &out_dir, &base_name, placeholders, output)
        }
        None => {
            let (Some(input), Some(output)) = (cli.input, cli.output) else {
                return Err(MdToXlsxError::Config(
                    "usage: mdxlsx <INPUT> <OUTPUT> (see --help)".to_string(),
                ));
            };
            let mode = if cli.raw {
                ConversionMode::Raw
            } else {
                ConversionMode::Formatted
            };
            let converter = cli.render.builder().with_mode(mode).build()?;

            let markdown = fs::read_to_string(&input)?;
            let report = converter.convert(&markdown, &output)?;
            println!(
                "Wrote {} ({} sheet(s), {} image(s))",
                output.display(),
                report.sheet_count,
                report.images.len()
            );
            if report.degraded_fences > 0 {
                println!(
                    "{} chart/diagram fence(s) could not be rendered and were kept as code blocks",
                    report.degraded_fences
                );
            }
            Ok(())
        }
    }
}

fn extract(
    converter: &Converter,
    input: &Path,
    out_dir: &Path,
    base_name: &str,
    placeholders: bool,
    output: Option<PathBuf>,
) -> Result<(), MdToXlsxError> {
    let markdown = fs::read_to_string(input)?;
    let extracted = extract_excel_fences(converter, &markdown, out_dir, base_name, placeholders)?;

    for file in &extracted.files {
        eprintln!("Generated {}", file.display());
    }
    match output {
        Some(path) => fs::write(path, extracted.markdown)?,
        None => print!("{}", extracted.markdown),
    }
    Ok(())
}
