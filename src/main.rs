use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

mod config;
mod disk_formats;
mod error;
mod formats;
mod image;
mod report;

use config::{BuildConfig, FileSpec, MissingFilePolicy, parse_file_entry};
use disk_formats::{DiskGeometry, parse_geometry};
use image::footer::{Clock, FOOTER_SIZE, SystemClock};
use image::layout::LayoutSummary;
use image::OutputFormat;

#[derive(Parser)]
#[command(about = "Bootable VHD Image Builder")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble boot sector, kernel and files into a disk image.
    Build {
        #[arg(long, default_value = config::DEFAULT_BOOT)]
        boot: PathBuf,
        #[arg(long, default_value = config::DEFAULT_KERNEL)]
        kernel: PathBuf,
        /// Virtual file as NAME=PATH; repeat for more files.
        #[arg(long = "file", value_parser = parse_file_entry, default_value = config::DEFAULT_FILE)]
        files: Vec<FileSpec>,
        #[arg(short, long, default_value = config::DEFAULT_OUTPUT)]
        output: PathBuf,
        /// 'cylinders,heads,sectors' or a preset name (vhd-10m, vhd-32m, vhd-64m).
        #[arg(long, value_parser = parse_geometry, default_value = "20,16,63")]
        geometry: DiskGeometry,
        #[arg(long, default_value_t = config::DEFAULT_KERNEL_SECTORS)]
        kernel_sectors: u32,
        /// vhd or img; defaults to the output extension.
        #[arg(long)]
        format: Option<OutputFormat>,
        /// Fail instead of skipping files that cannot be read.
        #[arg(long)]
        strict: bool,
        #[arg(long)]
        validate: bool,
        #[arg(long)]
        verbose: bool,
    },
    Display {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long, default_value_t = config::DEFAULT_KERNEL_SECTORS)]
        kernel_sectors: u32,
        #[arg(long)]
        ascii: bool,
    },
    /// Copy one file out of an image's filesystem table.
    Extract {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value_t = config::DEFAULT_KERNEL_SECTORS)]
        kernel_sectors: u32,
    },
}

fn build(config: &BuildConfig, clock: &dyn Clock) -> Result<LayoutSummary> {
    println!("Building {}...", config.output.display());

    let sources = config.load_sources()?;
    let layout = config.layout();
    let (data, summary) = image::assemble(&layout, &sources.boot, &sources.kernel, &sources.files, config.format, clock)?;

    if !summary.boot_signature_ok {
        println!("Warning: boot sector does not end with 55 AA");
    }
    println!("Kernel ends at offset {}. Adding Filesystem...", summary.fs_table_offset);
    if config.verbose {
        println!(
            "Kernel: {} of {} bytes, table at {}, data at {}, body ends at {}, {} bytes free",
            summary.kernel_len,
            layout.kernel_capacity(),
            summary.fs_table_offset,
            summary.fs_data_offset,
            summary.body_end,
            summary.free_bytes()
        );
        println!("Filesystem: {} files, {} skipped", sources.files.len(), sources.skipped.len());
    }

    report::write_atomic(&config.output, &data)?;
    Ok(summary)
}

/// Reloads the written image and checks it against what was built.
fn validate(config: &BuildConfig, summary: &LayoutSummary) -> Result<()> {
    let data = fs::read(&config.output).with_context(|| format!("reading {}", config.output.display()))?;
    let handler = formats::handler_for(config.format, data);

    let expected = summary.disk_size + if config.format == OutputFormat::Vhd { FOOTER_SIZE } else { 0 };
    if handler.data().len() != expected {
        return Err(anyhow!("Validation failed: Output size {} does not match expected size {}", handler.data().len(), expected));
    }
    if handler.body()?.len() != summary.disk_size {
        return Err(anyhow!("Validation failed: body is not {} bytes", summary.disk_size));
    }
    if let Some(geometry) = handler.geometry()? {
        if geometry != config.geometry {
            return Err(anyhow!("Validation failed: geometry {:?} does not match {:?}", geometry, config.geometry));
        }
    }
    let table = handler.fs_table(config.kernel_sectors)?;
    let data_offset = summary.fs_data_offset - summary.fs_table_offset;
    if table.encoded_len() != data_offset || summary.fs_data_offset + table.data_len() as usize != summary.body_end {
        return Err(anyhow!("Validation failed: filesystem table does not describe the written data"));
    }
    println!("Validation passed: {} bytes, {} files", handler.data().len(), table.entries.len());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { boot, kernel, files, output, geometry, kernel_sectors, format, strict, validate: check, verbose } => {
            let format = format
                .or_else(|| output.extension().and_then(|e| e.to_str()).and_then(OutputFormat::from_extension))
                .unwrap_or(OutputFormat::Vhd);
            let config = BuildConfig {
                boot,
                kernel,
                files,
                output,
                geometry,
                kernel_sectors,
                format,
                missing_files: if strict { MissingFilePolicy::Fail } else { MissingFilePolicy::Skip },
                verbose,
            };
            let summary = build(&config, &SystemClock)?;
            if check {
                validate(&config, &summary)?;
            }
            println!("Done.");
        }
        Commands::Display { input, kernel_sectors, ascii } => {
            let handler = formats::load_handler(&input)?;
            println!("{}", report::display(&*handler, kernel_sectors, ascii)?);
        }
        Commands::Extract { input, name, output, kernel_sectors } => {
            let handler = formats::load_handler(&input)?;
            let data = handler.read_file(kernel_sectors, &name)?;
            report::write_atomic(&output, &data)?;
            println!("Extracted {} ({} bytes) to {}", name, data.len(), output.display());
        }
    }
    Ok(())
}
