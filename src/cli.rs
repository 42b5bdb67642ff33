//! Command line interface for fwmerge

use crate::error::Result;
use crate::layout::MemoryLayout;
use crate::merger::{FirmwareMerger, ImageInfo};
use crate::{META_SIZE, VERSION};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

/// Command line arguments for fwmerge
#[derive(Parser, Debug)]
#[command(name = "fwmerge")]
#[command(version = VERSION)]
#[command(about = "Merge a bootloader and an application into a flashable firmware image", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode - only output errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merge a bootloader and an application into one firmware image
    Merge(MergeArgs),
    /// Print the metadata embedded in a firmware image
    Info(InfoArgs),
    /// Verify a firmware image's application CRC32
    Verify(VerifyArgs),
}

/// Memory map overrides, defaulting to the STM32F1 reference map
#[derive(clap::Args, Debug)]
pub struct LayoutArgs {
    /// Bootloader base address (hexadecimal)
    #[arg(long, value_parser = parse_hex_u32)]
    pub bootloader_base: Option<u32>,

    /// Metadata block base address (hexadecimal)
    #[arg(long, value_parser = parse_hex_u32)]
    pub metadata_base: Option<u32>,

    /// Application base address (hexadecimal)
    #[arg(long, value_parser = parse_hex_u32)]
    pub app_base: Option<u32>,
}

impl LayoutArgs {
    /// Build the memory map, falling back to the reference map per field
    pub fn to_layout(&self) -> MemoryLayout {
        let reference = MemoryLayout::STM32F1;
        MemoryLayout {
            bootloader_base: self.bootloader_base.unwrap_or(reference.bootloader_base),
            metadata_base: self.metadata_base.unwrap_or(reference.metadata_base),
            metadata_size: META_SIZE as u32,
            application_base: self.app_base.unwrap_or(reference.application_base),
        }
    }
}

/// Arguments for merging a firmware image
#[derive(Parser, Debug)]
pub struct MergeArgs {
    /// Path to bootloader binary file
    pub boot: PathBuf,

    /// Path to application binary file
    pub app: PathBuf,

    /// Path for output firmware file
    pub output: PathBuf,

    /// Application metadata version
    #[arg(short = 'V', long = "app-version", default_value_t = 1,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub app_version: u32,

    /// Overwrite output file if it exists
    #[arg(long)]
    pub force: bool,

    #[command(flatten)]
    pub layout: LayoutArgs,
}

/// Arguments for printing image metadata
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Firmware image file to examine
    pub image_file: PathBuf,

    #[command(flatten)]
    pub layout: LayoutArgs,
}

/// Arguments for verifying an image
#[derive(Parser, Debug)]
pub struct VerifyArgs {
    /// Firmware image file to verify
    pub image_file: PathBuf,

    #[command(flatten)]
    pub layout: LayoutArgs,
}

/// Parse hexadecimal string to u32
fn parse_hex_u32(s: &str) -> std::result::Result<u32, std::num::ParseIntError> {
    if s.starts_with("0x") || s.starts_with("0X") {
        u32::from_str_radix(&s[2..], 16)
    } else {
        s.parse::<u32>()
    }
}

/// Main CLI handler
pub fn run_cli(args: Args) -> Result<()> {
    let verbose = args.verbose && !args.quiet;
    let quiet = args.quiet;

    match args.command {
        Commands::Merge(merge_args) => handle_merge(merge_args, verbose, quiet),
        Commands::Info(info_args) => handle_info(info_args, verbose),
        Commands::Verify(verify_args) => handle_verify(verify_args, verbose, quiet),
    }
}

fn handle_merge(args: MergeArgs, verbose: bool, quiet: bool) -> Result<()> {
    let layout = args.layout.to_layout();

    if verbose {
        eprintln!("Reading bootloader from: {}", args.boot.display());
        eprintln!("Reading application from: {}", args.app.display());
        eprintln!("Output firmware to: {}", args.output.display());
        eprintln!("Application metadata version: {}", args.app_version);
    }

    // Overwrite confirmation, unless forced
    if args.output.exists() && !args.force && !confirm_overwrite(&args.output)? {
        if !quiet {
            println!("Operation cancelled");
        }
        return Ok(());
    }

    // Create the output directory if needed
    if let Some(parent) = args.output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let merger = FirmwareMerger::new(layout)
        .bootloader_from_file(&args.boot)?
        .application_from_file(&args.app)?
        .version(args.app_version);

    if verbose {
        eprintln!("Bootloader size: {} bytes", merger.bootloader_data().len());
        eprintln!("Application size: {} bytes", merger.application_data().len());
    }

    let image = merger.merge()?;
    std::fs::write(&args.output, &image)?;

    if !quiet {
        let metadata = merger.metadata();
        println!("Created firmware image: {}", args.output.display());
        println!("  Bootloader : {:6} bytes", merger.bootloader_data().len());
        println!("  Metadata   : {:6} bytes", META_SIZE);
        println!(
            "  Application: {:6} bytes (CRC32: 0x{:08X})",
            metadata.app_size, metadata.app_crc32
        );
        println!("  Total size : {:6} bytes", image.len());
    }

    Ok(())
}

fn handle_info(args: InfoArgs, verbose: bool) -> Result<()> {
    if verbose {
        eprintln!("Reading image: {}", args.image_file.display());
    }

    let image = std::fs::read(&args.image_file)?;
    let info = ImageInfo::from_image(&image, &args.layout.to_layout())?;

    println!("Image      : {}", args.image_file.display());
    println!("Total size : {} bytes", info.total_size);
    println!("Magic      : 0x{:08X}", info.metadata.magic);
    println!("Version    : {}", info.metadata.version);
    println!("App size   : {} bytes", info.metadata.app_size);
    println!("App CRC32  : 0x{:08X}", info.metadata.app_crc32);

    Ok(())
}

fn handle_verify(args: VerifyArgs, verbose: bool, quiet: bool) -> Result<()> {
    if verbose {
        eprintln!("Verifying image: {}", args.image_file.display());
    }

    let image = std::fs::read(&args.image_file)?;
    let info = ImageInfo::from_image(&image, &args.layout.to_layout())?;
    info.verify()?;

    if !quiet {
        println!(
            "Application CRC32: 0x{:08X} - OK",
            info.metadata.app_crc32
        );
        println!("Image verification successful");
    }

    Ok(())
}

/// Ask on the terminal whether an existing output file may be replaced
fn confirm_overwrite(path: &std::path::Path) -> Result<bool> {
    print!(
        "Output file '{}' already exists. Overwrite? (y/N): ",
        path.display()
    );
    std::io::stdout().flush()?;

    let mut response = String::new();
    std::io::stdin().read_line(&mut response)?;
    let response = response.trim().to_ascii_lowercase();
    Ok(response == "y" || response == "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_hex_u32() {
        assert_eq!(parse_hex_u32("0x8000000").unwrap(), 0x0800_0000);
        assert_eq!(parse_hex_u32("0X1000").unwrap(), 4096);
        assert_eq!(parse_hex_u32("1000").unwrap(), 1000);
    }

    #[test]
    fn test_args_parsing() {
        let args = Args::try_parse_from([
            "fwmerge", "merge", "boot.bin", "app.bin", "out.bin", "-V", "2", "--force",
        ])
        .unwrap();

        if let Commands::Merge(merge_args) = args.command {
            assert_eq!(merge_args.boot, PathBuf::from("boot.bin"));
            assert_eq!(merge_args.app_version, 2);
            assert!(merge_args.force);
        } else {
            panic!("Expected Merge command");
        }
    }

    #[test]
    fn test_version_zero_rejected() {
        let result = Args::try_parse_from([
            "fwmerge", "merge", "boot.bin", "app.bin", "out.bin", "-V", "0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_layout_overrides() {
        let args = Args::try_parse_from([
            "fwmerge",
            "merge",
            "boot.bin",
            "app.bin",
            "out.bin",
            "--bootloader-base",
            "0x08000000",
            "--metadata-base",
            "0x08001FD0",
            "--app-base",
            "0x08002000",
        ])
        .unwrap();

        if let Commands::Merge(merge_args) = args.command {
            let layout = merge_args.layout.to_layout();
            assert_eq!(layout.metadata_base, 0x0800_1FD0);
            assert_eq!(layout.application_base, 0x0800_2000);
            assert!(layout.validate().is_ok());
        } else {
            panic!("Expected Merge command");
        }
    }
}
