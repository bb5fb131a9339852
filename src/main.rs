use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use qrtint::{
    console_preview, encode, parse_hex_color, render, save_png, EncodingRequest, RenderConfig,
};

/// Generate a styled QR code PNG from text.
#[derive(Debug, Parser)]
#[command(name = "qrtint", version, about)]
struct Cli {
    /// Text or URL to encode.
    text: String,

    /// QR symbol version (1-40); larger versions hold more data.
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..=40))]
    qr_version: u32,

    /// Pixels per module.
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..))]
    box_size: u32,

    /// Quiet-zone width in modules.
    #[arg(long, default_value_t = 7)]
    border: u32,

    /// Module color as #RRGGBB.
    #[arg(long, default_value = "#000000", value_parser = parse_hex_color)]
    fill: [u8; 3],

    /// Background color as #RRGGBB.
    #[arg(long, default_value = "#FFFFFF", value_parser = parse_hex_color)]
    back: [u8; 3],

    /// Corner rounding radius in pixels; 0 keeps square corners.
    #[arg(long, default_value_t = 20)]
    corner_radius: u32,

    /// Output path; the file is always written as PNG.
    #[arg(short, long, default_value = "qr.png")]
    output: PathBuf,

    /// Print the module grid to stdout before saving.
    #[arg(long)]
    preview: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> qrtint::Result<()> {
    let request = EncodingRequest {
        text: cli.text.clone(),
        version: cli.qr_version,
        box_size: cli.box_size,
        border: cli.border,
    };
    let config = RenderConfig {
        fill_color: cli.fill,
        back_color: cli.back,
        corner_radius: cli.corner_radius,
    };

    let grid = encode(&request)?;
    if cli.preview {
        print!("{}", console_preview(&grid));
    }

    let image = render(&grid, &config);
    save_png(&image, &cli.output)?;
    println!(
        "saved {}x{} PNG to {}",
        image.width(),
        image.height(),
        cli.output.display()
    );
    Ok(())
}
