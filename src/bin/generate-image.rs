use std::io;
use std::path::PathBuf;
use std::process;

use clap::Parser;

use badge_tools::generation::{
    ASPECT_RATIOS, DEFAULT_ASPECT_RATIO, DEFAULT_IMAGE_SIZE, DEFAULT_OUTPUT_PATH, IMAGE_SIZES,
};
use badge_tools::{generate_image, Error, GeminiClient, GeminiConfig, GenerationRequest};

#[derive(Parser)]
#[command(
    name = "generate-image",
    about = "Generate an image from a text prompt with Gemini",
    version,
    after_help = "Reads GEMINI_API_KEY (or GOOGLE_API_KEY) from the environment or a .env file.\n\
                  Aspect ratio and image size are forwarded to the API as given."
)]
struct Cli {
    /// Text prompt describing the image
    prompt: Option<String>,

    /// Where to write the image
    #[arg(default_value = DEFAULT_OUTPUT_PATH)]
    output_path: PathBuf,

    /// Aspect ratio: 1:1, 16:9, 9:16, 4:3, 3:4
    #[arg(default_value = DEFAULT_ASPECT_RATIO)]
    aspect_ratio: String,

    /// Image size: 1K, 2K, 4K
    #[arg(default_value = DEFAULT_IMAGE_SIZE)]
    image_size: String,

    /// Optional image to steer the output (ignored if missing)
    reference_image_path: Option<PathBuf>,

    /// Override the model (default: GEMINI_MODEL or gemini-3-pro-image-preview)
    #[arg(long)]
    model: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn print_usage() {
    println!(
        "Usage: generate-image <prompt> [output_path] [aspect_ratio] [image_size] [reference_image_path]"
    );
    println!("  aspect_ratio: {}", ASPECT_RATIOS.join(", "));
    println!("  image_size: {}", IMAGE_SIZES.join(", "));
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    let Some(prompt) = cli.prompt.filter(|p| !p.trim().is_empty()) else {
        print_usage();
        process::exit(1);
    };

    if dotenv::dotenv().is_err() {
        log::debug!("No .env file found, using process environment");
    }

    let mut config = GeminiConfig::from_env();
    if let Some(model) = cli.model {
        config = config.with_model(model);
    }

    let mut request = GenerationRequest::new(prompt)
        .with_output_path(cli.output_path)
        .with_aspect_ratio(cli.aspect_ratio)
        .with_image_size(cli.image_size);
    if let Some(reference) = cli.reference_image_path {
        request = request.with_reference_image(reference);
    }

    let client = match GeminiClient::new(config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let mut stdout = io::stdout().lock();
    match generate_image(&client, &request, &mut stdout) {
        Ok(_) => {}
        // Reported next to the model's text, which often explains the refusal.
        Err(e @ Error::NoImageGenerated) => {
            drop(stdout);
            println!("{e}");
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
