//! Asset tooling for badge artwork: generate images with Gemini and strip
//! backgrounds from a directory of badge PNGs.
//!
//! # Generating an image
//!
//! ```no_run
//! use badge_tools::{generate_image, GeminiClient, GeminiConfig, GenerationRequest};
//!
//! let client = GeminiClient::new(GeminiConfig::from_env()).expect("GEMINI_API_KEY not set");
//! let request = GenerationRequest::new("a bronze ramen bowl badge, flat style")
//!     .with_output_path("out/ramen.png")
//!     .with_aspect_ratio("1:1");
//! let outcome = generate_image(&client, &request, &mut std::io::stdout()).unwrap();
//! println!("{}", outcome.saved_path.display());
//! ```
//!
//! # Stripping badge backgrounds
//!
//! Files listed in the [`SkipSet`] are left alone; every other `.png` in the
//! directory is rewritten in place.
//!
//! ```no_run
//! use badge_tools::{strip_badges, BatchConfig, CornerKeyRemover};
//!
//! let config = BatchConfig::new("assets/images/badges");
//! let summary = strip_badges(&config, &CornerKeyRemover::default(), &mut std::io::stdout())
//!     .unwrap();
//! assert_eq!(summary.success + summary.failed, summary.total);
//! ```

#![deny(missing_docs)]

pub mod background;
pub mod badges;
pub mod config;
pub mod error;
pub mod gemini;
pub mod generation;
pub mod remove_bg;

pub use background::{BackgroundRemover, CornerKeyRemover};
pub use badges::{discover_candidates, strip_badges, BatchConfig, BatchSummary, SkipSet};
pub use config::{GeminiConfig, RemoveBgConfig};
pub use error::{Error, Result};
pub use gemini::GeminiClient;
pub use generation::{
    generate_image, GenerationOutcome, GenerationRequest, GenerationResponse,
    ImageGenerationService, ResponsePart,
};
pub use remove_bg::RemoveBgClient;
