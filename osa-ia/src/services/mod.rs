//! Analysis services
//!
//! Pipeline order for one run: validate the image, send it to Gemini with
//! the catalog prompt, parse the reply into a detection report, score the
//! report against ground truth, and price the token usage.

pub mod accuracy;
pub mod cost_estimator;
pub mod detection_parser;
pub mod gemini_client;
pub mod image_validator;

pub use accuracy::{AccuracyComparator, ComparisonError};
pub use cost_estimator::{CostBreakdown, CostEstimator, TokenUsage};
pub use gemini_client::{DetectionOutcome, GeminiClient, GeminiError, RateLimiter};
pub use image_validator::{ImageError, ImageValidator, MAX_IMAGE_BYTES};
