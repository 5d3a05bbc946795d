//! Token cost estimation
//!
//! Applies the published Gemini 2.5 Pro price table to the token counts
//! the API reports per request. Prompts above 200k tokens bill at the
//! higher tier for both input and output.

use serde::{Deserialize, Serialize};

/// Prompts above this many tokens bill at the large-prompt rates
pub const LARGE_PROMPT_THRESHOLD_TOKENS: u64 = 200_000;

// USD per million tokens
const INPUT_RATE_SMALL: f64 = 1.25;
const INPUT_RATE_LARGE: f64 = 2.50;
const OUTPUT_RATE_SMALL: f64 = 10.00;
const OUTPUT_RATE_LARGE: f64 = 15.00;

/// Token counts reported by the API for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub output_tokens: u64,
}

/// Which side of the 200k prompt threshold a request fell on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptTier {
    SmallPrompt,
    LargePrompt,
}

/// Estimated cost of one request in USD
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub input_usd: f64,
    pub output_usd: f64,
    pub total_usd: f64,
    pub tier: PromptTier,
}

pub struct CostEstimator {
    large_prompt_threshold: u64,
}

impl CostEstimator {
    pub fn new() -> Self {
        Self {
            large_prompt_threshold: LARGE_PROMPT_THRESHOLD_TOKENS,
        }
    }

    /// Price a request from its reported token counts
    ///
    /// The tier is chosen by prompt size alone and applies to both the
    /// input and output rates.
    pub fn estimate(&self, usage: &TokenUsage) -> CostBreakdown {
        let tier = if usage.prompt_tokens > self.large_prompt_threshold {
            PromptTier::LargePrompt
        } else {
            PromptTier::SmallPrompt
        };
        let (input_rate, output_rate) = match tier {
            PromptTier::SmallPrompt => (INPUT_RATE_SMALL, OUTPUT_RATE_SMALL),
            PromptTier::LargePrompt => (INPUT_RATE_LARGE, OUTPUT_RATE_LARGE),
        };
        let input_usd = usage.prompt_tokens as f64 / 1_000_000.0 * input_rate;
        let output_usd = usage.output_tokens as f64 / 1_000_000.0 * output_rate;
        CostBreakdown {
            input_usd,
            output_usd,
            total_usd: input_usd + output_usd,
            tier,
        }
    }
}

impl Default for CostEstimator {
    fn default() -> Self {
        Self::new()
    }
}
