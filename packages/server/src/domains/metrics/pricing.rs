//! Per-model token pricing.

use tracing::warn;

use crate::common::TokenUsage;

/// USD per one million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

const PRICING: &[(&str, ModelPricing)] = &[
    (
        "gpt-4o",
        ModelPricing {
            input_per_million: 2.50,
            output_per_million: 10.00,
        },
    ),
    (
        "gpt-4o-mini",
        ModelPricing {
            input_per_million: 0.15,
            output_per_million: 0.60,
        },
    ),
    (
        "claude-3-5-sonnet-20241022",
        ModelPricing {
            input_per_million: 3.00,
            output_per_million: 15.00,
        },
    ),
    (
        "claude-3-haiku-20240307",
        ModelPricing {
            input_per_million: 0.25,
            output_per_million: 1.25,
        },
    ),
];

pub fn pricing_for(model: &str) -> Option<ModelPricing> {
    PRICING
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, pricing)| *pricing)
}

/// Cost of one call in USD; unknown models cost nothing.
pub fn calculate_cost(usage: &TokenUsage, model: &str) -> f64 {
    let Some(pricing) = pricing_for(model) else {
        warn!(model = %model, "no pricing info for model");
        return 0.0;
    };

    usage.prompt_tokens as f64 * pricing.input_per_million / 1_000_000.0
        + usage.completion_tokens as f64 * pricing.output_per_million / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_gpt4o_cost() {
        let cost = calculate_cost(&TokenUsage::new(1_000_000, 1_000_000), "gpt-4o");
        assert!(close(cost, 12.50));
    }

    #[test]
    fn test_sonnet_cost() {
        let cost = calculate_cost(&TokenUsage::new(1000, 500), "claude-3-5-sonnet-20241022");
        assert!(close(cost, 0.003 + 0.0075));
    }

    #[test]
    fn test_unknown_model_is_free() {
        assert_eq!(calculate_cost(&TokenUsage::new(10, 10), "mystery-model"), 0.0);
    }
}
