//! Power analysis for the variable count of the matching framework.
//!
//! Sample sizes use the multiple-regression approximation
//! `N = (z_{1-α/2} + z_β)² · (1 − R²) / (R² / k)` with `R² = d² / (1 + d²)`.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::errors::MatchError;

const HARRELL_PER_VARIABLE: usize = 15;
const CLASSIFICATION_PER_VARIABLE: usize = 20;
const ABSOLUTE_MINIMUM: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleSizeRequirements {
    pub power_80: usize,
    pub power_90: usize,
    pub power_95: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerAnalysis {
    pub variables: usize,
    pub effect_size: f64,
    pub alpha: f64,
    pub r_squared: f64,
    pub sample_size_requirements: SampleSizeRequirements,
    pub recommendation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleSizeBreakdown {
    pub harrell_rule: usize,
    pub cohen_power: usize,
    pub classification_rule: usize,
    pub absolute_minimum: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimumSampleSize {
    pub minimum_sample_size: usize,
    pub breakdown: SampleSizeBreakdown,
    pub confidence_level: f64,
    pub power: f64,
}

/// Sample sizes needed for 80 / 90 / 95% power at two-sided significance `alpha`.
pub fn statistical_power(
    num_variables: usize,
    effect_size: f64,
    alpha: f64,
) -> Result<PowerAnalysis, MatchError> {
    check_probability("alpha", alpha)?;
    let r_squared = r_squared(num_variables, effect_size)?;
    let z_alpha = z_score(1.0 - alpha / 2.0)?;

    let n = |power: f64| -> Result<usize, MatchError> {
        Ok(cohen_n(num_variables, r_squared, z_alpha, z_score(power)?))
    };
    let sample_size_requirements = SampleSizeRequirements {
        power_80: n(0.80)?,
        power_90: n(0.90)?,
        power_95: n(0.95)?,
    };

    Ok(PowerAnalysis {
        variables: num_variables,
        effect_size,
        alpha,
        r_squared,
        recommendation: format!(
            "Need {}+ samples for 80% power",
            sample_size_requirements.power_80
        ),
        sample_size_requirements,
    })
}

/// Most conservative of Harrell's 15-per-variable rule, Cohen's power analysis at
/// 95% confidence, 20 per variable, and an absolute floor of 500.
pub fn minimum_sample_size(
    num_variables: usize,
    desired_power: f64,
    effect_size: f64,
) -> Result<MinimumSampleSize, MatchError> {
    check_probability("desired_power", desired_power)?;
    let r_squared = r_squared(num_variables, effect_size)?;

    let breakdown = SampleSizeBreakdown {
        harrell_rule: num_variables * HARRELL_PER_VARIABLE,
        cohen_power: cohen_n(num_variables, r_squared, z_score(0.975)?, z_score(desired_power)?),
        classification_rule: num_variables * CLASSIFICATION_PER_VARIABLE,
        absolute_minimum: ABSOLUTE_MINIMUM,
    };
    let minimum_sample_size = breakdown
        .harrell_rule
        .max(breakdown.cohen_power)
        .max(breakdown.classification_rule)
        .max(breakdown.absolute_minimum);

    Ok(MinimumSampleSize {
        minimum_sample_size,
        breakdown,
        confidence_level: 0.95,
        power: desired_power,
    })
}

fn r_squared(num_variables: usize, effect_size: f64) -> Result<f64, MatchError> {
    if num_variables == 0 {
        return Err(MatchError::Validation(
            "power analysis needs at least one variable".to_string(),
        ));
    }
    if !effect_size.is_finite() || effect_size == 0.0 {
        return Err(MatchError::Validation(format!(
            "effect size must be finite and non-zero, got {effect_size}"
        )));
    }
    Ok(effect_size.powi(2) / (1.0 + effect_size.powi(2)))
}

fn cohen_n(num_variables: usize, r_squared: f64, z_alpha: f64, z_beta: f64) -> usize {
    let n = (z_alpha + z_beta).powi(2) * ((1.0 - r_squared) / (r_squared / num_variables as f64));
    n.max(0.0) as usize
}

fn check_probability(name: &str, value: f64) -> Result<(), MatchError> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(MatchError::Validation(format!(
            "{name} must lie strictly between 0 and 1, got {value}"
        )))
    }
}

fn z_score(p: f64) -> Result<f64, MatchError> {
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| MatchError::Validation(format!("standard normal: {e}")))?;
    Ok(normal.inverse_cdf(p))
}
