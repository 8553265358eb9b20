use std::time::Duration;

use crate::error::PolicyParseError;

// One step of the policy: requests cost `duration` seconds of cooldown once
// monthly egress reaches `threshold` GiB.
#[derive(Debug, Clone, PartialEq)]
pub struct CooldownTier {
    pub duration: u64,
    pub threshold: f64,
}

// Tiered cooldown policy, immutable once parsed. The default tier
// (threshold 0) is held apart; extra tiers are sorted by descending
// threshold so evaluation takes the first qualifying one.
#[derive(Debug, Clone, PartialEq)]
pub struct CooldownPolicy {
    default: u64,
    tiers: Vec<CooldownTier>,
}

impl CooldownPolicy {
    // Parse "default_seconds, duration:threshold, ...". Whitespace around
    // elements and around the colon is ignored.
    pub fn parse(spec: &str) -> Result<Self, PolicyParseError> {
        let mut parts = spec.split(',').map(str::trim);

        let default = parts.next().unwrap_or("");
        if default.is_empty() {
            return Err(PolicyParseError::MissingDefault);
        }
        if default.contains(':') {
            return Err(PolicyParseError::InvalidDefault(default.to_string()));
        }
        let default = default
            .parse::<u64>()
            .map_err(|_| PolicyParseError::InvalidDefault(default.to_string()))?;

        let mut tiers: Vec<CooldownTier> = Vec::new();

        for part in parts {
            let Some((duration, threshold)) = part.split_once(':') else {
                return Err(PolicyParseError::InvalidTier(part.to_string()));
            };
            let duration = duration
                .trim()
                .parse::<u64>()
                .map_err(|_| PolicyParseError::InvalidTier(part.to_string()))?;
            let threshold = threshold
                .trim()
                .parse::<f64>()
                .map_err(|_| PolicyParseError::InvalidTier(part.to_string()))?;
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(PolicyParseError::InvalidTier(part.to_string()));
            }
            // threshold 0 would shadow the default tier
            if threshold == 0.0 || tiers.iter().any(|t| t.threshold == threshold) {
                return Err(PolicyParseError::DuplicateThreshold(threshold));
            }
            tiers.push(CooldownTier {
                duration,
                threshold,
            });
        }

        tiers.sort_by(|a, b| b.threshold.total_cmp(&a.threshold));

        Ok(CooldownPolicy { default, tiers })
    }

    // Largest qualifying threshold wins; the default tier always qualifies,
    // so this never fails.
    pub fn evaluate(&self, usage_gib: f64) -> Duration {
        let seconds = self
            .tiers
            .iter()
            .find(|t| t.threshold <= usage_gib)
            .map(|t| t.duration)
            .unwrap_or(self.default);
        Duration::from_secs(seconds)
    }

    pub fn default_duration(&self) -> Duration {
        Duration::from_secs(self.default)
    }
}
