use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_MAX_NEW_SNOW_24H: f64 = 12.0;
pub const DEFAULT_MAX_SWE: f64 = 10.0;
pub const DEFAULT_MAX_DEPTH_JUMP: f64 = 5.0;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct AnomalyThresholds {
    #[serde(default = "default_max_new_snow_24h")]
    pub max_new_snow_24h: f64,
    #[serde(default = "default_max_swe")]
    pub max_swe: f64,
    #[serde(default = "default_max_depth_jump")]
    pub max_depth_jump: f64,
}

fn default_max_new_snow_24h() -> f64 {
    DEFAULT_MAX_NEW_SNOW_24H
}

fn default_max_swe() -> f64 {
    DEFAULT_MAX_SWE
}

fn default_max_depth_jump() -> f64 {
    DEFAULT_MAX_DEPTH_JUMP
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            max_new_snow_24h: DEFAULT_MAX_NEW_SNOW_24H,
            max_swe: DEFAULT_MAX_SWE,
            max_depth_jump: DEFAULT_MAX_DEPTH_JUMP,
        }
    }
}

impl AnomalyThresholds {
    pub fn validate_new_snow(&self, value: Option<f64>) -> Option<f64> {
        value.filter(|v| {
            let ok = *v <= self.max_new_snow_24h;
            if !ok {
                warn!(
                    "Discarding 24h snowfall reading {} (limit {})",
                    v, self.max_new_snow_24h
                );
            }
            ok
        })
    }

    pub fn validate_swe(&self, value: Option<f64>) -> Option<f64> {
        value.filter(|v| {
            let ok = *v <= self.max_swe;
            if !ok {
                warn!("Discarding SWE reading {} (limit {})", v, self.max_swe);
            }
            ok
        })
    }

    /// Hold-last-good-value correction over an assembled snow depth sequence.
    pub fn smooth_depth_spikes(&self, depths: &mut [Option<f64>]) -> usize {
        let mut previous: Option<f64> = None;
        let mut replaced = 0;

        for (index, slot) in depths.iter_mut().enumerate() {
            let Some(current) = *slot else {
                continue;
            };
            if let Some(prev) = previous {
                if (current - prev).abs() > self.max_depth_jump {
                    warn!(
                        "Snow depth spike at index {}: {} -> {}, holding {}",
                        index, prev, current, prev
                    );
                    *slot = Some(prev);
                    replaced += 1;
                    continue;
                }
            }
            previous = Some(current);
        }

        replaced
    }
}
