use qsb_core::{ErrorInfo, QsbError};
use qsb_obs::PauliString;
use serde::{Deserialize, Serialize};

/// Basis in which a setting is measured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "basis", rename_all = "snake_case")]
pub enum SettingBasis {
    /// One fixed basis for every shot.
    Fixed(PauliString),
    /// Independent uniform per-qubit basis per shot.
    Random,
}

/// One measurement configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementSetting {
    /// Identifier used to key raw outcomes.
    pub setting_id: String,
    /// Measurement basis.
    pub basis: SettingBasis,
    /// Qubits whose outcomes are read.
    pub targets: Vec<usize>,
    /// Observable indices estimated from this setting.
    pub observables: Vec<usize>,
}

/// Ordered settings with a parallel shot vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct MeasurementPlan {
    settings: Vec<MeasurementSetting>,
    shots: Vec<usize>,
}

impl MeasurementPlan {
    /// Pairs settings with shot counts; settings allocated zero shots are dropped.
    pub fn new(settings: Vec<MeasurementSetting>, shots: Vec<usize>) -> Result<Self, QsbError> {
        if settings.len() != shots.len() {
            return Err(QsbError::Data(
                ErrorInfo::new("plan-length-mismatch", "every setting needs exactly one shot count")
                    .with_context("settings", settings.len().to_string())
                    .with_context("shots", shots.len().to_string()),
            ));
        }
        let (settings, shots) = settings
            .into_iter()
            .zip(shots)
            .filter(|(_, shots)| *shots > 0)
            .unzip();
        Ok(Self { settings, shots })
    }

    /// Plan with no settings; ends the driving loop.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Settings in execution order.
    pub fn settings(&self) -> &[MeasurementSetting] {
        &self.settings
    }

    /// Shots per setting.
    pub fn shots_per_setting(&self) -> &[usize] {
        &self.shots
    }

    /// Sum of the shot vector.
    pub fn total_shots(&self) -> usize {
        self.shots.iter().sum()
    }

    /// Number of settings.
    pub fn len(&self) -> usize {
        self.settings.len()
    }

    /// True when nothing is planned.
    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// `(setting, shots)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&MeasurementSetting, usize)> {
        self.settings.iter().zip(self.shots.iter().copied())
    }
}

/// Splits `total` uniformly over `parts`; the first `total % parts` entries
/// receive one extra shot.
pub fn uniform_split(total: usize, parts: usize) -> Vec<usize> {
    if parts == 0 {
        return Vec::new();
    }
    let base = total / parts;
    let extra = total % parts;
    (0..parts)
        .map(|idx| base + usize::from(idx < extra))
        .collect()
}

/// Splits `total` by normalised `weights` with `floor(w_i · total)` per part;
/// the last part absorbs the remainder so the sum is always `total`.
pub fn weighted_split(total: usize, weights: &[f64]) -> Vec<usize> {
    let Some(last) = weights.len().checked_sub(1) else {
        return Vec::new();
    };
    let norm: f64 = weights.iter().filter(|w| w.is_finite() && **w > 0.0).sum();
    if norm <= 0.0 {
        return uniform_split(total, weights.len());
    }
    let mut shots = Vec::with_capacity(weights.len());
    let mut assigned = 0usize;
    for weight in &weights[..last] {
        let share = if weight.is_finite() && *weight > 0.0 {
            weight / norm
        } else {
            0.0
        };
        let count = ((share * total as f64).floor() as usize).min(total - assigned);
        assigned += count;
        shots.push(count);
    }
    shots.push(total - assigned);
    shots
}
