//! Scoring rules that turn raw model scores into a flag.
//!
//! Each model-backed detector kind pairs a model with one `ScorePolicy`. Policies
//! are pure: they see label names, per-label scores and the threshold, nothing else.

use std::ops::RangeInclusive;

/// Region labels that count as positive for the primary detector.
pub const PRIMARY_POSITIVE_LABELS: &[&str] = &[
    "FEMALE_GENITALIA_EXPOSED",
    "FEMALE_BREAST_EXPOSED",
    "MALE_GENITALIA_EXPOSED",
    "ANUS_EXPOSED",
    "BUTTOCKS_EXPOSED",
];

/// Class order of the default primary region model.
pub const PRIMARY_DEFAULT_LABELS: &[&str] = &[
    "FEMALE_GENITALIA_COVERED",
    "FACE_FEMALE",
    "BUTTOCKS_EXPOSED",
    "FEMALE_BREAST_EXPOSED",
    "FEMALE_GENITALIA_EXPOSED",
    "MALE_BREAST_EXPOSED",
    "ANUS_EXPOSED",
    "FEET_EXPOSED",
    "BELLY_COVERED",
    "FEET_COVERED",
    "ARMPITS_COVERED",
    "ARMPITS_EXPOSED",
    "FACE_MALE",
    "BELLY_EXPOSED",
    "MALE_GENITALIA_EXPOSED",
    "ANUS_COVERED",
    "FEMALE_BREAST_COVERED",
    "BUTTOCKS_COVERED",
];

/// Class order of the default five-category model.
pub const CATEGORY_DEFAULT_LABELS: &[&str] = &["drawings", "hentai", "neutral", "porn", "sexy"];

/// Prompts whose similarity counts as positive evidence.
pub const CONTRAST_POSITIVE_PROMPTS: &[&str] = &[
    "explicit nudity",
    "naked person",
    "sexual content",
    "pornographic image",
    "intimate body parts",
    "suggestive pose",
    "revealing clothing",
];

/// Prompts whose similarity counts as evidence the frame is safe.
pub const CONTRAST_SAFE_PROMPTS: &[&str] = &[
    "normal clothed person",
    "safe content",
    "appropriate image",
];

/// Below this threshold the category policy also counts half of "sexy".
const SUGGESTIVE_WEIGHT_BELOW: f32 = 0.3;
const SUGGESTIVE_WEIGHT: f32 = 0.5;

#[derive(Clone, Debug, PartialEq)]
pub enum ScorePolicy {
    /// Flag when any positive label scores strictly above the threshold.
    LabelThreshold { positive: Vec<String> },
    /// Flag when `porn + hentai` (plus half of `sexy` for low thresholds)
    /// exceeds the threshold.
    CategorySum,
    /// Flag when the best positive score beats the best safe score and the
    /// threshold. The first `positive` labels are positive, the rest safe.
    PromptContrast { positive: usize },
}

impl ScorePolicy {
    pub fn label_threshold() -> Self {
        ScorePolicy::LabelThreshold {
            positive: PRIMARY_POSITIVE_LABELS
                .iter()
                .map(|label| label.to_string())
                .collect(),
        }
    }

    pub fn prompt_contrast() -> Self {
        ScorePolicy::PromptContrast {
            positive: CONTRAST_POSITIVE_PROMPTS.len(),
        }
    }

    /// Thresholds the policy's scores can be compared against.
    ///
    /// Probabilities live in `[0, 1]`; prompt similarities are cosine scores.
    pub fn threshold_range(&self) -> RangeInclusive<f32> {
        match self {
            ScorePolicy::LabelThreshold { .. } | ScorePolicy::CategorySum => 0.0..=1.0,
            ScorePolicy::PromptContrast { .. } => -1.0..=1.0,
        }
    }

    /// Labels assumed when the model resource does not ship its own.
    pub fn default_labels(&self) -> Vec<String> {
        let labels: Vec<&str> = match self {
            ScorePolicy::LabelThreshold { .. } => PRIMARY_DEFAULT_LABELS.to_vec(),
            ScorePolicy::CategorySum => CATEGORY_DEFAULT_LABELS.to_vec(),
            ScorePolicy::PromptContrast { .. } => CONTRAST_POSITIVE_PROMPTS
                .iter()
                .chain(CONTRAST_SAFE_PROMPTS)
                .copied()
                .collect(),
        };
        labels.into_iter().map(str::to_string).collect()
    }

    /// `scores[i]` belongs to `labels[i]`; missing entries score zero.
    pub fn flagged(&self, labels: &[String], scores: &[f32], threshold: f32) -> bool {
        match self {
            ScorePolicy::LabelThreshold { positive } => labels
                .iter()
                .zip(scores)
                .any(|(label, score)| positive.contains(label) && *score > threshold),
            ScorePolicy::CategorySum => {
                let score_of = |name: &str| {
                    labels
                        .iter()
                        .position(|label| label.eq_ignore_ascii_case(name))
                        .and_then(|idx| scores.get(idx).copied())
                        .unwrap_or(0.0)
                };
                let mut total = score_of("porn") + score_of("hentai");
                if threshold < SUGGESTIVE_WEIGHT_BELOW {
                    total += score_of("sexy") * SUGGESTIVE_WEIGHT;
                }
                total > threshold
            }
            ScorePolicy::PromptContrast { positive } => {
                let split = (*positive).min(scores.len());
                let (pos, safe) = scores.split_at(split);
                let best = |values: &[f32]| values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                let pos_best = best(pos);
                let safe_best = best(safe);
                pos_best.is_finite() && pos_best > safe_best && pos_best > threshold
            }
        }
    }
}
