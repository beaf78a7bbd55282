#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::FilterType;
use tract_onnx::prelude::*;

use crate::detect::backend::FrameClassifier;
use crate::detect::policy::ScorePolicy;
use crate::model::ModelResource;

type Plan = TypedRunnableModel<TypedModel>;

/// Tract-based backend for ONNX inference on frame files.
///
/// The model is loaded once per worker from the shared model resource. Each
/// `classify` call decodes the frame, resizes it to the model input, runs the
/// model and hands the per-label scores to the kind's `ScorePolicy`.
pub struct TractClassifier {
    name: &'static str,
    model: Plan,
    input_size: u32,
    labels: Vec<String>,
    policy: ScorePolicy,
}

impl TractClassifier {
    /// Load the resource's ONNX model and prepare it for square RGB input.
    pub fn new(
        name: &'static str,
        resource: &ModelResource,
        policy: ScorePolicy,
        input_size: u32,
    ) -> Result<Self> {
        let model_path = resource
            .model_path()
            .ok_or_else(|| anyhow!("{} requires a model_path", name))?;
        let model = load_model(model_path, input_size)?;
        let labels = if resource.labels().is_empty() {
            policy.default_labels()
        } else {
            resource.labels().to_vec()
        };
        log::debug!(
            "{} backend loaded {} (sha256={}, {} labels)",
            name,
            model_path.display(),
            resource.digest().unwrap_or("unknown"),
            labels.len()
        );
        Ok(Self {
            name,
            model,
            input_size,
            labels,
            policy,
        })
    }

    fn build_input(&self, path: &str) -> Result<Tensor> {
        let img = image::open(path).with_context(|| format!("failed to decode frame {}", path))?;
        let side = self.input_size;
        let rgb = img.resize_exact(side, side, FilterType::Triangle).to_rgb8();

        let side = side as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, channel, y, x)| {
            rgb.get_pixel(x as u32, y as u32)[channel] as f32 / 255.0
        });
        Ok(input.into_tensor())
    }

    /// Collapse the first output to one score per label.
    ///
    /// Region models emit one row per candidate box; the best score per label wins.
    fn extract_scores(&self, outputs: TVec<TValue>) -> Result<Vec<f32>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let values: Vec<f32> = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?
            .iter()
            .copied()
            .collect();

        let width = self.labels.len();
        if width == 0 || values.len() % width != 0 {
            return Err(anyhow!(
                "model output of {} values does not fit {} labels",
                values.len(),
                width
            ));
        }

        let mut scores = vec![f32::NEG_INFINITY; width];
        for row in values.chunks_exact(width) {
            for (best, value) in scores.iter_mut().zip(row) {
                if value.is_finite() && *value > *best {
                    *best = *value;
                }
            }
        }
        for score in &mut scores {
            if !score.is_finite() {
                *score = 0.0;
            }
        }
        Ok(scores)
    }
}

impl FrameClassifier for TractClassifier {
    fn name(&self) -> &'static str {
        self.name
    }

    fn classify(&mut self, path: &str, threshold: f32) -> Result<bool> {
        let input = self.build_input(path)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let scores = self.extract_scores(outputs)?;
        Ok(self.policy.flagged(&self.labels, &scores, threshold))
    }
}

fn load_model(model_path: &Path, input_size: u32) -> Result<Plan> {
    let side = input_size as usize;
    tract_onnx::onnx()
        .model_for_path(model_path)
        .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
        .with_input_fact(
            0,
            InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
        )
        .context("failed to set input fact")?
        .into_optimized()
        .context("failed to optimize ONNX model")?
        .into_runnable()
        .context("failed to build runnable ONNX model")
}
