use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use crate::model::ModelResource;

use super::backend::FrameClassifier;
use super::backends::{NoopDetector, StubDetector};
use super::kind::DetectorKind;
use super::policy::ScorePolicy;

/// Builds one backend instance bound to the shared model resource.
///
/// Factories are called once per worker and must not mutate the resource.
pub type DetectorFactory =
    Arc<dyn Fn(&ModelResource) -> Result<Box<dyn FrameClassifier>> + Send + Sync>;

/// Registry of detector factories keyed by detector kind.
///
/// Lookup never fails: kinds without a registered factory resolve to the
/// no-op detector.
pub struct DetectorRegistry {
    factories: HashMap<DetectorKind, DetectorFactory>,
}

impl DetectorRegistry {
    /// Empty registry. Every kind resolves to the no-op detector.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with every built-in detector kind.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(DetectorKind::Primary, |resource: &ModelResource| {
            model_backed("primary", resource, ScorePolicy::label_threshold(), 320)
        });
        registry.register(DetectorKind::CategoryScores, |resource: &ModelResource| {
            model_backed("nsfw_model", resource, ScorePolicy::CategorySum, 224)
        });
        registry.register(DetectorKind::PromptContrast, |resource: &ModelResource| {
            model_backed(
                "clip_interrogator",
                resource,
                ScorePolicy::prompt_contrast(),
                224,
            )
        });
        registry.register(DetectorKind::Stub, |_: &ModelResource| {
            Ok(Box::new(StubDetector::default()) as Box<dyn FrameClassifier>)
        });
        registry
    }

    /// Register (or replace) the factory for a kind.
    pub fn register<F>(&mut self, kind: DetectorKind, factory: F)
    where
        F: Fn(&ModelResource) -> Result<Box<dyn FrameClassifier>> + Send + Sync + 'static,
    {
        self.factories.insert(kind, Arc::new(factory));
    }

    pub fn contains(&self, kind: &DetectorKind) -> bool {
        self.factories.contains_key(kind)
    }

    /// List registered kinds.
    pub fn list(&self) -> Vec<DetectorKind> {
        self.factories.keys().cloned().collect()
    }

    /// Resolve a kind once per batch.
    pub fn resolve(&self, kind: &DetectorKind) -> ResolvedDetector {
        match self.factories.get(kind) {
            Some(factory) => ResolvedDetector {
                kind: kind.clone(),
                factory: factory.clone(),
            },
            None => {
                log::warn!(
                    "detector '{}' not registered; frames will not be flagged",
                    kind
                );
                ResolvedDetector {
                    kind: kind.clone(),
                    factory: Arc::new(|_: &ModelResource| {
                        Ok(Box::new(NoopDetector) as Box<dyn FrameClassifier>)
                    }),
                }
            }
        }
    }
}

impl Default for DetectorRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

/// A detector kind bound to its factory, shared read-only with every worker.
#[derive(Clone)]
pub struct ResolvedDetector {
    kind: DetectorKind,
    factory: DetectorFactory,
}

impl ResolvedDetector {
    pub fn kind(&self) -> &DetectorKind {
        &self.kind
    }

    pub fn build(&self, resource: &ModelResource) -> Result<Box<dyn FrameClassifier>> {
        (self.factory)(resource)
    }
}

impl fmt::Debug for ResolvedDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedDetector")
            .field("kind", &self.kind)
            .finish()
    }
}

#[cfg(feature = "backend-tract")]
fn model_backed(
    name: &'static str,
    resource: &ModelResource,
    policy: ScorePolicy,
    input_size: u32,
) -> Result<Box<dyn FrameClassifier>> {
    let backend = super::backends::TractClassifier::new(name, resource, policy, input_size)?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "backend-tract"))]
fn model_backed(
    name: &'static str,
    _resource: &ModelResource,
    _policy: ScorePolicy,
    _input_size: u32,
) -> Result<Box<dyn FrameClassifier>> {
    Err(anyhow::anyhow!(
        "detector '{}' requires the backend-tract feature",
        name
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kind_resolves_to_noop() {
        let registry = DetectorRegistry::with_builtin();
        let kind = DetectorKind::from("does_not_exist");
        assert!(!registry.contains(&kind));

        let resolved = registry.resolve(&kind);
        let mut backend = resolved.build(&ModelResource::none()).unwrap();
        assert_eq!(backend.name(), "noop");
        assert!(!backend.classify("anything", 0.0).unwrap());
    }

    #[test]
    fn builtin_registers_every_known_kind() {
        let registry = DetectorRegistry::with_builtin();
        for kind in [
            DetectorKind::Primary,
            DetectorKind::CategoryScores,
            DetectorKind::PromptContrast,
            DetectorKind::Stub,
        ] {
            assert!(registry.contains(&kind), "{} missing", kind);
        }
        assert_eq!(registry.list().len(), 4);
    }

    #[test]
    fn register_replaces_factory() {
        let mut registry = DetectorRegistry::new();
        registry.register(DetectorKind::Stub, |_: &ModelResource| {
            Ok(Box::new(StubDetector::new("b")) as Box<dyn FrameClassifier>)
        });
        let mut backend = registry
            .resolve(&DetectorKind::Stub)
            .build(&ModelResource::none())
            .unwrap();
        assert!(backend.classify("b", 0.6).unwrap());
    }

    #[cfg(not(feature = "backend-tract"))]
    #[test]
    fn model_backed_kinds_fail_without_tract() {
        let registry = DetectorRegistry::with_builtin();
        let err = registry
            .resolve(&DetectorKind::Primary)
            .build(&ModelResource::none())
            .err()
            .expect("primary needs backend-tract");
        assert!(err.to_string().contains("backend-tract"));
    }
}
