/// 物体真实尺寸注册表 (Real-world object size registry)
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::PipelineError;

/// Known physical dimensions for a class, in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectSize {
    pub width: f32,
    pub height: f32,
    pub aspect_ratio: f32,
}

/// Class-name → real-world-size store.
///
/// Injectable: the estimator always takes a `&SizeRegistry`, so
/// independent detector instances can opt into isolated or shared
/// registries. The process-wide default lives at the pipeline wiring
/// layer (`pipeline::shared_registry`), not here. Names are lower-cased
/// on store and lookup; re-registering a class overwrites its entry;
/// entries never expire.
#[derive(Debug, Default)]
pub struct SizeRegistry {
    sizes: RwLock<HashMap<String, ObjectSize>>,
}

impl SizeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the physical size of a class.
    ///
    /// Fails when the name is empty/whitespace or either dimension is not
    /// strictly positive and finite.
    pub fn register(&self, class_name: &str, width: f32, height: f32) -> Result<(), PipelineError> {
        let key = class_name.trim().to_lowercase();
        if key.is_empty() {
            return Err(PipelineError::Registry("empty class name".into()));
        }
        if !width.is_finite() || !height.is_finite() || width <= 0.0 || height <= 0.0 {
            return Err(PipelineError::Registry(format!(
                "object size for '{}' must be strictly positive, got {}x{}",
                key, width, height
            )));
        }
        let entry = ObjectSize {
            width,
            height,
            aspect_ratio: width / height,
        };
        // lock poisoning only happens if a writer panicked; treat as empty
        if let Ok(mut map) = self.sizes.write() {
            map.insert(key, entry);
        }
        Ok(())
    }

    pub fn lookup(&self, class_name: &str) -> Option<ObjectSize> {
        let key = class_name.trim().to_lowercase();
        self.sizes.read().ok().and_then(|map| map.get(&key).copied())
    }

    pub fn len(&self) -> usize {
        self.sizes.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let reg = SizeRegistry::new();
        reg.register("Card", 0.086, 0.054).unwrap();
        assert!(reg.lookup("card").is_some());
        assert!(reg.lookup("CARD").is_some());
        assert!(reg.lookup("  Card ").is_some());
    }

    #[test]
    fn test_empty_name_rejected() {
        let reg = SizeRegistry::new();
        assert!(reg.register("", 1.0, 1.0).is_err());
        assert!(reg.register("   ", 1.0, 1.0).is_err());
    }

    #[test]
    fn test_non_positive_dimensions_rejected() {
        let reg = SizeRegistry::new();
        assert!(reg.register("person", 0.0, 1.7).is_err());
        assert!(reg.register("person", 0.45, -1.0).is_err());
        assert!(reg.register("person", f32::NAN, 1.7).is_err());
    }

    #[test]
    fn test_overwrite_is_idempotent() {
        let reg = SizeRegistry::new();
        reg.register("person", 0.45, 1.7).unwrap();
        reg.register("PERSON", 0.5, 1.8).unwrap();
        assert_eq!(reg.len(), 1);
        let s = reg.lookup("person").unwrap();
        assert!((s.width - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_aspect_ratio_stored() {
        let reg = SizeRegistry::new();
        reg.register("card", 0.086, 0.054).unwrap();
        let s = reg.lookup("card").unwrap();
        assert!((s.aspect_ratio - 0.086 / 0.054).abs() < 1e-6);
    }
}
