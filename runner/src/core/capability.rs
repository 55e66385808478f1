//! Static capability facts for runner candidates and model filtering.

use std::collections::BTreeSet;

/// Models a runner declares support for.
///
/// An empty declaration means the runner is unrestricted and accepts any model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelSet {
    models: Option<BTreeSet<String>>,
}

impl ModelSet {
    pub fn unrestricted() -> Self {
        Self::default()
    }

    /// Build a set from configured names. Entries are trimmed and blanks dropped.
    pub fn from_models<I, S>(models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<String> = models
            .into_iter()
            .map(|m| m.as_ref().trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        if set.is_empty() {
            Self::unrestricted()
        } else {
            Self { models: Some(set) }
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.models.is_none()
    }

    /// Exact-match support check. An unset model is supported by everyone.
    pub fn supports(&self, model: Option<&str>) -> bool {
        match (&self.models, model) {
            (None, _) | (_, None) => true,
            (Some(set), Some(model)) => set.contains(model),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.models.iter().flatten().map(String::as_str)
    }
}

/// Per-runner static facts: name, priority and model support.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    pub name: String,
    /// Lower values are tried earlier among fallbacks.
    pub priority: u32,
    pub models: ModelSet,
}

impl Capability {
    pub fn new(name: impl Into<String>, priority: u32, models: ModelSet) -> Self {
        Self {
            name: name.into(),
            priority,
            models,
        }
    }

    pub fn supports_model(&self, model: Option<&str>) -> bool {
        self.models.supports(model)
    }
}
