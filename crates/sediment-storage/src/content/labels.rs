//! Display labels for element kinds, used only in progress output.

use std::collections::HashMap;

use sediment_core::constants::DEFAULT_ELEMENT_LABEL;

/// Registered mapping from element-kind tag to display label.
#[derive(Debug, Clone)]
pub struct ElementLabels {
    labels: HashMap<String, String>,
}

impl Default for ElementLabels {
    fn default() -> Self {
        let mut labels = Self::empty();
        for (tag, label) in [
            ("entry", "entry"),
            ("asset", "asset"),
            ("category", "category"),
            ("tag", "tag"),
            ("user", "user"),
            ("global_set", "global set"),
            ("matrix_block", "matrix block"),
        ] {
            labels.register(tag, label);
        }
        labels
    }
}

impl ElementLabels {
    pub fn empty() -> Self {
        Self {
            labels: HashMap::new(),
        }
    }

    pub fn register(&mut self, tag: impl Into<String>, label: impl Into<String>) -> &mut Self {
        self.labels.insert(tag.into(), label.into());
        self
    }

    /// The label for `tag`, or the generic element label.
    pub fn label(&self, tag: Option<&str>) -> &str {
        tag.and_then(|t| self.labels.get(t))
            .map_or(DEFAULT_ELEMENT_LABEL, String::as_str)
    }
}
