use std::fmt;
use std::sync::Arc;

use crate::lazy::{LazyError, RootMargin};

/// `(index, total) -> bool`: whether the item at `index` may be deferred.
pub type LazyPredicate = Arc<dyn Fn(usize, usize) -> bool + Send + Sync>;

/// Produces the text shown in place of a deferred item.
pub type PlaceholderRenderer = Arc<dyn Fn(&PlaceholderInfo) -> String + Send + Sync>;

/// What a placeholder renderer gets to work with.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderInfo {
    pub height: f64,
    pub is_intersecting: bool,
    pub index: usize,
    pub total: usize,
    pub role: String,
}

#[derive(Clone)]
pub struct LazyConfig {
    pub enable: bool,
    /// Height assumed for items that have never been measured.
    pub placeholder_height: f64,
    pub root_margin: RootMargin,
    /// `None` defers every item.
    pub should_lazy_load: Option<LazyPredicate>,
    pub render_placeholder: Option<PlaceholderRenderer>,
    /// Mounted items farther than this from the viewport return to
    /// placeholders. `None` keeps them mounted once shown.
    pub unmount_distance: Option<f64>,
}

impl Default for LazyConfig {
    fn default() -> Self {
        Self {
            enable: false,
            placeholder_height: 100.0,
            root_margin: RootMargin::default(),
            should_lazy_load: None,
            render_placeholder: None,
            unmount_distance: None,
        }
    }
}

impl fmt::Debug for LazyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyConfig")
            .field("enable", &self.enable)
            .field("placeholder_height", &self.placeholder_height)
            .field("root_margin", &self.root_margin)
            .field("should_lazy_load", &self.should_lazy_load.is_some())
            .field("render_placeholder", &self.render_placeholder.is_some())
            .field("unmount_distance", &self.unmount_distance)
            .finish()
    }
}

impl LazyConfig {
    pub fn enabled() -> Self {
        Self {
            enable: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_placeholder_height(mut self, height: f64) -> Self {
        self.placeholder_height = height.max(0.0);
        self
    }

    pub fn with_root_margin(mut self, margin: &str) -> Result<Self, LazyError> {
        self.root_margin = margin.parse()?;
        Ok(self)
    }

    #[must_use]
    pub fn with_should_lazy_load(
        mut self,
        predicate: impl Fn(usize, usize) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.should_lazy_load = Some(Arc::new(predicate));
        self
    }

    /// Never defers the last `n` items; the tail of a conversation is what
    /// the reader is looking at.
    #[must_use]
    pub fn keep_last(self, n: usize) -> Self {
        self.with_should_lazy_load(move |index, total| index + n < total)
    }

    #[must_use]
    pub fn with_placeholder_renderer(
        mut self,
        render: impl Fn(&PlaceholderInfo) -> String + Send + Sync + 'static,
    ) -> Self {
        self.render_placeholder = Some(Arc::new(render));
        self
    }

    #[must_use]
    pub fn with_unmount_distance(mut self, distance: Option<f64>) -> Self {
        self.unmount_distance = distance;
        self
    }

    /// Whether the item at `index` of `total` is subject to deferral.
    pub fn defers(&self, index: usize, total: usize) -> bool {
        self.enable
            && self
                .should_lazy_load
                .as_ref()
                .is_none_or(|predicate| predicate(index, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_defers_nothing() {
        let config = LazyConfig::default();
        assert!(!config.defers(0, 10));
    }

    #[test]
    fn keep_last_exempts_the_tail() {
        let config = LazyConfig::enabled().keep_last(10);
        assert!(config.defers(189, 200));
        assert!(!config.defers(190, 200));
        assert!(!config.defers(0, 5));
    }

    #[test]
    fn bad_margin_is_an_error() {
        assert!(LazyConfig::enabled().with_root_margin("wide").is_err());
        let config = LazyConfig::enabled().with_root_margin("50px").unwrap();
        assert_eq!(config.root_margin, RootMargin::uniform(50.0));
    }
}
