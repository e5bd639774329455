//! Deferred rendering for long vertical lists.
//!
//! Every item starts as a fixed-height placeholder unless the config exempts
//! it. Exemption is re-evaluated against the current length whenever the list
//! changes, so the tail of a growing list moves with it. An item is promoted
//! to real content once it comes within the root margin of the viewport, or
//! when the host reports an intersection itself. Promotion happens once: the
//! item stops being observed and stays mounted unless an `unmount_distance`
//! sends it back.

use std::ops::Range;

use crate::lazy::{LazyConfig, PlaceholderInfo};

/// Per-item bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct LazyEntry {
    pub index: usize,
    pub role: String,
    pub total: usize,
    pub measured_height: Option<f64>,
    /// Promoted by proximity, intersection or a failed observation.
    promoted: bool,
    /// Excluded from deferral by `should_lazy_load` at the current length.
    exempt: bool,
    observed: bool,
}

impl LazyEntry {
    pub fn is_mounted(&self) -> bool {
        self.promoted || self.exempt
    }

    pub fn is_exempt(&self) -> bool {
        self.exempt
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scroll_top: f64,
    pub height: f64,
}

impl Viewport {
    fn bottom(&self) -> f64 {
        self.scroll_top + self.height
    }
}

/// How the host should draw an item right now.
#[derive(Debug, Clone, PartialEq)]
pub enum Render {
    Content,
    Placeholder(PlaceholderInfo),
}

#[derive(Debug, Default)]
pub struct LazyList {
    config: LazyConfig,
    entries: Vec<LazyEntry>,
    viewport: Option<Viewport>,
}

impl LazyList {
    pub fn new(config: LazyConfig) -> Self {
        Self {
            config,
            entries: Vec::new(),
            viewport: None,
        }
    }

    pub fn config(&self) -> &LazyConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LazyEntry] {
        &self.entries
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    /// Appends an item and returns its index.
    pub fn push(&mut self, role: impl Into<String>) -> usize {
        let index = self.entries.len();
        self.entries.push(LazyEntry {
            index,
            role: role.into(),
            total: 0,
            measured_height: None,
            promoted: false,
            exempt: false,
            observed: false,
        });
        self.refresh();
        index
    }

    /// Replaces the item list. Items that keep their index keep their
    /// measured height and promotion.
    pub fn set_items<I, S>(&mut self, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut old = std::mem::take(&mut self.entries).into_iter();
        self.entries = roles
            .into_iter()
            .enumerate()
            .map(|(index, role)| {
                let prior = old.next();
                LazyEntry {
                    index,
                    role: role.into(),
                    total: 0,
                    measured_height: prior.as_ref().and_then(|e| e.measured_height),
                    promoted: prior.is_some_and(|e| e.promoted),
                    exempt: false,
                    observed: false,
                }
            })
            .collect();
        self.refresh();
    }

    /// Moves the viewport and promotes whatever came into range. Returns the
    /// indices promoted by this call.
    pub fn set_viewport(&mut self, scroll_top: f64, height: f64) -> Vec<usize> {
        self.viewport = Some(Viewport {
            scroll_top,
            height: height.max(0.0),
        });
        self.check_proximity()
    }

    /// Host-reported intersection. Only the first `true` for an observed item
    /// has any effect.
    pub fn on_intersection(&mut self, index: usize, intersecting: bool) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) if intersecting && entry.observed => {
                promote(entry);
                log::debug!("lazy item {index} promoted by intersection");
                true
            }
            _ => false,
        }
    }

    /// Observation is unavailable for this item, so it renders eagerly.
    pub fn on_observe_failed(&mut self, index: usize) {
        if let Some(entry) = self.entries.get_mut(index) {
            log::warn!("observing lazy item {index} failed; rendering eagerly");
            promote(entry);
        }
    }

    /// Records an item's real height. When the item sits above the viewport
    /// the scroll position moves by the size change so the visible content
    /// stays put; the returned value is that adjustment.
    pub fn measure(&mut self, index: usize, height: f64) -> f64 {
        let (Some(previous), Some(top)) = (self.height_of(index), self.offset_of(index)) else {
            return 0.0;
        };
        let height = height.max(0.0);
        if let Some(entry) = self.entries.get_mut(index) {
            entry.measured_height = Some(height);
        }
        let delta = height - previous;
        let mut adjustment = 0.0;
        if let Some(vp) = &mut self.viewport
            && top < vp.scroll_top
            && delta != 0.0
        {
            vp.scroll_top += delta;
            adjustment = delta;
        }
        self.check_proximity();
        adjustment
    }

    pub fn decision(&self, index: usize) -> Option<Render> {
        let entry = self.entries.get(index)?;
        if entry.is_mounted() {
            return Some(Render::Content);
        }
        let height = self.height_of(index)?;
        let top = self.offset_of(index)?;
        let is_intersecting = self
            .proximity_window()
            .is_some_and(|window| overlaps(top, height, &window));
        Some(Render::Placeholder(PlaceholderInfo {
            height,
            is_intersecting,
            index,
            total: entry.total,
            role: entry.role.clone(),
        }))
    }

    pub fn is_placeholder(&self, index: usize) -> bool {
        matches!(self.decision(index), Some(Render::Placeholder(_)))
    }

    /// The configured placeholder text for `info`, if any renderer is set.
    pub fn placeholder_text(&self, info: &PlaceholderInfo) -> Option<String> {
        self.config.render_placeholder.as_ref().map(|render| render(info))
    }

    /// Measured height, or the placeholder height when never measured.
    pub fn height_of(&self, index: usize) -> Option<f64> {
        self.entries
            .get(index)
            .map(|e| e.measured_height.unwrap_or(self.config.placeholder_height))
    }

    pub fn offset_of(&self, index: usize) -> Option<f64> {
        (index < self.entries.len()).then(|| (0..index).filter_map(|i| self.height_of(i)).sum())
    }

    pub fn total_height(&self) -> f64 {
        (0..self.entries.len()).filter_map(|i| self.height_of(i)).sum()
    }

    /// Items overlapping the viewport itself, margin excluded.
    pub fn visible_range(&self) -> Range<usize> {
        let Some(vp) = self.viewport else {
            return 0..0;
        };
        let window = vp.scroll_top..vp.bottom();
        let mut offset = 0.0;
        let mut start = None;
        let mut end = 0;
        for i in 0..self.entries.len() {
            let height = self.height_of(i).unwrap_or(0.0);
            if overlaps(offset, height, &window) {
                start.get_or_insert(i);
                end = i + 1;
            } else if start.is_some() {
                break;
            }
            offset += height;
        }
        start.map_or(0..0, |s| s..end)
    }

    pub fn is_observed(&self, index: usize) -> bool {
        self.entries.get(index).is_some_and(|e| e.observed)
    }

    pub fn active_observers(&self) -> usize {
        self.entries.iter().filter(|e| e.observed).count()
    }

    /// Tears down every observer and forgets all items.
    pub fn unmount(&mut self) {
        let observers = self.active_observers();
        if observers > 0 {
            log::debug!("unmounting lazy list with {observers} pending observers");
        }
        self.entries.clear();
        self.viewport = None;
    }

    fn refresh(&mut self) {
        let total = self.entries.len();
        let deferred: Vec<bool> = (0..total).map(|i| self.config.defers(i, total)).collect();
        for (entry, defer) in self.entries.iter_mut().zip(deferred) {
            entry.total = total;
            entry.exempt = !defer;
            entry.observed = !entry.is_mounted();
        }
        if self.viewport.is_some() {
            self.check_proximity();
        }
    }

    fn proximity_window(&self) -> Option<Range<f64>> {
        let vp = self.viewport?;
        let (above, below) = self.config.root_margin.vertical(vp.height);
        Some(vp.scroll_top - above..vp.bottom() + below)
    }

    fn check_proximity(&mut self) -> Vec<usize> {
        let Some(window) = self.proximity_window() else {
            return Vec::new();
        };
        let heights: Vec<f64> = (0..self.entries.len())
            .filter_map(|i| self.height_of(i))
            .collect();
        let unmount_distance = self.config.unmount_distance;
        let mut promoted = Vec::new();
        let mut offset = 0.0;
        for (i, (entry, height)) in self.entries.iter_mut().zip(heights).enumerate() {
            if entry.observed && overlaps(offset, height, &window) {
                promote(entry);
                promoted.push(i);
            } else if let Some(limit) = unmount_distance
                && entry.promoted
                && !entry.exempt
                && distance(offset, height, &window) > limit
            {
                entry.promoted = false;
                entry.observed = true;
            }
            offset += height;
        }
        if !promoted.is_empty() {
            log::debug!("promoted {} lazy items", promoted.len());
        }
        promoted
    }
}

impl Drop for LazyList {
    fn drop(&mut self) {
        self.unmount();
    }
}

fn promote(entry: &mut LazyEntry) {
    entry.promoted = true;
    entry.observed = false;
}

fn overlaps(top: f64, height: f64, window: &Range<f64>) -> bool {
    top <= window.end && top + height >= window.start
}

/// Gap between an item and a window; zero when they overlap.
fn distance(top: f64, height: f64, window: &Range<f64>) -> f64 {
    if top > window.end {
        top - window.end
    } else if top + height < window.start {
        window.start - (top + height)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn list(config: LazyConfig, n: usize) -> LazyList {
        let mut list = LazyList::new(config);
        list.set_items((0..n).map(|i| if i % 2 == 0 { "user" } else { "assistant" }));
        list
    }

    #[test]
    fn disabled_renders_everything() {
        let l = list(LazyConfig::default(), 5);
        assert!((0..5).all(|i| l.decision(i) == Some(Render::Content)));
        assert_eq!(l.active_observers(), 0);
    }

    #[test]
    fn tail_is_never_deferred() {
        let l = list(LazyConfig::enabled().keep_last(10), 200);
        assert!((0..190).all(|i| l.is_placeholder(i)));
        assert!((190..200).all(|i| !l.is_placeholder(i)));
        assert_eq!(l.active_observers(), 190);
    }

    #[test]
    fn promotion_follows_the_margin() {
        let config = LazyConfig::enabled()
            .with_placeholder_height(100.0)
            .with_root_margin("200px")
            .unwrap();
        let mut l = list(config, 20);
        // viewport 0..300 widened to -200..500 reaches items 0..=5
        let promoted = l.set_viewport(0.0, 300.0);
        assert_eq!(promoted, vec![0, 1, 2, 3, 4, 5]);
        assert!(l.is_placeholder(6));
        assert_eq!(l.active_observers(), 14);
    }

    #[test]
    fn promotion_is_once() {
        let mut l = list(LazyConfig::enabled(), 3);
        assert!(l.on_intersection(1, true));
        assert!(!l.on_intersection(1, true));
        assert!(!l.on_intersection(2, false));
        l.set_viewport(10_000.0, 100.0);
        assert!(!l.is_placeholder(1));
    }

    #[test]
    fn failed_observation_renders_eagerly() {
        let mut l = list(LazyConfig::enabled(), 2);
        l.on_observe_failed(0);
        assert_eq!(l.decision(0), Some(Render::Content));
        assert!(!l.is_observed(0));
    }

    #[test]
    fn measuring_above_the_viewport_keeps_the_anchor() {
        let mut l = list(LazyConfig::enabled().with_root_margin("0px").unwrap(), 10);
        l.set_viewport(500.0, 100.0);
        let adjustment = l.measure(1, 160.0);
        assert_eq!(adjustment, 60.0);
        assert_eq!(l.viewport().map(|v| v.scroll_top), Some(560.0));
        assert_eq!(l.measure(8, 10.0), 0.0);
        assert_eq!(l.total_height(), 1000.0 + 60.0 - 90.0);
    }

    #[test]
    fn offsets_use_measured_heights() {
        let mut l = list(LazyConfig::enabled(), 3);
        l.measure(0, 40.0);
        assert_eq!(l.offset_of(1), Some(40.0));
        assert_eq!(l.offset_of(2), Some(140.0));
        assert_eq!(l.offset_of(3), None);
    }

    #[test]
    fn far_items_unmount_when_configured() {
        let config = LazyConfig::enabled()
            .with_root_margin("0px")
            .unwrap()
            .with_unmount_distance(Some(500.0));
        let mut l = list(config, 30);
        l.set_viewport(0.0, 100.0);
        assert!(!l.is_placeholder(0));
        l.set_viewport(2000.0, 100.0);
        assert!(l.is_placeholder(0));
        assert!(l.is_observed(0));
    }

    #[test]
    fn exemption_moves_with_a_growing_tail() {
        let mut l = LazyList::new(LazyConfig::enabled().keep_last(1));
        l.push("user");
        assert!(!l.is_placeholder(0));
        l.push("assistant");
        assert!(l.is_placeholder(0));
        assert!(l.is_observed(0));
        assert!(!l.is_placeholder(1));
        l.push("user");
        assert!(l.is_placeholder(1));
        assert!(!l.is_placeholder(2));
        assert_eq!(l.entries()[2].total, 3);
    }

    #[test]
    fn growing_list_keeps_items_promoted_by_proximity() {
        let config = LazyConfig::enabled()
            .keep_last(1)
            .with_root_margin("0px")
            .unwrap();
        let mut l = LazyList::new(config);
        l.set_viewport(0.0, 50.0);
        l.push("user");
        l.push("assistant");
        assert!(!l.is_placeholder(0), "item 0 sits in the viewport");
        for _ in 0..20 {
            l.push("user");
        }
        assert!(!l.is_placeholder(0));
        assert!(l.is_placeholder(1));
        assert!(!l.is_placeholder(21));
    }

    #[test]
    fn pushed_items_defer_like_a_bulk_set() {
        let mut pushed = LazyList::new(LazyConfig::enabled().keep_last(10));
        for i in 0..200 {
            pushed.push(if i % 2 == 0 { "user" } else { "assistant" });
        }
        let bulk = list(LazyConfig::enabled().keep_last(10), 200);
        for i in 0..200 {
            assert_eq!(pushed.is_placeholder(i), bulk.is_placeholder(i), "item {i}");
        }
        assert_eq!(pushed.active_observers(), 190);
    }

    #[test]
    fn unmount_leaves_no_observers() {
        let mut l = list(LazyConfig::enabled(), 50);
        assert_eq!(l.active_observers(), 50);
        l.unmount();
        assert_eq!(l.active_observers(), 0);
        assert!(l.is_empty());
    }

    #[test]
    fn placeholder_info_reaches_the_renderer() {
        let config = LazyConfig::enabled()
            .with_placeholder_renderer(|info| format!("{} {}/{}", info.role, info.index + 1, info.total));
        let l = list(config, 4);
        let Some(Render::Placeholder(info)) = l.decision(1) else {
            panic!("expected a placeholder");
        };
        assert_eq!(info.height, 100.0);
        assert!(!info.is_intersecting);
        assert_eq!(l.placeholder_text(&info).as_deref(), Some("assistant 2/4"));
    }

    #[test]
    fn visible_range_ignores_the_margin() {
        let mut l = list(LazyConfig::enabled(), 10);
        l.set_viewport(250.0, 200.0);
        assert_eq!(l.visible_range(), 2..5);
    }
}
