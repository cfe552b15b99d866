use crate::core::{DescriptorStore, ItemKey};

/// Fractions closer than this are treated as equal.
const FRACTION_EPSILON: f32 = 1e-4;

/// How much of one mounted item is on screen, as measured by the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityMeasurement {
    pub key: ItemKey,
    pub visible_fraction: f32,
}

impl VisibilityMeasurement {
    pub fn new(key: ItemKey, visible_fraction: f32) -> Self {
        Self {
            key,
            visible_fraction,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityReport {
    pub key: ItemKey,
    pub is_viewable: bool,
    pub visible_fraction: f32,
}

/// Picks the single most visible item among those at or above `threshold`.
///
/// Larger fraction wins. Equal fractions go to `active` when it is one of the
/// candidates, otherwise to the item earlier in the list.
pub fn select_most_visible(
    measurements: &[VisibilityMeasurement],
    threshold: f32,
    active: Option<&ItemKey>,
) -> Option<VisibilityReport> {
    let is_active = |m: &VisibilityMeasurement| active == Some(&m.key);

    let best = measurements
        .iter()
        .filter(|m| m.visible_fraction.is_finite() && m.visible_fraction >= threshold)
        .fold(None::<&VisibilityMeasurement>, |best, candidate| {
            let Some(current) = best else {
                return Some(candidate);
            };

            let diff = candidate.visible_fraction - current.visible_fraction;
            if diff > FRACTION_EPSILON {
                Some(candidate)
            } else if diff < -FRACTION_EPSILON {
                Some(current)
            } else if is_active(candidate) {
                Some(candidate)
            } else if is_active(current) {
                Some(current)
            } else if candidate.key.index < current.key.index {
                Some(candidate)
            } else {
                Some(current)
            }
        })?;

    Some(VisibilityReport {
        key: best.key.clone(),
        is_viewable: true,
        visible_fraction: best.visible_fraction,
    })
}

/// Visible fraction of every item intersecting the viewport, for a list of
/// fixed-height rows.
pub fn measure_fixed_layout(
    store: &DescriptorStore,
    scroll_offset: f32,
    viewport_height: f32,
    item_extent: f32,
) -> Vec<VisibilityMeasurement> {
    if store.is_empty() || !(viewport_height > 0.0) || !(item_extent > 0.0) {
        return Vec::new();
    }

    let viewport_top = scroll_offset.max(0.0);
    let viewport_bottom = viewport_top + viewport_height;
    let first = (viewport_top / item_extent).floor() as usize;
    let last = ((viewport_bottom / item_extent).ceil() as usize).min(store.len());

    (first..last)
        .filter_map(|index| {
            let top = index as f32 * item_extent;
            let bottom = top + item_extent;
            let visible = bottom.min(viewport_bottom) - top.max(viewport_top);
            if visible <= 0.0 {
                return None;
            }
            let key = store.key_at(index)?;
            Some(VisibilityMeasurement::new(key, (visible / item_extent).min(1.0)))
        })
        .collect()
}

/// Turns layout updates into at most one report each, staying quiet when
/// nothing moved.
#[derive(Debug, Clone)]
pub struct VisibilityTracker {
    threshold: f32,
    last: Vec<VisibilityMeasurement>,
}

impl VisibilityTracker {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            last: Vec::new(),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn on_layout(
        &mut self,
        mut measurements: Vec<VisibilityMeasurement>,
        active: Option<&ItemKey>,
    ) -> Option<VisibilityReport> {
        measurements.sort_by(|a, b| a.key.cmp(&b.key));

        if Self::unchanged(&self.last, &measurements) {
            return None;
        }
        self.last = measurements;

        let report = select_most_visible(&self.last, self.threshold, active);
        if let Some(ref report) = report {
            log::debug!(
                "Most visible item {} ({:.0}%)",
                report.key,
                report.visible_fraction * 100.0
            );
        }
        report
    }

    fn unchanged(previous: &[VisibilityMeasurement], next: &[VisibilityMeasurement]) -> bool {
        previous.len() == next.len()
            && previous.iter().zip(next).all(|(a, b)| {
                a.key == b.key && (a.visible_fraction - b.visible_fraction).abs() <= FRACTION_EPSILON
            })
    }
}
