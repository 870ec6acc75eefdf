use crate::detection::domain::detection::{Detection, DetectionSet};
use crate::shared::constants::{DEFAULT_GROUP_OVERLAP, DEFAULT_MIN_NEIGHBORS, NESTED_MARGIN_FRACTION};
use crate::shared::region::Region;

/// Clusters raw positive windows into one detection per physical object.
///
/// Windows are visited in insertion order; each joins the first group whose
/// current mean box overlaps it by at least `overlap_threshold` IoU, so ties
/// go to the earliest group. Groups with fewer than `min_neighbors` members
/// are dropped as spurious. Surviving boxes that sit inside a better
/// supported box are suppressed.
pub struct WindowGrouper {
    overlap_threshold: f64,
    min_neighbors: usize,
}

struct Group {
    sum_x: i64,
    sum_y: i64,
    sum_w: i64,
    sum_h: i64,
    count: usize,
}

impl Group {
    fn new(r: &Region) -> Self {
        Self {
            sum_x: r.x as i64,
            sum_y: r.y as i64,
            sum_w: r.width as i64,
            sum_h: r.height as i64,
            count: 1,
        }
    }

    fn push(&mut self, r: &Region) {
        self.sum_x += r.x as i64;
        self.sum_y += r.y as i64;
        self.sum_w += r.width as i64;
        self.sum_h += r.height as i64;
        self.count += 1;
    }

    fn mean(&self) -> Region {
        let n = self.count as f64;
        let avg = |s: i64| (s as f64 / n).round() as i32;
        Region::new(avg(self.sum_x), avg(self.sum_y), avg(self.sum_w), avg(self.sum_h))
    }
}

impl WindowGrouper {
    pub fn new(overlap_threshold: f64, min_neighbors: usize) -> Self {
        Self {
            overlap_threshold,
            min_neighbors,
        }
    }

    pub fn group(&self, candidates: &[Region]) -> DetectionSet {
        if candidates.is_empty() {
            return Vec::new();
        }

        let mut groups: Vec<Group> = Vec::new();
        for c in candidates {
            match groups
                .iter_mut()
                .find(|g| c.iou(&g.mean()) >= self.overlap_threshold)
            {
                Some(g) => g.push(c),
                None => groups.push(Group::new(c)),
            }
        }

        let kept: Vec<Detection> = groups
            .iter()
            .filter(|g| g.count >= self.min_neighbors)
            .map(|g| Detection {
                region: g.mean(),
                neighbors: g.count,
            })
            .filter(|d| d.region.width > 0 && d.region.height > 0)
            .collect();

        suppress_nested(&kept)
    }
}

impl Default for WindowGrouper {
    fn default() -> Self {
        Self::new(DEFAULT_GROUP_OVERLAP, DEFAULT_MIN_NEIGHBORS)
    }
}

/// Drops a detection lying inside another one when the outer box has more
/// than `max(3, n)` votes, or when the inner box itself has fewer than 3.
fn suppress_nested(detections: &[Detection]) -> DetectionSet {
    detections
        .iter()
        .enumerate()
        .filter(|(i, inner)| {
            !detections.iter().enumerate().any(|(j, outer)| {
                if *i == j {
                    return false;
                }
                let dx = (outer.region.width as f64 * NESTED_MARGIN_FRACTION).round() as i32;
                let dy = (outer.region.height as f64 * NESTED_MARGIN_FRACTION).round() as i32;
                inner.region.is_inside(&outer.region, dx, dy)
                    && (outer.neighbors > inner.neighbors.max(3) || inner.neighbors < 3)
            })
        })
        .map(|(_, d)| *d)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(x: i32, y: i32, w: i32, h: i32) -> Region {
        Region::new(x, y, w, h)
    }

    #[test]
    fn test_empty_input() {
        assert!(WindowGrouper::default().group(&[]).is_empty());
    }

    #[test]
    fn test_single_window_discarded_with_default_min_neighbors() {
        let result = WindowGrouper::default().group(&[region(10, 10, 50, 50)]);
        assert!(result.is_empty());
    }

    #[test]
    fn test_two_disjoint_windows_each_lack_corroboration() {
        let candidates = [region(0, 0, 40, 40), region(200, 200, 40, 40)];
        assert!(WindowGrouper::default().group(&candidates).is_empty());
    }

    #[test]
    fn test_two_weakly_overlapping_windows_discarded() {
        // IoU 0.33 is below the default grouping threshold, so each window
        // forms its own single-member group.
        let candidates = [region(0, 0, 100, 100), region(50, 0, 100, 100)];
        assert!(WindowGrouper::default().group(&candidates).is_empty());
    }

    #[test]
    fn test_overlapping_windows_merge_into_mean_box() {
        let candidates = [
            region(100, 100, 80, 80),
            region(104, 104, 80, 80),
            region(96, 100, 88, 88),
        ];
        let result = WindowGrouper::default().group(&candidates);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].neighbors, 3);
        assert_eq!(result[0].region, region(100, 101, 83, 83));
    }

    #[test]
    fn test_min_neighbors_one_keeps_singletons() {
        let grouper = WindowGrouper::new(0.5, 1);
        let result = grouper.group(&[region(0, 0, 40, 40), region(200, 200, 40, 40)]);
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|d| d.neighbors == 1));
    }

    #[test]
    fn test_first_seen_group_wins_ties() {
        // The middle window overlaps both seeds equally; it joins the first.
        let grouper = WindowGrouper::new(0.3, 1);
        let candidates = [
            region(0, 0, 100, 100),
            region(60, 0, 100, 100),
            region(30, 0, 100, 100),
        ];
        let result = grouper.group(&candidates);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].neighbors, 2);
        assert_eq!(result[1].neighbors, 1);
    }

    #[test]
    fn test_nested_weak_group_suppressed() {
        let grouper = WindowGrouper::new(0.5, 2);
        let candidates = [
            // big group, 4 votes
            region(100, 100, 100, 100),
            region(102, 102, 100, 100),
            region(98, 98, 100, 100),
            region(100, 100, 104, 104),
            // small group inside it, 2 votes
            region(130, 130, 30, 30),
            region(131, 131, 30, 30),
        ];
        let result = grouper.group(&candidates);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].neighbors, 4);
    }

    #[test]
    fn test_separate_objects_both_reported() {
        let candidates = [
            region(10, 10, 40, 40),
            region(12, 12, 40, 40),
            region(300, 200, 60, 60),
            region(303, 203, 60, 60),
        ];
        let result = WindowGrouper::default().group(&candidates);
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|d| d.region.width > 0 && d.region.height > 0));
    }
}
