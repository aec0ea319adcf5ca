//! Two-cluster point container for two-finger gestures.

use heapless::Vec;
use log::trace;

use crate::config::{DEFAULT_MAX_POINTS_PER_CLUSTER, DEFAULT_MIN_POINTS_DISTANCE_PX};
use crate::types::{distance, ScreenPosition, TouchId, TouchPoint};

/// Cluster slots in the two-finger model.
pub(crate) const MAX_CLUSTERS: usize = 2;
/// Member snapshots one cluster can hold; further contacts are ignored the
/// same way a third cluster would be.
pub(crate) const MAX_CLUSTER_MEMBERS: usize = 8;

#[derive(Clone, Debug)]
struct Cluster {
    members: Vec<TouchPoint, MAX_CLUSTER_MEMBERS>,
    centroid: ScreenPosition,
    previous_centroid: ScreenPosition,
    dirty: bool,
}

impl Cluster {
    fn with_point(point: TouchPoint) -> Self {
        let mut members = Vec::new();
        let _ = members.push(point);
        Self {
            members,
            centroid: point.position,
            previous_centroid: point.previous_position,
            dirty: false,
        }
    }

    fn refresh(&mut self) {
        if !self.dirty {
            return;
        }
        self.centroid = mean(self.members.iter().map(|member| member.position));
        self.previous_centroid = mean(self.members.iter().map(|member| member.previous_position));
        self.dirty = false;
    }

    fn contains(&self, id: TouchId) -> bool {
        self.members.iter().any(|member| member.id == id)
    }

    fn update_member(&mut self, point: TouchPoint) {
        if let Some(member) = self.members.iter_mut().find(|member| member.id == point.id) {
            *member = point;
        }
    }

    fn has_room(&self, max_members: usize) -> bool {
        self.members.len() < max_members.min(MAX_CLUSTER_MEMBERS)
    }
}

/// Container for the zero-to-two point clusters of a two-finger gesture.
/// Occupied slots stay compact: a surviving cluster is always reachable at
/// index 0. Centroids are cached and recomputed lazily on read.
#[derive(Clone, Debug)]
pub struct Clusters {
    clusters: Vec<Cluster, MAX_CLUSTERS>,
    min_points_distance: f32,
    max_points_per_cluster: usize,
}

impl Default for Clusters {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_POINTS_DISTANCE_PX, DEFAULT_MAX_POINTS_PER_CLUSTER)
    }
}

impl Clusters {
    /// `min_points_distance` is in pixels and clamps at zero;
    /// `max_points_per_cluster` clamps at one.
    pub fn new(min_points_distance: f32, max_points_per_cluster: usize) -> Self {
        Self {
            clusters: Vec::new(),
            min_points_distance: min_points_distance.max(0.0),
            max_points_per_cluster: max_points_per_cluster.max(1),
        }
    }

    /// Assigns new points in arrival order: the first cluster with member
    /// room takes each point, else a free slot opens, else the point is
    /// ignored. Already-registered ids refresh their snapshot instead.
    pub fn add_points(&mut self, points: &[TouchPoint]) {
        for &point in points {
            self.add_point(point);
        }
    }

    /// Refreshes member snapshots for moved points and marks their owners
    /// dirty. Unknown ids are ignored.
    pub fn update_points(&mut self, points: &[TouchPoint]) {
        for &point in points {
            if let Some(cluster) = self
                .clusters
                .iter_mut()
                .find(|cluster| cluster.contains(point.id))
            {
                cluster.update_member(point);
                cluster.dirty = true;
            }
        }
    }

    /// Removes points by id. A cluster left without members is destroyed and
    /// its slot freed; the survivor shifts to index 0.
    pub fn remove_points(&mut self, points: &[TouchPoint]) {
        for point in points {
            self.remove_point(point.id);
        }
    }

    pub fn remove_all_points(&mut self) {
        self.clusters.clear();
    }

    /// Marks every cluster dirty without touching membership, forcing a
    /// centroid recompute on the next read.
    pub fn invalidate(&mut self) {
        for cluster in &mut self.clusters {
            cluster.dirty = true;
        }
    }

    /// Current centroid of the cluster at `index`, recomputed if dirty.
    /// The index clamps to the occupied range; an empty container yields
    /// the origin.
    pub fn center_position(&mut self, index: usize) -> ScreenPosition {
        match self.cluster_at(index) {
            Some(cluster) => {
                cluster.refresh();
                cluster.centroid
            }
            None => ScreenPosition::default(),
        }
    }

    /// Centroid over the same members' prior-frame positions. Computed from
    /// the current member set, so points removed this frame never
    /// contribute stale data.
    pub fn previous_center_position(&mut self, index: usize) -> ScreenPosition {
        match self.cluster_at(index) {
            Some(cluster) => {
                cluster.refresh();
                cluster.previous_centroid
            }
            None => ScreenPosition::default(),
        }
    }

    /// True only when both slots are occupied and the centroids sit at least
    /// `min_points_distance` apart. Near-coincident contacts stay invisible
    /// so the scale ratio never divides by near-zero.
    pub fn has_clusters(&mut self) -> bool {
        if self.clusters.len() < MAX_CLUSTERS {
            return false;
        }
        for cluster in &mut self.clusters {
            cluster.refresh();
        }
        distance(self.clusters[0].centroid, self.clusters[1].centroid)
            >= self.min_points_distance
    }

    pub fn min_points_distance(&self) -> f32 {
        self.min_points_distance
    }

    /// Pixel threshold below which two centroids count as one noisy
    /// contact. Negative input clamps to zero.
    pub fn set_min_points_distance(&mut self, pixels: f32) {
        self.min_points_distance = pixels.max(0.0);
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    pub fn point_count(&self) -> usize {
        self.clusters
            .iter()
            .map(|cluster| cluster.members.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    fn add_point(&mut self, point: TouchPoint) {
        if let Some(cluster) = self
            .clusters
            .iter_mut()
            .find(|cluster| cluster.contains(point.id))
        {
            cluster.update_member(point);
            cluster.dirty = true;
            return;
        }

        match self.first_open_cluster() {
            Some(index) => {
                let cluster = &mut self.clusters[index];
                let _ = cluster.members.push(point);
                cluster.dirty = true;
            }
            None => {
                if self.clusters.len() < MAX_CLUSTERS {
                    trace!("cluster {} opens for touch {}", self.clusters.len(), point.id);
                    let _ = self.clusters.push(Cluster::with_point(point));
                }
                // Both slots full: the two-cluster model ignores the point.
            }
        }
    }

    fn remove_point(&mut self, id: TouchId) {
        let mut emptied = None;
        for (index, cluster) in self.clusters.iter_mut().enumerate() {
            if let Some(position) = cluster.members.iter().position(|member| member.id == id) {
                cluster.members.remove(position);
                cluster.dirty = true;
                if cluster.members.is_empty() {
                    emptied = Some(index);
                }
                break;
            }
        }
        if let Some(index) = emptied {
            trace!("cluster {index} emptied");
            self.clusters.remove(index);
        }
    }

    fn first_open_cluster(&self) -> Option<usize> {
        self.clusters
            .iter()
            .position(|cluster| cluster.has_room(self.max_points_per_cluster))
    }

    fn cluster_at(&mut self, index: usize) -> Option<&mut Cluster> {
        if self.clusters.is_empty() {
            return None;
        }
        let index = index.min(self.clusters.len() - 1);
        self.clusters.get_mut(index)
    }
}

fn mean(positions: impl Iterator<Item = ScreenPosition>) -> ScreenPosition {
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut count = 0usize;
    for position in positions {
        sum_x += position.x;
        sum_y += position.y;
        count += 1;
    }
    if count == 0 {
        return ScreenPosition::default();
    }
    ScreenPosition::new(sum_x / count as f32, sum_y / count as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: TouchId, x: f32, y: f32) -> TouchPoint {
        TouchPoint::new(id, ScreenPosition::new(x, y))
    }

    fn moved(id: TouchId, from: (f32, f32), to: (f32, f32)) -> TouchPoint {
        TouchPoint::new(id, ScreenPosition::new(from.0, from.1))
            .moved_to(ScreenPosition::new(to.0, to.1))
    }

    fn two_finger(min_distance: f32) -> Clusters {
        let mut clusters = Clusters::new(min_distance, 1);
        clusters.add_points(&[point(1, 0.0, 0.0), point(2, 100.0, 0.0)]);
        clusters
    }

    #[test]
    fn never_more_than_two_clusters() {
        let mut clusters = Clusters::new(10.0, 1);
        clusters.add_points(&[
            point(1, 0.0, 0.0),
            point(2, 100.0, 0.0),
            point(3, 50.0, 50.0),
            point(4, 200.0, 200.0),
        ]);

        assert_eq!(clusters.cluster_count(), 2);
        assert_eq!(clusters.point_count(), 2);
    }

    #[test]
    fn no_point_joins_two_clusters() {
        let mut clusters = Clusters::new(10.0, 1);
        clusters.add_points(&[point(1, 0.0, 0.0), point(2, 100.0, 0.0)]);
        // Same id arriving again must refresh, not re-register.
        clusters.add_points(&[point(1, 4.0, 0.0)]);

        assert_eq!(clusters.point_count(), 2);
        assert_eq!(clusters.center_position(0), ScreenPosition::new(4.0, 0.0));
        assert_eq!(clusters.center_position(1), ScreenPosition::new(100.0, 0.0));
    }

    #[test]
    fn has_clusters_needs_two_separated_clusters() {
        let mut clusters = Clusters::new(10.0, 1);
        assert!(!clusters.has_clusters());

        clusters.add_points(&[point(1, 0.0, 0.0)]);
        assert!(!clusters.has_clusters());

        clusters.add_points(&[point(2, 100.0, 0.0)]);
        assert!(clusters.has_clusters());
    }

    #[test]
    fn near_coincident_points_are_rejected() {
        let mut clusters = Clusters::new(10.0, 1);
        clusters.add_points(&[point(1, 0.0, 0.0), point(2, 5.0, 0.0)]);

        assert_eq!(clusters.cluster_count(), 2);
        assert!(!clusters.has_clusters());
    }

    #[test]
    fn separation_threshold_is_inclusive() {
        let mut clusters = Clusters::new(10.0, 1);
        clusters.add_points(&[point(1, 0.0, 0.0), point(2, 10.0, 0.0)]);

        assert!(clusters.has_clusters());
    }

    #[test]
    fn centroid_is_mean_of_members() {
        let mut clusters = Clusters::new(10.0, 2);
        clusters.add_points(&[point(1, 0.0, 0.0), point(2, 10.0, 10.0)]);

        assert_eq!(clusters.center_position(0), ScreenPosition::new(5.0, 5.0));
    }

    #[test]
    fn invalidate_is_idempotent_on_read() {
        let mut clusters = two_finger(10.0);
        for _ in 0..5 {
            clusters.invalidate();
        }

        assert_eq!(clusters.center_position(0), ScreenPosition::new(0.0, 0.0));
        assert_eq!(clusters.center_position(1), ScreenPosition::new(100.0, 0.0));
    }

    #[test]
    fn moved_points_shift_both_centroids() {
        let mut clusters = two_finger(10.0);
        clusters.update_points(&[moved(2, (100.0, 0.0), (200.0, 0.0))]);

        assert_eq!(clusters.center_position(1), ScreenPosition::new(200.0, 0.0));
        assert_eq!(
            clusters.previous_center_position(1),
            ScreenPosition::new(100.0, 0.0)
        );
        assert_eq!(
            clusters.previous_center_position(0),
            ScreenPosition::new(0.0, 0.0)
        );
    }

    #[test]
    fn points_fill_the_first_open_cluster() {
        let mut clusters = Clusters::new(10.0, 2);
        clusters.add_points(&[point(1, 0.0, 0.0), point(2, 100.0, 0.0)]);
        assert_eq!(clusters.cluster_count(), 1);
        assert_eq!(clusters.center_position(0), ScreenPosition::new(50.0, 0.0));

        // The first slot is full, so the next arrival opens the second.
        clusters.add_points(&[point(3, 90.0, 0.0)]);
        assert_eq!(clusters.cluster_count(), 2);
        assert_eq!(clusters.point_count(), 3);
        assert_eq!(clusters.center_position(1), ScreenPosition::new(90.0, 0.0));
    }

    #[test]
    fn full_clusters_ignore_excess_points() {
        let mut clusters = Clusters::new(10.0, 2);
        clusters.add_points(&[
            point(1, 0.0, 0.0),
            point(2, 4.0, 0.0),
            point(3, 100.0, 0.0),
            point(4, 104.0, 0.0),
            point(5, 50.0, 0.0),
        ]);

        assert_eq!(clusters.cluster_count(), 2);
        assert_eq!(clusters.point_count(), 4);
    }

    #[test]
    fn emptied_cluster_frees_its_slot() {
        let mut clusters = two_finger(10.0);
        clusters.remove_points(&[point(1, 0.0, 0.0)]);

        assert_eq!(clusters.cluster_count(), 1);
        assert!(!clusters.has_clusters());
        // Survivor compacts down to index 0.
        assert_eq!(clusters.center_position(0), ScreenPosition::new(100.0, 0.0));

        clusters.remove_points(&[point(2, 100.0, 0.0)]);
        assert!(clusters.is_empty());
        assert_eq!(clusters.point_count(), 0);
    }

    #[test]
    fn partial_removal_recomputes_survivor_centroid() {
        let mut clusters = Clusters::new(10.0, 2);
        clusters.add_points(&[point(1, 0.0, 0.0), point(2, 10.0, 0.0)]);
        clusters.remove_points(&[point(1, 0.0, 0.0)]);

        assert_eq!(clusters.cluster_count(), 1);
        assert_eq!(clusters.center_position(0), ScreenPosition::new(10.0, 0.0));
    }

    #[test]
    fn remove_all_points_empties_the_container() {
        let mut clusters = two_finger(10.0);
        clusters.remove_all_points();

        assert!(clusters.is_empty());
        assert!(!clusters.has_clusters());
    }

    #[test]
    fn index_access_clamps_to_occupied_range() {
        let mut clusters = two_finger(10.0);
        assert_eq!(clusters.center_position(9), ScreenPosition::new(100.0, 0.0));

        clusters.remove_points(&[point(2, 100.0, 0.0)]);
        assert_eq!(clusters.center_position(1), ScreenPosition::new(0.0, 0.0));
    }

    #[test]
    fn empty_container_reads_as_origin() {
        let mut clusters = Clusters::new(10.0, 1);
        assert_eq!(clusters.center_position(0), ScreenPosition::default());
        assert_eq!(clusters.previous_center_position(1), ScreenPosition::default());
    }

    #[test]
    fn negative_threshold_clamps_to_zero() {
        let mut clusters = Clusters::new(10.0, 1);
        clusters.set_min_points_distance(-5.0);
        assert_eq!(clusters.min_points_distance(), 0.0);

        clusters.add_points(&[point(1, 0.0, 0.0), point(2, 1.0, 0.0)]);
        assert!(clusters.has_clusters());
    }

    #[test]
    fn unknown_move_and_remove_are_no_ops() {
        let mut clusters = two_finger(10.0);
        clusters.update_points(&[moved(9, (0.0, 0.0), (50.0, 50.0))]);
        clusters.remove_points(&[point(9, 50.0, 50.0)]);

        assert_eq!(clusters.cluster_count(), 2);
        assert_eq!(clusters.center_position(0), ScreenPosition::new(0.0, 0.0));
    }
}
