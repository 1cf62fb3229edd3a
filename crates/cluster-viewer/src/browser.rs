//! Cluster grouping and cyclic navigation over loaded meshes.
//!
//! Meshes live in one owning arena; clusters and the current selection hold
//! integer indices into it, so rebuilding or navigating never invalidates
//! anything. Generic over the mesh payload so navigation is testable
//! without a GPU device.

/// Cluster key: the file stem up to the first `_`. Files whose stem has no
/// underscore form their own cluster.
pub fn cluster_key(file_name: &str) -> &str {
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);
    stem.split('_').next().unwrap_or(stem)
}

/// Ordered group of meshes sharing one key.
struct Cluster {
    key: String,
    /// Arena indices, in file-encounter order.
    members: Vec<usize>,
}

/// Selection position for display purposes. All indices are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionInfo {
    pub cluster_key: String,
    pub cluster_index: usize,
    pub cluster_count: usize,
    pub member_index: usize,
    pub member_count: usize,
}

pub struct ClusterBrowser<M> {
    meshes: Vec<M>,
    clusters: Vec<Cluster>,
    cluster_idx: usize,
    member_idx: usize,
}

impl<M> ClusterBrowser<M> {
    pub fn new() -> Self {
        Self {
            meshes: Vec::new(),
            clusters: Vec::new(),
            cluster_idx: 0,
            member_idx: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Groups `entries` (file name, mesh) into clusters, preserving
    /// first-seen order for clusters and file order within each cluster.
    /// Selection moves to the first mesh of the first cluster.
    ///
    /// The arena must have been drained first; old meshes are never mixed
    /// into a new grouping.
    pub fn rebuild(&mut self, entries: Vec<(String, M)>) {
        debug_assert!(self.meshes.is_empty(), "rebuild without drain");

        for (name, mesh) in entries {
            let key = cluster_key(&name);
            let index = self.meshes.len();
            self.meshes.push(mesh);

            match self.clusters.iter_mut().find(|c| c.key == key) {
                Some(cluster) => cluster.members.push(index),
                None => self.clusters.push(Cluster {
                    key: key.to_string(),
                    members: vec![index],
                }),
            }
        }

        self.cluster_idx = 0;
        self.member_idx = 0;
    }

    /// Empties the arena and clears the grouping, handing the meshes back
    /// so the caller can release their resources.
    pub fn drain(&mut self) -> Vec<M> {
        self.clusters.clear();
        self.cluster_idx = 0;
        self.member_idx = 0;
        std::mem::take(&mut self.meshes)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut M> {
        self.meshes.iter_mut()
    }

    pub fn selected(&self) -> Option<&M> {
        let cluster = self.clusters.get(self.cluster_idx)?;
        cluster.members.get(self.member_idx).map(|&i| &self.meshes[i])
    }

    pub fn selection_info(&self) -> Option<SelectionInfo> {
        let cluster = self.clusters.get(self.cluster_idx)?;
        Some(SelectionInfo {
            cluster_key: cluster.key.clone(),
            cluster_index: self.cluster_idx + 1,
            cluster_count: self.clusters.len(),
            member_index: self.member_idx + 1,
            member_count: cluster.members.len(),
        })
    }

    /// Cyclic advance within the current cluster. Returns whether the
    /// selection changed.
    pub fn next_in_cluster(&mut self) -> bool {
        self.step_member(1)
    }

    pub fn prev_in_cluster(&mut self) -> bool {
        self.step_member(-1)
    }

    /// Cyclic advance across clusters, landing on the new cluster's first
    /// mesh. A no-op with fewer than two clusters.
    pub fn next_cluster(&mut self) -> bool {
        self.step_cluster(1)
    }

    pub fn prev_cluster(&mut self) -> bool {
        self.step_cluster(-1)
    }

    fn step_member(&mut self, step: isize) -> bool {
        let Some(cluster) = self.clusters.get(self.cluster_idx) else {
            return false;
        };

        let len = cluster.members.len();
        let next = (self.member_idx as isize + step).rem_euclid(len as isize) as usize;
        let changed = next != self.member_idx;
        self.member_idx = next;
        changed
    }

    fn step_cluster(&mut self, step: isize) -> bool {
        let len = self.clusters.len();
        if len < 2 {
            return false;
        }

        self.cluster_idx = (self.cluster_idx as isize + step).rem_euclid(len as isize) as usize;
        self.member_idx = 0;
        true
    }
}

impl<M> Default for ClusterBrowser<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn browser(names: &[&str]) -> ClusterBrowser<String> {
        let mut browser = ClusterBrowser::new();
        browser.rebuild(
            names
                .iter()
                .map(|n| (n.to_string(), n.to_string()))
                .collect(),
        );
        browser
    }

    #[test]
    fn keys_come_from_the_stem_before_the_first_underscore() {
        assert_eq!(cluster_key("03_a.obj"), "03");
        assert_eq!(cluster_key("0003_synth__group_opt.obj"), "0003");
        assert_eq!(cluster_key("plain.obj"), "plain");
        assert_eq!(cluster_key("noext"), "noext");
    }

    #[test]
    fn grouping_preserves_first_seen_order() {
        let b = browser(&["03_a.obj", "03_b.obj", "07_x.obj"]);

        assert_eq!(b.cluster_count(), 2);
        assert_eq!(b.mesh_count(), 3);

        let info = b.selection_info().unwrap();
        assert_eq!(info.cluster_key, "03");
        assert_eq!(info.member_count, 2);
        assert_eq!(b.selected(), Some(&"03_a.obj".to_string()));
    }

    #[test]
    fn in_cluster_navigation_is_cyclic() {
        let mut b = browser(&["03_a.obj", "03_b.obj", "03_c.obj", "07_x.obj"]);

        // len(cluster) advances return to the original selection.
        let start = b.selected().cloned();
        for _ in 0..3 {
            b.next_in_cluster();
        }
        assert_eq!(b.selected().cloned(), start);

        assert!(b.prev_in_cluster());
        assert_eq!(b.selected(), Some(&"03_c.obj".to_string()));
    }

    #[test]
    fn cluster_navigation_is_cyclic_and_resets_the_member() {
        let mut b = browser(&["03_a.obj", "03_b.obj", "07_x.obj", "11_q.obj"]);

        b.next_in_cluster();
        assert_eq!(b.selected(), Some(&"03_b.obj".to_string()));

        assert!(b.next_cluster());
        assert_eq!(b.selected(), Some(&"07_x.obj".to_string()));

        // Full cycle across the cluster list.
        b.next_cluster();
        b.next_cluster();
        assert_eq!(b.selected(), Some(&"03_a.obj".to_string()));

        assert!(b.prev_cluster());
        assert_eq!(b.selected(), Some(&"11_q.obj".to_string()));
    }

    #[test]
    fn single_cluster_set_ignores_cluster_switches() {
        let mut b = browser(&["A_0.obj"]);

        assert!(!b.next_cluster());
        assert!(!b.prev_cluster());
        assert_eq!(b.selected(), Some(&"A_0.obj".to_string()));

        // A single-mesh cluster also has nowhere to go.
        assert!(!b.next_in_cluster());
    }

    #[test]
    fn empty_browser_is_all_no_ops() {
        let mut b: ClusterBrowser<String> = ClusterBrowser::new();

        assert!(!b.next_in_cluster());
        assert!(!b.prev_in_cluster());
        assert!(!b.next_cluster());
        assert!(!b.prev_cluster());
        assert_eq!(b.selected(), None);
        assert_eq!(b.selection_info(), None);
    }

    #[test]
    fn drain_hands_back_the_arena_and_clears_selection() {
        let mut b = browser(&["03_a.obj", "07_x.obj"]);

        let drained = b.drain();
        assert_eq!(drained.len(), 2);
        assert!(b.is_empty());
        assert_eq!(b.selected(), None);

        // A fresh rebuild starts over cleanly.
        b.rebuild(vec![("09_z.obj".to_string(), "09_z.obj".to_string())]);
        assert_eq!(b.selected(), Some(&"09_z.obj".to_string()));
    }
}
