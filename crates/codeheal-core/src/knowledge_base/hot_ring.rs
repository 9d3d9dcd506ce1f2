//! `HotRing`: a bounded in-memory cache of the most recently successful
//! patterns, checked before any cold-tier query.

use std::collections::VecDeque;

use super::pattern::SuccessPattern;

/// A fixed-capacity ring buffer, newest-first. Pushing past capacity evicts
/// the oldest entry.
#[derive(Debug)]
pub struct HotRing {
    capacity: usize,
    entries: VecDeque<SuccessPattern>,
}

impl HotRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn push(&mut self, pattern: SuccessPattern) {
        self.entries.push_front(pattern);
        while self.entries.len() > self.capacity {
            self.entries.pop_back();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn by_cluster(&self, cluster_id: &str) -> Vec<SuccessPattern> {
        self.entries
            .iter()
            .filter(|p| p.cluster_id.as_deref() == Some(cluster_id))
            .cloned()
            .collect()
    }

    pub fn by_error_code(&self, error_code: &str) -> Vec<SuccessPattern> {
        self.entries
            .iter()
            .filter(|p| p.error_code == error_code)
            .cloned()
            .collect()
    }

    pub fn by_family(&self, family: &str) -> Vec<SuccessPattern> {
        self.entries
            .iter()
            .filter(|p| p.family == family)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(id: &str) -> SuccessPattern {
        SuccessPattern::new(
            id,
            "SYN001",
            Some("SYN001:foo".to_string()),
            "syntax",
            "x",
            "diff",
            0.9,
        )
    }

    #[test]
    fn test_push_evicts_oldest_past_capacity() {
        let mut ring = HotRing::new(2);
        ring.push(pattern("p1"));
        ring.push(pattern("p2"));
        ring.push(pattern("p3"));
        assert_eq!(ring.len(), 2);
        assert!(ring.by_cluster("SYN001:foo").iter().all(|p| p.pattern_id != "p1"));
    }

    #[test]
    fn test_by_error_code_filters() {
        let mut ring = HotRing::new(5);
        ring.push(pattern("p1"));
        let mut other = pattern("p2");
        other.error_code = "RES001".to_string();
        ring.push(other);
        assert_eq!(ring.by_error_code("SYN001").len(), 1);
    }

    #[test]
    fn test_empty_ring_has_no_hits() {
        let ring = HotRing::new(5);
        assert!(ring.is_empty());
        assert!(ring.by_family("syntax").is_empty());
    }
}
