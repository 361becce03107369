//! Assignment of visible overlays to the 16 overlay groups of a
//! presentation state

use crate::dicom::tags::MAX_OVERLAY_GROUPS;
use crate::types::OverlayPlaneSource;
use std::collections::VecDeque;

const SLOTS: usize = MAX_OVERLAY_GROUPS as usize;

/// An overlay competing for a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotCandidate<K> {
    /// Caller's key for the overlay
    pub key: K,
    pub source: OverlayPlaneSource,
    /// Group the overlay was read from, if any
    pub index: Option<u8>,
}

/// Result of placing overlays into groups
#[derive(Debug, Clone)]
pub struct OverlaySlotMap<K> {
    slots: [Option<SlotCandidate<K>>; SLOTS],
    dropped: Vec<SlotCandidate<K>>,
}

impl<K: Copy> OverlaySlotMap<K> {
    /// Places overlays into groups
    ///
    /// Overlays not read from the image header are queued first. Image
    /// overlays keep their own group when it is free and are queued behind
    /// the others otherwise. Queued overlays then fill the free groups in
    /// ascending order; whatever is left is dropped.
    pub fn assign(candidates: &[SlotCandidate<K>]) -> Self {
        let mut slots: [Option<SlotCandidate<K>>; SLOTS] = [None; SLOTS];
        let mut queue: VecDeque<SlotCandidate<K>> = candidates
            .iter()
            .filter(|c| c.source != OverlayPlaneSource::Image)
            .copied()
            .collect();

        for candidate in candidates
            .iter()
            .filter(|c| c.source == OverlayPlaneSource::Image)
        {
            match candidate.index.map(usize::from).filter(|&n| n < SLOTS) {
                Some(n) if slots[n].is_none() => slots[n] = Some(*candidate),
                _ => queue.push_back(*candidate),
            }
        }

        for slot in slots.iter_mut().filter(|s| s.is_none()) {
            match queue.pop_front() {
                Some(candidate) => *slot = Some(candidate),
                None => break,
            }
        }

        Self {
            slots,
            dropped: queue.into_iter().collect(),
        }
    }

    pub fn get(&self, n: u8) -> Option<&SlotCandidate<K>> {
        self.slots.get(n as usize).and_then(Option::as_ref)
    }

    /// Occupied groups in ascending order
    pub fn iter(&self) -> impl Iterator<Item = (u8, &SlotCandidate<K>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(n, s)| s.as_ref().map(|c| (n as u8, c)))
    }

    pub fn assigned_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Overlays that found no free group
    pub fn dropped(&self) -> &[SlotCandidate<K>] {
        &self.dropped
    }

    /// Returns whether group `n` has to carry overlay data in the
    /// presentation state
    ///
    /// An image overlay left in its own group is already in the image header.
    pub fn needs_encoding(&self, n: u8) -> bool {
        self.get(n)
            .is_some_and(|c| c.source != OverlayPlaneSource::Image || c.index != Some(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn image(key: u32, index: u8) -> SlotCandidate<u32> {
        SlotCandidate {
            key,
            source: OverlayPlaneSource::Image,
            index: Some(index),
        }
    }

    fn user(key: u32) -> SlotCandidate<u32> {
        SlotCandidate {
            key,
            source: OverlayPlaneSource::User,
            index: None,
        }
    }

    #[test]
    fn test_image_overlays_keep_their_group() {
        let map = OverlaySlotMap::assign(&[image(1, 3), image(2, 7)]);
        assert_eq!(map.get(3).map(|c| c.key), Some(1));
        assert_eq!(map.get(7).map(|c| c.key), Some(2));
        assert!(!map.needs_encoding(3));
        assert!(!map.needs_encoding(7));
        assert!(map.dropped().is_empty());
    }

    #[test]
    fn test_user_overlays_fill_free_groups_in_order() {
        let map = OverlaySlotMap::assign(&[image(1, 0), user(10), user(11)]);
        assert_eq!(map.get(0).map(|c| c.key), Some(1));
        assert_eq!(map.get(1).map(|c| c.key), Some(10));
        assert_eq!(map.get(2).map(|c| c.key), Some(11));
        assert!(map.needs_encoding(1));
    }

    #[test]
    fn test_colliding_image_overlays_are_moved() {
        // two images share group 0
        let map = OverlaySlotMap::assign(&[image(1, 0), image(2, 0)]);
        assert_eq!(map.get(0).map(|c| c.key), Some(1));
        assert_eq!(map.get(1).map(|c| c.key), Some(2));
        assert!(!map.needs_encoding(0));
        assert!(map.needs_encoding(1));
    }

    #[test]
    fn test_twenty_overlays_keep_sixteen() {
        let mut candidates: Vec<_> = (0..4).map(|n| image(n as u32, n)).collect();
        candidates.extend((100..116).map(user));

        let map = OverlaySlotMap::assign(&candidates);
        assert_eq!(map.assigned_count(), 16);
        assert_eq!(map.dropped().len(), 4);

        let placed: Vec<u32> = map.iter().map(|(_, c)| c.key).collect();
        let unique: HashSet<_> = placed.iter().collect();
        assert_eq!(unique.len(), 16);

        // image overlays hold their own groups, queued overlays fill the rest
        // in queue order and the tail of the queue is dropped
        for n in 0..4u8 {
            assert_eq!(map.get(n).map(|c| c.key), Some(n as u32));
        }
        assert_eq!(map.get(4).map(|c| c.key), Some(100));
        assert_eq!(map.get(15).map(|c| c.key), Some(111));
        let dropped: Vec<u32> = map.dropped().iter().map(|c| c.key).collect();
        assert_eq!(dropped, vec![112, 113, 114, 115]);
    }

    #[test]
    fn test_displaced_image_overlays_queue_behind_others() {
        let mut candidates: Vec<_> = (100..116).map(user).collect();
        candidates.push(image(1, 0));
        // group 0 is free when image overlays are placed, so it stays
        let map = OverlaySlotMap::assign(&candidates);
        assert_eq!(map.get(0).map(|c| c.key), Some(1));
        assert_eq!(map.dropped().len(), 1);
        assert_eq!(map.dropped()[0].key, 115);

        let mut candidates: Vec<_> = (100..116).map(user).collect();
        candidates.extend([image(1, 0), image(2, 0)]);
        let map = OverlaySlotMap::assign(&candidates);
        let dropped: Vec<u32> = map.dropped().iter().map(|c| c.key).collect();
        assert_eq!(dropped, vec![115, 2]);
    }

    #[test]
    fn test_empty_input() {
        let map: OverlaySlotMap<u32> = OverlaySlotMap::assign(&[]);
        assert_eq!(map.assigned_count(), 0);
        assert!(!map.needs_encoding(0));
    }
}
