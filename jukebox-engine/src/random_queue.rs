//! Random queue
//!
//! A ring of catalog indices shuffled once at startup. Playing the front
//! track rotates it to the back, so the ring cycles through every eligible
//! track in the same order forever. The ring lives only in memory and is
//! reshuffled on every start.

use crate::catalog::Catalog;
use crate::genre::GenreFilter;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::VecDeque;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RandomQueue {
    ring: VecDeque<usize>,
}

impl RandomQueue {
    /// Shuffle every track the filter admits
    pub fn build<R: Rng + ?Sized>(catalog: &Catalog, filter: &GenreFilter, rng: &mut R) -> Self {
        let mut order: Vec<usize> = catalog
            .iter()
            .filter(|t| filter.eligible(t))
            .map(|t| t.index)
            .collect();
        order.shuffle(rng);
        Self::from_order(order)
    }

    /// Ring with a fixed order
    pub fn from_order(order: Vec<usize>) -> Self {
        Self { ring: order.into() }
    }

    pub fn front(&self) -> Option<usize> {
        self.ring.front().copied()
    }

    /// Move the front index to the back
    pub fn rotate(&mut self) {
        if let Some(index) = self.ring.pop_front() {
            self.ring.push_back(index);
        }
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Current order, front first
    pub fn order(&self) -> Vec<usize> {
        self.ring.iter().copied().collect()
    }
}
