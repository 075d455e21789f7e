//! Object pooling, named in spec §5 as a design pattern shared with the
//! [`crate::deadline::Deadline`] view (a single mutable record reused
//! across invocations instead of allocated per call) but used elsewhere by
//! external collaborators this crate does not implement — e.g. a
//! children-traversal helper that hands out a fixed-size pool of mutable
//! traversal-context records.
//!
//! This crate has no such collaborator, so there is nothing here to build.
//! [`Pool`] exists only so the pattern has one obvious place to live if an
//! embedding host wants to reuse it for its own per-operation contexts,
//! matching the cap (10) spec §5 describes.

/// A fixed-capacity stack of reusable `T`s. `acquire` pops the most
/// recently released item (or builds a fresh one once the pool is empty);
/// `release` clears it via `Resettable::reset` and pushes it back, unless
/// the pool is already at capacity, in which case the item is simply
/// dropped.
pub struct Pool<T> {
    items: Vec<T>,
    capacity: usize,
}

/// Implemented by pooled record types so [`Pool::release`] can clear
/// stale fields before the item is handed out again.
pub trait Resettable {
    fn reset(&mut self);
}

impl<T: Default + Resettable> Pool<T> {
    pub fn new(capacity: usize) -> Self {
        Self { items: Vec::with_capacity(capacity), capacity }
    }

    pub fn acquire(&mut self) -> T {
        self.items.pop().unwrap_or_default()
    }

    pub fn release(&mut self, mut item: T) {
        if self.items.len() >= self.capacity {
            return;
        }
        item.reset();
        self.items.push(item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Scratch {
        value: u32,
    }

    impl Resettable for Scratch {
        fn reset(&mut self) {
            self.value = 0;
        }
    }

    #[test]
    fn release_clears_fields_before_reuse() {
        let mut pool: Pool<Scratch> = Pool::new(10);
        let mut scratch = pool.acquire();
        scratch.value = 42;
        pool.release(scratch);
        let reused = pool.acquire();
        assert_eq!(reused.value, 0);
    }

    #[test]
    fn release_past_capacity_drops_the_item() {
        let mut pool: Pool<Scratch> = Pool::new(1);
        pool.release(Scratch { value: 1 });
        pool.release(Scratch { value: 2 });
        assert_eq!(pool.items.len(), 1);
    }
}
