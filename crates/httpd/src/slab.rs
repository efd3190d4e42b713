//! Arena of live sessions, indexed by a stable integer handle so the
//! tagged `user_data` token never needs to carry a pointer.

use crate::session::Session;

pub struct SessionSlab {
    slots: Vec<Option<Session>>,
    free: Vec<usize>,
}

impl SessionSlab {
    pub fn new(capacity: usize) -> Self {
        let mut slots: Vec<Option<Session>> = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        let free: Vec<usize> = (0..capacity).rev().collect();
        Self { slots, free }
    }

    /// Inserts `session`, returning its slot index, or `None` if the
    /// slab is at capacity.
    pub fn insert(&mut self, session: Session) -> Option<usize> {
        let idx = self.free.pop()?;
        self.slots[idx] = Some(session);
        Some(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut Session> {
        self.slots.get_mut(idx).and_then(|s| s.as_mut())
    }

    /// Drops the session at `idx`, closing its fd, and returns the slot
    /// to the free list.
    pub fn remove(&mut self, idx: usize) {
        if self.slots[idx].take().is_some() {
            self.free.push(idx);
        }
    }

    pub fn active(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_remove_recycle_slots() {
        let mut slab = SessionSlab::new(2);
        let fd = || ringcore::fd::OwnedFd::from_raw(ringcore::fd::OwnedFd::NONE);
        let router = std::rc::Rc::new(crate::router::Router::new());
        let a = slab.insert(Session::new(fd(), router.clone(), 8192)).unwrap();
        let b = slab.insert(Session::new(fd(), router.clone(), 8192)).unwrap();
        assert_eq!(slab.active(), 2);
        assert!(slab.insert(Session::new(fd(), router.clone(), 8192)).is_none());

        slab.remove(a);
        assert_eq!(slab.active(), 1);
        let c = slab.insert(Session::new(fd(), router.clone(), 8192)).unwrap();
        assert_eq!(c, a);
        let _ = b;
    }

    #[test]
    fn get_mut_on_empty_slot_is_none() {
        let mut slab = SessionSlab::new(1);
        assert!(slab.get_mut(0).is_none());
    }
}
