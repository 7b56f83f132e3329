// ============================================
// File: crates/meshwire-node/src/services/registry.rs
// ============================================
//! # Published-Actor Registry
//!
//! ## Creation Reason
//! Remote nodes reach an actor by connecting to the port it is published
//! on; the server handshake announces that actor and its interface.
//!
//! ## Main Functionality
//! - `PublishedActors`: At most one `PublishedActor` per port
//! - Removal by port, or by actor on one port or all ports (port 0)
//!
//! ## Last Modified
//! v0.1.0 - Initial registry

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use meshwire_common::types::ActorId;

/// Port value that matches every port in [`PublishedActors::remove_actor`].
pub const ANY_PORT: u16 = 0;

/// An actor reachable on a listening port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedActor {
    /// Published actor.
    pub actor: ActorId,
    /// Message signatures it accepts.
    pub interface: BTreeSet<String>,
}

/// Port to published actor mapping.
#[derive(Debug, Clone, Default)]
pub struct PublishedActors {
    entries: BTreeMap<u16, PublishedActor>,
}

impl PublishedActors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `actor` on `port`, returning the entry it replaced.
    pub fn add(
        &mut self,
        port: u16,
        actor: ActorId,
        interface: BTreeSet<String>,
    ) -> Option<PublishedActor> {
        let previous = self.entries.insert(port, PublishedActor { actor, interface });
        debug!(port, actor = %actor, replaced = previous.is_some(), "Actor published");
        previous
    }

    #[must_use]
    pub fn get(&self, port: u16) -> Option<&PublishedActor> {
        self.entries.get(&port)
    }

    /// Removes the entry on `port`; returns 1 if one existed, else 0.
    pub fn remove(&mut self, port: u16) -> usize {
        self.remove_with(port, |_, _| {})
    }

    /// Like [`PublishedActors::remove`], calling `on_removed` for the
    /// removed entry.
    pub fn remove_with<F>(&mut self, port: u16, mut on_removed: F) -> usize
    where
        F: FnMut(&PublishedActor, u16),
    {
        match self.entries.remove(&port) {
            Some(entry) => {
                debug!(port, actor = %entry.actor, "Actor unpublished");
                on_removed(&entry, port);
                1
            }
            None => 0,
        }
    }

    /// Removes `actor` from `port`, or from every port if `port` is
    /// [`ANY_PORT`]. Returns the number of entries removed.
    pub fn remove_actor(&mut self, actor: ActorId, port: u16) -> usize {
        self.remove_actor_with(actor, port, |_, _| {})
    }

    /// Like [`PublishedActors::remove_actor`], calling `on_removed` for
    /// each removed entry.
    pub fn remove_actor_with<F>(&mut self, actor: ActorId, port: u16, mut on_removed: F) -> usize
    where
        F: FnMut(&PublishedActor, u16),
    {
        if port != ANY_PORT {
            if self.entries.get(&port).is_some_and(|e| e.actor == actor) {
                return self.remove_with(port, on_removed);
            }
            return 0;
        }

        let ports: Vec<u16> = self
            .entries
            .iter()
            .filter(|(_, e)| e.actor == actor)
            .map(|(&p, _)| p)
            .collect();

        ports
            .into_iter()
            .map(|p| self.remove_with(p, &mut on_removed))
            .sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    fn iface(sigs: &[&str]) -> BTreeSet<String> {
        sigs.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_add_and_remove_by_port() {
        let mut reg = PublishedActors::new();
        let x = ActorId::new(7);

        assert!(reg.add(80, x, iface(&["foo"])).is_none());
        assert_eq!(reg.get(80).unwrap().interface, iface(&["foo"]));

        assert_eq!(reg.remove(80), 1);
        assert!(reg.get(80).is_none());
        assert_eq!(reg.remove(80), 0);
    }

    #[test]
    fn test_add_replaces() {
        let mut reg = PublishedActors::new();
        reg.add(80, ActorId::new(1), BTreeSet::new());
        let prev = reg.add(80, ActorId::new(2), iface(&["bar"])).unwrap();

        assert_eq!(prev.actor, ActorId::new(1));
        assert_eq!(reg.get(80).unwrap().actor, ActorId::new(2));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_remove_actor_all_ports() {
        let mut reg = PublishedActors::new();
        let x = ActorId::new(7);
        reg.add(80, x, iface(&["foo"]));
        reg.add(81, x, iface(&["foo"]));
        reg.add(82, ActorId::new(8), BTreeSet::new());

        let mut removed = Vec::new();
        let n = reg.remove_actor_with(x, ANY_PORT, |e, p| removed.push((e.actor, p)));

        assert_eq!(n, 2);
        assert_eq!(removed, vec![(x, 80), (x, 81)]);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_remove_actor_specific_port() {
        let mut reg = PublishedActors::new();
        let x = ActorId::new(7);
        reg.add(80, x, BTreeSet::new());
        reg.add(81, x, BTreeSet::new());

        assert_eq!(reg.remove_actor(ActorId::new(9), 80), 0);
        assert_eq!(reg.remove_actor(x, 80), 1);
        assert!(reg.get(81).is_some());
    }
}
