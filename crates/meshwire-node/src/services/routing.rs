// ============================================
// File: crates/meshwire-node/src/services/routing.rs
// ============================================
//! # Routing Table
//!
//! ## Creation Reason
//! Maps destination nodes to the connection bytes must be written to,
//! either directly or through a neighbouring node that relays them.
//!
//! ## Main Functionality
//! - `RoutingTable`: Direct and indirect routes plus per-connection buffers
//! - `Route`: Resolved outbound path (connection handle + next hop)
//! - Cascading `erase` with an unreachable-node callback
//!
//! ## Routing Table Structure
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                   Routing Table                       │
//! ├──────────────┬────────────────────────────────────────┤
//! │ direct       │  hdl#1 ⇄ node A, hdl#2 ⇄ node B         │
//! │ indirect     │  node C → {A}, node D → {A, B}          │
//! │ buffers      │  hdl#1 → [...], hdl#2 → [...]           │
//! └──────────────┴────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Every indirect hop is a node with a direct route; removing a direct
//!   route removes it from every hop set in the same call
//! - Not synchronized; the owner serializes access
//! - `flush` hands the buffer to the transport, which empties it
//!
//! ## Last Modified
//! v0.1.0 - Initial routing table

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use bytes::BytesMut;
use tracing::{debug, info};

use meshwire_common::types::{ConnectionHandle, NodeId};
use meshwire_transport::Transport;

// ============================================
// Route
// ============================================

/// A resolved outbound path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// Connection the bytes are written to.
    pub handle: ConnectionHandle,
    /// Node at the other end of `handle`; the destination itself for
    /// direct routes.
    pub next_hop: NodeId,
}

// ============================================
// RoutingTable
// ============================================

/// Direct and indirect routes to other nodes.
pub struct RoutingTable<T> {
    direct_by_hdl: HashMap<ConnectionHandle, NodeId>,
    direct_by_nid: HashMap<NodeId, ConnectionHandle>,
    indirect: HashMap<NodeId, BTreeSet<NodeId>>,
    buffers: HashMap<ConnectionHandle, BytesMut>,
    transport: T,
}

impl<T: Transport> RoutingTable<T> {
    /// Creates an empty table writing through `transport`.
    pub fn new(transport: T) -> Self {
        Self {
            direct_by_hdl: HashMap::new(),
            direct_by_nid: HashMap::new(),
            indirect: HashMap::new(),
            buffers: HashMap::new(),
            transport,
        }
    }

    // ========================================
    // Lookups
    // ========================================

    /// Returns the path to `node`, preferring a direct connection.
    #[must_use]
    pub fn lookup(&self, node: &NodeId) -> Option<Route> {
        if let Some(&handle) = self.direct_by_nid.get(node) {
            return Some(Route {
                handle,
                next_hop: *node,
            });
        }

        self.indirect.get(node)?.iter().find_map(|hop| {
            self.direct_by_nid.get(hop).map(|&handle| Route {
                handle,
                next_hop: *hop,
            })
        })
    }

    /// Returns the connection of a direct route to `node`.
    #[must_use]
    pub fn lookup_direct(&self, node: &NodeId) -> Option<ConnectionHandle> {
        self.direct_by_nid.get(node).copied()
    }

    /// Returns the node directly connected on `handle`.
    #[must_use]
    pub fn lookup_node(&self, handle: ConnectionHandle) -> Option<NodeId> {
        self.direct_by_hdl.get(&handle).copied()
    }

    /// All direct routes, ordered by handle.
    #[must_use]
    pub fn direct_routes(&self) -> Vec<Route> {
        let mut routes: Vec<Route> = self
            .direct_by_hdl
            .iter()
            .map(|(&handle, &next_hop)| Route { handle, next_hop })
            .collect();
        routes.sort_by_key(|r| r.handle);
        routes
    }

    /// Number of direct routes.
    #[must_use]
    pub fn direct_count(&self) -> usize {
        self.direct_by_hdl.len()
    }

    /// Number of nodes reachable only through a relay.
    #[must_use]
    pub fn indirect_count(&self) -> usize {
        self.indirect.len()
    }

    // ========================================
    // Mutation
    // ========================================

    /// Registers `node` as directly connected on `handle`.
    ///
    /// Returns `false` if either side already has a direct route.
    pub fn add_direct(&mut self, handle: ConnectionHandle, node: NodeId) -> bool {
        if node.is_none()
            || self.direct_by_hdl.contains_key(&handle)
            || self.direct_by_nid.contains_key(&node)
        {
            return false;
        }

        self.direct_by_hdl.insert(handle, node);
        self.direct_by_nid.insert(node, handle);
        info!(handle = %handle, node = %node, "Direct route added");
        true
    }

    /// Registers `dest` as reachable through the directly connected `hop`.
    ///
    /// Returns `false` if `hop` has no direct route, `dest` is directly
    /// connected, or the entry already exists.
    pub fn add_indirect(&mut self, hop: NodeId, dest: NodeId) -> bool {
        if hop == dest
            || dest.is_none()
            || !self.direct_by_nid.contains_key(&hop)
            || self.direct_by_nid.contains_key(&dest)
        {
            return false;
        }

        let added = self.indirect.entry(dest).or_default().insert(hop);
        if added {
            debug!(hop = %hop, dest = %dest, "Indirect route added");
        }
        added
    }

    /// Removes every route to `node` and every indirect route that loses
    /// its last hop as a result.
    ///
    /// `on_unreachable` runs once for each node that was reachable before
    /// the call and is not afterwards, `node` included.
    pub fn erase<F>(&mut self, node: &NodeId, mut on_unreachable: F)
    where
        F: FnMut(&NodeId),
    {
        let mut pending = VecDeque::from([*node]);
        let mut seen = HashSet::new();

        while let Some(lost) = pending.pop_front() {
            if !seen.insert(lost) {
                continue;
            }

            let mut was_reachable = self.indirect.remove(&lost).is_some();
            if let Some(handle) = self.direct_by_nid.remove(&lost) {
                self.direct_by_hdl.remove(&handle);
                was_reachable = true;

                // Destinations relayed through `lost` lose that hop
                let mut orphaned = Vec::new();
                for (dest, hops) in &mut self.indirect {
                    if hops.remove(&lost) && hops.is_empty() {
                        orphaned.push(*dest);
                    }
                }
                pending.extend(orphaned);
            }

            if was_reachable {
                info!(node = %lost, "Node unreachable");
                on_unreachable(&lost);
            }
        }
    }

    /// Removes the direct route on `handle` (cascading like
    /// [`RoutingTable::erase`]) and drops the handle's buffer.
    pub fn erase_handle<F>(&mut self, handle: ConnectionHandle, on_unreachable: F)
    where
        F: FnMut(&NodeId),
    {
        if let Some(node) = self.direct_by_hdl.get(&handle).copied() {
            self.erase(&node, on_unreachable);
        }
        self.buffers.remove(&handle);
    }

    // ========================================
    // Buffers
    // ========================================

    /// Outbound buffer of `handle`, created on first use.
    pub fn buffer_mut(&mut self, handle: ConnectionHandle) -> &mut BytesMut {
        self.buffers.entry(handle).or_default()
    }

    /// Hands the buffered bytes of `route` to the transport.
    pub fn flush(&mut self, route: &Route) {
        self.flush_handle(route.handle);
    }

    /// Hands the buffered bytes of `handle` to the transport.
    pub fn flush_handle(&mut self, handle: ConnectionHandle) {
        let buf = self.buffers.entry(handle).or_default();
        self.transport.flush(handle, buf);
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The underlying transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T> std::fmt::Debug for RoutingTable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingTable")
            .field("direct", &self.direct_by_hdl.len())
            .field("indirect", &self.indirect.len())
            .field("buffers", &self.buffers.len())
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BufMut;
    use meshwire_transport::MockTransport;

    fn node(n: u8) -> NodeId {
        NodeId::new([n; 20], u32::from(n))
    }

    fn hdl(n: u64) -> ConnectionHandle {
        ConnectionHandle::new(n)
    }

    fn table() -> (RoutingTable<MockTransport>, MockTransport) {
        let probe = MockTransport::new();
        (RoutingTable::new(probe.clone()), probe)
    }

    #[test]
    fn test_direct_route() {
        let (mut rt, _) = table();
        assert!(rt.add_direct(hdl(1), node(1)));

        let route = rt.lookup(&node(1)).unwrap();
        assert_eq!(route.handle, hdl(1));
        assert_eq!(route.next_hop, node(1));
        assert_eq!(rt.lookup_node(hdl(1)), Some(node(1)));
        assert_eq!(rt.lookup_direct(&node(1)), Some(hdl(1)));
    }

    #[test]
    fn test_duplicate_direct_rejected() {
        let (mut rt, _) = table();
        assert!(rt.add_direct(hdl(1), node(1)));
        assert!(!rt.add_direct(hdl(2), node(1)));
        assert!(!rt.add_direct(hdl(1), node(2)));
        assert!(!rt.add_direct(hdl(3), NodeId::NONE));
        assert_eq!(rt.direct_count(), 1);
    }

    #[test]
    fn test_indirect_route() {
        let (mut rt, _) = table();
        rt.add_direct(hdl(1), node(1));

        assert!(rt.add_indirect(node(1), node(3)));
        assert!(!rt.add_indirect(node(1), node(3)));
        // hop without a direct route
        assert!(!rt.add_indirect(node(2), node(3)));
        // destination already direct
        assert!(!rt.add_indirect(node(1), node(1)));

        let route = rt.lookup(&node(3)).unwrap();
        assert_eq!(route.handle, hdl(1));
        assert_eq!(route.next_hop, node(1));
    }

    #[test]
    fn test_unknown_node() {
        let (rt, _) = table();
        assert!(rt.lookup(&node(9)).is_none());
    }

    #[test]
    fn test_cascading_erase() {
        let (mut rt, _) = table();
        rt.add_direct(hdl(1), node(1));
        rt.add_indirect(node(1), node(3));

        let mut lost = Vec::new();
        rt.erase(&node(1), |n| lost.push(*n));

        assert!(rt.lookup(&node(1)).is_none());
        assert!(rt.lookup(&node(3)).is_none());
        lost.sort();
        assert_eq!(lost, vec![node(1), node(3)]);
        assert_eq!(rt.indirect_count(), 0);
    }

    #[test]
    fn test_erase_keeps_alternate_hop() {
        let (mut rt, _) = table();
        rt.add_direct(hdl(1), node(1));
        rt.add_direct(hdl(2), node(2));
        rt.add_indirect(node(1), node(4));
        rt.add_indirect(node(2), node(4));

        let mut lost = Vec::new();
        rt.erase(&node(1), |n| lost.push(*n));

        assert_eq!(lost, vec![node(1)]);
        assert_eq!(rt.lookup(&node(4)).unwrap().next_hop, node(2));
    }

    #[test]
    fn test_erase_unknown_node_skips_callback() {
        let (mut rt, _) = table();
        let mut calls = 0;
        rt.erase(&node(7), |_| calls += 1);
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_erase_handle_drops_buffer() {
        let (mut rt, probe) = table();
        rt.add_direct(hdl(1), node(1));
        rt.buffer_mut(hdl(1)).put_slice(b"pending");

        let mut lost = Vec::new();
        rt.erase_handle(hdl(1), |n| lost.push(*n));

        assert_eq!(lost, vec![node(1)]);
        assert!(rt.lookup_node(hdl(1)).is_none());
        // buffer is gone, a fresh one is empty
        assert!(rt.buffer_mut(hdl(1)).is_empty());
        assert_eq!(probe.flush_count(), 0);
    }

    #[test]
    fn test_flush_hands_buffer_to_transport() {
        let (mut rt, probe) = table();
        rt.add_direct(hdl(1), node(1));
        rt.buffer_mut(hdl(1)).put_slice(b"abc");

        let route = rt.lookup(&node(1)).unwrap();
        rt.flush(&route);

        assert_eq!(probe.flush_count(), 1);
        assert_eq!(probe.flushed_bytes(hdl(1)), b"abc".to_vec());
        assert!(rt.buffer_mut(hdl(1)).is_empty());
    }

    #[test]
    fn test_direct_routes_sorted() {
        let (mut rt, _) = table();
        rt.add_direct(hdl(3), node(3));
        rt.add_direct(hdl(1), node(1));

        let handles: Vec<_> = rt.direct_routes().iter().map(|r| r.handle).collect();
        assert_eq!(handles, vec![hdl(1), hdl(3)]);
    }
}
