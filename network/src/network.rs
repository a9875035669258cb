// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The base-network aggregate shared by all topology builders.
//!
//! Owns the router set, the directed flit-channel inventory with paired
//! credit back-channels, and the per-node injection/ejection channel
//! pairs. Channels are referenced by index, never by owning pointer: a
//! router's port lists hold [`ChannelId`]s into the inventory, so the
//! two-sided references stay cycle-free.
//!
//! The channel inventory is laid out as the `channels` network channels
//! first, followed by one injection and one ejection channel per node.
//! [`Network::num_channels`] counts network channels only.

use itertools::Itertools;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::channel::{ChannelId, CreditChannel, Endpoint, FlitChannel};
use crate::router::Router;
use crate::{Cycle, Error, NodeId};

#[derive(Clone, Debug)]
pub struct Network {
    name: String,
    nodes: usize,
    channels: usize,
    routers: Vec<Router>,
    chan: Vec<FlitChannel>,
    chan_cred: Vec<CreditChannel>,
}

impl Network {
    /// Allocate the channel inventory up front; routers are added by the
    /// builder as it derives their port counts.
    pub(crate) fn alloc(name: &str, nodes: usize, channels: usize) -> Self {
        log::debug!(
            "allocating network '{}': {} nodes, {} channels",
            name,
            nodes,
            channels
        );
        let total = channels + 2 * nodes;
        Self {
            name: name.to_string(),
            nodes,
            channels,
            routers: Vec::with_capacity(nodes),
            chan: (0..total).map(|_| FlitChannel::new()).collect(),
            chan_cred: (0..total).map(|_| CreditChannel::new()).collect(),
        }
    }

    pub(crate) fn add_router(&mut self, router: Router) -> Result<NodeId, Error> {
        if router.id() != self.routers.len() || self.routers.len() == self.nodes {
            return Err(Error::InternalAssertion(format!(
                "router '{}' (id {}) added out of order, {} of {} present",
                router.name(),
                router.id(),
                self.routers.len(),
                self.nodes
            )));
        }
        self.routers.push(router);
        Ok(self.routers.len() - 1)
    }

    /// Register `channel` as the next output of `src` and the next input
    /// of `dst`; returns the (output, input) port indices it landed on.
    pub(crate) fn connect(
        &mut self,
        src: NodeId,
        channel: ChannelId,
        dst: NodeId,
    ) -> Result<(usize, usize), Error> {
        if src >= self.routers.len() || dst >= self.routers.len() || channel >= self.channels {
            return Err(Error::InternalAssertion(format!(
                "connect {} -> {} via channel {} outside the allocation",
                src, dst, channel
            )));
        }
        let out_port = self.routers[src].add_output_channel(channel)?;
        self.chan[channel].bind_source(Endpoint {
            router: src,
            port: out_port,
        })?;
        let in_port = self.routers[dst].add_input_channel(channel)?;
        self.chan[channel].bind_destination(Endpoint {
            router: dst,
            port: in_port,
        })?;
        Ok((out_port, in_port))
    }

    /// Latency applies to the flit channel and its credit back-channel.
    pub(crate) fn set_channel_latency(&mut self, channel: ChannelId, latency: Cycle) {
        self.chan[channel].set_latency(latency);
        self.chan_cred[channel].set_latency(latency);
    }

    /// Attach the node's injection channel as a router input at latency 1;
    /// returns the input port index.
    pub(crate) fn attach_injection(&mut self, node: NodeId) -> Result<usize, Error> {
        let channel = self.injection_channel(node);
        let port = self.routers[node].add_input_channel(channel)?;
        self.chan[channel].bind_destination(Endpoint { router: node, port })?;
        self.set_channel_latency(channel, 1);
        Ok(port)
    }

    /// Attach the node's ejection channel as a router output at latency 1;
    /// returns the output port index.
    pub(crate) fn attach_ejection(&mut self, node: NodeId) -> Result<usize, Error> {
        let channel = self.ejection_channel(node);
        let port = self.routers[node].add_output_channel(channel)?;
        self.chan[channel].bind_source(Endpoint { router: node, port })?;
        self.set_channel_latency(channel, 1);
        Ok(port)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes
    }

    /// Directed network channels, excluding injection/ejection.
    pub fn num_channels(&self) -> usize {
        self.channels
    }

    pub fn router(&self, id: NodeId) -> &Router {
        &self.routers[id]
    }

    pub(crate) fn router_mut(&mut self, id: NodeId) -> &mut Router {
        &mut self.routers[id]
    }

    pub fn routers(&self) -> &[Router] {
        &self.routers
    }

    pub fn channel(&self, id: ChannelId) -> &FlitChannel {
        &self.chan[id]
    }

    pub fn credit_channel(&self, id: ChannelId) -> &CreditChannel {
        &self.chan_cred[id]
    }

    pub fn injection_channel(&self, node: NodeId) -> ChannelId {
        self.channels + node
    }

    pub fn ejection_channel(&self, node: NodeId) -> ChannelId {
        self.channels + self.nodes + node
    }

    /// Mark an output port faulty so the allocator collaborator skips it.
    pub fn set_output_fault(&mut self, node: NodeId, port: usize, faulty: bool) {
        self.routers[node].set_output_fault(port, faulty);
    }

    /// Post-wiring check: every router carries exactly the port counts it
    /// was sized for, every network channel is registered as the output of
    /// one router and the input of one router, and every injection and
    /// ejection channel is attached on its router side.
    pub(crate) fn check_wiring(&self) -> Result<(), Error> {
        if self.routers.len() != self.nodes {
            return Err(Error::InternalAssertion(format!(
                "{} routers built, {} expected",
                self.routers.len(),
                self.nodes
            )));
        }
        for router in &self.routers {
            if router.input_index_count() != router.num_inputs()
                || router.output_index_count() != router.num_outputs()
            {
                return Err(Error::InternalAssertion(format!(
                    "router '{}' wired {}/{} inputs and {}/{} outputs",
                    router.name(),
                    router.input_index_count(),
                    router.num_inputs(),
                    router.output_index_count(),
                    router.num_outputs()
                )));
            }
        }
        for id in 0..self.channels {
            if self.chan[id].source().is_none() || self.chan[id].destination().is_none() {
                return Err(Error::InternalAssertion(format!(
                    "network channel {} left dangling",
                    id
                )));
            }
        }
        for node in 0..self.nodes {
            if self.chan[self.injection_channel(node)].destination().is_none() {
                return Err(Error::InternalAssertion(format!(
                    "injection channel for node {} not attached",
                    node
                )));
            }
            if self.chan[self.ejection_channel(node)].source().is_none() {
                return Err(Error::InternalAssertion(format!(
                    "ejection channel for node {} not attached",
                    node
                )));
            }
        }
        Ok(())
    }

    /// Adjacency view over the network channels: routers as graph nodes
    /// (the node index equals the router id), one directed edge per
    /// channel carrying its [`ChannelId`].
    pub fn graph(&self) -> DiGraph<String, ChannelId> {
        let mut graph = DiGraph::with_capacity(self.nodes, self.channels);
        for router in &self.routers {
            graph.add_node(router.name().to_string());
        }
        for id in 0..self.channels {
            if let (Some(src), Some(dst)) = (self.chan[id].source(), self.chan[id].destination()) {
                graph.add_edge(NodeIndex::new(src.router), NodeIndex::new(dst.router), id);
            }
        }
        graph
    }

    /// Unique neighbors of a node, ignoring link direction.
    pub fn neighbors(&self, node: NodeId) -> Vec<NodeId> {
        self.graph()
            .neighbors_undirected(NodeIndex::new(node))
            .unique()
            .map(|n| n.index())
            .collect()
    }

    pub fn to_graphviz(&self) -> String {
        use petgraph::dot::{Config, Dot};

        let graph = self.graph();
        format!(
            "{:?}",
            Dot::with_attr_getters(
                &graph,
                &[Config::NodeNoLabel, Config::EdgeNoLabel],
                &|_, edge| {
                    format!(
                        "label=\"ch {}\nLatency({})\"",
                        edge.weight(),
                        self.chan[*edge.weight()].latency()
                    )
                },
                &|_, node| format!("label=\"{}\n(id: {})\"", node.1, node.0.index()),
            )
        )
    }
}
