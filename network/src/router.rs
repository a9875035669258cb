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

//! The router collaborator seen by the topology core.
//!
//! The router pipeline (buffering, VC arbitration, switch allocation) is
//! simulated elsewhere; the core only registers channels on numbered ports
//! and attaches build-time metadata. Port indices are positions in the
//! registration order, which the builders fix deliberately: routing
//! functions later read the recorded indices back out of the metadata.

use crate::channel::ChannelId;
use crate::{Error, NodeId};

/// Topological metadata attached to a router during construction.
///
/// Write-once: the builder sets it when the router is created and the
/// routing function reads it for the network's lifetime. The variant tag
/// tells a routing function which topology it is looking at.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Metadata {
    None,
    UniTorus {
        coords: Vec<usize>,
        dim_sizes: Vec<usize>,
    },
    Cake(CakeMetadata),
}

/// Recorded output-port indices for each cardinal outgoing link of a cake
/// router. `None` marks a link the router does not have: non-elevator
/// routers carry no vertical ports.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CakePorts {
    pub xp: Option<usize>,
    pub yp: Option<usize>,
    pub zup: Option<usize>,
    pub zdn: Option<usize>,
    pub eject: Option<usize>,
}

impl CakePorts {
    fn record(slot: &mut Option<usize>, index: usize) {
        debug_assert!(slot.is_none(), "port slot recorded twice");
        *slot = Some(index);
    }

    pub(crate) fn record_xp(&mut self, index: usize) {
        Self::record(&mut self.xp, index);
    }

    pub(crate) fn record_yp(&mut self, index: usize) {
        Self::record(&mut self.yp, index);
    }

    pub(crate) fn record_zup(&mut self, index: usize) {
        Self::record(&mut self.zup, index);
    }

    pub(crate) fn record_zdn(&mut self, index: usize) {
        Self::record(&mut self.zdn, index);
    }

    pub(crate) fn record_eject(&mut self, index: usize) {
        Self::record(&mut self.eject, index);
    }
}

/// Everything `dor_cake` needs to pick an output port: the layer geometry,
/// this router's coordinates, the preferred elevator column for layer
/// changes, and the recorded port indices.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CakeMetadata {
    pub x_size: usize,
    pub y_size: usize,
    pub layers: usize,
    pub x: usize,
    pub y: usize,
    pub z: usize,
    pub elevator: (usize, usize),
    pub ports: CakePorts,
}

#[derive(Clone, Debug)]
pub struct Router {
    id: NodeId,
    name: String,
    inputs: usize,
    outputs: usize,
    input_channels: Vec<ChannelId>,
    output_channels: Vec<ChannelId>,
    output_faults: Vec<bool>,
    metadata: Metadata,
}

impl Router {
    pub(crate) fn new(name: &str, id: NodeId, inputs: usize, outputs: usize) -> Self {
        Self {
            id,
            name: name.to_string(),
            inputs,
            outputs,
            input_channels: Vec::with_capacity(inputs),
            output_channels: Vec::with_capacity(outputs),
            output_faults: vec![false; outputs],
            metadata: Metadata::None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Input port count this router was sized for.
    pub fn num_inputs(&self) -> usize {
        self.inputs
    }

    /// Output port count this router was sized for.
    pub fn num_outputs(&self) -> usize {
        self.outputs
    }

    /// Number of inputs registered so far.
    pub fn input_index_count(&self) -> usize {
        self.input_channels.len()
    }

    /// Number of outputs registered so far. During wiring this is the port
    /// index the next registered output will land on.
    pub fn output_index_count(&self) -> usize {
        self.output_channels.len()
    }

    pub(crate) fn add_input_channel(&mut self, channel: ChannelId) -> Result<usize, Error> {
        if self.input_channels.len() == self.inputs {
            return Err(Error::InternalAssertion(format!(
                "router {} sized for {} inputs, adding channel {} overflows",
                self.name, self.inputs, channel
            )));
        }
        self.input_channels.push(channel);
        Ok(self.input_channels.len() - 1)
    }

    pub(crate) fn add_output_channel(&mut self, channel: ChannelId) -> Result<usize, Error> {
        if self.output_channels.len() == self.outputs {
            return Err(Error::InternalAssertion(format!(
                "router {} sized for {} outputs, adding channel {} overflows",
                self.name, self.outputs, channel
            )));
        }
        self.output_channels.push(channel);
        Ok(self.output_channels.len() - 1)
    }

    pub fn input_channel(&self, port: usize) -> Option<ChannelId> {
        self.input_channels.get(port).copied()
    }

    pub fn output_channel(&self, port: usize) -> Option<ChannelId> {
        self.output_channels.get(port).copied()
    }

    pub fn output_channels(&self) -> &[ChannelId] {
        &self.output_channels
    }

    pub fn input_channels(&self) -> &[ChannelId] {
        &self.input_channels
    }

    /// Advisory faulty-output bit. The allocator collaborator excludes
    /// faulty ports; the topology core records the bit and never reads it.
    pub fn set_output_fault(&mut self, port: usize, faulty: bool) {
        self.output_faults[port] = faulty;
    }

    pub fn output_faulty(&self, port: usize) -> bool {
        self.output_faults[port]
    }

    pub(crate) fn set_metadata(&mut self, metadata: Metadata) {
        debug_assert!(
            matches!(self.metadata, Metadata::None),
            "router metadata is write-once"
        );
        self.metadata = metadata;
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Cake metadata, when this router belongs to a cake network.
    pub fn cake(&self) -> Option<&CakeMetadata> {
        match &self.metadata {
            Metadata::Cake(meta) => Some(meta),
            _ => None,
        }
    }

    pub(crate) fn cake_mut(&mut self) -> Option<&mut CakeMetadata> {
        match &mut self.metadata {
            Metadata::Cake(meta) => Some(meta),
            _ => None,
        }
    }
}
