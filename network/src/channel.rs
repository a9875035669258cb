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

use crate::{Cycle, Error, NodeId};

/// Channel identifiers index the network-owned channel inventory.
pub type ChannelId = usize;

/// Where a directed channel attaches to a router: the router id and the
/// port index under which the channel was registered there.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Endpoint {
    pub router: NodeId,
    pub port: usize,
}

/// A directed flit channel.
///
/// The flit payload is opaque at this layer; the core only models the
/// latency and the two endpoint registrations. Endpoints are bound exactly
/// once each during wiring: a channel is the output of one router and the
/// input of another (a self-loop binds both sides to the same router).
#[derive(Clone, Debug)]
pub struct FlitChannel {
    latency: Cycle,
    src: Option<Endpoint>,
    dst: Option<Endpoint>,
}

impl FlitChannel {
    pub(crate) fn new() -> Self {
        Self {
            latency: 1,
            src: None,
            dst: None,
        }
    }

    pub fn latency(&self) -> Cycle {
        self.latency
    }

    pub(crate) fn set_latency(&mut self, latency: Cycle) {
        self.latency = latency;
    }

    /// The (router, output port) this channel leaves from. `None` for an
    /// injection channel, whose producer is the traffic endpoint.
    pub fn source(&self) -> Option<Endpoint> {
        self.src
    }

    /// The (router, input port) this channel feeds. `None` for an ejection
    /// channel, whose consumer is the traffic endpoint.
    pub fn destination(&self) -> Option<Endpoint> {
        self.dst
    }

    pub(crate) fn bind_source(&mut self, endpoint: Endpoint) -> Result<(), Error> {
        if let Some(existing) = self.src {
            return Err(Error::InternalAssertion(format!(
                "channel already sourced at router {} port {}",
                existing.router, existing.port
            )));
        }
        self.src = Some(endpoint);
        Ok(())
    }

    pub(crate) fn bind_destination(&mut self, endpoint: Endpoint) -> Result<(), Error> {
        if let Some(existing) = self.dst {
            return Err(Error::InternalAssertion(format!(
                "channel already sunk at router {} port {}",
                existing.router, existing.port
            )));
        }
        self.dst = Some(endpoint);
        Ok(())
    }
}

/// The reverse-direction credit channel paired with a flit channel.
///
/// Orientation mirrors the flit channel by construction, so only the
/// latency is modeled here.
#[derive(Clone, Debug)]
pub struct CreditChannel {
    latency: Cycle,
}

impl CreditChannel {
    pub(crate) fn new() -> Self {
        Self { latency: 1 }
    }

    pub fn latency(&self) -> Cycle {
        self.latency
    }

    pub(crate) fn set_latency(&mut self, latency: Cycle) {
        self.latency = latency;
    }
}
