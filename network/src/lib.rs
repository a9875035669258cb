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

//! Topology core for a cycle-accurate network-on-chip simulator.
//!
//! Two related topologies are built here:
//!   - [`UniTorus`]: an N-dimensional unidirectional torus with
//!     per-dimension bandwidth, latency, and penalty attributes.
//!   - [`Cake`]: stacked two-dimensional unidirectional tori ("layers")
//!     joined by sparse vertical "elevator" links at configured (x,y)
//!     coordinates.
//!
//! Both consume an already-parsed [`Configuration`] and produce an
//! immutable [`Network`]: routers indexed `0..size`, a directed
//! flit-channel inventory with paired credit back-channels, and per-node
//! injection/ejection channels. During wiring the builders record
//! per-router topological metadata (coordinates, output-port indices for
//! each cardinal direction, preferred elevator) so that a routing function
//! can pick output ports from the metadata alone, without global state.

mod channel;
mod config;
mod error;
mod network;
mod router;
mod routing;
mod topologies;

// Public types
// type to use for cycles
pub type Cycle = usize;
// node identifiers are dense integers in [0, size)
pub type NodeId = usize;

pub use crate::channel::{ChannelId, CreditChannel, Endpoint, FlitChannel};
pub use crate::config::Configuration;
pub use crate::error::Error;
pub use crate::network::Network;
pub use crate::router::{CakeMetadata, CakePorts, Metadata, Router};
pub use crate::routing::{
    dim_order_unitorus, dimension_hints, dor_cake, lookup_routing_function,
    register_routing_function, register_routing_functions, set_dimension_hints, RoutingFunction,
};
pub use crate::topologies::{Cake, Topology, UniTorus};
