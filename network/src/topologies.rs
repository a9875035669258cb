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

//! Topology builders.
//!
//! Each builder consumes an already-parsed [`crate::Configuration`], sizes
//! the network, allocates the channel inventory, instantiates routers with
//! the port counts the topology dictates, and wires the directed channels
//! in a deterministic order. The wiring order is load-bearing: it fixes
//! the output-port indices that the routing functions later read back out
//! of the router metadata.
//!
//! The two topologies deliberately do not share a coordinate flattening
//! routine. The torus is mixed-radix with the least-significant dimension
//! first; cake fixes (x, y, z) with x least significant inside a layer and
//! the layer index most significant.

use crate::config::Configuration;
use crate::network::Network;
use crate::{routing, Error};

mod cake;
mod unitorus;

pub use cake::Cake;
pub use unitorus::UniTorus;

/// The topology variants this crate can build, dispatched on the
/// `topology` configuration key.
#[derive(Clone, Debug)]
pub enum Topology {
    UniTorus(UniTorus),
    Cake(Cake),
}

impl Topology {
    pub fn from_config(config: &Configuration, name: &str) -> Result<Self, Error> {
        match config.get_str("topology") {
            Some("unitorus") => Ok(Self::UniTorus(UniTorus::new(config, name)?)),
            Some("cake") => Ok(Self::Cake(Cake::new(config, name)?)),
            Some(other) => Err(Error::BadConfig(
                "topology".to_string(),
                format!("unknown topology '{}'", other),
            )),
            None => Err(Error::BadConfig(
                "topology".to_string(),
                "missing".to_string(),
            )),
        }
    }

    pub fn network(&self) -> &Network {
        match self {
            Self::UniTorus(topo) => topo.network(),
            Self::Cake(topo) => topo.network(),
        }
    }
}

/// Every topology requires a `routing_function` naming a registered entry.
fn require_known_routing_function(config: &Configuration) -> Result<(), Error> {
    let name = config
        .get_str("routing_function")
        .ok_or_else(|| Error::BadConfig("routing_function".to_string(), "missing".to_string()))?;
    if routing::lookup_routing_function(name).is_none() {
        return Err(Error::BadConfig(
            "routing_function".to_string(),
            format!("'{}' is not a registered routing function", name),
        ));
    }
    Ok(())
}
