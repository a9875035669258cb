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

use itertools::Itertools;

use crate::config::Configuration;
use crate::network::Network;
use crate::router::{Metadata, Router};
use crate::routing;
use crate::{ChannelId, Cycle, Error, NodeId};

/// N-dimensional unidirectional torus.
///
/// Every dimension has only a positive-direction wrap link; the return
/// path is the long way around the ring. Each node owns one channel per
/// dimension, `ch = node * D + dim`, and each router exposes `D + 1`
/// inputs and outputs (the wrap links plus injection/ejection).
///
/// Per-dimension attributes come from `dim_bandwidth`, `dim_latency` and
/// `dim_penalty`; their lengths must match `dim_sizes` when given.
#[derive(Clone, Debug)]
pub struct UniTorus {
    net: Network,
    dim_sizes: Vec<usize>,
    dim_bandwidth: Vec<usize>,
    dim_latency: Vec<Cycle>,
    dim_penalty: Vec<usize>,
    debug: bool,
}

impl UniTorus {
    pub fn new(config: &Configuration, name: &str) -> Result<Self, Error> {
        routing::register_routing_functions();
        let debug = config.get_int("unitorus_debug")?.unwrap_or(0) != 0;

        let dim_sizes = parse_dim_sizes(config)?;
        let dims = dim_sizes.len();
        let size: usize = dim_sizes.iter().product();
        let channels = dims * size;

        let dim_bandwidth = dimension_attribute(config, "dim_bandwidth", dims, 1, 1)?;
        let dim_latency = dimension_attribute(config, "dim_latency", dims, 1, 1)?;
        let dim_penalty = dimension_attribute(config, "dim_penalty", dims, 0, 0)?;

        super::require_known_routing_function(config)?;
        routing::set_dimension_hints(dims, dim_sizes[0], &dim_sizes);

        let mut topo = Self {
            net: Network::alloc(name, size, channels),
            dim_sizes,
            dim_bandwidth,
            dim_latency,
            dim_penalty,
            debug,
        };
        topo.build_net()?;
        topo.net.check_wiring()?;
        Ok(topo)
    }

    fn build_net(&mut self) -> Result<(), Error> {
        let dims = self.dim_sizes.len();
        if self.debug {
            log::debug!(
                "building unidirectional {}-D torus {} = {} nodes, {} channels",
                dims,
                self.dim_sizes.iter().join("x"),
                self.net.num_nodes(),
                self.net.num_channels()
            );
        }

        for node in 0..self.net.num_nodes() {
            let coords = self.node_to_coords(node);
            let name = format!("router_{}", coords.iter().join("_"));
            let mut router = Router::new(&name, node, dims + 1, dims + 1);
            router.set_metadata(Metadata::UniTorus {
                coords,
                dim_sizes: self.dim_sizes.clone(),
            });
            self.net.add_router(router)?;
        }

        // wrap links; appending in dimension order puts dim d on port d
        for node in 0..self.net.num_nodes() {
            for dim in 0..dims {
                let next = self.next_node(node, dim);
                let channel = self.channel_id(node, dim);
                let (out_port, _) = self.net.connect(node, channel, next)?;
                if out_port != dim {
                    return Err(Error::InternalAssertion(format!(
                        "dimension {} of node {} landed on output port {}",
                        dim, node, out_port
                    )));
                }
                self.net.set_channel_latency(channel, self.dim_latency[dim]);
                if self.debug {
                    log::debug!(
                        "channel {}: node {} -> node {} (dim {}, latency {})",
                        channel,
                        node,
                        next,
                        dim,
                        self.dim_latency[dim]
                    );
                }
            }
        }

        for node in 0..self.net.num_nodes() {
            self.net.attach_injection(node)?;
            let eject_port = self.net.attach_ejection(node)?;
            if eject_port != dims {
                return Err(Error::InternalAssertion(format!(
                    "ejection of node {} landed on output port {}",
                    node, eject_port
                )));
            }
        }
        Ok(())
    }

    /// Positive wrap neighbor of `node` along `dim`.
    pub fn next_node(&self, node: NodeId, dim: usize) -> NodeId {
        let mut coords = self.node_to_coords(node);
        coords[dim] = (coords[dim] + 1) % self.dim_sizes[dim];
        self.coords_to_node(&coords)
    }

    /// Channel feeding the positive wrap link of `node` along `dim`.
    pub fn channel_id(&self, node: NodeId, dim: usize) -> ChannelId {
        node * self.dim_sizes.len() + dim
    }

    /// Mixed-radix decomposition, least-significant dimension first.
    pub fn node_to_coords(&self, node: NodeId) -> Vec<usize> {
        let mut coords = Vec::with_capacity(self.dim_sizes.len());
        let mut rest = node;
        for &extent in &self.dim_sizes {
            coords.push(rest % extent);
            rest /= extent;
        }
        coords
    }

    pub fn coords_to_node(&self, coords: &[usize]) -> NodeId {
        let mut node = 0;
        let mut stride = 1;
        for (&coord, &extent) in coords.iter().zip(&self.dim_sizes) {
            node += coord * stride;
            stride *= extent;
        }
        node
    }

    pub fn n(&self) -> usize {
        self.dim_sizes.len()
    }

    pub fn dim_size(&self, dim: usize) -> usize {
        self.dim_sizes[dim]
    }

    pub fn dim_sizes(&self) -> &[usize] {
        &self.dim_sizes
    }

    pub fn dim_bandwidth(&self, dim: usize) -> usize {
        self.dim_bandwidth[dim]
    }

    pub fn dim_latency(&self, dim: usize) -> Cycle {
        self.dim_latency[dim]
    }

    pub fn dim_penalty(&self, dim: usize) -> usize {
        self.dim_penalty[dim]
    }

    /// Per-node capacity: the node counts cancel, leaving the sum of the
    /// per-dimension bandwidths.
    pub fn capacity(&self) -> f64 {
        self.dim_bandwidth.iter().sum::<usize>() as f64
    }

    pub fn network(&self) -> &Network {
        &self.net
    }
}

fn parse_dim_sizes(config: &Configuration) -> Result<Vec<usize>, Error> {
    let raw = config.int_list("dim_sizes")?.ok_or_else(|| {
        Error::BadConfig(
            "dim_sizes".to_string(),
            "missing; expected {size1,...,sizeN}".to_string(),
        )
    })?;
    raw.iter()
        .map(|&size| {
            if size <= 0 {
                Err(Error::BadConfig(
                    "dim_sizes".to_string(),
                    format!("dimension sizes must be positive, got {}", size),
                ))
            } else {
                Ok(size as usize)
            }
        })
        .collect()
}

/// Per-dimension attribute list: defaults when unset, otherwise exactly
/// one value of at least `minimum` per dimension.
fn dimension_attribute(
    config: &Configuration,
    key: &str,
    dims: usize,
    default: usize,
    minimum: i64,
) -> Result<Vec<usize>, Error> {
    let values = match config.int_list(key)? {
        Some(values) => values,
        None => return Ok(vec![default; dims]),
    };
    if values.len() != dims {
        return Err(Error::BadConfig(
            key.to_string(),
            format!("{} values for {} dimensions", values.len(), dims),
        ));
    }
    values
        .iter()
        .map(|&value| {
            if value < minimum {
                Err(Error::BadConfig(
                    key.to_string(),
                    format!("values must be at least {}, got {}", minimum, value),
                ))
            } else {
                Ok(value as usize)
            }
        })
        .collect()
}
