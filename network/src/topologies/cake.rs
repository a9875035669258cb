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

use itertools::iproduct;
use std::collections::HashMap;

use crate::config::Configuration;
use crate::network::Network;
use crate::router::{CakeMetadata, CakePorts, Metadata, Router};
use crate::routing;
use crate::{ChannelId, Error, NodeId};

/// Stacked 2D layers of unidirectional tori (X+ and Y+ only) with sparse
/// vertical links ("elevators") at configured (x,y) coordinates.
///
/// Each elevator hosts two unidirectional links per layer, Z+ (up) and
/// Z- (down), both wrapping in the layer index. Every router additionally
/// injects and ejects locally. Wiring happens in a fixed order (X+ pass,
/// Y+ pass, vertical pass, injection/ejection) so that the output-port
/// indices recorded in the router metadata are deterministic: an elevator
/// router reads (xp, yp, zup, zdn, eject) = (0, 1, 2, 3, 4) and a plain
/// router (xp, yp, eject) = (0, 1, 2).
#[derive(Clone, Debug)]
pub struct Cake {
    net: Network,
    x: usize,
    y: usize,
    layers: usize,
    elevators: Vec<(usize, usize)>,
    elevator_index: HashMap<(usize, usize), usize>,
    // per (y, x) cell: which elevator to head for when changing layers
    elevator_map: Vec<Vec<(usize, usize)>>,
    inplane_channels: usize,
    vertical_channels: usize,
    debug: bool,
}

impl Cake {
    pub fn new(config: &Configuration, name: &str) -> Result<Self, Error> {
        routing::register_routing_functions();
        let debug = config.get_int("unitorus_debug")?.unwrap_or(0) != 0;

        let (x, y, layers) = parse_sizes(config)?;
        let (elevators, elevator_index) = parse_elevators(config, x, y)?;
        let elevator_map = parse_elevator_map(config, x, y, &elevator_index)?;
        super::require_known_routing_function(config)?;

        let size = x * y * layers;
        let inplane_channels = 2 * size;
        let vertical_channels = 2 * elevators.len() * layers;

        // base DOR works on the 2 in-plane dims; Z is handled as special
        routing::set_dimension_hints(2, x, &[x, y]);

        let mut cake = Self {
            net: Network::alloc(name, size, inplane_channels + vertical_channels),
            x,
            y,
            layers,
            elevators,
            elevator_index,
            elevator_map,
            inplane_channels,
            vertical_channels,
            debug,
        };
        cake.build_net()?;
        cake.net.check_wiring()?;
        cake.check_port_slots()?;
        Ok(cake)
    }

    fn build_net(&mut self) -> Result<(), Error> {
        if self.debug {
            log::debug!(
                "building cake {}x{}x{}: {} nodes, {} in-plane + {} vertical channels",
                self.x,
                self.y,
                self.layers,
                self.net.num_nodes(),
                self.inplane_channels,
                self.vertical_channels
            );
        }

        // routers with exact port counts, metadata populated up front
        for id in 0..self.net.num_nodes() {
            let (x, y, z) = self.id_to_xyz(id);
            let is_elev = self.elevator_index.contains_key(&(x, y));
            let net_ports = 2 + if is_elev { 2 } else { 0 };
            let name = format!("router_{}_{}_{}", x, y, z);
            let mut router = Router::new(&name, id, net_ports + 1, net_ports + 1);
            router.set_metadata(Metadata::Cake(CakeMetadata {
                x_size: self.x,
                y_size: self.y,
                layers: self.layers,
                x,
                y,
                z,
                elevator: self.elevator_map[y][x],
                ports: CakePorts::default(),
            }));
            self.net.add_router(router)?;
        }

        // X+ pass
        for (z, y, x) in iproduct!(0..self.layers, 0..self.y, 0..self.x) {
            let from = self.node_id(x, y, z);
            let to = self.node_id((x + 1) % self.x, y, z);
            let channel = self.inplane_channel(from, 0);
            let (out_port, _) = self.net.connect(from, channel, to)?;
            self.cake_ports_mut(from)?.record_xp(out_port);
            self.net.set_channel_latency(channel, 1);
        }

        // Y+ pass
        for (z, y, x) in iproduct!(0..self.layers, 0..self.y, 0..self.x) {
            let from = self.node_id(x, y, z);
            let to = self.node_id(x, (y + 1) % self.y, z);
            let channel = self.inplane_channel(from, 1);
            let (out_port, _) = self.net.connect(from, channel, to)?;
            self.cake_ports_mut(from)?.record_yp(out_port);
            self.net.set_channel_latency(channel, 1);
        }

        // vertical pass, in elevator declaration order; with a single
        // layer the wrap degenerates to self-loops, which still function
        for elevator in 0..self.elevators.len() {
            let (ex, ey) = self.elevators[elevator];
            for z in 0..self.layers {
                let from = self.node_id(ex, ey, z);

                let to_up = self.node_id(ex, ey, (z + 1) % self.layers);
                let channel = self.up_channel(elevator, z);
                let (out_port, _) = self.net.connect(from, channel, to_up)?;
                self.cake_ports_mut(from)?.record_zup(out_port);
                self.net.set_channel_latency(channel, 1);

                let to_down = self.node_id(ex, ey, (z + self.layers - 1) % self.layers);
                let channel = self.down_channel(elevator, z);
                let (out_port, _) = self.net.connect(from, channel, to_down)?;
                self.cake_ports_mut(from)?.record_zdn(out_port);
                self.net.set_channel_latency(channel, 1);
            }
        }

        // injection/ejection
        for id in 0..self.net.num_nodes() {
            self.net.attach_injection(id)?;
            let eject_port = self.net.attach_ejection(id)?;
            self.cake_ports_mut(id)?.record_eject(eject_port);
        }
        Ok(())
    }

    fn cake_ports_mut(&mut self, id: NodeId) -> Result<&mut CakePorts, Error> {
        self.net
            .router_mut(id)
            .cake_mut()
            .map(|meta| &mut meta.ports)
            .ok_or_else(|| {
                Error::InternalAssertion(format!("router {} carries no cake metadata", id))
            })
    }

    /// Post-wiring check of the recorded port slots: ordering, the
    /// elevator/non-elevator shape, and that each slot's channel actually
    /// leads where its name says.
    fn check_port_slots(&self) -> Result<(), Error> {
        for router in self.net.routers() {
            let meta = router.cake().ok_or_else(|| {
                Error::InternalAssertion(format!("router {} carries no cake metadata", router.id()))
            })?;
            let ports = meta.ports;
            let is_elev = self.elevator_index.contains_key(&(meta.x, meta.y));
            let expected = if is_elev {
                CakePorts {
                    xp: Some(0),
                    yp: Some(1),
                    zup: Some(2),
                    zdn: Some(3),
                    eject: Some(4),
                }
            } else {
                CakePorts {
                    xp: Some(0),
                    yp: Some(1),
                    zup: None,
                    zdn: None,
                    eject: Some(2),
                }
            };
            if ports != expected {
                return Err(Error::InternalAssertion(format!(
                    "router '{}' recorded ports {:?}, expected {:?}",
                    router.name(),
                    ports,
                    expected
                )));
            }

            let targets = [
                (ports.xp, self.node_id((meta.x + 1) % self.x, meta.y, meta.z)),
                (ports.yp, self.node_id(meta.x, (meta.y + 1) % self.y, meta.z)),
                (
                    ports.zup,
                    self.node_id(meta.x, meta.y, (meta.z + 1) % self.layers),
                ),
                (
                    ports.zdn,
                    self.node_id(meta.x, meta.y, (meta.z + self.layers - 1) % self.layers),
                ),
            ];
            for (slot, target) in targets {
                let port = match slot {
                    Some(port) => port,
                    None => continue,
                };
                let channel = router.output_channel(port).ok_or_else(|| {
                    Error::InternalAssertion(format!(
                        "router '{}' port {} has no channel",
                        router.name(),
                        port
                    ))
                })?;
                let reached = self.net.channel(channel).destination().map(|e| e.router);
                if reached != Some(target) {
                    return Err(Error::InternalAssertion(format!(
                        "router '{}' port {} reaches {:?}, expected {}",
                        router.name(),
                        port,
                        reached,
                        target
                    )));
                }
            }

            let eject = ports.eject.and_then(|port| router.output_channel(port));
            if eject != Some(self.net.ejection_channel(router.id())) {
                return Err(Error::InternalAssertion(format!(
                    "router '{}' eject slot does not name its ejection channel",
                    router.name()
                )));
            }
        }
        Ok(())
    }

    /// Flatten 3D coordinates to a node id: x least significant within a
    /// layer, the layer index most significant.
    pub fn node_id(&self, x: usize, y: usize, z: usize) -> NodeId {
        z * (self.x * self.y) + y * self.x + x
    }

    pub fn id_to_xyz(&self, id: NodeId) -> (usize, usize, usize) {
        let plane = self.x * self.y;
        (id % plane % self.x, id % plane / self.x, id / plane)
    }

    // dim 0 = X+, 1 = Y+
    fn inplane_channel(&self, node: NodeId, dim: usize) -> ChannelId {
        node * 2 + dim
    }

    // vertical channels sit after the in-plane block, grouped by
    // (elevator, source layer), {up, down} innermost
    fn up_channel(&self, elevator: usize, layer: usize) -> ChannelId {
        self.inplane_channels + (elevator * self.layers + layer) * 2
    }

    fn down_channel(&self, elevator: usize, layer: usize) -> ChannelId {
        self.inplane_channels + (elevator * self.layers + layer) * 2 + 1
    }

    pub fn x(&self) -> usize {
        self.x
    }

    pub fn y(&self) -> usize {
        self.y
    }

    pub fn layers(&self) -> usize {
        self.layers
    }

    /// Distinct elevator coordinates, in declaration order.
    pub fn elevators(&self) -> &[(usize, usize)] {
        &self.elevators
    }

    pub fn is_elevator(&self, x: usize, y: usize) -> bool {
        self.elevator_index.contains_key(&(x, y))
    }

    /// The preferred-elevator table, `Y` rows of `X` entries.
    pub fn elevator_map(&self) -> &[Vec<(usize, usize)>] {
        &self.elevator_map
    }

    pub fn network(&self) -> &Network {
        &self.net
    }
}

fn parse_sizes(config: &Configuration) -> Result<(usize, usize, usize), Error> {
    let raw = config.int_list("dim_sizes")?.ok_or_else(|| {
        Error::BadConfig(
            "dim_sizes".to_string(),
            "missing; expected {x,y[,layers]}".to_string(),
        )
    })?;
    if raw.len() < 2 || raw.len() > 3 {
        return Err(Error::BadConfig(
            "dim_sizes".to_string(),
            format!("expected {{x,y[,layers]}}, got {} values", raw.len()),
        ));
    }
    if raw.iter().any(|&size| size <= 0) {
        return Err(Error::BadConfig(
            "dim_sizes".to_string(),
            format!("sizes must be positive, got {:?}", raw),
        ));
    }
    let x = raw[0] as usize;
    let y = raw[1] as usize;
    let layers = if raw.len() == 3 { raw[2] as usize } else { 1 };
    Ok((x, y, layers))
}

type ElevatorSet = (Vec<(usize, usize)>, HashMap<(usize, usize), usize>);

/// Elevator coordinates in declaration order, duplicates collapsed to
/// their first occurrence.
fn parse_elevators(config: &Configuration, x: usize, y: usize) -> Result<ElevatorSet, Error> {
    let declared = match config.pair_list("elevator_coords")? {
        Some(pairs) => Some(pairs),
        None => config.pair_list("elevatorcoords")?,
    };
    let mut elevators = Vec::new();
    let mut elevator_index = HashMap::new();
    for (ex, ey) in declared.unwrap_or_default() {
        if ex < 0 || ex as usize >= x || ey < 0 || ey as usize >= y {
            return Err(Error::OutOfRange(
                "elevator_coords".to_string(),
                format!("({},{}) outside {}x{}", ex, ey, x, y),
            ));
        }
        let coord = (ex as usize, ey as usize);
        if !elevator_index.contains_key(&coord) {
            elevator_index.insert(coord, elevators.len());
            elevators.push(coord);
        }
    }
    Ok((elevators, elevator_index))
}

/// The Y×X preferred-elevator table. When configured, every entry must
/// name an actual elevator. When omitted the identity stands in: each
/// cell maps to its own (x,y).
fn parse_elevator_map(
    config: &Configuration,
    x: usize,
    y: usize,
    elevator_index: &HashMap<(usize, usize), usize>,
) -> Result<Vec<Vec<(usize, usize)>>, Error> {
    let raw = match config.int_list("elevator_mapping_coords")? {
        Some(nums) => Some(nums),
        None => config.int_list("elevatormapping")?,
    };

    let mut map = vec![vec![(0, 0); x]; y];
    match raw {
        Some(nums) => {
            if nums.len() != 2 * x * y {
                return Err(Error::BadConfig(
                    "elevator_mapping_coords".to_string(),
                    format!("expected {} integers ((x,y) pairs), got {}", 2 * x * y, nums.len()),
                ));
            }
            for (ry, rx) in iproduct!(0..y, 0..x) {
                let cell = 2 * (ry * x + rx);
                let (ex, ey) = (nums[cell], nums[cell + 1]);
                if ex < 0 || ex as usize >= x || ey < 0 || ey as usize >= y {
                    return Err(Error::OutOfRange(
                        "elevator_mapping_coords".to_string(),
                        format!("cell ({},{}) -> ({},{}) outside {}x{}", rx, ry, ex, ey, x, y),
                    ));
                }
                let target = (ex as usize, ey as usize);
                if !elevator_index.contains_key(&target) {
                    return Err(Error::OutOfRange(
                        "elevator_mapping_coords".to_string(),
                        format!("cell ({},{}) -> ({},{}) is not an elevator", rx, ry, ex, ey),
                    ));
                }
                map[ry][rx] = target;
            }
        }
        None => {
            for (ry, rx) in iproduct!(0..y, 0..x) {
                map[ry][rx] = (rx, ry);
            }
        }
    }
    Ok(map)
}
