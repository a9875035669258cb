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

//! Routing functions and the process-wide registry they live in.
//!
//! A routing function is a pure mapping from (router metadata, destination
//! node) to the outgoing port index. The builders record enough metadata
//! on every router that no global state is needed to route; the legacy
//! dimension hints are still published for older routing helpers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};

use crate::router::{Metadata, Router};
use crate::NodeId;

/// Maps a router (through its metadata) and a destination node id to the
/// output port a head flit should take. `None` when the router carries no
/// metadata the function understands.
pub type RoutingFunction = fn(&Router, NodeId) -> Option<usize>;

fn registry() -> &'static Mutex<HashMap<String, RoutingFunction>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, RoutingFunction>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Register `function` under `name`. Re-registering a name replaces the
/// entry, so registration is idempotent within a process lifetime.
pub fn register_routing_function(name: &str, function: RoutingFunction) {
    registry()
        .lock()
        .expect("routing registry poisoned")
        .insert(name.to_string(), function);
}

pub fn lookup_routing_function(name: &str) -> Option<RoutingFunction> {
    registry()
        .lock()
        .expect("routing registry poisoned")
        .get(name)
        .copied()
}

/// Register the routing functions every topology in this crate relies on.
/// Builders call this on construction; calling it again is harmless.
pub fn register_routing_functions() {
    register_routing_function("dim_order_unitorus_unitorus", dim_order_unitorus);
    register_routing_function("dor_cake", dor_cake);
}

static G_N: AtomicUsize = AtomicUsize::new(0);
static G_K: AtomicUsize = AtomicUsize::new(0);

fn dim_sizes_hint() -> &'static Mutex<Vec<usize>> {
    static G_DIM_SIZES: OnceLock<Mutex<Vec<usize>>> = OnceLock::new();
    G_DIM_SIZES.get_or_init(|| Mutex::new(Vec::new()))
}

/// Publish the process-wide dimension hints kept for legacy routing
/// helpers: the dimension count, the leading dimension's size, and a copy
/// of the dim size sequence. Informational only; routing functions in this
/// crate read router metadata instead.
pub fn set_dimension_hints(n: usize, k: usize, dim_sizes: &[usize]) {
    G_N.store(n, Ordering::Relaxed);
    G_K.store(k, Ordering::Relaxed);
    *dim_sizes_hint().lock().expect("dimension hints poisoned") = dim_sizes.to_vec();
}

pub fn dimension_hints() -> (usize, usize, Vec<usize>) {
    (
        G_N.load(Ordering::Relaxed),
        G_K.load(Ordering::Relaxed),
        dim_sizes_hint()
            .lock()
            .expect("dimension hints poisoned")
            .clone(),
    )
}

/// Dimension-ordered routing on the unidirectional torus: correct the
/// lowest-index mismatched dimension via its positive wrap link (output
/// port d is dimension d's wrap link); eject once every coordinate
/// matches.
pub fn dim_order_unitorus(router: &Router, dest: NodeId) -> Option<usize> {
    let (coords, dim_sizes) = match router.metadata() {
        Metadata::UniTorus { coords, dim_sizes } => (coords, dim_sizes),
        _ => return None,
    };
    let mut rest = dest;
    for (dim, (&coord, &extent)) in coords.iter().zip(dim_sizes.iter()).enumerate() {
        let want = rest % extent;
        rest /= extent;
        if want != coord {
            return Some(dim);
        }
    }
    // ejection port sits after the D wrap links
    Some(dim_sizes.len())
}

/// Dimension-ordered routing on cake: X, then Y, then Z. Vertical motion
/// is only taken at the router's preferred elevator column; because the
/// in-plane links are unidirectional, the positive wrap is the only way
/// to correct X and Y.
pub fn dor_cake(router: &Router, dest: NodeId) -> Option<usize> {
    let meta = router.cake()?;
    let plane = meta.x_size * meta.y_size;
    let dz = dest / plane;
    let dy = dest % plane / meta.x_size;
    let dx = dest % plane % meta.x_size;
    let ports = &meta.ports;

    if (dx, dy, dz) == (meta.x, meta.y, meta.z) {
        return ports.eject;
    }
    if dz != meta.z {
        // steer toward the preferred elevator, then ride it
        let (elv_x, elv_y) = meta.elevator;
        if meta.x != elv_x {
            return ports.xp;
        }
        if meta.y != elv_y {
            return ports.yp;
        }
        let up = (dz + meta.layers - meta.z) % meta.layers;
        let down = (meta.z + meta.layers - dz) % meta.layers;
        return if up <= down { ports.zup } else { ports.zdn };
    }
    if dx != meta.x {
        return ports.xp;
    }
    ports.yp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{CakeMetadata, CakePorts};

    fn cake_router(x: usize, y: usize, z: usize, elevator: (usize, usize)) -> Router {
        let is_elev = (x, y) == elevator;
        let mut router = Router::new("router_t", 0, 5, 5);
        router.set_metadata(Metadata::Cake(CakeMetadata {
            x_size: 3,
            y_size: 3,
            layers: 4,
            x,
            y,
            z,
            elevator,
            ports: CakePorts {
                xp: Some(0),
                yp: Some(1),
                zup: if is_elev { Some(2) } else { None },
                zdn: if is_elev { Some(3) } else { None },
                eject: Some(if is_elev { 4 } else { 2 }),
            },
        }));
        router
    }

    fn dest(x: usize, y: usize, z: usize) -> NodeId {
        z * 9 + y * 3 + x
    }

    #[test]
    fn test_registry_is_idempotent() {
        register_routing_functions();
        register_routing_functions();
        assert!(lookup_routing_function("dim_order_unitorus_unitorus").is_some());
        assert!(lookup_routing_function("dor_cake").is_some());
        assert!(lookup_routing_function("valiant").is_none());
    }

    #[test]
    fn test_dimension_hints_roundtrip() {
        set_dimension_hints(3, 9, &[9, 7, 5]);
        let (n, k, sizes) = dimension_hints();
        assert_eq!((n, k), (3, 9));
        assert_eq!(sizes, vec![9, 7, 5]);
    }

    #[test]
    fn test_dim_order_unitorus_fixes_lowest_dimension_first() {
        let mut router = Router::new("router_1_1", 4, 3, 3);
        router.set_metadata(Metadata::UniTorus {
            coords: vec![1, 1],
            dim_sizes: vec![3, 3],
        });
        assert_eq!(dim_order_unitorus(&router, 5), Some(0)); // (2,1): x first
        assert_eq!(dim_order_unitorus(&router, 7), Some(1)); // (1,2): y next
        assert_eq!(dim_order_unitorus(&router, 4), Some(2)); // here: eject
        assert_eq!(dim_order_unitorus(&router, 8), Some(0)); // (2,2): x before y
    }

    #[test]
    fn test_dim_order_unitorus_needs_torus_metadata() {
        let router = Router::new("router_plain", 0, 1, 1);
        assert_eq!(dim_order_unitorus(&router, 0), None);
    }

    #[test]
    fn test_dor_cake_ejects_at_destination() {
        let router = cake_router(1, 1, 2, (1, 1));
        assert_eq!(dor_cake(&router, dest(1, 1, 2)), Some(4));
    }

    #[test]
    fn test_dor_cake_steers_toward_elevator_before_z() {
        // off-elevator in x: head x+ even though y already matches
        let router = cake_router(0, 2, 0, (2, 2));
        assert_eq!(dor_cake(&router, dest(0, 2, 1)), Some(0));
        // x matches the elevator column, y does not
        let router = cake_router(2, 0, 0, (2, 2));
        assert_eq!(dor_cake(&router, dest(2, 0, 1)), Some(1));
    }

    #[test]
    fn test_dor_cake_picks_shorter_vertical_direction() {
        // layers = 4: z 0 -> 1 is one hop up, z 0 -> 3 one hop down
        let router = cake_router(1, 1, 0, (1, 1));
        assert_eq!(dor_cake(&router, dest(1, 1, 1)), Some(2));
        assert_eq!(dor_cake(&router, dest(1, 1, 3)), Some(3));
        // equidistant (0 -> 2): ties break upward
        assert_eq!(dor_cake(&router, dest(1, 1, 2)), Some(2));
    }

    #[test]
    fn test_dor_cake_in_plane_is_x_then_y() {
        let router = cake_router(0, 0, 1, (1, 1));
        assert_eq!(dor_cake(&router, dest(2, 2, 1)), Some(0));
        assert_eq!(dor_cake(&router, dest(0, 2, 1)), Some(1));
    }
}
