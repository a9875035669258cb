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

//! End-to-end checks against the public surface: configuration in, wired
//! network out, routed by the registered routing functions.

use std::collections::HashMap;

use network::{
    lookup_routing_function, Cake, ChannelId, Configuration, Error, Network, NodeId, Topology,
    UniTorus,
};

/// Follow a registered routing function from `src` until ejection,
/// asserting it happens at `dest`; returns the hop count.
fn walk(net: &Network, routing_function: &str, src: NodeId, dest: NodeId, limit: usize) -> usize {
    let route = lookup_routing_function(routing_function).expect("registered");
    let mut here = src;
    for hops in 0..limit {
        let router = net.router(here);
        let port = route(router, dest).expect("routable");
        let channel = router.output_channel(port).expect("wired port");
        match net.channel(channel).destination() {
            Some(endpoint) => here = endpoint.router,
            None => {
                assert_eq!(here, dest, "ejected at the wrong router");
                return hops;
            }
        }
    }
    panic!("no ejection within {} hops ({} -> {})", limit, src, dest);
}

/// Every network channel must be registered as the output of exactly one
/// router and the input of exactly one router.
fn assert_channel_coverage(net: &Network) {
    let mut outputs: HashMap<ChannelId, usize> = HashMap::new();
    let mut inputs: HashMap<ChannelId, usize> = HashMap::new();
    for router in net.routers() {
        for &channel in router.output_channels() {
            *outputs.entry(channel).or_insert(0) += 1;
        }
        for &channel in router.input_channels() {
            *inputs.entry(channel).or_insert(0) += 1;
        }
    }
    for id in 0..net.num_channels() {
        assert_eq!(outputs.get(&id), Some(&1), "channel {} output side", id);
        assert_eq!(inputs.get(&id), Some(&1), "channel {} input side", id);
    }
}

#[test]
fn test_unitorus_from_yaml() {
    let _logger = env_logger::builder().try_init();
    let config = Configuration::from_yaml_str(
        "---
topology: unitorus
dim_sizes: \"{4,4,4}\"
routing_function: dim_order_unitorus_unitorus
",
    )
    .unwrap();
    let topo = UniTorus::new(&config, "torus_4ary3").unwrap();
    let net = topo.network();
    assert_eq!(net.num_nodes(), 64);
    assert_eq!(net.num_channels(), 192);
    assert_channel_coverage(net);

    // unidirectional: the wrong-way trip is the long way around the ring
    let src = topo.coords_to_node(&[1, 1, 1]);
    let ahead = topo.coords_to_node(&[2, 1, 1]);
    let behind = topo.coords_to_node(&[0, 1, 1]);
    assert_eq!(walk(net, "dim_order_unitorus_unitorus", src, ahead, 16), 1);
    assert_eq!(walk(net, "dim_order_unitorus_unitorus", src, behind, 16), 3);
    assert_eq!(walk(net, "dim_order_unitorus_unitorus", src, src, 16), 0);
}

#[test]
fn test_unitorus_all_pairs_hop_counts() {
    let _logger = env_logger::builder().try_init();
    let mut config = Configuration::new();
    config.set("topology", "unitorus");
    config.set("dim_sizes", "{3,4}");
    config.set("routing_function", "dim_order_unitorus_unitorus");
    let topo = UniTorus::new(&config, "torus").unwrap();

    for src in 0..topo.network().num_nodes() {
        for dest in 0..topo.network().num_nodes() {
            let s = topo.node_to_coords(src);
            let d = topo.node_to_coords(dest);
            let expected = (d[0] + 3 - s[0]) % 3 + (d[1] + 4 - s[1]) % 4;
            let hops = walk(topo.network(), "dim_order_unitorus_unitorus", src, dest, 16);
            assert_eq!(hops, expected, "{:?} -> {:?}", s, d);
        }
    }
}

#[test]
fn test_cake_port_ordering_and_coverage() {
    let _logger = env_logger::builder().try_init();
    let config = Configuration::from_yaml_str(
        "---
topology: cake
dim_sizes: \"{3,3,2}\"
elevator_coords: \"{{1,1}}\"
routing_function: dor_cake
",
    )
    .unwrap();
    let cake = Cake::new(&config, "cake_3x3x2").unwrap();
    let net = cake.network();
    assert_eq!(net.num_nodes(), 18);
    assert_eq!(net.num_channels(), 40);
    assert_channel_coverage(net);

    for router in net.routers() {
        let meta = router.cake().unwrap();
        let ports = meta.ports;
        assert_eq!(ports.xp, Some(0));
        assert_eq!(ports.yp, Some(1));
        if cake.is_elevator(meta.x, meta.y) {
            assert_eq!(ports.zup, Some(2));
            assert_eq!(ports.zdn, Some(3));
            assert_eq!(ports.eject, Some(4));
        } else {
            assert_eq!(ports.zup, None);
            assert_eq!(ports.zdn, None);
            assert_eq!(ports.eject, Some(2));
        }

        // each slot names the channel whose semantic matches it
        let xp = net.channel(router.output_channel(0).unwrap());
        assert_eq!(
            xp.destination().unwrap().router,
            cake.node_id((meta.x + 1) % 3, meta.y, meta.z)
        );
        let yp = net.channel(router.output_channel(1).unwrap());
        assert_eq!(
            yp.destination().unwrap().router,
            cake.node_id(meta.x, (meta.y + 1) % 3, meta.z)
        );
    }
}

#[test]
fn test_cake_dor_changes_layers_through_elevator() {
    let _logger = env_logger::builder().try_init();
    let mut config = Configuration::new();
    config.set("topology", "cake");
    config.set("dim_sizes", "{3,3,2}");
    config.set("elevator_coords", "{{1,1}}");
    // the default mapping is the identity, so steer every cell to the
    // one elevator explicitly
    config.set(
        "elevator_mapping_coords",
        "{{{1,1},{1,1},{1,1}},\
          {{1,1},{1,1},{1,1}},\
          {{1,1},{1,1},{1,1}}}",
    );
    config.set("routing_function", "dor_cake");
    let cake = Cake::new(&config, "cake").unwrap();
    let net = cake.network();

    for src in 0..net.num_nodes() {
        for dest in 0..net.num_nodes() {
            walk(net, "dor_cake", src, dest, 24);
        }
    }
}

#[test]
fn test_topology_factory_dispatches_on_key() {
    let _logger = env_logger::builder().try_init();
    let mut config = Configuration::new();
    config.set("topology", "unitorus");
    config.set("dim_sizes", "{2,2}");
    config.set("routing_function", "dim_order_unitorus_unitorus");
    let topo = Topology::from_config(&config, "tiny").unwrap();
    assert!(matches!(topo, Topology::UniTorus(_)));
    assert_eq!(topo.network().num_nodes(), 4);

    config.set("topology", "mesh");
    assert!(matches!(
        Topology::from_config(&config, "tiny"),
        Err(Error::BadConfig(key, _)) if key == "topology"
    ));
}

#[test]
fn test_build_errors() {
    let mut config = Configuration::new();
    config.set("topology", "unitorus");
    config.set("dim_sizes", "{4,0}");
    config.set("routing_function", "dim_order_unitorus_unitorus");
    assert!(matches!(
        UniTorus::new(&config, "torus"),
        Err(Error::BadConfig(key, _)) if key == "dim_sizes"
    ));

    let mut config = Configuration::new();
    config.set("topology", "cake");
    config.set("dim_sizes", "{3,3,2}");
    config.set("elevator_coords", "{{5,0}}");
    config.set("routing_function", "dor_cake");
    assert!(matches!(
        Cake::new(&config, "cake"),
        Err(Error::OutOfRange(key, _)) if key == "elevator_coords"
    ));
}

#[test]
fn test_graphviz_export_mentions_every_router() {
    let _logger = env_logger::builder().try_init();
    let mut config = Configuration::new();
    config.set("topology", "cake");
    config.set("dim_sizes", "{2,2,1}");
    config.set("routing_function", "dor_cake");
    let cake = Cake::new(&config, "cake").unwrap();
    let dot = cake.network().to_graphviz();
    assert!(dot.starts_with("digraph"));
    for router in cake.network().routers() {
        assert!(dot.contains(router.name()), "missing {}", router.name());
    }
}
