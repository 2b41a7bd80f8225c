use crate::*;
use keywheel_core::{RouteError, RouterConfig};

/// A ureq agent that reports redirects instead of following them; the
/// redirect Location IS the routing decision under test.
fn agent() -> ureq::Agent {
    ureq::AgentBuilder::new().redirects(0).build()
}

fn base(srv: &RouterSrv) -> String {
    format!("http://{:?}", srv.listen_addrs()[0])
}

fn insert(srv: &RouterSrv, ip_address: &str, replica_count: u32) {
    let res = ureq::post(&format!("{}/insert", base(srv)))
        .send_form(&[
            ("ip_address", ip_address),
            ("replica_count", &replica_count.to_string()),
        ])
        .unwrap();
    assert_eq!(200, res.status());
}

fn route(srv: &RouterSrv, key: &str) -> ureq::Response {
    agent()
        .get(&format!("{}/?url={}", base(srv), key))
        .call()
        .unwrap()
}

#[test]
fn happy_empty_server_health() {
    let srv = RouterSrv::new(Config::testing()).unwrap();
    let res = ureq::get(&format!("{}/health", base(&srv)))
        .call()
        .unwrap()
        .into_string()
        .unwrap();
    assert_eq!("{}", res);
}

#[test]
fn reject_route_without_url_param() {
    let srv = RouterSrv::new(Config::testing()).unwrap();
    match agent().get(&base(&srv)).call() {
        Err(ureq::Error::Status(status, res)) => {
            assert_eq!(400, status);
            let res = res.into_string().unwrap();
            assert!(res.contains("invalid parameter"), "{res}");
        }
        oth => panic!("unexpected {oth:?}"),
    }
}

#[test]
fn route_on_empty_topology_is_unavailable() {
    let srv = RouterSrv::new(Config::testing()).unwrap();
    match agent()
        .get(&format!("{}/?url=www.example.com", base(&srv)))
        .call()
    {
        Err(ureq::Error::Status(status, res)) => {
            assert_eq!(503, status);
            let res = res.into_string().unwrap();
            assert!(res.contains("no nodes available"), "{res}");
        }
        oth => panic!("unexpected {oth:?}"),
    }
}

#[test]
fn insert_then_route_redirects_to_the_node() {
    let srv = RouterSrv::new(Config::testing()).unwrap();
    insert(&srv, "10.0.0.1", 3);

    let res = route(&srv, "www.example.com");
    assert_eq!(307, res.status());
    assert_eq!(
        Some("http://10.0.0.1:8080/?url=www.example.com"),
        res.header("Location"),
    );
}

#[test]
fn routing_is_deterministic_across_requests() {
    let srv = RouterSrv::new(Config::testing()).unwrap();
    insert(&srv, "10.0.0.1", 5);
    insert(&srv, "10.0.0.2", 5);

    let first = route(&srv, "www.example.com")
        .header("Location")
        .unwrap()
        .to_string();
    let second = route(&srv, "www.example.com")
        .header("Location")
        .unwrap()
        .to_string();
    assert_eq!(first, second);
}

#[test]
fn trie_flavor_serves_the_same_contract() {
    let config = Config {
        router: RouterConfig {
            assignment: keywheel_core::AssignmentFlavor::Trie,
            ..Default::default()
        },
        ..Config::testing()
    };
    let srv = RouterSrv::new(config).unwrap();
    insert(&srv, "10.0.0.1", 3);

    let res = route(&srv, "www.example.com");
    assert_eq!(307, res.status());
    assert_eq!(
        Some("http://10.0.0.1:8080/?url=www.example.com"),
        res.header("Location"),
    );
}

#[test]
fn hot_key_redirects_spread_over_the_fleet() {
    let config = Config {
        router: RouterConfig {
            hot_key_threshold: 1.0,
            ..Default::default()
        },
        ..Config::testing()
    };
    let srv = RouterSrv::new(config).unwrap();
    insert(&srv, "10.0.0.1", 5);
    insert(&srv, "10.0.0.2", 5);

    let mut seen = std::collections::HashSet::new();
    for _ in 0..100 {
        seen.insert(
            route(&srv, "www.hot.com")
                .header("Location")
                .unwrap()
                .to_string(),
        );
    }
    assert_eq!(2, seen.len(), "{seen:?}");
}

#[test]
fn reject_insert_missing_ip_address() {
    let srv = RouterSrv::new(Config::testing()).unwrap();
    match ureq::post(&format!("{}/insert", base(&srv)))
        .send_form(&[("replica_count", "3")])
    {
        Err(ureq::Error::Status(status, res)) => {
            assert_eq!(400, status);
            let res = res.into_string().unwrap();
            assert!(res.contains("ip_address"), "{res}");
        }
        oth => panic!("unexpected {oth:?}"),
    }
}

#[test]
fn reject_insert_bad_replica_count() {
    let srv = RouterSrv::new(Config::testing()).unwrap();

    for bad in ["abc", "-2", "0"] {
        match ureq::post(&format!("{}/insert", base(&srv)))
            .send_form(&[("ip_address", "10.0.0.1"), ("replica_count", bad)])
        {
            Err(ureq::Error::Status(status, res)) => {
                assert_eq!(400, status, "replica_count={bad}");
                let res = res.into_string().unwrap();
                assert!(res.contains("replica_count"), "{res}");
            }
            oth => panic!("unexpected {oth:?}"),
        }
    }

    // the failed inserts must not have touched the topology
    assert!(srv.router().membership().node_ids().is_empty());
}

#[test]
fn reject_heartbeat_from_unregistered_node() {
    let srv = RouterSrv::new(Config::testing()).unwrap();
    match ureq::post(&format!("{}/heartbeat", base(&srv))).send_form(&[]) {
        Err(ureq::Error::Status(status, res)) => {
            assert_eq!(400, status);
            let res = res.into_string().unwrap();
            assert!(res.contains("unknown node"), "{res}");
        }
        oth => panic!("unexpected {oth:?}"),
    }
}

#[test]
fn heartbeat_refreshes_a_registered_node() {
    let srv = RouterSrv::new(Config::testing()).unwrap();
    // test requests arrive over loopback, which identifies as localhost
    insert(&srv, "localhost", 3);

    let res = ureq::post(&format!("{}/heartbeat", base(&srv)))
        .send_form(&[])
        .unwrap();
    assert_eq!(200, res.status());
}

#[test]
fn delete_removes_the_node_from_routing() {
    let srv = RouterSrv::new(Config::testing()).unwrap();
    insert(&srv, "10.0.0.1", 3);

    let res = ureq::post(&format!("{}/delete", base(&srv)))
        .send_form(&[("ip_address", "10.0.0.1")])
        .unwrap();
    assert_eq!(200, res.status());

    match agent()
        .get(&format!("{}/?url=www.example.com", base(&srv)))
        .call()
    {
        Err(ureq::Error::Status(503, _)) => {}
        oth => panic!("unexpected {oth:?}"),
    }
}

#[test]
fn reject_delete_of_unknown_node() {
    let srv = RouterSrv::new(Config::testing()).unwrap();
    match ureq::post(&format!("{}/delete", base(&srv)))
        .send_form(&[("ip_address", "10.9.9.9")])
    {
        Err(ureq::Error::Status(status, res)) => {
            assert_eq!(400, status);
            let res = res.into_string().unwrap();
            assert!(res.contains("unknown node"), "{res}");
        }
        oth => panic!("unexpected {oth:?}"),
    }
}

#[test]
fn initial_node_list_is_routable_at_startup() {
    let config = Config {
        initial_node_list: vec!["10.0.0.7".to_string()],
        ..Config::testing()
    };
    let srv = RouterSrv::new(config).unwrap();

    let res = route(&srv, "www.example.com");
    assert_eq!(307, res.status());
    assert_eq!(
        Some("http://10.0.0.7:8080/?url=www.example.com"),
        res.header("Location"),
    );
}

#[test]
fn admin_source_checks() {
    use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

    let local_v4: SocketAddr = (Ipv4Addr::LOCALHOST, 4100).into();
    let local_v6: SocketAddr = (Ipv6Addr::LOCALHOST, 4100).into();
    let remote: SocketAddr = ([10, 0, 0, 4], 4100).into();

    assert!(require_loopback(&local_v4).is_ok());
    assert!(require_loopback(&local_v6).is_ok());
    assert_eq!(
        Err(RouteError::UnauthorizedSource),
        require_loopback(&remote),
    );

    assert_eq!("localhost", source_node_id(&local_v4));
    assert_eq!("localhost", source_node_id(&local_v6));
    assert_eq!("10.0.0.4", source_node_id(&remote));
}
