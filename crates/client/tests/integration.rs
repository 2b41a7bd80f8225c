use keywheel_srv::{Config, RouterSrv};
use url::Url;

fn server_url(srv: &RouterSrv) -> Url {
    Url::parse(&format!("http://{:?}", srv.listen_addrs()[0])).unwrap()
}

#[test]
fn insert_heartbeat_delete_round_trip() {
    let srv = RouterSrv::new(Config::testing()).unwrap();
    let url = server_url(&srv);

    // test traffic arrives over loopback, which the router identifies
    // as localhost
    keywheel_client::send_insert(&url, "localhost", 3).unwrap();
    keywheel_client::send_heartbeat(&url).unwrap();

    keywheel_client::send_delete(&url, "localhost").unwrap();

    // the node is gone, so its heartbeats are rejected again
    assert!(keywheel_client::send_heartbeat(&url).is_err());
}

#[test]
fn heartbeat_before_registration_is_rejected() {
    let srv = RouterSrv::new(Config::testing()).unwrap();
    assert!(keywheel_client::send_heartbeat(&server_url(&srv)).is_err());
}

#[test]
fn delete_of_unknown_node_is_rejected() {
    let srv = RouterSrv::new(Config::testing()).unwrap();
    assert!(
        keywheel_client::send_delete(&server_url(&srv), "10.9.9.9")
            .is_err()
    );
}
