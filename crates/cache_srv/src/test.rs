use crate::*;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A tiny fixed-content upstream for the cache to fetch from. Counts
/// how many fetches actually reached it.
fn stub_upstream(body: &'static str) -> (String, Arc<AtomicUsize>) {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let fetches = Arc::new(AtomicUsize::new(0));

    let count = fetches.clone();
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let mut stream = match stream {
                Ok(stream) => stream,
                Err(_) => break,
            };
            count.fetch_add(1, Ordering::SeqCst);

            // drain the request head; the content is fixed either way
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf);

            let res = format!(
                "HTTP/1.1 200 OK\r\n\
                 Content-Type: text/plain\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\
                 \r\n\
                 {}",
                body.len(),
                body,
            );
            let _ = stream.write_all(res.as_bytes());
        }
    });

    (format!("http://{addr}/content"), fetches)
}

fn get(srv: &CacheSrv, upstream: &str) -> ureq::Response {
    let addr = srv.listen_addrs()[0];
    ureq::get(&format!("http://{addr:?}/?url={upstream}"))
        .call()
        .unwrap()
}

#[test]
fn happy_empty_server_health() {
    let srv = CacheSrv::new(Config::testing()).unwrap();
    let addr = srv.listen_addrs()[0];
    let res = ureq::get(&format!("http://{addr:?}/health"))
        .call()
        .unwrap()
        .into_string()
        .unwrap();
    assert_eq!("{}", res);
}

#[test]
fn miss_fetches_then_hit_serves_from_cache() {
    let srv = CacheSrv::new(Config::testing()).unwrap();
    let (upstream, fetches) = stub_upstream("cached content");

    let res = get(&srv, &upstream);
    assert_eq!("text/plain", res.content_type());
    assert_eq!("cached content", res.into_string().unwrap());

    let res = get(&srv, &upstream);
    assert_eq!("cached content", res.into_string().unwrap());

    // the second request must have been served without refetching
    assert_eq!(1, fetches.load(Ordering::SeqCst));
}

#[test]
fn expired_content_is_refetched() {
    let srv = CacheSrv::new(Config {
        content_ttl: std::time::Duration::from_millis(50),
        ..Config::testing()
    })
    .unwrap();
    let (upstream, fetches) = stub_upstream("short lived");

    let _ = get(&srv, &upstream);
    std::thread::sleep(std::time::Duration::from_millis(200));
    let res = get(&srv, &upstream);

    assert_eq!("short lived", res.into_string().unwrap());
    assert_eq!(2, fetches.load(Ordering::SeqCst));
}

#[test]
fn metrics_report_hits_and_requests() {
    let srv = CacheSrv::new(Config::testing()).unwrap();
    let (upstream, _) = stub_upstream("metered");

    let _ = get(&srv, &upstream);
    let _ = get(&srv, &upstream);

    let addr = srv.listen_addrs()[0];
    let res = ureq::get(&format!("http://{addr:?}/metrics"))
        .call()
        .unwrap()
        .into_string()
        .unwrap();
    assert_eq!("{\"hits\":1,\"requests\":2}", res);
}

#[test]
fn reject_missing_url_param() {
    let srv = CacheSrv::new(Config::testing()).unwrap();
    let addr = srv.listen_addrs()[0];
    match ureq::get(&format!("http://{addr:?}/")).call() {
        Err(ureq::Error::Status(status, res)) => {
            assert_eq!(400, status);
            let res = res.into_string().unwrap();
            assert!(res.contains("url"), "{res}");
        }
        oth => panic!("unexpected {oth:?}"),
    }
}

#[test]
fn unreachable_upstream_is_an_internal_error() {
    let srv = CacheSrv::new(Config::testing()).unwrap();

    // bind then immediately drop to get an address nothing listens on
    let dead = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();

    let addr = srv.listen_addrs()[0];
    match ureq::get(&format!("http://{addr:?}/?url=http://{dead}/"))
        .call()
    {
        Err(ureq::Error::Status(500, _)) => {}
        oth => panic!("unexpected {oth:?}"),
    }
}
