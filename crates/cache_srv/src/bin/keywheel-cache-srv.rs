//! The binary keywheel-cache-srv.

use keywheel_cache_srv::*;

#[derive(clap::Parser, Debug)]
#[command(version)]
pub struct Args {
    /// By default keywheel-cache-srv runs in "testing" configuration
    /// with much lighter resource usage settings. To setup the server to
    /// be ready to use most of the resources available on a single given
    /// machine, you can set this "production" mode.
    #[arg(long)]
    pub production: bool,
}

fn main() {
    let args = <Args as clap::Parser>::parse();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::Level::INFO.into())
                .from_env_lossy(),
        )
        .try_init();

    let config = if args.production {
        Config::production()
    } else {
        Config::testing()
    };

    tracing::info!(?args, ?config, "starting");

    let (send, recv) = std::sync::mpsc::channel();

    ctrlc::set_handler(move || {
        send.send(()).unwrap();
    })
    .unwrap();

    let srv = CacheSrv::new(config);

    let _ = recv.recv();

    println!("Terminating...");
    drop(srv);
    println!("Done.");
    std::process::exit(0);
}
