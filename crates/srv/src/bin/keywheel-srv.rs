//! The binary keywheel-srv.

use keywheel_srv::*;

#[derive(clap::Parser, Debug)]
#[command(version)]
pub struct Args {
    /// By default keywheel-srv runs in "testing" configuration
    /// with much lighter resource usage settings and an empty initial
    /// node list. This testing mode should be more than enough for most
    /// developer application testing and continuous integration or
    /// automated tests.
    ///
    /// To setup the server to be ready to use most of the resources
    /// available on a single given machine, you can set this
    /// "production" mode.
    #[arg(long)]
    pub production: bool,

    /// Route with the xor trie instead of the hash ring.
    #[arg(long)]
    pub trie: bool,
    // TODO - Implement the ability to specify the listening address
    //        and the initial node list without recompiling
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

    let mut config = if args.production {
        Config::production()
    } else {
        Config::testing()
    };

    if args.trie {
        config.router.assignment = keywheel_core::AssignmentFlavor::Trie;
    }

    tracing::info!(?args, ?config, "starting");

    let (send, recv) = std::sync::mpsc::channel();

    ctrlc::set_handler(move || {
        send.send(()).unwrap();
    })
    .unwrap();

    let srv = RouterSrv::new(config);

    let _ = recv.recv();

    println!("Terminating...");
    drop(srv);
    println!("Done.");
    std::process::exit(0);
}
