//! The binary keywheel-client.

#[derive(clap::Parser, Debug)]
#[command(version)]
pub struct Args {
    /// The keywheel router server to talk to.
    #[arg(long, default_value = "http://127.0.0.1:5050")]
    pub server: url::Url,

    #[command(subcommand)]
    pub cmd: Cmd,
}

/// Commands accepted by keywheel-client.
#[derive(clap::Subcommand, Debug)]
pub enum Cmd {
    /// Send heartbeats to the router server on an interval, forever.
    /// Run this on every backend node.
    Heartbeat {
        /// Seconds between heartbeats.
        #[arg(long, default_value = "5")]
        interval_s: u64,
    },

    /// Register a backend node, or update its replica count.
    /// Only accepted when run on the router host itself.
    Insert {
        /// The backend node address.
        ip_address: String,

        /// How many virtual positions the node should own.
        replica_count: u32,
    },

    /// Remove a backend node immediately.
    /// Only accepted when run on the router host itself.
    Delete {
        /// The backend node address.
        ip_address: String,
    },
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

    match args.cmd {
        Cmd::Heartbeat { interval_s } => loop {
            match keywheel_client::send_heartbeat(&args.server) {
                Ok(()) => tracing::info!("sent heartbeat"),
                Err(err) => {
                    tracing::warn!(?err, "error sending heartbeat")
                }
            }
            std::thread::sleep(std::time::Duration::from_secs(interval_s));
        },
        Cmd::Insert {
            ip_address,
            replica_count,
        } => {
            if let Err(err) = keywheel_client::send_insert(
                &args.server,
                &ip_address,
                replica_count,
            ) {
                tracing::error!(?err, "error sending insert");
                std::process::exit(1);
            }
            tracing::info!(%ip_address, replica_count, "inserted node");
        }
        Cmd::Delete { ip_address } => {
            if let Err(err) =
                keywheel_client::send_delete(&args.server, &ip_address)
            {
                tracing::error!(?err, "error sending delete");
                std::process::exit(1);
            }
            tracing::info!(%ip_address, "deleted node");
        }
    }
}
