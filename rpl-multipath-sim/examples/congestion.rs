//! Congestion example: a lossy link congests a relay, whose children move
//! half of their traffic to an alternate parent until the link recovers.
//!
//! ```text
//!            root (0)
//!           /        \
//!      relay (1)   relay (2)
//!       /     \   .  .   \
//!   leaf (3) leaf (4)   leaf (5)
//! ```
//!
//! Leaves 3 and 4 may use relay 2 as alternate parent (dotted).
//!
//! Run with:
//!   cargo run --example congestion -p rpl-multipath-sim -- --delivery 30%
//!
//! Set `RUST_LOG=rpl_multipath_core=debug` to follow every detection interval.

use anyhow::Result;
use clap::Parser;
use rpl_multipath_sim::{
    Delivery, Mesh, MultipathConfig, NodeId, SelectionPolicy, ThresholdRatio,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
struct Command {
    /// Number of detection intervals to simulate
    #[arg(long, default_value = "16")]
    steps: u64,

    /// Delivery ratio of the degraded link
    #[arg(long, default_value = "30%")]
    delivery: Delivery,

    /// Interval at which the link degrades
    #[arg(long, default_value = "3")]
    degrade_at: u64,

    /// Interval at which the link recovers
    #[arg(long, default_value = "10")]
    recover_at: u64,

    /// Congestion threshold, as a fraction of the expected packets
    #[arg(long, default_value = "1/2")]
    threshold: ThresholdRatio,

    /// Draw the alternate parent at random
    #[arg(long)]
    randomized: bool,

    /// Data packets originated by every leaf per interval
    #[arg(long, default_value = "20")]
    traffic: u32,

    #[arg(long, default_value = "0")]
    seed: u64,
}

fn list(ids: impl Iterator<Item = String>) -> String {
    ids.collect::<Vec<_>>().join(", ")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cmd = Command::parse();

    let policy = if cmd.randomized {
        SelectionPolicy::randomized()
    } else {
        SelectionPolicy::Deterministic
    };
    let config = |node: u64| {
        MultipathConfig::default()
            .set_threshold(cmd.threshold)
            .set_policy(policy)
            .set_seed(cmd.seed.wrapping_add(node))
    };

    let mut mesh = Mesh::new();
    mesh.set_seed(cmd.seed);

    let root = mesh.new_node().set_config(config(0)).build()?;
    let relay1 = mesh.new_node().set_parent(root).set_config(config(1)).build()?;
    let relay2 = mesh.new_node().set_parent(root).set_config(config(2)).build()?;
    let lossy = mesh
        .new_node()
        .set_parent(relay1)
        .add_candidate(relay2)
        .set_traffic(cmd.traffic)
        .set_config(config(3))
        .build()?;
    mesh.new_node()
        .set_parent(relay1)
        .add_candidate(relay2)
        .set_traffic(cmd.traffic)
        .set_config(config(4))
        .build()?;
    mesh.new_node()
        .set_parent(relay2)
        .set_traffic(cmd.traffic)
        .set_config(config(5))
        .build()?;

    println!(
        "{} nodes, {} packets per leaf and interval, threshold {}",
        mesh.len(),
        cmd.traffic,
        cmd.threshold
    );
    println!();
    println!("step delivered lost  congested  alternates");

    for step in 1..=cmd.steps {
        if step == cmd.degrade_at {
            mesh.configure_link(lossy, relay1)
                .set_delivery(cmd.delivery)
                .apply()?;
            println!("---- link {lossy}-{relay1} degraded to {}", cmd.delivery);
        }
        if step == cmd.recover_at {
            mesh.configure_link(lossy, relay1)
                .set_delivery(Delivery::ALL)
                .apply()?;
            println!("---- link {lossy}-{relay1} recovered");
        }

        let report = mesh.step();
        let stats = mesh.stats();

        let congested = list(
            report
                .ticks
                .iter()
                .filter(|(_, tick)| tick.verdict.self_congested)
                .map(|(id, _)| id.to_string()),
        );
        let alternates = list(stats.nodes.iter().filter_map(|node| {
            node.alternate
                .map(|alternate| format!("{}->{}", node.id, alternate))
        }));

        println!(
            "{step:>4} {:>9} {:>4}  [{congested:^7}]  [{alternates}]",
            report.delivered, report.lost
        );
    }

    println!();
    println!("node parent originated forwarded via-alt   lost  activations");
    for node in mesh.stats().nodes {
        let parent = node
            .parent
            .as_ref()
            .map_or_else(|| "-".to_owned(), NodeId::to_string);
        println!(
            "{:>4} {parent:>6} {:>10} {:>9} {:>7} {:>6} {:>12}",
            node.id,
            node.originated,
            node.forwarded,
            node.via_alternate,
            node.lost,
            node.multipath.activations,
        );
    }

    Ok(())
}
