use edge_node_agent::agent::heartbeat::HeartbeatExit;
use edge_node_agent::agent_start;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let env_file = args
        .windows(2)
        .find(|w| w[0] == "--env-file")
        .map(|w| w[1].clone());
    match agent_start(env_file.as_deref()).await? {
        HeartbeatExit::Killed => log::info!("Node killed by coordinator, exiting"),
        HeartbeatExit::Stopped => log::info!("Node stopped"),
    }
    Ok(())
}
