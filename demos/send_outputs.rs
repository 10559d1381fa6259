//! Example: Staging a model output and sending it to two nodes
//!
//! Run with: cargo run --example send_outputs
//!
//! Set `RUST_LOG=debug` to see every read and write.
//!
//! This example demonstrates:
//! - Staging a model output document and reading it back
//! - Connecting and resolving two nodes
//! - Sending values one node at a time and as a concurrent batch
//! - Guaranteed teardown with `Connector::session`

use opcua_bridge::payload::{dump_output, retrieve_message};
use opcua_bridge::{Connector, ConnectorConfig, MemoryClient, Message, Model};
use tracing_subscriber::EnvFilter;

const NODES: [&str; 2] = ["ns=2;i=2", "ns=2;i=4"];

#[tokio::main]
async fn main() -> opcua_bridge::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // =========================================================================
    // Stage the output
    // =========================================================================

    let dir = std::env::temp_dir().join("opcua-bridge-demo");
    std::fs::create_dir_all(&dir)?;
    let output_path = dir.join("output.json");

    dump_output("CC", vec![100, 200], Some(&output_path))?;
    let message = retrieve_message(&output_path, None)?;
    println!("Data from JSON file: {:?}", message);

    // =========================================================================
    // Connect
    // =========================================================================

    // Stands in for the local test server with two writable variables.
    let client = MemoryClient::new()
        .with_node(NODES[0], "abcxyz")
        .with_node(NODES[1], "12345");
    let config = ConnectorConfig::new("opc.tcp://localhost:4840")?.with_nodes(NODES)?;
    let mut connector = Connector::with_client(client, config);

    if connector.connect().await {
        let outcome = send_one_by_one(&connector, &message).await;
        connector.disconnect().await;
        outcome?;
    }

    // =========================================================================
    // Batch send inside a scoped session
    // =========================================================================

    let client = MemoryClient::new()
        .with_node(NODES[0], 0)
        .with_node(NODES[1], 0);
    let config = ConnectorConfig::new("opc.tcp://localhost:4840")?.with_nodes(NODES)?;
    let mut connector = Connector::with_client(client, config);

    connector
        .session(move |c| {
            Box::pin(async move {
                Model::attached("CC", c).send(message, [0, 1]).await?;
                print_values(c, "after batch send").await
            })
        })
        .await?;

    println!("Connected after session: {}", connector.is_connected());
    Ok(())
}

async fn send_one_by_one(
    connector: &Connector<MemoryClient>,
    message: &Message,
) -> opcua_bridge::Result<()> {
    print_values(connector, "before").await?;

    let model = Model::attached("CC", connector);
    if let Message::Sequence(values) = message {
        for (index, value) in values.iter().enumerate() {
            model.send(value.clone(), index).await?;
            print_values(connector, &format!("after send {index}")).await?;
        }
    }
    Ok(())
}

async fn print_values(
    connector: &Connector<MemoryClient>,
    label: &str,
) -> opcua_bridge::Result<()> {
    for (index, id) in connector.node_ids().iter().enumerate() {
        println!("Value {label} of {id}: {}", connector.read_value(index).await?);
    }
    println!();
    Ok(())
}
