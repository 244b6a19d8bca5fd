//! Run a single command and print the rows

use rosapi::{Client, Command};

#[tokio::main]
async fn main() -> rosapi::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // Change to your router
    let addr = std::env::var("ROUTER_ADDR").unwrap_or_else(|_| "192.168.88.1".to_string());
    let user = std::env::var("ROUTER_USER").unwrap_or_else(|_| "admin".to_string());
    let password = std::env::var("ROUTER_PASSWORD").unwrap_or_default();

    println!("Connecting to {}...", addr);
    let client = Client::dial(addr, rosapi::DEFAULT_PORT, &user, &password).await?;

    let command = Command::new("/ip/address/print").proplist(&["address", "interface"]);
    let reply = client.run_command(command).await?;

    for row in reply.rows() {
        println!(
            "{:<20} {}",
            row.get("address").map(String::as_str).unwrap_or("-"),
            row.get("interface").map(String::as_str).unwrap_or("-")
        );
    }

    client.close().await;
    Ok(())
}
