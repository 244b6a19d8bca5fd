//! Follow interface changes for a while, in async mode

use std::time::Duration;

use rosapi::{Client, ClientConfig, Connector, TcpTransport};

#[tokio::main]
async fn main() -> rosapi::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let addr = std::env::var("ROUTER_ADDR").unwrap_or_else(|_| "192.168.88.1".to_string());
    let password = std::env::var("ROUTER_PASSWORD").unwrap_or_default();

    let config = ClientConfig::default()
        .with_timeout(Duration::from_secs(10))
        .with_async(true);
    let transport = TcpTransport::new(addr, rosapi::DEFAULT_PORT);
    println!("Connecting to {}...", transport.remote_addr());

    let client = Client::dial_with(&transport, "admin", &password, config).await?;

    // Commands may run while the listen is active
    let identity = client.run(&["/system/identity/print"]).await?;
    println!("Identity: {:?}", identity.rows().next().and_then(|r| r.get("name")));

    let mut listen = client.listen(&["/interface/listen"]).await?;
    let stop = tokio::time::sleep(Duration::from_secs(30));
    tokio::pin!(stop);
    let mut cancelled = false;

    loop {
        tokio::select! {
            _ = &mut stop, if !cancelled => {
                listen.cancel().await?;
                cancelled = true;
            }
            row = listen.recv() => match row {
                Some(row) => println!("{}", row?),
                None => break,
            },
        }
    }

    client.close().await;
    Ok(())
}
