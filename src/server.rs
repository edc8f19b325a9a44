use crate::config::Config;
use crate::resp::{self, DecodeError};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

/// Fixed acknowledgement sent for every decoded request. The command layer
/// that would dispatch on the decoded value does not exist yet.
const ACK: &[u8] = b"+PONG\r\n";

pub async fn run_server(config: Config) -> std::io::Result<()> {
    let addr = format!("{}:{}", config.bind, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Minnow server listening on {addr}");

    // Accept loop with graceful shutdown on ctrl-c
    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = result?;
                debug!("New connection from {peer_addr}");

                let timeout = config.timeout;
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, timeout).await {
                        debug!("Connection error from {peer_addr}: {e}");
                    }
                    debug!("Connection closed: {peer_addr}");
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down...");
                return Ok(());
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, timeout: u64) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    loop {
        let decoded = if timeout > 0 {
            match tokio::time::timeout(Duration::from_secs(timeout), resp::decode(&mut reader))
                .await
            {
                Ok(result) => result,
                Err(_) => {
                    debug!("Client idle past {timeout}s deadline, closing");
                    return Ok(());
                }
            }
        } else {
            resp::decode(&mut reader).await
        };

        match decoded {
            Ok(value) => {
                debug!(?value, "Decoded request");
                write_half.write_all(ACK).await?;
            }
            // The client closed the stream, either cleanly between requests
            // or mid-value; nothing left to answer.
            Err(DecodeError::IncompleteStream) => return Ok(()),
            Err(DecodeError::Io(e)) => return Err(e),
            Err(e @ (DecodeError::UnknownType(_) | DecodeError::MalformedLength(_))) => {
                // The stream is mid-message with no way to resynchronize.
                debug!("Protocol error, closing: {e}");
                return Ok(());
            }
        }
    }
}
