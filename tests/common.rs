//! Test utilities & fixtures.
//! Starts an in-process server on an ephemeral port and offers a
//! line-oriented test client with read timeouts.

use std::net::SocketAddr;
use std::time::Duration;

use netbbs::bbs::BbsServer;
use netbbs::config::{Config, GroupConfig};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Two small groups, deterministic names, default backfill of 2.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.groups = vec![
        GroupConfig {
            id: 1,
            name: "Group 1".to_string(),
        },
        GroupConfig {
            id: 2,
            name: "Group 2".to_string(),
        },
    ];
    config
}

/// Bind an ephemeral port, run the server on it in the background, and
/// return the address clients should connect to.
pub async fn start_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let server = BbsServer::new(test_config());
    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });
    addr
}

pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    /// Connect and consume the WELCOME/GROUPS greeting.
    pub async fn connect(addr: SocketAddr) -> Self {
        let mut client = Self::connect_raw(addr).await;
        assert_eq!(client.recv().await, "WELCOME");
        let groups = client.recv().await;
        assert!(
            groups.starts_with("GROUPS "),
            "unexpected greeting: {groups}"
        );
        client
    }

    /// Connect without consuming the greeting.
    pub async fn connect_raw(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        let (reader, writer) = stream.into_split();
        TestClient {
            reader: BufReader::new(reader),
            writer,
        }
    }

    pub async fn send(&mut self, line: &str) {
        self.writer
            .write_all(line.as_bytes())
            .await
            .expect("write line");
        self.writer.write_all(b"\n").await.expect("write newline");
    }

    /// Read one line, failing the test after a timeout instead of hanging it.
    pub async fn recv(&mut self) -> String {
        let mut line = String::new();
        let bytes = timeout(READ_TIMEOUT, self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for line")
            .expect("read line");
        assert!(bytes > 0, "connection closed while waiting for line");
        line.trim_end_matches(['\r', '\n']).to_string()
    }

    /// Send one command and return the next reply line.
    pub async fn request(&mut self, line: &str) -> String {
        self.send(line).await;
        self.recv().await
    }

    pub async fn login(&mut self, name: &str) {
        assert_eq!(self.request(&format!("LOGIN {name}")).await, "OK LOGIN");
    }

    /// Wait for the server to close the stream.
    #[allow(dead_code)]
    pub async fn expect_closed(&mut self) {
        let mut line = String::new();
        let bytes = timeout(READ_TIMEOUT, self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for close")
            .expect("read at close");
        assert_eq!(bytes, 0, "expected close, got line: {line}");
    }
}
