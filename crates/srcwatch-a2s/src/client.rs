//! A2S query client.

use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::net::{lookup_host, UdpSocket};
use tracing::{debug, trace};

use crate::error::A2sError;
use crate::info::ServerInfo;
use crate::packet::{decode_response, encode_info_request, Response};

/// Default time to wait for each reply datagram.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest datagram a Source server sends without splitting.
const MAX_PACKET_SIZE: usize = 1400;

/// Challenge round-trips allowed before a query is abandoned.
const MAX_CHALLENGE_ROUNDS: usize = 3;

#[derive(Debug)]
struct Target {
    host: String,
    port: u16,
    /// Address the socket is currently connected to.
    addr: SocketAddr,
}

/// Queries a single game server for A2S_INFO.
///
/// Call [`A2sClient::set_target`] once, then [`A2sClient::info`] as often
/// as needed. Queries are strictly sequential (`&mut self`).
#[derive(Debug)]
pub struct A2sClient {
    timeout: Duration,
    target: Option<Target>,
    socket: Option<UdpSocket>,
}

impl A2sClient {
    /// Create a client with no target.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            target: None,
            socket: None,
        }
    }

    /// Per-reply timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The configured host and port, if any.
    pub fn target(&self) -> Option<(&str, u16)> {
        self.target.as_ref().map(|t| (t.host.as_str(), t.port))
    }

    /// Point the client at `host:port`.
    ///
    /// Fails with [`A2sError::InvalidTarget`] when the host is empty or
    /// does not resolve.
    pub async fn set_target(&mut self, host: &str, port: u16) -> Result<(), A2sError> {
        let addr = resolve(host, port, self.timeout).await?;
        let socket = connect_socket(addr).await?;

        debug!(%host, port, %addr, "a2s target set");

        self.target = Some(Target {
            host: host.to_string(),
            port,
            addr,
        });
        self.socket = Some(socket);
        Ok(())
    }

    /// Run one A2S_INFO query against the target.
    pub async fn info(&mut self) -> Result<ServerInfo, A2sError> {
        let timeout = self.timeout;
        let socket = self.refresh_socket().await?;

        let mut challenge = None;
        for _ in 0..MAX_CHALLENGE_ROUNDS {
            discard_stale_replies(socket)?;
            socket.send(&encode_info_request(challenge)).await?;

            let mut buf = [0u8; MAX_PACKET_SIZE];
            let len = tokio::time::timeout(timeout, socket.recv(&mut buf))
                .await
                .map_err(|_| A2sError::Timeout(timeout))??;

            match decode_response(&buf[..len])? {
                Response::Info(info) => return Ok(info),
                Response::Challenge(value) => {
                    trace!("a2s challenge received");
                    challenge = Some(value);
                }
            }
        }

        Err(A2sError::TooManyChallenges)
    }

    /// Drop the socket and forget the target.
    pub fn close(&mut self) {
        if let Some(target) = self.target.take() {
            debug!(host = %target.host, port = target.port, "a2s client closed");
        }
        self.socket = None;
    }

    /// Re-resolve the target and reconnect the socket if its address moved.
    async fn refresh_socket(&mut self) -> Result<&UdpSocket, A2sError> {
        let target = self.target.as_mut().ok_or(A2sError::NoTarget)?;
        let addr = resolve(&target.host, target.port, self.timeout).await?;

        if addr != target.addr || self.socket.is_none() {
            if addr != target.addr {
                debug!(
                    host = %target.host,
                    old = %target.addr,
                    new = %addr,
                    "a2s target address changed"
                );
            }
            self.socket = Some(connect_socket(addr).await?);
            target.addr = addr;
        }

        self.socket.as_ref().ok_or(A2sError::NoTarget)
    }
}

impl Default for A2sClient {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

async fn resolve(host: &str, port: u16, timeout: Duration) -> Result<SocketAddr, A2sError> {
    if host.trim().is_empty() {
        return Err(A2sError::InvalidTarget {
            host: host.to_string(),
            reason: "host is empty".to_string(),
        });
    }

    first_address(host, timeout, lookup_host((host, port))).await
}

/// First address produced by `lookup`, which must finish within `timeout`.
async fn first_address<F, I>(host: &str, timeout: Duration, lookup: F) -> Result<SocketAddr, A2sError>
where
    F: Future<Output = io::Result<I>>,
    I: Iterator<Item = SocketAddr>,
{
    let mut addrs = tokio::time::timeout(timeout, lookup)
        .await
        .map_err(|_| A2sError::Timeout(timeout))?
        .map_err(|e| A2sError::InvalidTarget {
            host: host.to_string(),
            reason: e.to_string(),
        })?;

    addrs.next().ok_or_else(|| A2sError::InvalidTarget {
        host: host.to_string(),
        reason: "no addresses found".to_string(),
    })
}

/// Drop datagrams that arrived after an earlier query gave up on them, so a
/// late answer is never read as the reply to a new query.
fn discard_stale_replies(socket: &UdpSocket) -> Result<(), A2sError> {
    let mut buf = [0u8; MAX_PACKET_SIZE];
    loop {
        match socket.try_recv(&mut buf) {
            Ok(len) => trace!(len, "discarded stale a2s reply"),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
            // ICMP unreachable left over from an earlier send.
            Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {}
            Err(e) => return Err(e.into()),
        }
    }
}

async fn connect_socket(addr: SocketAddr) -> Result<UdpSocket, A2sError> {
    let local: SocketAddr = if addr.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(local).await?;
    socket.connect(addr).await?;
    Ok(socket)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::sample_info_reply;

    /// Bind a fake server on loopback and return it with its port.
    async fn fake_server() -> (UdpSocket, u16) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        (socket, port)
    }

    #[tokio::test]
    async fn info_without_challenge() {
        let (server, port) = fake_server().await;

        let responder = tokio::spawn(async move {
            let mut buf = [0u8; 1500];
            let (len, peer) = server.recv_from(&mut buf).await.unwrap();
            assert_eq!(&buf[..len], &encode_info_request(None)[..]);
            server.send_to(&sample_info_reply(), peer).await.unwrap();
        });

        let mut client = A2sClient::new(Duration::from_secs(2));
        client.set_target("127.0.0.1", port).await.unwrap();
        let info = client.info().await.unwrap();

        assert_eq!(info.name, "srcwatch test");
        assert_eq!(info.map, "de_dust2");
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn info_answers_challenge() {
        let (server, port) = fake_server().await;
        let challenge = [9, 8, 7, 6];

        let responder = tokio::spawn(async move {
            let mut buf = [0u8; 1500];

            let (_, peer) = server.recv_from(&mut buf).await.unwrap();
            let mut reply = vec![0xFF, 0xFF, 0xFF, 0xFF, 0x41];
            reply.extend_from_slice(&challenge);
            server.send_to(&reply, peer).await.unwrap();

            let (len, peer) = server.recv_from(&mut buf).await.unwrap();
            assert_eq!(&buf[..len], &encode_info_request(Some(challenge))[..]);
            server.send_to(&sample_info_reply(), peer).await.unwrap();
        });

        let mut client = A2sClient::new(Duration::from_secs(2));
        client.set_target("127.0.0.1", port).await.unwrap();
        let info = client.info().await.unwrap();

        assert_eq!(info.players, 12);
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn endless_challenges_give_up() {
        let (server, port) = fake_server().await;

        tokio::spawn(async move {
            let mut buf = [0u8; 1500];
            loop {
                let (_, peer) = server.recv_from(&mut buf).await.unwrap();
                let reply = [0xFF, 0xFF, 0xFF, 0xFF, 0x41, 1, 1, 1, 1];
                server.send_to(&reply, peer).await.unwrap();
            }
        });

        let mut client = A2sClient::new(Duration::from_secs(2));
        client.set_target("127.0.0.1", port).await.unwrap();
        assert!(matches!(
            client.info().await,
            Err(A2sError::TooManyChallenges)
        ));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        // Bound but never answers.
        let (_server, port) = fake_server().await;

        let mut client = A2sClient::new(Duration::from_millis(100));
        client.set_target("127.0.0.1", port).await.unwrap();

        match client.info().await {
            Err(A2sError::Timeout(t)) => assert_eq!(t, Duration::from_millis(100)),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn late_reply_does_not_answer_next_query() {
        let (server, port) = fake_server().await;

        let responder = tokio::spawn(async move {
            let mut buf = [0u8; 1500];
            let (_, peer) = server.recv_from(&mut buf).await.unwrap();
            tokio::time::sleep(Duration::from_millis(200)).await;
            server.send_to(&sample_info_reply(), peer).await.unwrap();
            // Silent from here on.
            loop {
                let _ = server.recv_from(&mut buf).await;
            }
        });

        let mut client = A2sClient::new(Duration::from_millis(100));
        client.set_target("127.0.0.1", port).await.unwrap();

        assert!(matches!(client.info().await, Err(A2sError::Timeout(_))));
        // Let the late reply land in the socket's queue.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(matches!(client.info().await, Err(A2sError::Timeout(_))));

        responder.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_lookup_times_out() {
        let lookup = std::future::pending::<io::Result<std::vec::IntoIter<SocketAddr>>>();

        match first_address("srcds.internal", Duration::from_secs(5), lookup).await {
            Err(A2sError::Timeout(t)) => assert_eq!(t, Duration::from_secs(5)),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn lookup_without_addresses_is_invalid_target() {
        let lookup = async { Ok(Vec::<SocketAddr>::new().into_iter()) };

        assert!(matches!(
            first_address("srcds.internal", Duration::from_secs(5), lookup).await,
            Err(A2sError::InvalidTarget { .. })
        ));
    }

    #[tokio::test]
    async fn empty_host_is_invalid_target() {
        let mut client = A2sClient::default();
        assert!(matches!(
            client.set_target("  ", 27015).await,
            Err(A2sError::InvalidTarget { .. })
        ));
        assert!(client.target().is_none());
    }

    #[tokio::test]
    async fn query_without_target_fails() {
        let mut client = A2sClient::default();
        assert!(matches!(client.info().await, Err(A2sError::NoTarget)));
    }

    #[tokio::test]
    async fn close_forgets_target() {
        let (_server, port) = fake_server().await;

        let mut client = A2sClient::default();
        client.set_target("127.0.0.1", port).await.unwrap();
        assert_eq!(client.target(), Some(("127.0.0.1", port)));

        client.close();
        assert!(client.target().is_none());
        assert!(matches!(client.info().await, Err(A2sError::NoTarget)));
    }
}
