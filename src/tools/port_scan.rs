use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{NetdashError, Result};

/// Ports probed when a scan request does not name any.
pub const DEFAULT_PORTS: &str = "22,80,443,3389,8080";

/// Parse a comma-separated port list such as `"22, 80,443"`.
pub fn parse_ports(spec: &str) -> Result<Vec<u16>> {
    spec.split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<u16>()
                .map_err(|_| NetdashError::InvalidPorts(part.to_string()))
        })
        .collect()
}

/// Probe each port in order with a bounded connect timeout and return
/// the ones that accepted.
///
/// Strictly sequential by design: one slow target costs at most
/// `probe_timeout` per port, and the simple loop keeps per-call resource
/// usage flat.
pub async fn scan(target: &str, ports: &[u16], probe_timeout: Duration) -> Vec<u16> {
    let mut open_ports = Vec::new();
    for &port in ports {
        match timeout(probe_timeout, TcpStream::connect((target, port))).await {
            Ok(Ok(_stream)) => {
                debug!("{target}:{port} is open");
                open_ports.push(port);
            }
            Ok(Err(_)) | Err(_) => {}
        }
    }
    open_ports
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn parses_a_trimmed_comma_separated_list() {
        assert_eq!(parse_ports("22, 80,443").unwrap(), vec![22, 80, 443]);
    }

    #[test]
    fn rejects_non_numeric_entries() {
        let err = parse_ports("22,http").unwrap_err();
        assert!(matches!(err, NetdashError::InvalidPorts(_)));
        assert!(err.to_string().contains("http"));
    }

    #[test]
    fn rejects_out_of_range_ports() {
        assert!(parse_ports("70000").is_err());
        assert!(parse_ports("").is_err());
    }

    #[tokio::test]
    async fn finds_only_the_listening_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open_port = listener.local_addr().unwrap().port();

        // Bind and immediately drop a second listener to get a port that
        // is very likely closed.
        let closed_port = {
            let spare = TcpListener::bind("127.0.0.1:0").await.unwrap();
            spare.local_addr().unwrap().port()
        };

        let open_ports = scan(
            "127.0.0.1",
            &[closed_port, open_port],
            Duration::from_millis(500),
        )
        .await;
        assert_eq!(open_ports, vec![open_port]);
    }
}
