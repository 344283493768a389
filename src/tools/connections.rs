use std::net::IpAddr;
use std::sync::Arc;

use netstat2::{AddressFamilyFlags, ProtocolFlags, ProtocolSocketInfo, TcpState};
use parking_lot::Mutex;
use serde::Serialize;
use sysinfo::{ProcessesToUpdate, System};

use crate::error::{NetdashError, Result};

/// One established TCP connection with its owning process, when the OS
/// exposes it.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionEntry {
    pub local_addr: String,
    pub remote_addr: String,
    pub status: String,
    pub pid: Option<u32>,
    pub process_name: String,
}

/// List established TCP connections that have a remote peer.
///
/// Socket enumeration and the process-table refresh both touch the OS
/// synchronously, so callers run this on the blocking pool. The process
/// table is shared across calls to avoid rebuilding it per request.
pub fn list(process_table: &Arc<Mutex<System>>) -> Result<Vec<ConnectionEntry>> {
    let address_families = AddressFamilyFlags::IPV4 | AddressFamilyFlags::IPV6;
    let sockets = netstat2::get_sockets_info(address_families, ProtocolFlags::TCP)
        .map_err(|e| NetdashError::Connections(e.to_string()))?;

    let mut system = process_table.lock();
    system.refresh_processes(ProcessesToUpdate::All, true);

    let mut connections = Vec::new();
    for socket in sockets {
        let ProtocolSocketInfo::Tcp(tcp) = &socket.protocol_socket_info else {
            continue;
        };
        if tcp.state != TcpState::Established
            || is_unspecified_peer(tcp.remote_addr, tcp.remote_port)
        {
            continue;
        }

        let pid = socket.associated_pids.first().copied();
        let process_name = pid
            .and_then(|pid| system.process(sysinfo::Pid::from_u32(pid)))
            .map(|process| process.name().to_string_lossy().into_owned())
            .unwrap_or_else(|| "N/A".to_string());

        connections.push(ConnectionEntry {
            local_addr: format!("{}:{}", tcp.local_addr, tcp.local_port),
            remote_addr: format!("{}:{}", tcp.remote_addr, tcp.remote_port),
            status: "ESTABLISHED".to_string(),
            pid,
            process_name,
        });
    }
    Ok(connections)
}

/// Listening and half-set-up sockets report an all-zero peer; they are
/// not conversations worth showing.
fn is_unspecified_peer(addr: IpAddr, port: u16) -> bool {
    port == 0 || addr.is_unspecified()
}
