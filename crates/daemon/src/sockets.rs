// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Binds every listening socket the supervisor exposes: the client and PCP
//! Unix-domain sockets, plus zero or more INET sockets, one per
//! `listen_addresses` entry crossed with `{v4, v6}`.

use std::net::{IpAddr, SocketAddr};
use std::os::unix::fs::PermissionsExt;

use nix::sys::socket::{setsockopt, sockopt::Ipv6V6Only};
use pgsup_core::Config;
use tokio::net::{TcpListener, TcpSocket, UnixListener};

use crate::error::{DaemonError, Result};

/// Every socket the supervisor listens on once startup completes.
pub struct BoundSockets {
    pub client: UnixListener,
    pub pcp: UnixListener,
    pub inet: Vec<TcpListener>,
}

/// Unix-domain sockets are created mode 0777 and removed on exit (exit-time
/// cleanup is the caller's job, in `lifecycle::shutdown`).
fn bind_unix(path: &std::path::Path) -> Result<UnixListener> {
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    let listener = UnixListener::bind(path).map_err(|e| DaemonError::BindFailed(path.display().to_string(), e))?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o777))?;
    Ok(listener)
}

/// One INET listener per resolved address, with `SO_REUSEADDR` set before
/// bind. V6 sockets get `IPV6_V6ONLY` set explicitly: several platforms
/// default it off, in which case a `::`-style listener would also accept
/// v4-mapped connections and collide with a separate `0.0.0.0`-style
/// listener on the same port.
async fn bind_inet(addr: SocketAddr, backlog: u32) -> Result<TcpListener> {
    let socket = match addr.ip() {
        IpAddr::V4(_) => TcpSocket::new_v4()?,
        IpAddr::V6(_) => {
            let socket = TcpSocket::new_v6()?;
            setsockopt(&socket, Ipv6V6Only, &true)
                .map_err(|e| DaemonError::BindFailed(addr.to_string(), std::io::Error::from(e)))?;
            socket
        }
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr).map_err(|e| DaemonError::BindFailed(addr.to_string(), e))?;
    socket.listen(backlog).map_err(|e| DaemonError::BindFailed(addr.to_string(), e))
}

pub async fn bind_all(config: &Config) -> Result<BoundSockets> {
    let client = bind_unix(&config.client_socket_path())?;
    let pcp = bind_unix(&config.pcp_socket_path())?;

    let backlog = config.listen_backlog();
    let mut inet = Vec::new();
    for pattern in &config.listen_addresses {
        let host = if pattern == "*" { "0.0.0.0" } else { pattern.as_str() };
        let addrs = tokio::net::lookup_host((host, config.port))
            .await
            .map_err(|e| DaemonError::BindFailed(format!("{host}:{}", config.port), e))?;
        for addr in addrs {
            inet.push(bind_inet(addr, backlog).await?);
        }
    }

    Ok(BoundSockets { client, pcp, inet })
}

#[cfg(test)]
#[path = "sockets_tests.rs"]
mod tests;
