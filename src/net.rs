use anyhow::{Context, Result};
use log::trace;
use nix::poll::{poll, PollFd, PollFlags};
use socket2::{Socket, Domain, Type, Protocol};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use crate::traits::{DatagramSource, Readiness};

pub const DEFAULT_PORT: u16 = 5000;

/// Create a blocking UDP socket bound to every local IPv4 address on `port`.
/// Port 0 picks an ephemeral port.
pub fn create_listen_socket(port: u16) -> Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .context("opening datagram socket")?;

    let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port);
    socket
        .bind(&addr.into())
        .with_context(|| format!("binding datagram socket to {}", addr))?;

    socket.set_nonblocking(false)?;

    Ok(socket.into())
}

/// Probe socket with a `poll(2)` based readiness wait.
pub struct UdpListener {
    socket: UdpSocket,
}

impl UdpListener {
    pub fn bind(port: u16) -> Result<Self> {
        Ok(UdpListener {
            socket: create_listen_socket(port)?,
        })
    }

    pub fn from_socket(socket: UdpSocket) -> Self {
        UdpListener { socket }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl DatagramSource for UdpListener {
    fn wait_readable(&mut self, timeout: Duration) -> Result<Readiness> {
        let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;
        let mut fds = [PollFd::new(&self.socket, PollFlags::POLLIN)];

        // A single descriptor: any ready count means it is ours. Error
        // conditions also wake poll and surface from the following recv.
        let ready = poll(&mut fds, timeout_ms).context("select")?;
        if ready > 0 {
            Ok(Readiness::Readable)
        } else {
            Ok(Readiness::TimedOut)
        }
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize> {
        let (size, src) = self
            .socket
            .recv_from(buf)
            .context("receiving datagram packet")?;
        trace!("{} bytes from {}", size, src);
        Ok(size)
    }
}
