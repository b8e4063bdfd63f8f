// Listener module
// Binds the requested port, falling back to a free one

use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Create a `TcpListener` on `addr` with `SO_REUSEADDR` enabled.
///
/// `SO_REUSEPORT` is deliberately left off so that a port held by another
/// process is reported as taken.
pub fn create_listener(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

    // Allows rebinding a port still in TIME_WAIT after a restart
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(128)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}

/// Bind `addr`, or an OS-assigned port on the same host when it is unavailable
pub fn bind_available(addr: SocketAddr) -> std::io::Result<TcpListener> {
    match create_listener(addr) {
        Ok(listener) => Ok(listener),
        Err(e) if addr.port() != 0 => {
            crate::logger::log_warning(&format!(
                "Port {} is unavailable ({e}), selecting another port",
                addr.port()
            ));
            create_listener(SocketAddr::new(addr.ip(), 0))
        }
        Err(e) => Err(e),
    }
}
