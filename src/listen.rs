//! Listening socket selection and binding.
//!
//! [`resolve`] turns CLI/env overrides and the config file into a single
//! [`ListenTarget`], in priority order:
//!
//! 1. `LISTEN_FDS=1`: an inherited socket on fd 3 (systemd socket activation)
//! 2. a unix socket path (`--socket` / `SLACKMUX_SOCKET`, else `unixSocket`)
//! 3. a host and port (`--interface` / `--port`, else `interface` / `port`,
//!    else `localhost:8080`)
//!
//! The choice only affects how connections arrive; request handling is
//! the same router in every case.

use std::fmt;
use std::path::PathBuf;

use tokio::net::TcpListener;
#[cfg(unix)]
use tokio::net::UnixListener;

use crate::config::model::Config;
use crate::error::SlackmuxError;

/// First file descriptor passed by systemd socket activation.
pub const SD_LISTEN_FDS_START: i32 = 3;
pub const DEFAULT_INTERFACE: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8080;

/// Startup switches that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ListenOverrides {
    pub listen_fds: Option<u32>,
    pub socket: Option<PathBuf>,
    pub interface: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenTarget {
    Inherited { fd: i32 },
    Unix(PathBuf),
    Tcp { host: String, port: u16 },
}

impl fmt::Display for ListenTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inherited { fd } => write!(f, "fd://{fd}"),
            Self::Unix(path) => write!(f, "unix://{}", path.display()),
            Self::Tcp { host, port } => write!(f, "{host}:{port}"),
        }
    }
}

#[must_use]
pub fn resolve(overrides: &ListenOverrides, config: &Config) -> ListenTarget {
    if overrides.listen_fds == Some(1) {
        return ListenTarget::Inherited {
            fd: SD_LISTEN_FDS_START,
        };
    }

    if let Some(path) = overrides.socket.as_ref().or(config.unix_socket.as_ref()) {
        return ListenTarget::Unix(path.clone());
    }

    let host = overrides
        .interface
        .as_deref()
        .or(config.interface.as_deref())
        .unwrap_or(DEFAULT_INTERFACE)
        .to_string();
    // Port 0 from the environment means "unset", matching the file default
    let port = overrides
        .port
        .filter(|p| *p != 0)
        .or(config.port)
        .unwrap_or(DEFAULT_PORT);

    ListenTarget::Tcp { host, port }
}

pub enum BoundListener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener),
}

pub async fn bind(target: &ListenTarget) -> Result<BoundListener, SlackmuxError> {
    match target {
        ListenTarget::Inherited { fd } => inherit(*fd),
        #[cfg(unix)]
        ListenTarget::Unix(path) => Ok(BoundListener::Unix(UnixListener::bind(path)?)),
        #[cfg(not(unix))]
        ListenTarget::Unix(_) => Err(SlackmuxError::Io(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "unix sockets are not supported on this platform",
        ))),
        ListenTarget::Tcp { host, port } => {
            Ok(BoundListener::Tcp(TcpListener::bind((host.as_str(), *port)).await?))
        }
    }
}

#[cfg(unix)]
fn inherit(fd: i32) -> Result<BoundListener, SlackmuxError> {
    use std::os::fd::{FromRawFd, IntoRawFd};

    // SAFETY: LISTEN_FDS=1 is the service manager's promise that `fd` is an
    // open listening socket handed to this process and owned by nobody else.
    let tcp = unsafe { std::net::TcpListener::from_raw_fd(fd) };

    // getsockname on an AF_UNIX socket does not yield an inet address
    if tcp.local_addr().is_ok() {
        tcp.set_nonblocking(true)?;
        return Ok(BoundListener::Tcp(TcpListener::from_std(tcp)?));
    }

    // SAFETY: ownership of the same descriptor moves out of `tcp` unchanged.
    let unix = unsafe { std::os::unix::net::UnixListener::from_raw_fd(tcp.into_raw_fd()) };
    unix.local_addr()?;
    unix.set_nonblocking(true)?;
    Ok(BoundListener::Unix(UnixListener::from_std(unix)?))
}

#[cfg(not(unix))]
fn inherit(_fd: i32) -> Result<BoundListener, SlackmuxError> {
    Err(SlackmuxError::SocketActivationUnsupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(unix_socket: Option<&str>, interface: Option<&str>, port: Option<u16>) -> Config {
        Config {
            unix_socket: unix_socket.map(PathBuf::from),
            interface: interface.map(String::from),
            port,
            ..Config::default()
        }
    }

    #[test]
    fn defaults_to_localhost_8080() {
        let target = resolve(&ListenOverrides::default(), &Config::default());
        assert_eq!(
            target,
            ListenTarget::Tcp {
                host: "localhost".into(),
                port: 8080
            }
        );
        assert_eq!(target.to_string(), "localhost:8080");
    }

    #[test]
    fn socket_activation_wins() {
        let overrides = ListenOverrides {
            listen_fds: Some(1),
            socket: Some("/run/override.sock".into()),
            ..ListenOverrides::default()
        };
        let config = config_with(Some("/run/slackmux.sock"), Some("0.0.0.0"), Some(9000));
        assert_eq!(
            resolve(&overrides, &config),
            ListenTarget::Inherited { fd: 3 }
        );
    }

    #[test]
    fn multiple_inherited_fds_are_ignored() {
        let overrides = ListenOverrides {
            listen_fds: Some(2),
            ..ListenOverrides::default()
        };
        assert!(matches!(
            resolve(&overrides, &Config::default()),
            ListenTarget::Tcp { .. }
        ));
    }

    #[test]
    fn socket_override_beats_config_socket() {
        let overrides = ListenOverrides {
            socket: Some("/run/override.sock".into()),
            ..ListenOverrides::default()
        };
        let config = config_with(Some("/run/slackmux.sock"), None, None);
        assert_eq!(
            resolve(&overrides, &config),
            ListenTarget::Unix("/run/override.sock".into())
        );
        assert_eq!(
            resolve(&ListenOverrides::default(), &config),
            ListenTarget::Unix("/run/slackmux.sock".into())
        );
    }

    #[test]
    fn config_socket_beats_host_and_port() {
        let config = config_with(Some("/run/slackmux.sock"), Some("0.0.0.0"), Some(9000));
        assert!(matches!(
            resolve(&ListenOverrides::default(), &config),
            ListenTarget::Unix(_)
        ));
    }

    #[test]
    fn host_and_port_layering() {
        let config = config_with(None, Some("0.0.0.0"), Some(9000));
        assert_eq!(
            resolve(&ListenOverrides::default(), &config),
            ListenTarget::Tcp {
                host: "0.0.0.0".into(),
                port: 9000
            }
        );

        let overrides = ListenOverrides {
            interface: Some("127.0.0.1".into()),
            port: Some(7000),
            ..ListenOverrides::default()
        };
        assert_eq!(
            resolve(&overrides, &config),
            ListenTarget::Tcp {
                host: "127.0.0.1".into(),
                port: 7000
            }
        );

        let zero_port = ListenOverrides {
            port: Some(0),
            ..ListenOverrides::default()
        };
        assert_eq!(
            resolve(&zero_port, &config),
            ListenTarget::Tcp {
                host: "0.0.0.0".into(),
                port: 9000
            }
        );
    }

    #[tokio::test]
    async fn binds_tcp_target() {
        let target = ListenTarget::Tcp {
            host: "127.0.0.1".into(),
            port: 0,
        };
        let BoundListener::Tcp(listener) = bind(&target).await.unwrap() else {
            panic!("expected a TCP listener");
        };
        assert!(listener.local_addr().unwrap().port() > 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn binds_unix_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slackmux.sock");
        let listener = bind(&ListenTarget::Unix(path.clone())).await.unwrap();
        assert!(matches!(listener, BoundListener::Unix(_)));
        assert!(path.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn inherits_tcp_descriptor() {
        use std::os::fd::IntoRawFd;

        let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = std_listener.local_addr().unwrap();
        let fd = std_listener.into_raw_fd();

        let BoundListener::Tcp(listener) = bind(&ListenTarget::Inherited { fd }).await.unwrap()
        else {
            panic!("expected a TCP listener");
        };
        assert_eq!(listener.local_addr().unwrap(), addr);

        let _client = tokio::net::TcpStream::connect(addr).await.unwrap();
        assert!(listener.accept().await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn inherits_unix_descriptor() {
        use std::os::fd::IntoRawFd;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activated.sock");
        let fd = std::os::unix::net::UnixListener::bind(&path)
            .unwrap()
            .into_raw_fd();

        let BoundListener::Unix(listener) = bind(&ListenTarget::Inherited { fd }).await.unwrap()
        else {
            panic!("expected a unix listener");
        };

        let _client = tokio::net::UnixStream::connect(&path).await.unwrap();
        assert!(listener.accept().await.is_ok());
    }
}
