//! Endpoint descriptors and their canonical accept strings

use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol suffix appended to every accept string
const URP_SUFFIX: &str = ";urp;";

/// Where a worker listens for URP connections.
///
/// The accept string rendered from a descriptor is matched verbatim against
/// live process command lines, so two workers must never share a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "lowercase")]
pub enum EndpointDescriptor {
    /// Named pipe
    Pipe { name: String },
    /// TCP socket
    Socket { host: String, port: u16 },
}

impl EndpointDescriptor {
    /// Named pipe endpoint
    pub fn pipe(name: impl Into<String>) -> Self {
        Self::Pipe { name: name.into() }
    }

    /// Socket endpoint
    pub fn socket(host: impl Into<String>, port: u16) -> Self {
        Self::Socket {
            host: host.into(),
            port,
        }
    }

    /// Socket endpoint on the loopback interface
    pub fn local_socket(port: u16) -> Self {
        Self::socket("127.0.0.1", port)
    }

    /// Canonical accept string, e.g. `pipe,name=office1;urp;`
    pub fn accept_string(&self) -> String {
        let mut accept = match self {
            Self::Pipe { name } => format!("pipe,name={}", name),
            Self::Socket { host, port } => format!("socket,host={},port={}", host, port),
        };
        accept.push_str(URP_SUFFIX);
        accept
    }

    /// Connection string used by clients bridging to the worker
    pub fn connect_string(&self) -> String {
        match self {
            Self::Pipe { name } => format!("pipe,name={}", name),
            Self::Socket { host, port } => {
                format!("socket,host={},port={},tcpNoDelay=1", host, port)
            }
        }
    }
}

impl fmt::Display for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.accept_string())
    }
}
