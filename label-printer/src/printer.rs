//! Printer adapters for sending raster data
//!
//! Supports:
//! - Device printers (USB printer class device or spool file, e.g. `/dev/usb/lp0`)
//! - Network printers (TCP port 9100)

use crate::error::{PrintError, PrintResult};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{info, instrument, warn};

/// Trait for printer adapters
#[allow(async_fn_in_trait)]
pub trait Printer {
    /// Send a complete raster job to the printer
    ///
    /// Returns only after every byte has been handed to the transport.
    async fn print(&self, data: &[u8]) -> PrintResult<()>;

    /// Check if the printer is online/reachable
    async fn is_online(&self) -> bool;
}

/// Device printer
///
/// The device file is opened fresh for every job and closed afterwards.
/// It is never created: a missing device means the printer is unplugged.
#[derive(Debug, Clone)]
pub struct DevicePrinter {
    path: PathBuf,
}

impl DevicePrinter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the device path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Printer for DevicePrinter {
    #[instrument(skip(data), fields(path = %self.path.display(), data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)
            .await
            .map_err(|e| PrintError::Offline(format!("{}: {}", self.path.display(), e)))?;

        file.write_all(data).await.map_err(|e| {
            PrintError::Io(std::io::Error::new(
                e.kind(),
                format!("Write failed: {}", e),
            ))
        })?;

        file.flush().await?;

        info!("Print job written");
        Ok(())
    }

    #[instrument(fields(path = %self.path.display()))]
    async fn is_online(&self) -> bool {
        match OpenOptions::new().write(true).open(&self.path).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "Printer device unavailable");
                false
            }
        }
    }
}

/// Network printer (TCP port 9100)
///
/// Networked QL models accept raw raster jobs on port 9100.
#[derive(Debug, Clone)]
pub struct NetworkPrinter {
    addr: SocketAddr,
    timeout: Duration,
}

impl NetworkPrinter {
    /// Create a new network printer
    pub fn new(host: &str, port: u16) -> PrintResult<Self> {
        Self::from_addr(&format!("{}:{}", host, port))
    }

    /// Create from a socket address string (e.g., "192.168.1.100:9100")
    pub fn from_addr(addr: &str) -> PrintResult<Self> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|_| PrintError::InvalidConfig(format!("Invalid address: {}", addr)))?;

        Ok(Self {
            addr,
            timeout: Duration::from_secs(5),
        })
    }

    /// Set connection timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the printer address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Printer for NetworkPrinter {
    #[instrument(skip(data), fields(addr = %self.addr, data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        info!("Connecting to printer");

        let mut stream = tokio::time::timeout(self.timeout, TcpStream::connect(self.addr))
            .await
            .map_err(|_| PrintError::Timeout(format!("Connection timeout: {}", self.addr)))?
            .map_err(|e| PrintError::Connection(format!("{}: {}", self.addr, e)))?;

        info!("Connected, sending {} bytes", data.len());

        stream.write_all(data).await.map_err(|e| {
            PrintError::Io(std::io::Error::new(
                e.kind(),
                format!("Write failed: {}", e),
            ))
        })?;

        stream.flush().await?;
        stream.shutdown().await?;

        info!("Print job sent successfully");
        Ok(())
    }

    #[instrument(fields(addr = %self.addr))]
    async fn is_online(&self) -> bool {
        let check_timeout = Duration::from_millis(500);

        match tokio::time::timeout(check_timeout, TcpStream::connect(self.addr)).await {
            Ok(Ok(_)) => {
                info!("Printer online");
                true
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Printer offline");
                false
            }
            Err(_) => {
                warn!("Printer check timeout");
                false
            }
        }
    }
}

/// Printer selected from a configured `printer_path`
///
/// `tcp://host:port` selects a network printer, anything else is a device path.
#[derive(Debug, Clone)]
pub enum Transport {
    Device(DevicePrinter),
    Network(NetworkPrinter),
}

impl Transport {
    pub fn from_path(path: &str) -> PrintResult<Self> {
        let path = path.trim();
        if path.is_empty() {
            return Err(PrintError::InvalidConfig("printer_path is empty".to_string()));
        }
        match path.strip_prefix("tcp://") {
            Some(addr) if addr.contains(':') => Ok(Self::Network(NetworkPrinter::from_addr(addr)?)),
            Some(host) => Ok(Self::Network(NetworkPrinter::new(host, 9100)?)),
            None => Ok(Self::Device(DevicePrinter::new(path))),
        }
    }
}

impl Printer for Transport {
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        match self {
            Transport::Device(p) => p.print(data).await,
            Transport::Network(p) => p.print(data).await,
        }
    }

    async fn is_online(&self) -> bool {
        match self {
            Transport::Device(p) => p.is_online().await,
            Transport::Network(p) => p.is_online().await,
        }
    }
}
