use crate::{ConnectError, ConnectionStringBuilder};

/// Factory for opening SQL Server connections.
///
/// The dialog never talks to a connection stack directly; it goes through
/// this seam so tests can substitute a deterministic fake.
pub trait Driver: Send + Sync {
    /// Human-readable name for UI display (e.g., "SQL Server").
    fn display_name(&self) -> &'static str;

    /// Open a connection described by the builder.
    fn connect(
        &self,
        descriptor: &ConnectionStringBuilder,
    ) -> Result<Box<dyn Connection>, ConnectError>;

    /// Test if a connection can be established without keeping it open.
    ///
    /// The connection handle is scoped to this call: it is closed on every
    /// exit path, whether the ping succeeds or fails.
    fn test_connection(&self, descriptor: &ConnectionStringBuilder) -> Result<(), ConnectError> {
        let mut conn = self.connect(descriptor)?;
        let ping = conn.ping();
        let close = conn.close();
        ping.and(close)
    }
}

/// Active database connection.
pub trait Connection: Send {
    /// Check that the connection is alive, typically via `SELECT 1`.
    fn ping(&self) -> Result<(), ConnectError>;

    /// Close the connection and release resources.
    fn close(&mut self) -> Result<(), ConnectError>;
}
