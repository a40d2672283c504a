use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;
use sqlprobe_core::{ConnectError, Connection, ConnectionStringBuilder, Driver};
use tiberius::{Client, Config};
use tokio::net::TcpStream;
use tokio::runtime::{Builder as RuntimeBuilder, Runtime};
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

type TdsClient = Client<Compat<TcpStream>>;

/// SQL Server driver over the TDS protocol.
///
/// tiberius is async; the dialog's test path is synchronous and blocking,
/// so the driver owns a current-thread runtime and blocks on it.
pub struct MssqlDriver {
    runtime: Arc<Runtime>,
}

impl MssqlDriver {
    pub fn new() -> Result<Self, ConnectError> {
        let runtime = RuntimeBuilder::new_current_thread()
            .enable_io()
            .enable_time()
            .build()?;

        Ok(Self {
            runtime: Arc::new(runtime),
        })
    }
}

impl Driver for MssqlDriver {
    fn display_name(&self) -> &'static str {
        "SQL Server"
    }

    fn connect(
        &self,
        descriptor: &ConnectionStringBuilder,
    ) -> Result<Box<dyn Connection>, ConnectError> {
        let conn_string = descriptor.connection_string();
        let config = Config::from_ado_string(&conn_string)
            .map_err(|e| ConnectError::InvalidDescriptor(e.to_string()))?;

        debug!("Connecting to {}", config.get_addr());

        let client = self.runtime.block_on(async {
            let tcp = TcpStream::connect(config.get_addr())
                .await
                .map_err(|e| ConnectError::ConnectionFailed(e.to_string()))?;
            tcp.set_nodelay(true)
                .map_err(|e| ConnectError::ConnectionFailed(e.to_string()))?;

            Client::connect(config, tcp.compat_write())
                .await
                .map_err(|e| ConnectError::ConnectionFailed(e.to_string()))
        })?;

        Ok(Box::new(MssqlConnection {
            runtime: self.runtime.clone(),
            client: Mutex::new(Some(client)),
        }))
    }
}

pub struct MssqlConnection {
    runtime: Arc<Runtime>,
    client: Mutex<Option<TdsClient>>,
}

impl Connection for MssqlConnection {
    fn ping(&self) -> Result<(), ConnectError> {
        let mut guard = mutex_lock(&self.client);
        let client = guard
            .as_mut()
            .ok_or_else(|| ConnectError::ConnectionFailed("Connection is closed".to_string()))?;

        self.runtime.block_on(async {
            let stream = client
                .simple_query("SELECT 1")
                .await
                .map_err(|e| ConnectError::ConnectionFailed(e.to_string()))?;

            stream
                .into_results()
                .await
                .map_err(|e| ConnectError::ConnectionFailed(e.to_string()))?;

            Ok(())
        })
    }

    fn close(&mut self) -> Result<(), ConnectError> {
        let client = mutex_lock(&self.client).take();

        if let Some(client) = client {
            self.runtime
                .block_on(client.close())
                .map_err(|e| ConnectError::ConnectionFailed(e.to_string()))?;
        }

        Ok(())
    }
}

fn mutex_lock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    }
}
