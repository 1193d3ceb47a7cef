use bb8::ManageConnection;
use tiberius::{Client, Config as TiberiusConfig, Query};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

pub type MssqlClient = Client<Compat<TcpStream>>;

/// A pooled client plus a flag the pool checks before reusing it.
pub struct MssqlConnection {
    pub(crate) client: MssqlClient,
    pub(crate) broken: bool,
}

/// bb8 manager opening tiberius clients over TCP.
///
/// Named instances are resolved through the SQL Browser service.
#[derive(Clone)]
pub struct MssqlConnectionManager {
    config: TiberiusConfig,
    named_instance: bool,
}

impl MssqlConnectionManager {
    #[must_use]
    pub fn new(config: TiberiusConfig, named_instance: bool) -> Self {
        Self {
            config,
            named_instance,
        }
    }
}

impl ManageConnection for MssqlConnectionManager {
    type Connection = MssqlConnection;
    type Error = tiberius::error::Error;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let config = self.config.clone();
        let named_instance = self.named_instance;
        async move {
            let tcp = if named_instance {
                use tiberius::SqlBrowser;
                TcpStream::connect_named(&config).await?
            } else {
                TcpStream::connect(config.get_addr()).await?
            };
            tcp.set_nodelay(true)?;
            let client = Client::connect(config, tcp.compat_write()).await?;
            Ok(MssqlConnection {
                client,
                broken: false,
            })
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        async move {
            Query::new("SELECT 1")
                .query(&mut conn.client)
                .await?
                .into_results()
                .await
                .map(|_| ())
        }
    }

    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        conn.broken
    }
}
