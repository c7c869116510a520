//! Connection parameters and connection-string construction.

use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// ODBC driver named in the connection string unless overridden.
pub const DEFAULT_ODBC_DRIVER: &str = "{ODBC Driver 17 for SQL Server}";

/// SQL Server port written into the `SERVER` attribute.
pub const SQL_SERVER_PORT: u16 = 1433;

/// Prefix of every connection string; the ODBC attributes follow it encoded.
pub const CONNECTION_STRING_PREFIX: &str = "mssql+pyodbc:///?odbc_connect=";

/// Bytes left as-is by `quote_plus`. Space is kept here and turned into `+` afterwards.
const QUOTE_PLUS: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b' ');

/// SQL Server login.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub uid: String,
    pub pwd: String,
}

impl Credentials {
    pub fn new(uid: impl Into<String>, pwd: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            pwd: pwd.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("uid", &self.uid)
            .field("pwd", &"<redacted>")
            .finish()
    }
}

/// Everything needed to reach one database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub server: String,
    pub database: String,
    pub credentials: Credentials,
    /// ODBC driver attribute, braces included.
    pub driver: String,
    /// Send frame writes as multi-row statements instead of one statement per row.
    pub fast_executemany: bool,
}

impl ConnectionParams {
    pub fn new(
        server: impl Into<String>,
        database: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            server: server.into(),
            database: database.into(),
            credentials,
            driver: DEFAULT_ODBC_DRIVER.to_string(),
            fast_executemany: true,
        }
    }

    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = driver.into();
        self
    }

    pub fn with_fast_executemany(mut self, enabled: bool) -> Self {
        self.fast_executemany = enabled;
        self
    }

    /// The raw ODBC attribute string, before encoding.
    pub fn odbc_string(&self) -> String {
        format!(
            "DRIVER={};SERVER=tcp:{},{};DATABASE={};UID={};PWD={}",
            self.driver,
            self.server,
            SQL_SERVER_PORT,
            self.database,
            self.credentials.uid,
            self.credentials.pwd
        )
    }

    /// Builds `mssql+pyodbc:///?odbc_connect=<quote_plus(odbc string)>`.
    pub fn connection_string(&self) -> String {
        format!("{}{}", CONNECTION_STRING_PREFIX, quote_plus(&self.odbc_string()))
    }
}

/// Percent-encodes `value` the way form query values are: space becomes `+`.
pub fn quote_plus(value: &str) -> String {
    utf8_percent_encode(value, QUOTE_PLUS)
        .to_string()
        .replace(' ', "+")
}
