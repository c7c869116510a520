use std::borrow::Cow;

use async_trait::async_trait;
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, ToSql};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};
use url::Url;

use crate::error::{Result, SqlFrameError};
use crate::params::SQL_SERVER_PORT;
use crate::traits::DatabaseDriver;
use crate::types::{RawQueryResult, SqlValue};

type MssqlClient = Client<Compat<TcpStream>>;

/// SQL Server driver implementation using tiberius.
///
/// Holds one dedicated connection; statements run one at a time.
pub struct MssqlDriver {
    client: Mutex<MssqlClient>,
}

impl MssqlDriver {
    /// Connect using a `mssql+pyodbc:///?odbc_connect=...` connection string.
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let config = config_from_connection_string(connection_string)?;
        let addr = config.get_addr();

        let tcp = TcpStream::connect(&addr)
            .await
            .map_err(|e| SqlFrameError::ConnectionFailed(e.to_string()))?;
        tcp.set_nodelay(true).ok();

        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| SqlFrameError::ConnectionFailed(e.to_string()))?;

        info!(addr = %addr, "Connected to SQL Server");
        Ok(Self {
            client: Mutex::new(client),
        })
    }
}

#[async_trait]
impl DatabaseDriver for MssqlDriver {
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<RawQueryResult> {
        debug!(sql = %sql, params = params.len(), "Executing statement");

        let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
        let mut client = self.client.lock().await;

        // Parameterless statements go as a plain batch so that BEGIN/COMMIT
        // are not scoped to an sp_executesql call.
        let mut stream = if params.is_empty() {
            client.simple_query(sql).await
        } else {
            client.query(sql, &param_refs).await
        }
        .map_err(|e| SqlFrameError::QueryFailed(e.to_string()))?;

        // Column metadata arrives before any row, so empty results keep their columns.
        let columns: Vec<String> = stream
            .columns()
            .await
            .map_err(|e| SqlFrameError::QueryFailed(e.to_string()))?
            .map(|cols| cols.iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        let rows = stream
            .into_first_result()
            .await
            .map_err(|e| SqlFrameError::QueryFailed(e.to_string()))?;

        let result_rows = rows.iter().map(convert_row).collect();
        Ok(RawQueryResult::new(columns, result_rows))
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> ColumnData<'_> {
        match self {
            SqlValue::Null => ColumnData::String(None),
            SqlValue::Text(s) => ColumnData::String(Some(Cow::Borrowed(s.as_str()))),
            SqlValue::Int32(i) => ColumnData::I32(Some(*i)),
            SqlValue::Int64(i) => ColumnData::I64(Some(*i)),
            SqlValue::Float64(f) => ColumnData::F64(Some(*f)),
            SqlValue::Bool(b) => ColumnData::Bit(Some(*b)),
        }
    }
}

/// Parses the `odbc_connect` attributes of a connection string into a tiberius config.
///
/// Recognised attributes: `SERVER` (optional `tcp:` prefix, `,port` or
/// `\instance` suffix), `DATABASE`, `UID`, `PWD`, `Encrypt` and
/// `TrustServerCertificate`. Anything else, such as `DRIVER`, is ignored.
pub fn config_from_connection_string(connection_string: &str) -> Result<Config> {
    let url = Url::parse(connection_string)
        .map_err(|e| SqlFrameError::InvalidConnectionString(e.to_string()))?;
    let odbc = url
        .query_pairs()
        .find(|(key, _)| key == "odbc_connect")
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| {
            SqlFrameError::InvalidConnectionString("missing odbc_connect parameter".to_string())
        })?;

    let mut config = Config::new();
    let mut has_server = false;
    let mut uid = String::new();
    let mut pwd = String::new();

    for (key, value) in odbc_attributes(&odbc)? {
        match key.as_str() {
            "SERVER" => {
                let server = value
                    .strip_prefix("tcp:")
                    .or_else(|| value.strip_prefix("TCP:"))
                    .unwrap_or(&value);
                if let Some((host, port)) = server.split_once(',') {
                    let port = port.trim().parse::<u16>().map_err(|_| {
                        SqlFrameError::InvalidConnectionString(format!("invalid port: {}", port))
                    })?;
                    config.host(host);
                    config.port(port);
                } else if let Some((host, instance)) = server.split_once('\\') {
                    config.host(host);
                    config.instance_name(instance);
                } else {
                    config.host(server);
                    config.port(SQL_SERVER_PORT);
                }
                has_server = true;
            }
            "DATABASE" => config.database(&value),
            "UID" => uid = value,
            "PWD" => pwd = value,
            "ENCRYPT" => match value.to_lowercase().as_str() {
                "yes" | "true" | "mandatory" => config.encryption(EncryptionLevel::Required),
                "no" | "false" | "optional" => config.encryption(EncryptionLevel::Off),
                _ => {}
            },
            "TRUSTSERVERCERTIFICATE" => {
                if matches!(value.to_lowercase().as_str(), "yes" | "true") {
                    config.trust_cert();
                }
            }
            _ => {}
        }
    }

    if !has_server {
        return Err(SqlFrameError::InvalidConnectionString(
            "missing SERVER attribute".to_string(),
        ));
    }
    config.authentication(AuthMethod::sql_server(uid, pwd));
    config.application_name("sqlframe");
    Ok(config)
}

/// Splits `KEY=value;KEY={value}` pairs. Keys are upper-cased, braces around
/// values are removed.
fn odbc_attributes(odbc: &str) -> Result<Vec<(String, String)>> {
    odbc.split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                SqlFrameError::InvalidConnectionString(format!(
                    "invalid connection string part: {}",
                    part
                ))
            })?;
            let value = value.trim();
            let value = value
                .strip_prefix('{')
                .and_then(|v| v.strip_suffix('}'))
                .unwrap_or(value);
            Ok((key.trim().to_uppercase(), value.to_string()))
        })
        .collect()
}

/// Convert a tiberius Row to values in column order.
fn convert_row(row: &tiberius::Row) -> Vec<SqlValue> {
    row.cells()
        .enumerate()
        .map(|(i, (_col, data))| match data {
            ColumnData::DateTime(Some(_))
            | ColumnData::SmallDateTime(Some(_))
            | ColumnData::DateTime2(Some(_)) => row
                .try_get::<chrono::NaiveDateTime, _>(i)
                .ok()
                .flatten()
                .map(|dt| SqlValue::Text(dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()))
                .unwrap_or(SqlValue::Null),
            ColumnData::DateTimeOffset(Some(_)) => row
                .try_get::<chrono::DateTime<chrono::Utc>, _>(i)
                .ok()
                .flatten()
                .map(|dt| SqlValue::Text(dt.to_rfc3339()))
                .unwrap_or(SqlValue::Null),
            ColumnData::Date(Some(_)) => row
                .try_get::<chrono::NaiveDate, _>(i)
                .ok()
                .flatten()
                .map(|d| SqlValue::Text(d.format("%Y-%m-%d").to_string()))
                .unwrap_or(SqlValue::Null),
            ColumnData::Time(Some(_)) => row
                .try_get::<chrono::NaiveTime, _>(i)
                .ok()
                .flatten()
                .map(|t| SqlValue::Text(t.format("%H:%M:%S%.f").to_string()))
                .unwrap_or(SqlValue::Null),
            _ => convert_column_data(data),
        })
        .collect()
}

/// Convert a non-temporal tiberius value.
fn convert_column_data(data: &ColumnData<'_>) -> SqlValue {
    match data {
        ColumnData::Bit(Some(b)) => SqlValue::Bool(*b),
        ColumnData::U8(Some(v)) => SqlValue::Int32(i32::from(*v)),
        ColumnData::I16(Some(v)) => SqlValue::Int32(i32::from(*v)),
        ColumnData::I32(Some(v)) => SqlValue::Int32(*v),
        ColumnData::I64(Some(v)) => SqlValue::Int64(*v),
        ColumnData::F32(Some(v)) => SqlValue::Float64(f64::from(*v)),
        ColumnData::F64(Some(v)) => SqlValue::Float64(*v),
        ColumnData::Numeric(Some(n)) => {
            SqlValue::Float64(n.value() as f64 / 10f64.powi(i32::from(n.scale())))
        }
        ColumnData::String(Some(s)) => SqlValue::Text(s.to_string()),
        ColumnData::Guid(Some(g)) => SqlValue::Text(g.to_string()),
        ColumnData::Xml(Some(xml)) => SqlValue::Text(xml.to_string()),
        ColumnData::Binary(Some(bytes)) => SqlValue::Text(
            std::iter::once("0x".to_string())
                .chain(bytes.iter().map(|b| format!("{:02X}", b)))
                .collect(),
        ),
        _ => SqlValue::Null,
    }
}
