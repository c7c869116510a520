mod mssql;

pub use self::in_memory_test::{InMemoryTestDriver, InMemoryTestResponseBuilder, RecordedQuery};
pub use self::mssql::{config_from_connection_string, MssqlDriver};
