mod driver;
mod table;

pub use driver::DatabaseDriver;
pub use table::Table;
