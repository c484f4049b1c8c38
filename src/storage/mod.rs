mod table;
pub use table::*;

mod database;
pub use database::*;

mod persist;
pub use persist::*;
