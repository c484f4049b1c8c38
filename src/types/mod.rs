mod value;
pub use value::*;

mod column;
pub use column::*;

mod schema;
pub use schema::*;

mod row;
pub use row::*;
