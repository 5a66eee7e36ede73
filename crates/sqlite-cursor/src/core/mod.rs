pub mod column;
pub mod connection;
pub mod cursor;
pub mod limits;
pub mod params;
pub mod query;
pub mod stream;
pub mod types;
pub mod value;
