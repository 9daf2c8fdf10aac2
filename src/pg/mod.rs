pub mod catalog;
pub mod connection;
pub mod introspect;

pub use catalog::CatalogSnapshot;
pub use connection::PgConnection;
pub use introspect::fetch_catalog;
