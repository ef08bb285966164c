pub mod config;
pub mod error;
pub mod samples;
pub mod schema;
pub mod source;

pub use config::Config;
pub use error::*;
pub use schema::*;
pub use source::SourceLocation;
