mod netdash_error;

pub use netdash_error::NetdashError;
pub type Result<T> = std::result::Result<T, NetdashError>;
