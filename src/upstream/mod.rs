pub mod http_source;
#[cfg(test)]
pub mod mock;
pub mod probe;
pub mod traits;
