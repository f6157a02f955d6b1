pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod sheets;
pub mod table;
pub mod zentra;

#[cfg(test)]
pub mod test_support;
