pub mod initializer;
pub mod network;
pub mod optimizer;
