pub mod config_cmd;
pub mod friends;
pub mod plan;
pub mod serve;
