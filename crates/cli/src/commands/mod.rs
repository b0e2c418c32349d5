pub mod compact;
pub mod estimate;
pub mod init_config;
pub mod session;
