// ftpsave Core Library
//
// 서버 레코드 1건(ServerConfig)으로 FTP 또는 SFTP에 접속해
// 상대경로 기준 upload / download 수행

#[cfg(not(any(feature = "ftp", feature = "sftp")))]
compile_error!("enable at least one of the \"ftp\" or \"sftp\" features");

pub mod config;
pub mod connector;
pub mod error;
#[cfg(feature = "ftp")]
pub mod ftp;
pub mod session;
#[cfg(feature = "sftp")]
pub mod sftp;
pub mod state;
pub mod utils;

pub use config::{HostKeyPolicy, Registry, ServerConfig};
pub use connector::Connector;
pub use error::{Error, Result};
pub use session::Session;
