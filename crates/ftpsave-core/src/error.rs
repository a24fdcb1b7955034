// ftpsave Error Types
//
// thiserror 없이 직접 구현 (Display + From<io::Error>)
// 에러는 재시도/로그 없이 호출자에게 그대로 전달됨

use std::fmt;
use crate::state::ConnectionState;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// 서버 레코드 자체가 잘못됨 (빈 host, 필수 user 누락, TOML 파싱 실패 등)
    Config(String),
    /// TCP 연결 실패, DNS 실패, 타임아웃, 프로토콜 핸드셰이크 실패
    Connection(String),
    Auth(String),
    HostKey(String),
    /// 원격 파일 읽기/쓰기 실패 (파일 없음, 권한, IO)
    Transfer(String),
    InvalidPath(String),
    InvalidTransition {
        from: ConnectionState,
        to: ConnectionState,
    },
    /// 해당 프로토콜 feature가 빌드에 포함되지 않음
    Unavailable(&'static str),
}

impl Error {
    /// 연결 단계 에러인지 (네트워크/인증/호스트키)
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::Auth(_) | Error::HostKey(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e)                          => write!(f, "IO error: {}", e),
            Error::Config(s)                      => write!(f, "Config error: {}", s),
            Error::Connection(s)                  => write!(f, "Connection error: {}", s),
            Error::Auth(s)                        => write!(f, "Auth failed: {}", s),
            Error::HostKey(s)                     => write!(f, "Host key rejected: {}", s),
            Error::Transfer(s)                    => write!(f, "Transfer error: {}", s),
            Error::InvalidPath(s)                 => write!(f, "Invalid path: {}", s),
            Error::InvalidTransition { from, to } => write!(f, "Invalid state transition: {:?} → {:?}", from, to),
            Error::Unavailable(proto)             => write!(f, "{} support is not compiled in (enable the \"{}\" feature)", proto.to_uppercase(), proto),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
