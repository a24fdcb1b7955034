// ftpsave Server Config
//
// 원격 서버 1개의 접속 정보 (레코드 1건)
// serde derive → TOML 레지스트리 파일에서 로드

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::utils::resolve_path;

const DEFAULT_PORT: u16 = 21;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

fn default_port() -> u16 { DEFAULT_PORT }
fn default_true() -> bool { true }
fn default_timeout() -> u64 { DEFAULT_TIMEOUT_SECS }

#[derive(Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// true → SFTP, false → 평문 FTP
    #[serde(default = "default_true", alias = "tls")]
    pub use_secure_transfer: bool,
    #[serde(default)]
    pub home_path: Option<String>,
    /// SFTP 전용
    #[serde(default)]
    pub host_key: HostKeyPolicy,
    /// TCP 연결 + 핸드셰이크 + 로그인까지의 제한 시간
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// SSH 호스트키 검증 방식
///
/// TOML:
///   host_key = "known_hosts"
///   host_key = "accept_any"
///   host_key = { fingerprint = "SHA256:..." }
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostKeyPolicy {
    /// ~/.ssh/known_hosts 확인 (기본값)
    #[default]
    KnownHosts,
    /// SHA256 fingerprint 고정 ("SHA256:" 접두어 생략 가능)
    Fingerprint(String),
    /// 검증 생략. 명시적으로 켠 경우에만
    AcceptAny,
}

impl fmt::Display for HostKeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostKeyPolicy::KnownHosts     => write!(f, "known_hosts"),
            HostKeyPolicy::Fingerprint(_) => write!(f, "fingerprint"),
            HostKeyPolicy::AcceptAny      => write!(f, "accept_any"),
        }
    }
}

impl ServerConfig {
    /// host만 지정, 나머지는 레코드 기본값 (port 21, SFTP, known_hosts)
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            user: None,
            password: None,
            use_secure_transfer: true,
            home_path: None,
            host_key: HostKeyPolicy::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn protocol(&self) -> &'static str {
        if self.use_secure_transfer { "sftp" } else { "ftp" }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// 상대경로 → home_path 기준 원격 경로
    pub fn full_path(&self, relative: &str) -> String {
        resolve_path(self.home_path.as_deref(), relative)
    }

    /// 접속 시도 전 검증
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(Error::Config("port must be between 1 and 65535".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be at least 1".to_string()));
        }
        if self.use_secure_transfer && self.user.as_deref().map_or(true, str::is_empty) {
            return Err(Error::Config(format!("{}: SFTP requires a user", self.host)));
        }
        Ok(())
    }
}

// password는 로그에 남지 않도록 직접 구현
impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("use_secure_transfer", &self.use_secure_transfer)
            .field("home_path", &self.home_path)
            .field("host_key", &self.host_key)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

// ── Registry ─────────────────────────────────────────────────────────────────

/// 서버 레코드 모음 (TOML 파일 1개)
///
/// ```toml
/// [servers.reports]
/// host = "test.local"
/// port = 21
/// user = "u"
/// password = "p"
/// use_secure_transfer = false
/// home_path = "/incoming"
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct Registry {
    #[serde(default)]
    servers: BTreeMap<String, ServerConfig>,
}

impl Registry {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let registry: Registry = text.parse()?;
        tracing::debug!("[config] loaded {} server(s) from {}", registry.servers.len(), path.display());
        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Result<&ServerConfig> {
        self.servers
            .get(name)
            .ok_or_else(|| Error::Config(format!("unknown server: {}", name)))
    }

    /// 레코드가 하나뿐이면 이름 없이 선택 가능
    pub fn only(&self) -> Option<(&str, &ServerConfig)> {
        let mut iter = self.servers.iter();
        match (iter.next(), iter.next()) {
            (Some((name, config)), None) => Some((name.as_str(), config)),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ServerConfig)> {
        self.servers.iter().map(|(name, config)| (name.as_str(), config))
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

impl std::str::FromStr for Registry {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}
