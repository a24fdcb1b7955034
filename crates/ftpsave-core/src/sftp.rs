// ftpsave SFTP (russh + russh-sftp 기반)
//
// russh로 SSH 연결/호스트키 검증/인증을 처리하고
// russh-sftp로 SFTP 세션을 수립합니다.
//
// SftpClient  : SFTP 채널 위의 put/get (스트림만 있으면 생성 가능)
// SftpSession : SSH 연결 + SftpClient, close 시 SSH disconnect

use std::sync::Arc;

use russh::client;
use russh_sftp::client::SftpSession as RusshSftpSession;
use russh_sftp::protocol::OpenFlags;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::{HostKeyPolicy, ServerConfig};
use crate::error::{Error, Result};

// russh 클라이언트 핸들러 (서버 이벤트 처리)
pub(crate) struct ClientHandler {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
}

#[async_trait::async_trait]
impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        Ok(self.verify(server_public_key))
    }
}

impl ClientHandler {
    fn new(config: &ServerConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            policy: config.host_key.clone(),
        }
    }

    fn verify(&self, key: &russh::keys::key::PublicKey) -> bool {
        match &self.policy {
            HostKeyPolicy::AcceptAny => {
                tracing::warn!("[sftp] host key verification disabled for {}:{}", self.host, self.port);
                true
            }
            HostKeyPolicy::Fingerprint(expected) => {
                let actual = key.fingerprint();
                let ok = fingerprint_matches(expected, &actual);
                if !ok {
                    tracing::warn!("[sftp] {}:{} presented SHA256:{}, expected {}", self.host, self.port, actual, expected);
                }
                ok
            }
            HostKeyPolicy::KnownHosts => {
                match russh::keys::check_known_hosts(&self.host, self.port, key) {
                    Ok(true) => true,
                    Ok(false) => {
                        tracing::warn!("[sftp] {}:{} not found in known_hosts (SHA256:{})", self.host, self.port, key.fingerprint());
                        false
                    }
                    Err(e) => {
                        tracing::warn!("[sftp] known_hosts check failed for {}:{}: {}", self.host, self.port, e);
                        false
                    }
                }
            }
        }
    }
}

/// "SHA256:" 접두어 유무와 관계없이 비교
fn fingerprint_matches(expected: &str, actual: &str) -> bool {
    let strip = |s: &str| s.trim().trim_start_matches("SHA256:").to_string();
    let expected = strip(expected);
    !expected.is_empty() && expected == strip(actual)
}

/// TCP 연결 + 키 교환 + 호스트키 검증 (인증 전)
pub(crate) async fn handshake(config: &ServerConfig) -> Result<client::Handle<ClientHandler>> {
    let russh_config = Arc::new(client::Config::default());
    let handler = ClientHandler::new(config);

    tracing::debug!("[sftp] handshake with {} (host key: {})", config.addr(), config.host_key);

    client::connect(russh_config, (config.host.as_str(), config.port), handler)
        .await
        .map_err(|e| match e {
            russh::Error::UnknownKey => Error::HostKey(format!(
                "{} failed {} verification", config.addr(), config.host_key
            )),
            other => Error::Connection(format!("{}: {}", config.addr(), other)),
        })
}

// ── SftpSession ───────────────────────────────────────────────────────────────

pub struct SftpSession {
    ssh: client::Handle<ClientHandler>,
    client: SftpClient,
}

impl SftpSession {
    /// 인증 + sftp 채널. 실패하면 SSH 연결을 끊고 에러 반환
    pub(crate) async fn authenticate(
        mut ssh: client::Handle<ClientHandler>,
        config: &ServerConfig,
    ) -> Result<Self> {
        let user = config.user.as_deref()
            .ok_or_else(|| Error::Config("SFTP requires a user".to_string()))?;
        let password = config.password.as_deref().unwrap_or("");

        match open_sftp(&mut ssh, user, password).await {
            Ok(client) => {
                tracing::debug!("[sftp] ready as {}", user);
                Ok(Self { ssh, client })
            }
            Err(e) => {
                // 인증/채널 실패 → 반쯤 열린 SSH 연결도 정리
                if let Err(close_err) = ssh.disconnect(russh::Disconnect::ByApplication, "", "en").await {
                    tracing::warn!("[sftp] disconnect after failed setup: {}", close_err);
                }
                Err(e)
            }
        }
    }

    pub async fn put(&self, path: &str, content: &[u8]) -> Result<()> {
        self.client.put(path, content).await
    }

    pub async fn get(&self, path: &str) -> Result<Vec<u8>> {
        self.client.get(path).await
    }

    pub async fn close(self) -> Result<()> {
        drop(self.client);
        self.ssh
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(|e| Error::Connection(e.to_string()))
    }
}

/// 비밀번호 인증 → 세션 채널 → sftp 서브시스템
async fn open_sftp(
    ssh: &mut client::Handle<ClientHandler>,
    user: &str,
    password: &str,
) -> Result<SftpClient> {
    let authed = ssh.authenticate_password(user, password)
        .await
        .map_err(|e| Error::Auth(e.to_string()))?;

    if !authed {
        return Err(Error::Auth(format!("password rejected for {}", user)));
    }

    let channel = ssh.channel_open_session()
        .await
        .map_err(|e| Error::Connection(e.to_string()))?;

    channel.request_subsystem(true, "sftp")
        .await
        .map_err(|e| Error::Connection(e.to_string()))?;

    SftpClient::from_stream(channel.into_stream()).await
}

// ── SftpClient ────────────────────────────────────────────────────────────────

pub struct SftpClient {
    sftp: RusshSftpSession,
}

impl SftpClient {
    /// 이미 열린 sftp 서브시스템 스트림 위에 세션 수립
    pub async fn from_stream<S>(stream: S) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let sftp = RusshSftpSession::new(stream)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        Ok(Self { sftp })
    }

    /// 메모리 → 원격 파일 (기존 파일은 덮어씀)
    pub async fn put(&self, path: &str, content: &[u8]) -> Result<()> {
        let mut file = self.sftp
            .open_with_flags(path, OpenFlags::CREATE | OpenFlags::WRITE | OpenFlags::TRUNCATE)
            .await
            .map_err(|e| transfer_error(path, e))?;

        file.write_all(content).await
            .map_err(|e| transfer_error(path, e))?;
        file.shutdown().await
            .map_err(|e| transfer_error(path, e))?;

        tracing::debug!("[sftp] put {} ({} bytes)", path, content.len());
        Ok(())
    }

    /// 원격 파일 → 메모리 (전체)
    pub async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let mut file = self.sftp.open(path)
            .await
            .map_err(|e| transfer_error(path, e))?;

        let mut content = Vec::new();
        file.read_to_end(&mut content).await
            .map_err(|e| transfer_error(path, e))?;
        file.shutdown().await
            .map_err(|e| transfer_error(path, e))?;

        tracing::debug!("[sftp] get {} ({} bytes)", path, content.len());
        Ok(content)
    }
}

fn transfer_error(path: &str, e: impl std::fmt::Display) -> Error {
    Error::Transfer(format!("{}: {}", path, e))
}
