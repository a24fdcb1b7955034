// ftpsave Connector
//
// ServerConfig 1건 → 연결 → 작업 1개 → 종료
// 작업마다 새 연결을 열고, 성공/실패와 관계없이 항상 닫고 반환
// 풀링/재시도/캐시 없음

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::state::{ConnectionObserver, ConnectionState, NoopObserver};
use crate::utils::{check_relative_path, fmt_size};

pub struct Connector {
    config: ServerConfig,
    state: ConnectionState,
    observer: Box<dyn ConnectionObserver>,
}

impl Connector {
    pub fn new(config: ServerConfig) -> Self {
        Self::with_observer(config, Box::new(NoopObserver))
    }

    pub fn with_observer(config: ServerConfig, observer: Box<dyn ConnectionObserver>) -> Self {
        Self { config, state: ConnectionState::Idle, observer }
    }

    pub fn config(&self) -> &ServerConfig { &self.config }

    pub fn state(&self) -> &ConnectionState { &self.state }

    fn transition(&mut self, next: ConnectionState) -> Result<()> {
        if !self.state.can_transition_to(&next) {
            return Err(Error::InvalidTransition { from: self.state.clone(), to: next });
        }
        let prev = std::mem::replace(&mut self.state, next);
        self.observer.on_state_changed(&prev, &self.state);
        Ok(())
    }

    fn transition_to_error(&mut self, message: String) {
        let current = self.state.clone();
        let prev = std::mem::replace(
            &mut self.state,
            ConnectionState::Error { state: Box::new(current), message }
        );
        self.observer.on_state_changed(&prev, &self.state);
    }

    /// 인증까지 끝난 세션 반환
    ///
    /// 호출자가 직접 close() 해야 함. upload/download는 내부에서 처리
    pub async fn connect(&mut self) -> Result<Session> {
        self.config.validate()?;
        self.transition(ConnectionState::Connecting)?;

        tracing::info!("[connector] connecting to {} ({})", self.config.addr(), self.config.protocol());

        let limit = self.config.timeout();
        let attempt = tokio::time::timeout(limit, self.establish()).await;
        let outcome = match attempt {
            Ok(result) => result,
            Err(_) => Err(Error::Connection(format!(
                "{}: timed out after {}s", self.config.addr(), limit.as_secs()
            ))),
        };

        match outcome {
            Ok(session) => {
                self.transition(ConnectionState::Connected)?;
                Ok(session)
            }
            Err(e) => {
                self.transition_to_error(e.to_string());
                Err(e)
            }
        }
    }

    async fn establish(&mut self) -> Result<Session> {
        if self.config.use_secure_transfer {
            self.establish_sftp().await
        } else {
            self.establish_ftp().await
        }
    }

    #[cfg(feature = "sftp")]
    async fn establish_sftp(&mut self) -> Result<Session> {
        let ssh = crate::sftp::handshake(&self.config).await?;
        self.transition(ConnectionState::Authenticating)?;
        let sftp = crate::sftp::SftpSession::authenticate(ssh, &self.config).await?;
        Ok(Session::Secure(sftp))
    }

    #[cfg(not(feature = "sftp"))]
    async fn establish_sftp(&mut self) -> Result<Session> {
        Err(Error::Unavailable("sftp"))
    }

    #[cfg(feature = "ftp")]
    async fn establish_ftp(&mut self) -> Result<Session> {
        let mut ftp = crate::ftp::FtpSession::open(
            &self.config.host, self.config.port, self.config.timeout()
        ).await?;
        self.transition(ConnectionState::Authenticating)?;

        // 사용자 미지정 → 익명 로그인
        let user = self.config.user.as_deref().filter(|u| !u.is_empty()).unwrap_or("anonymous");
        let password = self.config.password.as_deref().unwrap_or("");
        if let Err(e) = ftp.login(user, password).await {
            // 로그인 실패해도 QUIT으로 제어 연결 정리
            if let Err(close_err) = ftp.close().await {
                tracing::warn!("[connector] closing {} after failed login: {}", self.config.addr(), close_err);
            }
            return Err(e);
        }
        Ok(Session::Plain(ftp))
    }

    #[cfg(not(feature = "ftp"))]
    async fn establish_ftp(&mut self) -> Result<Session> {
        Err(Error::Unavailable("ftp"))
    }

    /// 세션 종료. 종료 중 에러는 작업 결과를 덮어쓰지 않음
    pub async fn close(&mut self, session: Session) {
        if self.transition(ConnectionState::Closing).is_err() {
            // Connected를 거치지 않은 세션: 상태 머신 밖에서 정리만
            if let Err(e) = session.close().await {
                tracing::warn!("[connector] closing {}: {}", self.config.addr(), e);
            }
            return;
        }
        if let Err(e) = session.close().await {
            tracing::warn!("[connector] closing {}: {}", self.config.addr(), e);
        }
        let _ = self.transition(ConnectionState::Closed);
    }

    /// 상대경로 기준 업로드
    pub async fn upload(&mut self, relative: &str, content: &[u8]) -> Result<()> {
        check_relative_path(relative)?;
        let path = self.config.full_path(relative);

        let mut session = self.connect().await?;
        tracing::info!("[connector] upload {} ({})", path, fmt_size(content.len() as u64));
        let result = session.put(&path, content).await;
        self.close(session).await;
        result
    }

    /// 상대경로 기준 다운로드 (전체를 메모리로)
    pub async fn download(&mut self, relative: &str) -> Result<Vec<u8>> {
        check_relative_path(relative)?;
        let path = self.config.full_path(relative);

        let mut session = self.connect().await?;
        let result = session.get(&path).await;
        if let Ok(content) = &result {
            tracing::info!("[connector] download {} ({})", path, fmt_size(content.len() as u64));
        }
        self.close(session).await;
        result
    }

    /// 연결만 시도. 실패는 삼키지 않고 그대로 반환
    pub async fn test_connection(&mut self) -> Result<bool> {
        let session = self.connect().await?;
        self.close(session).await;
        Ok(true)
    }
}
