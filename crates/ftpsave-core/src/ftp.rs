// ftpsave FTP (suppaftp 기반)
//
// suppaftp는 blocking API → 모든 호출을 spawn_blocking으로 감싸서
// SFTP 쪽과 동일한 async 인터페이스로 노출
//
// 흐름: connect(220) → USER/PASS → TYPE I → STOR/RETR → QUIT
// 제어 채널 소켓은 timeout_secs 동안 응답이 없으면 에러

use std::io::Cursor;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream};

use crate::error::{Error, Result};

pub struct FtpSession {
    // spawn_blocking 동안에는 잠시 비어 있음
    stream: Option<FtpStream>,
}

impl FtpSession {
    /// TCP 연결 + 환영 메시지(220) 수신까지
    ///
    /// 소켓에 read/write 타임아웃을 걸어 두므로 응답 없는 서버에서도
    /// blocking 스레드가 timeout 후 에러로 빠져나오고 소켓이 닫힘
    pub async fn open(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let host = host.to_string();
        let stream = tokio::task::spawn_blocking(move || -> Result<FtpStream> {
            let addr = resolve_addr(&host, port)?;
            tracing::debug!("[ftp] connecting to {}", addr);
            let socket = TcpStream::connect_timeout(&addr, timeout)
                .map_err(|e| connection_error(&host, port, e))?;
            socket.set_read_timeout(Some(timeout))
                .and_then(|_| socket.set_write_timeout(Some(timeout)))
                .map_err(|e| connection_error(&host, port, e))?;

            FtpStream::connect_with_stream(socket)
                .map_err(|e| connection_error(&host, port, e))
        })
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))??;

        Ok(Self { stream: Some(stream) })
    }

    /// USER/PASS 후 바이너리 모드로 전환
    pub async fn login(&mut self, user: &str, password: &str) -> Result<()> {
        let (user, password) = (user.to_string(), password.to_string());
        let name = user.clone();

        self.blocking(move |ftp| ftp.login(&user, &password))
            .await?
            .map_err(|e| Error::Auth(format!("{}: {}", name, e)))?;

        self.blocking(|ftp| ftp.transfer_type(FileType::Binary))
            .await?
            .map_err(|e| Error::Connection(e.to_string()))?;

        tracing::debug!("[ftp] logged in as {}", name);
        Ok(())
    }

    /// STOR (바이너리)
    pub async fn put(&mut self, path: &str, content: &[u8]) -> Result<()> {
        let target = path.to_string();
        let mut reader = Cursor::new(content.to_vec());

        let written = self.blocking(move |ftp| ftp.put_file(&target, &mut reader))
            .await?
            .map_err(|e| transfer_error(path, e))?;

        tracing::debug!("[ftp] STOR {} ({} bytes)", path, written);
        Ok(())
    }

    /// RETR (바이너리) → 전체를 메모리로
    pub async fn get(&mut self, path: &str) -> Result<Vec<u8>> {
        let target = path.to_string();

        let buffer = self.blocking(move |ftp| ftp.retr_as_buffer(&target))
            .await?
            .map_err(|e| transfer_error(path, e))?;

        let content = buffer.into_inner();
        tracing::debug!("[ftp] RETR {} ({} bytes)", path, content.len());
        Ok(content)
    }

    /// QUIT
    pub async fn close(mut self) -> Result<()> {
        self.blocking(|ftp| ftp.quit())
            .await?
            .map_err(|e| Error::Connection(e.to_string()))
    }

    /// blocking 호출을 별도 스레드에서 실행하고 스트림을 되돌려 받음
    ///
    /// 바깥 Result: 세션 상태/스레드 문제, 안쪽 Result: FTP 응답
    async fn blocking<T, F>(&mut self, f: F) -> Result<std::result::Result<T, FtpError>>
    where
        F: FnOnce(&mut FtpStream) -> std::result::Result<T, FtpError> + Send + 'static,
        T: Send + 'static,
    {
        let mut stream = self.stream.take()
            .ok_or_else(|| Error::Connection("FTP session is no longer usable".to_string()))?;

        let (stream, result) = tokio::task::spawn_blocking(move || {
            let result = f(&mut stream);
            (stream, result)
        })
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))?;

        self.stream = Some(stream);
        Ok(result)
    }
}

fn resolve_addr(host: &str, port: u16) -> Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| Error::Connection(format!("cannot resolve {}: {}", host, e)))?
        .next()
        .ok_or_else(|| Error::Connection(format!("no address for {}", host)))
}

fn connection_error(host: &str, port: u16, e: impl std::fmt::Display) -> Error {
    Error::Connection(format!("{}:{}: {}", host, port, e))
}

fn transfer_error(path: &str, e: FtpError) -> Error {
    Error::Transfer(format!("{}: {}", path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_literal_address() {
        let addr = resolve_addr("127.0.0.1", 2121).unwrap();
        assert_eq!(addr, "127.0.0.1:2121".parse::<SocketAddr>().unwrap());
    }

    #[tokio::test]
    async fn refused_connection_is_connection_error() {
        // 바인드 후 바로 닫은 포트 → 연결 거부
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let result = FtpSession::open("127.0.0.1", port, Duration::from_secs(2)).await;
        assert!(matches!(result, Err(Error::Connection(_))));
    }
}
