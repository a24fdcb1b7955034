// ftpsave Session
//
// 프로토콜별 세션을 하나의 enum으로 묶음
// match가 항상 exhaustive → "알 수 없는 커넥터 타입" 분기가 존재하지 않음

#[cfg(feature = "ftp")]
use crate::ftp::FtpSession;
#[cfg(feature = "sftp")]
use crate::sftp::SftpSession;

use crate::error::Result;

pub enum Session {
    #[cfg(feature = "ftp")]
    Plain(FtpSession),
    #[cfg(feature = "sftp")]
    Secure(SftpSession),
}

impl Session {
    pub fn protocol(&self) -> &'static str {
        match self {
            #[cfg(feature = "ftp")]
            Session::Plain(_) => "ftp",
            #[cfg(feature = "sftp")]
            Session::Secure(_) => "sftp",
        }
    }

    /// 원격 경로(home_path 적용 완료)에 content 기록
    pub async fn put(&mut self, path: &str, content: &[u8]) -> Result<()> {
        match self {
            #[cfg(feature = "ftp")]
            Session::Plain(ftp) => ftp.put(path, content).await,
            #[cfg(feature = "sftp")]
            Session::Secure(sftp) => sftp.put(path, content).await,
        }
    }

    /// 원격 경로(home_path 적용 완료)의 내용 전체
    pub async fn get(&mut self, path: &str) -> Result<Vec<u8>> {
        match self {
            #[cfg(feature = "ftp")]
            Session::Plain(ftp) => ftp.get(path).await,
            #[cfg(feature = "sftp")]
            Session::Secure(sftp) => sftp.get(path).await,
        }
    }

    pub async fn close(self) -> Result<()> {
        match self {
            #[cfg(feature = "ftp")]
            Session::Plain(ftp) => ftp.close().await,
            #[cfg(feature = "sftp")]
            Session::Secure(sftp) => sftp.close().await,
        }
    }
}
