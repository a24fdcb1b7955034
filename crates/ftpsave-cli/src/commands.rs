// ftpsave CLI Commands
//
// 순수 파싱만 담당 (IO 없음, 테스트 용이)

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "ftpsave", version, about = "Upload/download files over FTP or SFTP using saved server records")]
pub struct Cli {
    /// 서버 레코드 TOML 파일
    #[arg(short, long, env = "FTPSAVE_CONFIG", default_value = "ftpsave.toml")]
    pub config: PathBuf,

    /// 레코드 이름 ([servers.<name>]). 레코드가 하나뿐이면 생략 가능
    #[arg(short, long)]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, PartialEq)]
pub enum Command {
    /// List configured servers
    List,
    /// Connect, authenticate and disconnect
    Test,
    /// Upload a local file (remote path is relative to home_path)
    Upload {
        local: PathBuf,
        remote: Option<String>,
    },
    /// Download a remote file (relative to home_path)
    Download {
        remote: String,
        local: Option<PathBuf>,
    },
}

impl Command {
    /// upload: remote 생략 시 로컬 파일명
    pub fn upload_target(local: &std::path::Path, remote: Option<&str>) -> String {
        match remote {
            Some(r) => r.to_string(),
            None => extract_filename(&local.to_string_lossy()),
        }
    }

    /// download: local 생략 시 원격 파일명
    pub fn download_target(remote: &str, local: Option<&std::path::Path>) -> PathBuf {
        match local {
            Some(l) => l.to_path_buf(),
            None => PathBuf::from(extract_filename(remote)),
        }
    }
}

/// 경로에서 파일명만 추출 ("/remote/path/file.txt" → "file.txt")
fn extract_filename(path: &str) -> String {
    path.rsplit('/')
        .next()
        .and_then(|s| s.rsplit('\\').next())
        .unwrap_or(path)
        .to_string()
}
