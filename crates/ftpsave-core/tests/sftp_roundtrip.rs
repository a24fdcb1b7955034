// SFTP 왕복 테스트
//
// 1) SSH 없이 tokio::io::duplex 위에서 russh-sftp 서버를 직접 돌림 (SftpClient)
// 2) 프로세스 내 russh 서버 + 같은 sftp 핸들러 (Connector 전체 경로)
// 파일시스템은 HashMap (경로 → 바이트)

#![cfg(feature = "sftp")]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use russh::keys::key::KeyPair;
use russh::server::{self, Auth, Msg};
use russh::{Channel, ChannelId};
use russh_sftp::protocol::{Data, FileAttributes, Handle, OpenFlags, Status, StatusCode, Version};

use ftpsave_core::sftp::SftpClient;
use ftpsave_core::state::ConnectionState;
use ftpsave_core::{Connector, Error, HostKeyPolicy, ServerConfig};

type Files = Arc<Mutex<HashMap<String, Vec<u8>>>>;

struct MemoryHandler {
    files: Files,
    handles: HashMap<String, String>,
    next_handle: u32,
}

impl MemoryHandler {
    fn new(files: Files) -> Self {
        Self { files, handles: HashMap::new(), next_handle: 0 }
    }

    fn ok(id: u32) -> Status {
        Status {
            id,
            status_code: StatusCode::Ok,
            error_message: "Ok".to_string(),
            language_tag: "en-US".to_string(),
        }
    }
}

#[async_trait::async_trait]
impl russh_sftp::server::Handler for MemoryHandler {
    type Error = StatusCode;

    fn unimplemented(&self) -> Self::Error {
        StatusCode::OpUnsupported
    }

    async fn init(
        &mut self,
        _version: u32,
        _extensions: HashMap<String, String>,
    ) -> Result<Version, Self::Error> {
        Ok(Version::new())
    }

    async fn open(
        &mut self,
        id: u32,
        filename: String,
        pflags: OpenFlags,
        _attrs: FileAttributes,
    ) -> Result<Handle, Self::Error> {
        {
            let mut files = self.files.lock().unwrap();
            if pflags.contains(OpenFlags::CREATE) {
                let entry = files.entry(filename.clone()).or_default();
                if pflags.contains(OpenFlags::TRUNCATE) {
                    entry.clear();
                }
            } else if !files.contains_key(&filename) {
                return Err(StatusCode::NoSuchFile);
            }
        }

        self.next_handle += 1;
        let handle = format!("h{}", self.next_handle);
        self.handles.insert(handle.clone(), filename);
        Ok(Handle { id, handle })
    }

    async fn close(&mut self, id: u32, handle: String) -> Result<Status, Self::Error> {
        self.handles.remove(&handle);
        Ok(Self::ok(id))
    }

    async fn read(
        &mut self,
        id: u32,
        handle: String,
        offset: u64,
        len: u32,
    ) -> Result<Data, Self::Error> {
        let path = self.handles.get(&handle).ok_or(StatusCode::Failure)?;
        let files = self.files.lock().unwrap();
        let content = files.get(path).ok_or(StatusCode::NoSuchFile)?;

        let start = offset as usize;
        if start >= content.len() {
            return Err(StatusCode::Eof);
        }
        let end = (start + len as usize).min(content.len());
        Ok(Data { id, data: content[start..end].to_vec() })
    }

    async fn write(
        &mut self,
        id: u32,
        handle: String,
        offset: u64,
        data: Vec<u8>,
    ) -> Result<Status, Self::Error> {
        let path = self.handles.get(&handle).ok_or(StatusCode::Failure)?;
        let mut files = self.files.lock().unwrap();
        let content = files.get_mut(path).ok_or(StatusCode::NoSuchFile)?;

        let start = offset as usize;
        let end = start + data.len();
        if content.len() < end {
            content.resize(end, 0);
        }
        content[start..end].copy_from_slice(&data);
        Ok(Self::ok(id))
    }
}

async fn client_with_memory_fs() -> (SftpClient, Files) {
    let files = Files::default();
    let handler = MemoryHandler::new(files.clone());

    let (client_end, server_end) = tokio::io::duplex(64 * 1024);
    tokio::spawn(russh_sftp::server::run(server_end, handler));

    let client = SftpClient::from_stream(client_end).await.unwrap();
    (client, files)
}

#[tokio::test]
async fn put_then_get_under_home() {
    let (client, files) = client_with_memory_fs().await;
    let mut config = ServerConfig::new("test.local");
    config.home_path = Some("/incoming".to_string());
    let path = config.full_path("report.csv");

    client.put(&path, b"a,b\n1,2").await.unwrap();
    assert_eq!(
        files.lock().unwrap().get("/incoming/report.csv").map(Vec::as_slice),
        Some(&b"a,b\n1,2"[..])
    );
    assert_eq!(client.get(&path).await.unwrap(), b"a,b\n1,2");
}

#[tokio::test]
async fn large_payload_round_trips() {
    let (client, _files) = client_with_memory_fs().await;
    let payload: Vec<u8> = (0..300_000u32).map(|i| (i * 7 % 256) as u8).collect();

    client.put("blob.bin", &payload).await.unwrap();
    assert_eq!(client.get("blob.bin").await.unwrap(), payload);
}

#[tokio::test]
async fn overwrite_truncates() {
    let (client, _files) = client_with_memory_fs().await;

    client.put("note.txt", b"a much longer first version").await.unwrap();
    client.put("note.txt", b"short").await.unwrap();
    assert_eq!(client.get("note.txt").await.unwrap(), b"short");
}

#[tokio::test]
async fn missing_file_is_transfer_error() {
    let (client, _files) = client_with_memory_fs().await;
    let err = client.get("nope.csv").await.unwrap_err();
    assert!(matches!(err, Error::Transfer(_)), "{:?}", err);
}

#[tokio::test]
async fn unreachable_host_fails_within_timeout() {
    let mut config = ServerConfig::new("10.255.255.1");
    config.port = 22;
    config.user = Some("u".to_string());
    config.password = Some("p".to_string());
    config.host_key = HostKeyPolicy::AcceptAny;
    config.timeout_secs = 1;
    let mut connector = Connector::new(config);

    let started = std::time::Instant::now();
    let err = connector.test_connection().await.unwrap_err();
    assert!(matches!(err, Error::Connection(_)), "{:?}", err);
    assert!(started.elapsed() < std::time::Duration::from_secs(10));
}

#[tokio::test]
async fn missing_user_is_config_error() {
    let mut connector = Connector::new(ServerConfig::new("127.0.0.1"));
    let err = connector.upload("a.txt", b"a").await.unwrap_err();
    assert!(matches!(err, Error::Config(_)), "{:?}", err);
}

// ── russh 서버 경유 (Connector) ──────────────────────────────────────────────

struct SshHandler {
    files: Files,
    channels: HashMap<ChannelId, Channel<Msg>>,
}

#[async_trait::async_trait]
impl server::Handler for SshHandler {
    type Error = russh::Error;

    async fn auth_password(&mut self, user: &str, password: &str) -> Result<Auth, Self::Error> {
        if user == "u" && password == "p" {
            Ok(Auth::Accept)
        } else {
            Ok(Auth::Reject { proceed_with_methods: None })
        }
    }

    async fn channel_open_session(
        &mut self,
        channel: Channel<Msg>,
        _session: &mut server::Session,
    ) -> Result<bool, Self::Error> {
        self.channels.insert(channel.id(), channel);
        Ok(true)
    }

    async fn subsystem_request(
        &mut self,
        channel_id: ChannelId,
        name: &str,
        session: &mut server::Session,
    ) -> Result<(), Self::Error> {
        match (name, self.channels.remove(&channel_id)) {
            ("sftp", Some(channel)) => {
                let _ = session.channel_success(channel_id);
                let handler = MemoryHandler::new(self.files.clone());
                tokio::spawn(russh_sftp::server::run(channel.into_stream(), handler));
            }
            _ => {
                let _ = session.channel_failure(channel_id);
            }
        }
        Ok(())
    }
}

struct SshServer {
    port: u16,
    fingerprint: String,
    files: Files,
}

/// 임시 ed25519 호스트키로 127.0.0.1 임의 포트에서 SSH 서버 시작
async fn spawn_ssh_server() -> SshServer {
    let key = KeyPair::generate_ed25519().unwrap();
    let fingerprint = key.clone_public_key().unwrap().fingerprint();
    let config = Arc::new(server::Config {
        keys: vec![key],
        auth_rejection_time: Duration::from_millis(10),
        auth_rejection_time_initial: Some(Duration::from_millis(0)),
        ..Default::default()
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let files = Files::default();

    let shared = files.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let handler = SshHandler { files: shared.clone(), channels: HashMap::new() };
            let config = config.clone();
            tokio::spawn(async move {
                if let Ok(session) = server::run_stream(config, socket, handler).await {
                    let _ = session.await;
                }
            });
        }
    });

    SshServer { port, fingerprint, files }
}

fn sftp_config(server: &SshServer) -> ServerConfig {
    let mut config = ServerConfig::new("127.0.0.1");
    config.port = server.port;
    config.user = Some("u".to_string());
    config.password = Some("p".to_string());
    config.home_path = Some("/incoming".to_string());
    config.host_key = HostKeyPolicy::Fingerprint(format!("SHA256:{}", server.fingerprint));
    config.timeout_secs = 5;
    config
}

#[tokio::test]
async fn connector_test_connection_with_pinned_key() {
    let server = spawn_ssh_server().await;
    let mut connector = Connector::new(sftp_config(&server));

    assert!(connector.test_connection().await.unwrap());
    assert_eq!(connector.state(), &ConnectionState::Closed);
}

#[tokio::test]
async fn connector_upload_then_download_under_home() {
    let server = spawn_ssh_server().await;
    let mut connector = Connector::new(sftp_config(&server));

    connector.upload("report.csv", b"a,b\n1,2").await.unwrap();
    assert_eq!(
        server.files.lock().unwrap().get("/incoming/report.csv").map(Vec::as_slice),
        Some(&b"a,b\n1,2"[..])
    );

    assert_eq!(connector.download("report.csv").await.unwrap(), b"a,b\n1,2");
    assert_eq!(connector.state(), &ConnectionState::Closed);
}

#[tokio::test]
async fn connector_missing_remote_file_still_closes() {
    let server = spawn_ssh_server().await;
    let mut connector = Connector::new(sftp_config(&server));

    let err = connector.download("nope.csv").await.unwrap_err();
    assert!(matches!(err, Error::Transfer(_)), "{:?}", err);
    assert_eq!(connector.state(), &ConnectionState::Closed);
}

#[tokio::test]
async fn connector_bad_password_is_auth_error() {
    let server = spawn_ssh_server().await;
    let mut config = sftp_config(&server);
    config.password = Some("wrong".to_string());
    let mut connector = Connector::new(config);

    let err = connector.test_connection().await.unwrap_err();
    assert!(matches!(err, Error::Auth(_)), "{:?}", err);
    assert!(matches!(connector.state(), ConnectionState::Error { .. }));
}

#[tokio::test]
async fn connector_wrong_fingerprint_is_host_key_error() {
    let server = spawn_ssh_server().await;
    let mut config = sftp_config(&server);
    config.host_key = HostKeyPolicy::Fingerprint("SHA256:AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA".to_string());
    let mut connector = Connector::new(config);

    let err = connector.test_connection().await.unwrap_err();
    assert!(matches!(err, Error::HostKey(_)), "{:?}", err);
    assert!(err.is_connection());
}

#[tokio::test]
async fn connector_unknown_host_is_rejected_by_known_hosts() {
    // 매번 새로 만든 키 → known_hosts에 있을 수 없음
    let server = spawn_ssh_server().await;
    let mut config = sftp_config(&server);
    config.host_key = HostKeyPolicy::KnownHosts;
    let mut connector = Connector::new(config);

    let err = connector.test_connection().await.unwrap_err();
    assert!(matches!(err, Error::HostKey(_)), "{:?}", err);
}
