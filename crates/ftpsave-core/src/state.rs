// ftpsave Connection State Machine + Observer
//
// 연결 라이프사이클을 상태 머신으로 관리
// can_transition_to()로 허용된 전이만 가능하게 강제
//
// 상태 흐름:
//   Idle → Connecting → Authenticating → Connected → Closing → Closed
//
//   어느 상태에서든 → Error 전이 가능
//   Closed / Error → Connecting (작업마다 새 연결)

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Authenticating,
    Connected,
    Closing,
    Closed,
    Error {
        state: Box<ConnectionState>,  // 에러 발생 시점의 상태
        message: String,
    },
}

impl ConnectionState {
    /// 허용된 다음 상태인지 검증
    pub fn can_transition_to(&self, next: &ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Idle, Connecting)
            | (Closed, Connecting)
            | (Error { .. }, Connecting)
            | (Connecting, Authenticating)
            | (Authenticating, Connected)
            | (Connected, Closing)
            | (Closing, Closed)
            | (_, Error { .. })
        )
    }
}

/// 상태 변경 알림 trait
///
/// CLI: tracing debug 로그
/// 레코드 화면 등: 진행 상태 표시
pub trait ConnectionObserver: Send + Sync {
    fn on_state_changed(&self, prev: &ConnectionState, next: &ConnectionState);
}

/// 알림이 필요 없을 때
pub struct NoopObserver;

impl ConnectionObserver for NoopObserver {
    fn on_state_changed(&self, _prev: &ConnectionState, _next: &ConnectionState) {}
}
