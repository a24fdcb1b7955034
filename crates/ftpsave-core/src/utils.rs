// ftpsave Utils
//
// 공통 유틸 함수 모음
// - resolve_path        : 상대경로 → home_path 기준 원격 경로
// - check_relative_path : 전송 전 경로 검증 (".." 거부)
// - fmt_size            : 바이트 → 사람이 읽기 좋은 단위 (1.2MB 등)

use crate::error::{Error, Result};

// ── 경로 유틸 ────────────────────────────────────────────────────────────────

/// 상대경로 → 원격 경로 변환
///
/// - home 있음 → "{home}/{relative}"
/// - home 없음 (또는 빈 문자열) → relative 그대로
///
/// 정규화는 하지 않음. 슬래시 중복도 그대로 둠.
pub fn resolve_path(home: Option<&str>, relative: &str) -> String {
    match home {
        Some(home) if !home.is_empty() => format!("{}/{}", home, relative),
        _ => relative.to_string(),
    }
}

/// 업로드/다운로드 전 상대경로 검증
///
/// ".." 컴포넌트가 있으면 home_path 밖으로 나갈 수 있으므로 거부
pub fn check_relative_path(relative: &str) -> Result<()> {
    if relative.is_empty() {
        return Err(Error::InvalidPath("empty path".to_string()));
    }
    if relative.split(['/', '\\']).any(|part| part == "..") {
        return Err(Error::InvalidPath(format!("'..' is not allowed: {}", relative)));
    }
    Ok(())
}

// ── 포맷 유틸 ────────────────────────────────────────────────────────────────

/// 바이트 → 사람이 읽기 좋은 단위 문자열
pub fn fmt_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB      { format!("{:.1}GB", bytes as f64 / GB as f64) }
    else if bytes >= MB { format!("{:.1}MB", bytes as f64 / MB as f64) }
    else if bytes >= KB { format!("{:.1}KB", bytes as f64 / KB as f64) }
    else                { format!("{}B",     bytes) }
}
