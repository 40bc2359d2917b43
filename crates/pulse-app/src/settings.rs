//! 설정 로드.
//!
//! 우선순위: 내장 기본값 → 설정 파일 → 환경 변수(`PULSE__SECTION__FIELD`) → CLI 인자.
//! 설정 파일을 지정하지 않으면 플랫폼별 설정 디렉토리의 `config.toml`을 찾는다.
//!
//! # 플랫폼별 기본 경로
//! - macOS: `~/Library/Application Support/dev.pulse.pulse/config.toml`
//! - Windows: `%APPDATA%\pulse\pulse\config\config.toml`
//! - Linux: `~/.config/pulse/config.toml`

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use directories::ProjectDirs;
use pulse_core::config::AppConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 환경 변수 접두사
const ENV_PREFIX: &str = "PULSE";

/// 기본 설정 파일 경로
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("dev", "pulse", "pulse").map(|p| p.config_dir().join("config.toml"))
}

/// 설정 로드
///
/// `explicit`가 주어지면 그 파일이 반드시 있어야 한다. 기본 경로의 파일은
/// 없어도 된다.
pub fn load(explicit: Option<&Path>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    match explicit {
        Some(path) => {
            info!("설정 파일: {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }
        None => {
            if let Some(path) = default_config_path() {
                debug!("기본 설정 파일 확인: {}", path.display());
                builder = builder.add_source(File::from(path).required(false));
            }
        }
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config: AppConfig = builder
        .build()
        .context("설정 소스 병합 실패")?
        .try_deserialize()
        .context("설정 역직렬화 실패")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::config::Transport;
    use pulse_core::models::metric::MetricKey;
    use std::io::Write;

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        tokio_test::assert_err!(load(Some(&path)));
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pulse.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[server]
port = 4100

[emitter]
interval_ms = 3000

[client]
transport = "sse"

[notification.thresholds]
bounceRate = 80.0
"#
        )
        .unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.server.port, 4100);
        assert_eq!(config.emitter.interval_ms, 3000);
        assert_eq!(config.emitter.value_max, 1_000.0);
        assert_eq!(config.client.transport, Transport::Sse);
        assert_eq!(
            config.notification.thresholds.get(&MetricKey::BounceRate),
            Some(&80.0)
        );
        tokio_test::assert_ok!(config.validate());
    }

    #[test]
    fn json_file_is_supported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pulse.json");
        std::fs::write(&path, r#"{"channel": {"capacity": 32}}"#).unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.channel.capacity, 32);
        assert_eq!(config.channel.client_buffer, 64);
    }
}
