//! # Logging モジュール
//!
//! 迎撃シミュレーションのログ管理機能を提供します。
//!
//! tracing-appender による非同期ファイル出力と、コンソール出力を切り替えられます。
//! ティックループの処理速度に影響を与えないよう、ファイルへの書き込みは
//! 専用スレッドで行われます。
//!
//! ## 設定可能な出力先
//!
//! - `Console`: コンソールのみ（compact形式）
//! - `File`: ファイルのみ（JSON形式、`logs/interceptsim.YYYY-MM-DD`）
//! - `Both`: コンソールとファイルの両方

use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// ログ出力先の設定
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogOutput {
    Console,
    File,
    Both,
}

impl LogOutput {
    fn writes_console(&self) -> bool {
        matches!(self, LogOutput::Console | LogOutput::Both)
    }

    fn writes_file(&self) -> bool {
        matches!(self, LogOutput::File | LogOutput::Both)
    }
}

impl FromStr for LogOutput {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "console" | "stdout" => Ok(LogOutput::Console),
            "file" => Ok(LogOutput::File),
            "both" | "all" => Ok(LogOutput::Both),
            _ => Err(LogError::InvalidOutput(s.to_string())),
        }
    }
}

/// ログ初期化エラー
#[derive(Debug, Error)]
pub enum LogError {
    #[error("無効な出力先: {0}. 利用可能: console, file, both")]
    InvalidOutput(String),
    #[error("ログディレクトリを作成できません {}: {}", .0.display(), .1)]
    Directory(PathBuf, #[source] std::io::Error),
    #[error("ログシステムは既に初期化されています: {0}")]
    AlreadyInitialized(#[from] tracing_subscriber::util::TryInitError),
}

/// ログ設定構造体
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub output: LogOutput,
    /// ログファイルのディレクトリ（File または Both の場合）
    pub log_dir: PathBuf,
    pub file_prefix: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            output: LogOutput::Console,
            log_dir: PathBuf::from("logs"),
            file_prefix: "interceptsim".to_string(),
        }
    }
}

/// ログシステムを初期化
///
/// 環境変数 `RUST_LOG` が設定されている場合はそちらを優先します。
/// ファイル出力時は非同期書き込みスレッドのガードを返すので、呼び出し側は
/// プロセス終了までこれを保持してください（破棄時に未書き込み分をフラッシュします）。
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>, LogError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level.to_string()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = config.output.writes_console().then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
    });

    let (file_layer, guard) = if config.output.writes_file() {
        ensure_log_directory(&config.log_dir)?;
        let file_appender = rolling::daily(&config.log_dir, &config.file_prefix);
        let (writer, guard) = non_blocking(file_appender);
        let layer = fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .json();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

/// ログレベルを文字列から解析
///
/// 無効な文字列の場合は INFO を返します。
pub fn parse_log_level(level_str: &str) -> Level {
    Level::from_str(level_str.trim()).unwrap_or_else(|_| {
        eprintln!("警告: 無効なログレベル '{}'. INFOを使用します", level_str);
        Level::INFO
    })
}

/// `-v` の回数からログレベルを決定
pub fn level_from_verbosity(verbose: u8) -> Level {
    match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// ログディレクトリを作成
pub fn ensure_log_directory(log_dir: &std::path::Path) -> Result<(), LogError> {
    std::fs::create_dir_all(log_dir).map_err(|e| LogError::Directory(log_dir.to_path_buf(), e))
}
