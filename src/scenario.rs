use crate::guidance::DEFAULT_GUIDANCE;
use crate::models::{
    Entity, Vector3, DEFAULT_CAPTURE_RADIUS_M, DEFAULT_DT_S, DEFAULT_NAVIGATION_GAIN, GRAVITY_MPS2,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// シナリオメタデータ
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    pub description: String,
}

impl Default for ScenarioMeta {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: "default".to_string(),
            description: "水平飛行するターゲットを地上発射ミサイルで迎撃".to_string(),
        }
    }
}

/// シミュレーション設定
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// 時間刻み（秒）。ティック周期にも使用
    pub dt_s: f64,
    /// 迎撃判定距離（m）
    pub capture_radius_m: f64,
    /// 重力加速度（m/s²）
    pub gravity_mps2: f64,
    /// 比例航法定数
    pub navigation_gain: f64,
    /// 初期誘導則名
    pub guidance: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            dt_s: DEFAULT_DT_S,
            capture_radius_m: DEFAULT_CAPTURE_RADIUS_M,
            gravity_mps2: GRAVITY_MPS2,
            navigation_gain: DEFAULT_NAVIGATION_GAIN,
            guidance: DEFAULT_GUIDANCE.to_string(),
        }
    }
}

/// 飛翔体の初期状態
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EntityConfig {
    pub id: String,
    pub position: Vector3,
    pub velocity: Vector3,
    pub max_accel_mps2: f64,
}

impl EntityConfig {
    /// デフォルトのターゲット: 東5000m・高度2000m・北5000m から西南へ水平飛行
    pub fn default_target() -> Self {
        Self {
            id: "target-1".to_string(),
            position: Vector3::new(5000.0, 2000.0, 5000.0),
            velocity: Vector3::new(-200.0, 0.0, -100.0),
            max_accel_mps2: 30.0,
        }
    }

    /// デフォルトのミサイル: 原点から上方・ターゲット側へ小さな初速で発射
    pub fn default_missile() -> Self {
        Self {
            id: "missile-1".to_string(),
            position: Vector3::ZERO,
            velocity: Vector3::new(10.0, 10.0, 10.0),
            max_accel_mps2: 400.0,
        }
    }

    fn is_valid(&self) -> bool {
        self.position.is_finite()
            && self.velocity.is_finite()
            && self.max_accel_mps2.is_finite()
            && self.max_accel_mps2 >= 0.0
    }
}

fn default_target_config() -> EntityConfig {
    EntityConfig::default_target()
}

fn default_missile_config() -> EntityConfig {
    EntityConfig::default_missile()
}

/// 完全なシナリオ設定
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub meta: ScenarioMeta,
    #[serde(default)]
    pub sim: SimulationConfig,
    #[serde(default = "default_target_config")]
    pub target: EntityConfig,
    #[serde(default = "default_missile_config")]
    pub missile: EntityConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            meta: ScenarioMeta::default(),
            sim: SimulationConfig::default(),
            target: EntityConfig::default_target(),
            missile: EntityConfig::default_missile(),
        }
    }
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        let contents =
            fs::read_to_string(path).map_err(|e| ScenarioError::Io(path.to_path_buf(), e))?;

        let config = Self::from_yaml_str(&contents)
            .map_err(|e| match e {
                ScenarioError::Parse(_, err) => ScenarioError::Parse(path.to_path_buf(), err),
                other => other,
            })?;

        Ok(config)
    }

    /// YAML文字列からシナリオ設定を読み込み
    pub fn from_yaml_str(contents: &str) -> Result<Self, ScenarioError> {
        let config: ScenarioConfig = serde_yaml::from_str(contents)
            .map_err(|e| ScenarioError::Parse(PathBuf::from("<string>"), e))?;

        config.validate()?;

        Ok(config)
    }

    /// 設定の基本的な検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if !self.sim.dt_s.is_finite() || self.sim.dt_s <= 0.0 {
            return Err(ScenarioError::Validation("dt_s must be positive".to_string()));
        }
        if !self.sim.capture_radius_m.is_finite() || self.sim.capture_radius_m <= 0.0 {
            return Err(ScenarioError::Validation(
                "capture_radius_m must be positive".to_string(),
            ));
        }
        if !self.sim.gravity_mps2.is_finite() {
            return Err(ScenarioError::Validation("gravity_mps2 must be finite".to_string()));
        }
        if !self.sim.navigation_gain.is_finite() || self.sim.navigation_gain <= 0.0 {
            return Err(ScenarioError::Validation(
                "navigation_gain must be positive".to_string(),
            ));
        }
        if !self.target.is_valid() {
            return Err(ScenarioError::Validation(format!(
                "target {} has non-finite state or negative max_accel_mps2",
                self.target.id
            )));
        }
        if !self.missile.is_valid() {
            return Err(ScenarioError::Validation(format!(
                "missile {} has non-finite state or negative max_accel_mps2",
                self.missile.id
            )));
        }

        Ok(())
    }

    /// 不正な値をデフォルト値に置き換えた設定を返す
    ///
    /// エンジンは対話的な制御面のため、設定の不備で停止せず安全なデフォルトで継続します。
    pub fn sanitized(mut self) -> Self {
        let defaults = SimulationConfig::default();

        if !self.sim.dt_s.is_finite() || self.sim.dt_s <= 0.0 {
            warn!(dt_s = self.sim.dt_s, fallback = defaults.dt_s, "CONFIG_FALLBACK: 時間刻みが不正です");
            self.sim.dt_s = defaults.dt_s;
        }
        if !self.sim.capture_radius_m.is_finite() || self.sim.capture_radius_m <= 0.0 {
            warn!(
                capture_radius_m = self.sim.capture_radius_m,
                fallback = defaults.capture_radius_m,
                "CONFIG_FALLBACK: 迎撃判定距離が不正です"
            );
            self.sim.capture_radius_m = defaults.capture_radius_m;
        }
        if !self.sim.gravity_mps2.is_finite() {
            warn!(fallback = defaults.gravity_mps2, "CONFIG_FALLBACK: 重力加速度が不正です");
            self.sim.gravity_mps2 = defaults.gravity_mps2;
        }
        if !self.sim.navigation_gain.is_finite() || self.sim.navigation_gain <= 0.0 {
            warn!(
                navigation_gain = self.sim.navigation_gain,
                fallback = defaults.navigation_gain,
                "CONFIG_FALLBACK: 比例航法定数が不正です"
            );
            self.sim.navigation_gain = defaults.navigation_gain;
        }
        if !self.target.is_valid() {
            warn!(target_id = %self.target.id, "CONFIG_FALLBACK: ターゲット初期状態が不正です");
            self.target = EntityConfig::default_target();
        }
        if !self.missile.is_valid() {
            warn!(missile_id = %self.missile.id, "CONFIG_FALLBACK: ミサイル初期状態が不正です");
            self.missile = EntityConfig::default_missile();
        }

        self
    }

    /// 初期状態のターゲットを生成
    pub fn build_target(&self) -> Entity {
        Entity::new_target(
            self.target.id.clone(),
            self.target.position,
            self.target.velocity,
            self.target.max_accel_mps2,
        )
    }

    /// 初期状態のミサイルを生成
    pub fn build_missile(&self, guidance_mode: &str) -> Entity {
        Entity::new_missile(
            self.missile.id.clone(),
            self.missile.position,
            self.missile.velocity,
            self.missile.max_accel_mps2,
            guidance_mode,
        )
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== シミュレーション設定 ===");
        println!("時間刻み: {:.3}秒 ({:.1}Hz)", self.sim.dt_s, 1.0 / self.sim.dt_s);
        println!("迎撃判定距離: {:.1}m", self.sim.capture_radius_m);
        println!("重力加速度: {:.2}m/s²", self.sim.gravity_mps2);
        println!("誘導則: {} (N={:.1})", self.sim.guidance, self.sim.navigation_gain);
        println!();

        for (label, entity) in [("ターゲット", &self.target), ("ミサイル", &self.missile)] {
            println!("=== {} ({}) ===", label, entity.id);
            println!(
                "位置: ({:.0}, {:.0}, {:.0}) m",
                entity.position.x, entity.position.y, entity.position.z
            );
            println!(
                "速度: ({:.1}, {:.1}, {:.1}) m/s",
                entity.velocity.x, entity.velocity.y, entity.velocity.z
            );
            println!("最大加速度: {:.1}m/s²", entity.max_accel_mps2);
        }
        println!(
            "初期距離: {:.0}m",
            self.target.position.distance(&self.missile.position)
        );
    }
}

/// シナリオ読み込みエラー
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("シナリオファイルが見つかりません: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("ファイル読み込みエラー {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("YAML解析エラー {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] serde_yaml::Error),
    #[error("設定検証エラー: {0}")]
    Validation(String),
}
