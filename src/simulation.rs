//! # Simulation モジュール
//!
//! 迎撃シミュレーションの中核となるシミュレーションエンジンを提供します。
//!
//! エンジンはターゲット1機・ミサイル1発・有効な誘導則・シミュレーション時刻・
//! 実行状態を排他的に所有し、固定周期のティックループで世界状態を進めます。
//! 外部（トランスポート層）からは `start` / `stop` / `reset` /
//! `set_guidance_mode` / `step` / `get_state` の操作のみで制御・観測します。
//!
//! ## 1ティックの処理順序
//!
//! 1. **誘導計算**: 有効な誘導則でミサイルの指令加速度を計算
//! 2. **加速度制限**: ミサイルの最大加速度でクリップ
//! 3. **重力合成**: 高度軸下向きの重力を加算（誘導則は重力を知らない）
//! 4. **ターゲット自動操縦**: 正味加速度ゼロ（水平等速直線飛行）
//! 5. **運動学積分**: 両エンティティを半陰的オイラー法で更新
//! 6. **時刻更新**: 経過時間を `dt` 進める
//! 7. **終了判定**: 迎撃（捕捉半径未満）→ 地表衝突（高度 < 0）の順
//!
//! 誘導則は重力を補償しませんが、重力による沈み込みは次のティックで誘導則が
//! 観測する位置・速度誤差として現れ、閉ループで自然に修正されます。
//!
//! ## 並行性
//!
//! 世界状態は1つの `RwLock` で保護されます。ティックループと制御操作が唯一の
//! 書き込み側で、`get_state` は読み取りロックで一貫したスナップショットを複製します。
//! ループはタイマー待ちの間ロックを保持しません。`stop` / `reset` は実行ID
//! （`run_id`）を更新してからループへ通知し、ループは毎回ロック下で実行IDと状態を
//! 再確認するため、古いティックがリセット後の状態を上書きすることはありません。
//!
//! ## 使用例
//!
//! ```rust
//! use interceptsim::scenario::ScenarioConfig;
//! use interceptsim::simulation::{SimulationEngine, SimulationStatus};
//!
//! let engine = SimulationEngine::new(ScenarioConfig::default());
//! engine.set_guidance_mode("LeadPursuit");
//!
//! let state = engine.get_state();
//! assert_eq!(state.status, SimulationStatus::Stopped);
//! assert_eq!(state.entities.len(), 2);
//! ```

use crate::guidance::{GuidanceParams, GuidanceRegistry};
use crate::models::{Entity, EntityRole, IGuidanceLaw, Vector3, gravity_vector};
use crate::physics::{advance_entity, limit_acceleration};
use crate::scenario::ScenarioConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

/// シミュレーションの実行状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationStatus {
    Stopped,
    Running,
    Intercepted,
    Crashed,
}

impl SimulationStatus {
    /// 終了状態（リセットまで遷移しない）かどうか
    pub fn is_terminal(&self) -> bool {
        matches!(self, SimulationStatus::Intercepted | SimulationStatus::Crashed)
    }
}

impl fmt::Display for SimulationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SimulationStatus::Stopped => "Stopped",
            SimulationStatus::Running => "Running",
            SimulationStatus::Intercepted => "Intercepted",
            SimulationStatus::Crashed => "Crashed",
        };
        f.write_str(label)
    }
}

/// 外部に公開する世界状態のスナップショット
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    /// ターゲット、ミサイルの順
    pub entities: Vec<Entity>,
    pub status: SimulationStatus,
    /// 経過シミュレーション時間（秒）
    pub time: f64,
    pub intercept: bool,
}

impl SimulationState {
    pub fn target(&self) -> Option<&Entity> {
        self.entities.iter().find(|e| e.role == EntityRole::Target)
    }

    pub fn missile(&self) -> Option<&Entity> {
        self.entities.iter().find(|e| e.role == EntityRole::Missile)
    }

    /// ミサイルとターゲットの現在距離（m）
    pub fn miss_distance(&self) -> Option<f64> {
        Some(self.missile()?.position.distance(&self.target()?.position))
    }
}

/// 1ステップの結果
#[derive(Debug, Clone, Copy, PartialEq)]
enum StepOutcome {
    /// Running でないため何もしなかった
    Skipped,
    Advanced,
    Intercepted { time: f64, distance: f64, guidance: &'static str },
    Crashed { time: f64, impact_speed: f64, miss_distance: f64 },
}

/// ロックで保護される世界状態
struct World {
    target: Entity,
    missile: Entity,
    guidance: Box<dyn IGuidanceLaw>,
    status: SimulationStatus,
    time: f64,
    intercept: bool,
    step_count: u64,
    /// 実行ループの世代。停止・リセットのたびに進める
    run_id: u64,
    loop_signal: Option<Arc<Notify>>,
}

impl World {
    fn from_scenario(config: &ScenarioConfig, guidance: Box<dyn IGuidanceLaw>, run_id: u64) -> Self {
        Self {
            target: config.build_target(),
            missile: config.build_missile(guidance.name()),
            guidance,
            status: SimulationStatus::Stopped,
            time: 0.0,
            intercept: false,
            step_count: 0,
            run_id,
            loop_signal: None,
        }
    }

    fn snapshot(&self) -> SimulationState {
        SimulationState {
            entities: vec![self.target.clone(), self.missile.clone()],
            status: self.status,
            time: self.time,
            intercept: self.intercept,
        }
    }

    /// 実行中のループを無効化して通知する
    fn cancel_loop(&mut self) {
        self.run_id = self.run_id.wrapping_add(1);
        if let Some(signal) = self.loop_signal.take() {
            signal.notify_one();
        }
    }

    fn step(&mut self, config: &ScenarioConfig) -> StepOutcome {
        if self.status != SimulationStatus::Running {
            return StepOutcome::Skipped;
        }

        let dt = config.sim.dt_s;

        // 1. 誘導計算
        let mut command = self
            .guidance
            .calculate_acceleration(&self.missile, &self.target, dt);
        if !command.is_finite() {
            warn!(
                missile_id = %self.missile.id,
                guidance = self.guidance.name(),
                "GUIDANCE_DEGENERATE: 非有限の指令加速度をゼロに置き換えます"
            );
            command = Vector3::ZERO;
        }

        // 2. 構造制限
        let command = limit_acceleration(command, self.missile.max_acceleration);

        // 3. 重力合成
        self.missile.acceleration = command + gravity_vector(config.sim.gravity_mps2);

        // 4. ターゲットは水平飛行を維持（揚力が重力を相殺）
        self.target.acceleration = Vector3::ZERO;

        // 5. 運動学積分
        for entity in [&mut self.missile, &mut self.target] {
            if let Err(e) = advance_entity(entity, dt) {
                error!(
                    entity_id = %entity.id,
                    error = %e,
                    "KINEMATICS_REJECTED: 積分結果を破棄し前回の状態を維持します"
                );
            }
        }

        // 6. 時刻更新
        self.time += dt;
        self.step_count += 1;

        // 7. 終了判定
        let distance = self.missile.position.distance(&self.target.position);
        if distance < config.sim.capture_radius_m {
            self.intercept = true;
            self.status = SimulationStatus::Intercepted;
            self.cancel_loop();
            return StepOutcome::Intercepted {
                time: self.time,
                distance,
                guidance: self.guidance.name(),
            };
        }

        if self.missile.altitude() < 0.0 {
            let impact_speed = self.missile.speed();
            self.missile.position.y = 0.0;
            self.missile.velocity = Vector3::ZERO;
            self.status = SimulationStatus::Crashed;
            self.cancel_loop();
            return StepOutcome::Crashed {
                time: self.time,
                impact_speed,
                miss_distance: self.missile.position.distance(&self.target.position),
            };
        }

        trace!(time = self.time, miss_distance = distance, "SIM_STEP");
        StepOutcome::Advanced
    }
}

/// ティック周期が表現できない場合の既定値
const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(16);
/// ティック周期の上限
const MAX_TICK_PERIOD: Duration = Duration::from_secs(3600);

/// 時間刻みから実時間のティック周期を求める
///
/// ゼロに丸められる値や上限を超える値は既定値に置き換えます。
fn tick_period_for(dt_s: f64) -> Duration {
    match Duration::try_from_secs_f64(dt_s) {
        Ok(period) if !period.is_zero() && period <= MAX_TICK_PERIOD => period,
        _ => {
            warn!(
                dt_s,
                fallback_ms = DEFAULT_TICK_PERIOD.as_millis() as u64,
                "CONFIG_FALLBACK: ティック周期を表現できません"
            );
            DEFAULT_TICK_PERIOD
        }
    }
}

struct Shared {
    world: RwLock<World>,
    config: ScenarioConfig,
    registry: GuidanceRegistry,
    guidance_params: GuidanceParams,
    tick_period: Duration,
}

/// シミュレーションエンジン
///
/// `Clone` は同じ世界状態を共有するハンドルを作ります。全ての操作は `&self` で、
/// 任意のタスク・スレッドから並行に呼び出せます。
#[derive(Clone)]
pub struct SimulationEngine {
    shared: Arc<Shared>,
}

impl SimulationEngine {
    /// 組み込みの誘導則でエンジンを作成
    pub fn new(config: ScenarioConfig) -> Self {
        Self::with_registry(config, GuidanceRegistry::default())
    }

    /// 任意の誘導則レジストリでエンジンを作成
    ///
    /// 不正な設定値は警告を出してデフォルト値に置き換えます。
    pub fn with_registry(config: ScenarioConfig, registry: GuidanceRegistry) -> Self {
        let config = config.sanitized();
        let guidance_params = GuidanceParams {
            navigation_gain: config.sim.navigation_gain,
        };
        let tick_period = tick_period_for(config.sim.dt_s);

        let guidance = registry.resolve(&config.sim.guidance, &guidance_params);
        let world = World::from_scenario(&config, guidance, 0);

        info!(
            scenario = %config.meta.name,
            dt_s = config.sim.dt_s,
            capture_radius_m = config.sim.capture_radius_m,
            guidance = %world.missile.guidance_mode,
            "SIM_CREATED: シミュレーションエンジンを作成しました"
        );

        Self {
            shared: Arc::new(Shared {
                world: RwLock::new(world),
                config,
                registry,
                guidance_params,
                tick_period,
            }),
        }
    }

    fn read_world(&self) -> RwLockReadGuard<'_, World> {
        self.shared.world.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_world(&self) -> RwLockWriteGuard<'_, World> {
        self.shared.world.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// シミュレーションを開始（再開）
    ///
    /// 既に実行中なら何もしません。終了状態（迎撃・墜落）からはリセットするまで
    /// 開始できません。ループは現在の tokio ランタイム上で実行されるため、
    /// ランタイム外から呼び出した場合はエラーログを出して停止状態のままです。
    pub fn start(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!("SIM_START_FAILED: tokio ランタイム外からは開始できません");
            return;
        };

        let signal = Arc::new(Notify::new());
        let Some(run_id) = self.begin_run(Some(Arc::clone(&signal))) else {
            return;
        };

        info!(
            run_id,
            tick_period_ms = self.shared.tick_period.as_secs_f64() * 1000.0,
            "SIM_STARTED: シミュレーションを開始しました"
        );

        runtime.spawn(run_loop(Arc::downgrade(&self.shared), run_id, signal));
    }

    /// ティックループを起動せずに実行状態へ遷移
    ///
    /// 呼び出し側が [`step`](Self::step) を直接呼び出して決定的に進めるためのモードです。
    /// 遷移の条件は [`start`](Self::start) と同じです。
    pub fn start_manual(&self) {
        if let Some(run_id) = self.begin_run(None) {
            info!(run_id, "SIM_STARTED: 手動ステップモードで開始しました");
        }
    }

    fn begin_run(&self, signal: Option<Arc<Notify>>) -> Option<u64> {
        let mut world = self.write_world();
        match world.status {
            SimulationStatus::Running => return None,
            SimulationStatus::Intercepted | SimulationStatus::Crashed => {
                info!(status = %world.status, "SIM_START_IGNORED: 終了状態のためリセットが必要です");
                return None;
            }
            SimulationStatus::Stopped => {}
        }

        world.cancel_loop();
        world.status = SimulationStatus::Running;
        world.loop_signal = signal;
        Some(world.run_id)
    }

    /// シミュレーションを一時停止
    ///
    /// 実行中でなければ何もしません（終了状態は上書きしません）。
    pub fn stop(&self) {
        let mut world = self.write_world();
        if world.status != SimulationStatus::Running {
            return;
        }
        world.status = SimulationStatus::Stopped;
        world.cancel_loop();
        info!(time = world.time, steps = world.step_count, "SIM_STOPPED: シミュレーションを停止しました");
    }

    /// 初期シナリオへリセット
    ///
    /// 実行中のループを無効化してから両エンティティを再構築し、時刻・迎撃フラグを
    /// クリアして停止状態にします。誘導則もシナリオの初期値に戻ります。
    pub fn reset(&self) {
        let guidance = self
            .shared
            .registry
            .resolve(&self.shared.config.sim.guidance, &self.shared.guidance_params);

        let mut world = self.write_world();
        world.cancel_loop();
        let run_id = world.run_id;
        *world = World::from_scenario(&self.shared.config, guidance, run_id);
        info!(run_id, "SIM_RESET: シミュレーションを初期状態に戻しました");
    }

    /// 誘導則を切り替え
    ///
    /// 任意の状態で呼び出せ、次のティックから有効になります。未知の名前は
    /// デフォルトの誘導則にフォールバックし、ミサイルの `guidance_mode` には
    /// 実際に有効になった誘導則の正式名称を反映します。
    pub fn set_guidance_mode(&self, name: &str) {
        let guidance = self.shared.registry.resolve(name, &self.shared.guidance_params);
        let resolved = guidance.name();

        let mut world = self.write_world();
        let previous = world.guidance.name();
        world.guidance = guidance;
        world.missile.guidance_mode = resolved.to_string();

        info!(
            requested = name,
            previous,
            current = resolved,
            time = world.time,
            "GUIDANCE_MODE_CHANGED: 誘導則を切り替えました"
        );
    }

    /// 1ステップ進める
    ///
    /// 実行中でなければ何もしません。ティックループから呼ばれるほか、
    /// 決定的なステップ実行のために直接呼び出すこともできます。
    pub fn step(&self) {
        let outcome = {
            let mut world = self.write_world();
            world.step(&self.shared.config)
        };
        self.report(outcome);
    }

    /// 現在の状態のスナップショットを取得
    pub fn get_state(&self) -> SimulationState {
        self.read_world().snapshot()
    }

    pub fn status(&self) -> SimulationStatus {
        self.read_world().status
    }

    pub fn is_running(&self) -> bool {
        self.status() == SimulationStatus::Running
    }

    /// 有効な誘導則の正式名称
    pub fn guidance_mode(&self) -> &'static str {
        self.read_world().guidance.name()
    }

    pub fn step_count(&self) -> u64 {
        self.read_world().step_count
    }

    pub fn dt(&self) -> f64 {
        self.shared.config.sim.dt_s
    }

    pub fn tick_period(&self) -> Duration {
        self.shared.tick_period
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.shared.config
    }

    pub fn registry(&self) -> &GuidanceRegistry {
        &self.shared.registry
    }

    /// ループ用: 実行IDが一致する場合のみ1ステップ進める
    ///
    /// 継続すべき場合は `true` を返します。
    fn tick(&self, run_id: u64) -> bool {
        let outcome = {
            let mut world = self.write_world();
            if world.run_id != run_id || world.status != SimulationStatus::Running {
                return false;
            }
            world.step(&self.shared.config)
        };
        self.report(outcome);
        outcome == StepOutcome::Advanced
    }

    fn report(&self, outcome: StepOutcome) {
        match outcome {
            StepOutcome::Skipped | StepOutcome::Advanced => {}
            StepOutcome::Intercepted { time, distance, guidance } => {
                info!(
                    time,
                    intercept_distance = distance,
                    guidance,
                    "INTERCEPT_SUCCESS: ミサイルがターゲットを迎撃しました"
                );
            }
            StepOutcome::Crashed { time, impact_speed, miss_distance } => {
                warn!(time, impact_speed, miss_distance, "MISSILE_CRASHED: ミサイルが地表に衝突しました");
            }
        }
    }
}

impl fmt::Debug for SimulationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let world = self.read_world();
        f.debug_struct("SimulationEngine")
            .field("status", &world.status)
            .field("time", &world.time)
            .field("guidance", &world.guidance.name())
            .field("run_id", &world.run_id)
            .finish()
    }
}

/// 固定周期のティックループ
///
/// エンジンへの弱参照のみを保持し、全てのハンドルが破棄された場合も終了します。
async fn run_loop(shared: Weak<Shared>, run_id: u64, signal: Arc<Notify>) {
    let Some(period) = shared.upgrade().map(|s| s.tick_period) else {
        return;
    };

    let first_tick = Instant::now().checked_add(period).unwrap_or_else(Instant::now);
    let mut interval = tokio::time::interval_at(first_tick, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = signal.notified() => break,
            _ = interval.tick() => {}
        }

        let Some(shared) = shared.upgrade() else {
            break;
        };
        let engine = SimulationEngine { shared };
        if !engine.tick(run_id) {
            break;
        }
    }

    debug!(run_id, "SIM_LOOP_EXIT: ティックループを終了しました");
}
