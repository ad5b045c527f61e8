//! # Physics モジュール
//!
//! 飛翔体の運動学積分と加速度制限を提供します。
//!
//! 積分には半陰的オイラー法（速度→位置の順で更新）を使用します。
//!
//! ```text
//! v' = v + a·dt
//! p' = p + v'·dt
//! ```
//!
//! 陽的オイラー法よりエネルギー挙動が良く、固定の小さな時間刻み（約0.016秒）
//! で高次積分のコストをかけずに安定した軌道を得られます。

use crate::models::{IMovable, Vector3};
use thiserror::Error;

/// 運動学計算のエラー
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum PhysicsError {
    /// 時間刻みが0以下または非有限
    #[error("時間刻みが不正です: dt={0}")]
    InvalidTimeStep(f64),
    /// 積分結果に NaN/Inf が含まれる
    #[error("積分結果が非有限値になりました")]
    NonFiniteState,
}

/// 半陰的オイラー法による1ステップの運動学更新
///
/// # 引数
///
/// * `position` - 現在位置（m）
/// * `velocity` - 現在速度（m/s）
/// * `acceleration` - 適用する加速度（m/s²）
/// * `dt` - 時間刻み（秒）、正の有限値
///
/// # 戻り値
///
/// 更新後の（位置, 速度）。`dt` が不正な場合や結果が非有限の場合はエラー
pub fn kinematics_update(
    position: Vector3,
    velocity: Vector3,
    acceleration: Vector3,
    dt: f64,
) -> Result<(Vector3, Vector3), PhysicsError> {
    if !dt.is_finite() || dt <= 0.0 {
        return Err(PhysicsError::InvalidTimeStep(dt));
    }

    let new_velocity = velocity + acceleration * dt;
    let new_position = position + new_velocity * dt;

    if !new_velocity.is_finite() || !new_position.is_finite() {
        return Err(PhysicsError::NonFiniteState);
    }

    Ok((new_position, new_velocity))
}

/// 加速度ベクトルの大きさ制限
///
/// `|a| > max_magnitude` の場合は方向を保ったまま `max_magnitude` に縮小します。
/// 制限値が負または非有限の場合は 0 とみなします。
pub fn limit_acceleration(acceleration: Vector3, max_magnitude: f64) -> Vector3 {
    let cap = if max_magnitude.is_finite() { max_magnitude.max(0.0) } else { 0.0 };
    let mag = acceleration.magnitude();
    if mag > cap {
        acceleration * (cap / mag)
    } else {
        acceleration
    }
}

/// エンティティを現在の加速度で1ステップ進める
///
/// 失敗した場合、エンティティの状態は変更されません。
pub fn advance_entity<M: IMovable>(entity: &mut M, dt: f64) -> Result<(), PhysicsError> {
    let (position, velocity) = kinematics_update(
        entity.get_position(),
        entity.get_velocity(),
        entity.get_acceleration(),
        dt,
    )?;
    entity.set_position(position);
    entity.set_velocity(velocity);
    Ok(())
}
