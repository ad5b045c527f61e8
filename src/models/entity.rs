use crate::models::{
    common::{EntityRole, Vector3},
    traits::IMovable,
};
use serde::{Deserialize, Serialize};

/// シミュレーション上の飛翔体（ターゲットまたはミサイル）
///
/// 運動状態（位置・速度・加速度）と役割固有の属性を保持します。
/// エンジンのみが更新を行い、外部には[`SimulationState`](crate::simulation::SimulationState)
/// のスナップショットとして公開されます。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// 一意識別子
    pub id: String,
    /// 役割
    pub role: EntityRole,
    /// 現在位置（m）
    pub position: Vector3,
    /// 現在速度（m/s）
    pub velocity: Vector3,
    /// 直近に適用された正味加速度（m/s²）
    pub acceleration: Vector3,
    /// 最大加速度（m/s²）
    pub max_acceleration: f64,
    /// 誘導モード名（観測用のミラー、挙動には影響しない）
    pub guidance_mode: String,
}

impl Entity {
    /// 新しいターゲットを作成
    ///
    /// ターゲットは誘導を持たないため `guidance_mode` は空文字列です。
    pub fn new_target(
        id: impl Into<String>,
        position: Vector3,
        velocity: Vector3,
        max_acceleration: f64,
    ) -> Self {
        Self {
            id: id.into(),
            role: EntityRole::Target,
            position,
            velocity,
            acceleration: Vector3::ZERO,
            max_acceleration,
            guidance_mode: String::new(),
        }
    }

    /// 新しいミサイル（迎撃体）を作成
    pub fn new_missile(
        id: impl Into<String>,
        position: Vector3,
        velocity: Vector3,
        max_acceleration: f64,
        guidance_mode: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            role: EntityRole::Missile,
            position,
            velocity,
            acceleration: Vector3::ZERO,
            max_acceleration,
            guidance_mode: guidance_mode.into(),
        }
    }

    /// 高度（Y成分）
    pub fn altitude(&self) -> f64 {
        self.position.y
    }

    /// 速さ（m/s）
    pub fn speed(&self) -> f64 {
        self.velocity.magnitude()
    }
}

impl IMovable for Entity {
    fn get_position(&self) -> Vector3 {
        self.position
    }

    fn get_velocity(&self) -> Vector3 {
        self.velocity
    }

    fn get_acceleration(&self) -> Vector3 {
        self.acceleration
    }

    fn set_position(&mut self, position: Vector3) {
        self.position = position;
    }

    fn set_velocity(&mut self, velocity: Vector3) {
        self.velocity = velocity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_assign_roles() {
        let target = Entity::new_target("t", Vector3::new(1.0, 2.0, 3.0), Vector3::ZERO, 30.0);
        assert_eq!(target.role, EntityRole::Target);
        assert!(target.guidance_mode.is_empty());

        let missile = Entity::new_missile("m", Vector3::ZERO, Vector3::new(10.0, 10.0, 10.0), 400.0, "ProNav");
        assert_eq!(missile.role, EntityRole::Missile);
        assert_eq!(missile.guidance_mode, "ProNav");
        assert_eq!(missile.acceleration, Vector3::ZERO);
    }

    #[test]
    fn test_serializes_with_camel_case_keys() {
        let missile = Entity::new_missile("missile-1", Vector3::ZERO, Vector3::ZERO, 400.0, "ProNav");
        let json = serde_json::to_value(&missile).expect("serialize");
        assert_eq!(json["maxAcceleration"], 400.0);
        assert_eq!(json["guidanceMode"], "ProNav");
        assert_eq!(json["role"], "Missile");
    }
}
