use crate::models::{Entity, IGuidanceLaw, Vector3};

/// 先行追尾で使う最小接近速度（m/s）
pub const MIN_CLOSING_SPEED_MPS: f64 = 1.0;
/// 先行追尾の予測時間の上限（秒）
pub const MAX_TIME_TO_GO_S: f64 = 60.0;

const MIN_RANGE_M: f64 = 1e-6;

/// 純追尾
///
/// ターゲットの現在位置へ速度ベクトルを向けるように加速します。
/// ターゲットの運動予測は行いません。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PurePursuit;

/// 先行追尾
///
/// ターゲット速度と残り時間 `t_go = |r| / max(Vc, ε)` から予測した
/// 会合点へ速度ベクトルを向けます。`t_go` は [`MAX_TIME_TO_GO_S`] で頭打ちに
/// するため、遠方または離脱中のターゲットでは会合点が最大60秒先までの外挿になります。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LeadPursuit;

impl LeadPursuit {
    /// 予測会合点の計算
    pub fn predicted_intercept_point(missile: &Entity, target: &Entity) -> Vector3 {
        let relative_position = target.position - missile.position;
        let range = relative_position.magnitude();
        if range < MIN_RANGE_M {
            return target.position;
        }

        let relative_velocity = target.velocity - missile.velocity;
        let closing_velocity = -relative_position.dot(&relative_velocity) / range;
        let time_to_go = (range / closing_velocity.max(MIN_CLOSING_SPEED_MPS)).min(MAX_TIME_TO_GO_S);

        target.position + target.velocity * time_to_go
    }
}

/// 照準点へ速度ベクトルを向けるための指令加速度
///
/// 目標速度は照準点方向に、現在の速さに1ステップ分の最大加速を加えた大きさとし、
/// 1ステップで目標速度に到達する加速度を返します（大きさの制限はエンジン側）。
fn steer_toward(missile: &Entity, aim_point: Vector3, dt: f64) -> Vector3 {
    if !dt.is_finite() || dt <= 0.0 {
        return Vector3::ZERO;
    }

    let line_of_sight = aim_point - missile.position;
    if !line_of_sight.is_finite() || line_of_sight.magnitude() < MIN_RANGE_M {
        return Vector3::ZERO;
    }

    let desired_speed = missile.speed() + missile.max_acceleration.max(0.0) * dt;
    let desired_velocity = line_of_sight.normalize() * desired_speed;
    let command = (desired_velocity - missile.velocity) * (1.0 / dt);

    if command.is_finite() { command } else { Vector3::ZERO }
}

impl IGuidanceLaw for PurePursuit {
    fn name(&self) -> &'static str {
        "PurePursuit"
    }

    fn calculate_acceleration(&self, missile: &Entity, target: &Entity, dt: f64) -> Vector3 {
        steer_toward(missile, target.position, dt)
    }
}

impl IGuidanceLaw for LeadPursuit {
    fn name(&self) -> &'static str {
        "LeadPursuit"
    }

    fn calculate_acceleration(&self, missile: &Entity, target: &Entity, dt: f64) -> Vector3 {
        let aim_point = Self::predicted_intercept_point(missile, target);
        steer_toward(missile, aim_point, dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missile_at(position: Vector3, velocity: Vector3) -> Entity {
        Entity::new_missile("m", position, velocity, 400.0, "PurePursuit")
    }

    fn target_at(position: Vector3, velocity: Vector3) -> Entity {
        Entity::new_target("t", position, velocity, 30.0)
    }

    #[test]
    fn test_pure_pursuit_turns_velocity_toward_target() {
        let missile = missile_at(Vector3::ZERO, Vector3::new(0.0, 0.0, 100.0));
        let target = target_at(Vector3::new(1000.0, 0.0, 0.0), Vector3::ZERO);
        let cmd = PurePursuit.calculate_acceleration(&missile, &target, 0.016);
        assert!(cmd.x > 0.0);
        assert!(cmd.z < 0.0);
    }

    #[test]
    fn test_pure_pursuit_aligned_only_accelerates_along_los() {
        let missile = missile_at(Vector3::ZERO, Vector3::new(100.0, 0.0, 0.0));
        let target = target_at(Vector3::new(1000.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 200.0));
        let cmd = PurePursuit.calculate_acceleration(&missile, &target, 0.016);
        assert!((cmd.x - 400.0).abs() < 1e-6);
        assert!(cmd.y.abs() < 1e-9 && cmd.z.abs() < 1e-9);
    }

    #[test]
    fn test_pure_pursuit_degenerate_inputs_return_zero() {
        let p = Vector3::new(10.0, 10.0, 10.0);
        let missile = missile_at(p, Vector3::new(100.0, 0.0, 0.0));
        let target = target_at(p, Vector3::ZERO);
        assert_eq!(PurePursuit.calculate_acceleration(&missile, &target, 0.016), Vector3::ZERO);

        let far = target_at(Vector3::new(1000.0, 0.0, 0.0), Vector3::ZERO);
        assert_eq!(PurePursuit.calculate_acceleration(&missile, &far, 0.0), Vector3::ZERO);
    }

    #[test]
    fn test_lead_pursuit_aims_ahead_of_moving_target() {
        let missile = missile_at(Vector3::ZERO, Vector3::new(100.0, 0.0, 0.0));
        let target = target_at(Vector3::new(1000.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 100.0));
        let aim = LeadPursuit::predicted_intercept_point(&missile, &target);
        // Vc=100, t_go=10s
        assert!((aim.z - 1000.0).abs() < 1e-9);
        assert!((aim.x - 1000.0).abs() < 1e-9);

        let lead = LeadPursuit.calculate_acceleration(&missile, &target, 0.016);
        let pure = PurePursuit.calculate_acceleration(&missile, &target, 0.016);
        assert!(lead.z > pure.z);
    }

    #[test]
    fn test_lead_pursuit_matches_pure_for_stationary_target() {
        let missile = missile_at(Vector3::new(5.0, 5.0, 5.0), Vector3::new(50.0, 10.0, 0.0));
        let target = target_at(Vector3::new(800.0, 300.0, -200.0), Vector3::ZERO);
        let lead = LeadPursuit.calculate_acceleration(&missile, &target, 0.016);
        let pure = PurePursuit.calculate_acceleration(&missile, &target, 0.016);
        assert!(lead.distance(&pure) < 1e-9);
    }

    #[test]
    fn test_lead_pursuit_caps_time_to_go_when_opening() {
        // 離れていく場合は Vc を ε に置き換え、t_go は上限で打ち切る
        let missile = missile_at(Vector3::ZERO, Vector3::ZERO);
        let target = target_at(Vector3::new(1000.0, 0.0, 0.0), Vector3::new(100.0, 0.0, 0.0));
        let aim = LeadPursuit::predicted_intercept_point(&missile, &target);
        assert!((aim.x - (1000.0 + 100.0 * MAX_TIME_TO_GO_S)).abs() < 1e-9);
        assert!(aim.is_finite());
    }
}
