use crate::models::{Entity, IGuidanceLaw, Vector3};

/// True 3D 比例航法
///
/// 相対位置 `r = pT − pM`、相対速度 `v = vT − vM` から
///
/// - 接近速度 `Vc = −(r·v)/|r|`（接近中は正）
/// - LOS角速度 `ω = (r × v)/|r|²`
///
/// を求め、指令加速度 `N · Vc · (ω × r̂)` を返します。
/// 指令は常にLOSに直交します。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProNav {
    /// 比例航法定数（通常3-5）
    pub navigation_gain: f64,
}

impl ProNav {
    /// 同位置とみなす距離（m）
    const MIN_RANGE_M: f64 = 1e-6;

    pub fn new(navigation_gain: f64) -> Self {
        Self { navigation_gain }
    }
}

impl IGuidanceLaw for ProNav {
    fn name(&self) -> &'static str {
        "ProNav"
    }

    fn calculate_acceleration(&self, missile: &Entity, target: &Entity, _dt: f64) -> Vector3 {
        let relative_position = target.position - missile.position;
        let range = relative_position.magnitude();

        if !range.is_finite() || range < Self::MIN_RANGE_M {
            return Vector3::ZERO;
        }

        let relative_velocity = target.velocity - missile.velocity;
        let los_unit = relative_position * (1.0 / range);

        let closing_velocity = -relative_position.dot(&relative_velocity) / range;
        let los_rate = relative_position.cross(&relative_velocity) * (1.0 / (range * range));

        let command = los_rate.cross(&los_unit) * (self.navigation_gain * closing_velocity);

        if command.is_finite() { command } else { Vector3::ZERO }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_NAVIGATION_GAIN;
    use proptest::prelude::*;

    fn missile_at(position: Vector3, velocity: Vector3) -> Entity {
        Entity::new_missile("m", position, velocity, 400.0, "ProNav")
    }

    fn target_at(position: Vector3, velocity: Vector3) -> Entity {
        Entity::new_target("t", position, velocity, 30.0)
    }

    #[test]
    fn test_colocated_returns_zero() {
        let law = ProNav::new(DEFAULT_NAVIGATION_GAIN);
        let p = Vector3::new(100.0, 100.0, 100.0);
        let cmd = law.calculate_acceleration(
            &missile_at(p, Vector3::new(10.0, 0.0, 0.0)),
            &target_at(p, Vector3::new(-10.0, 0.0, 0.0)),
            0.016,
        );
        assert_eq!(cmd, Vector3::ZERO);
    }

    #[test]
    fn test_constant_bearing_needs_no_command() {
        // LOSが回転しない衝突コースでは指令はゼロ
        let law = ProNav::new(DEFAULT_NAVIGATION_GAIN);
        let cmd = law.calculate_acceleration(
            &missile_at(Vector3::ZERO, Vector3::new(100.0, 0.0, 0.0)),
            &target_at(Vector3::new(1000.0, 0.0, 0.0), Vector3::new(-50.0, 0.0, 0.0)),
            0.016,
        );
        assert!(cmd.magnitude() < 1e-9);
    }

    #[test]
    fn test_steers_toward_crossing_target_motion() {
        // ターゲットが+Z方向に横切る場合、指令は+Z成分を持つ
        let law = ProNav::new(DEFAULT_NAVIGATION_GAIN);
        let cmd = law.calculate_acceleration(
            &missile_at(Vector3::ZERO, Vector3::new(300.0, 0.0, 0.0)),
            &target_at(Vector3::new(3000.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 100.0)),
            0.016,
        );
        assert!(cmd.z > 0.0);
        assert!(cmd.x.abs() < 1e-9);
    }

    #[test]
    fn test_command_scales_with_gain() {
        let missile = missile_at(Vector3::ZERO, Vector3::new(300.0, 0.0, 0.0));
        let target = target_at(Vector3::new(3000.0, 500.0, 0.0), Vector3::new(0.0, 0.0, 100.0));
        let low = ProNav::new(3.0).calculate_acceleration(&missile, &target, 0.016);
        let high = ProNav::new(6.0).calculate_acceleration(&missile, &target, 0.016);
        assert!((high.magnitude() - 2.0 * low.magnitude()).abs() < 1e-9);
    }

    fn vector(range: f64) -> impl Strategy<Value = Vector3> {
        (-range..range, -range..range, -range..range).prop_map(|(x, y, z)| Vector3::new(x, y, z))
    }

    proptest! {
        #[test]
        fn prop_command_is_perpendicular_to_line_of_sight(
            pm in vector(1.0e4),
            vm in vector(1.0e3),
            pt in vector(1.0e4),
            vt in vector(1.0e3),
            gain in 3.0f64..5.0,
        ) {
            let r = pt - pm;
            prop_assume!(r.magnitude() > 1.0);

            let cmd = ProNav::new(gain).calculate_acceleration(&missile_at(pm, vm), &target_at(pt, vt), 0.016);
            prop_assert!(cmd.is_finite());
            let cos = cmd.dot(&r.normalize()) / (1.0 + cmd.magnitude());
            prop_assert!(cos.abs() < 1e-9);
        }
    }
}
