use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

/// 3次元ベクトル（位置・速度・加速度共通）
///
/// 座標系は右手系で、X=東、Y=高度（上向き）、Z=北 とします。
/// 全ての演算は非破壊的で、新しい値を返します。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64, // m, m/s, m/s²
    pub y: f64, // 高度軸
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// 内積
    pub fn dot(&self, other: &Vector3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// 外積（右手系）
    pub fn cross(&self, other: &Vector3) -> Vector3 {
        Vector3::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// ベクトルの長さ
    pub fn magnitude(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// 2点間の3次元距離を計算
    pub fn distance(&self, other: &Vector3) -> f64 {
        (*other - *self).magnitude()
    }

    /// 単位ベクトルへ正規化
    ///
    /// 長さが `f64::EPSILON` 未満の場合はゼロベクトルを返します（NaNは返しません）。
    pub fn normalize(&self) -> Vector3 {
        let mag = self.magnitude();
        if mag < f64::EPSILON {
            Vector3::ZERO
        } else {
            *self * (1.0 / mag)
        }
    }

    /// 全成分が有限値かどうか
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vector3 {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vector3 {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f64> for Vector3 {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl Neg for Vector3 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// エンティティの役割
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityRole {
    Target,
    Missile,
}

/// 重力加速度（m/s²、高度軸の負方向に作用）
pub const GRAVITY_MPS2: f64 = 9.81;
/// 迎撃判定距離（m）
pub const DEFAULT_CAPTURE_RADIUS_M: f64 = 5.0;
/// デフォルト時間刻み（約60Hz）
pub const DEFAULT_DT_S: f64 = 0.016;
/// 比例航法定数のデフォルト値（通常3-5）
pub const DEFAULT_NAVIGATION_GAIN: f64 = 4.0;

/// 高度軸方向の重力加速度ベクトル
pub fn gravity_vector(gravity_mps2: f64) -> Vector3 {
    Vector3::new(0.0, -gravity_mps2, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_follows_right_hand_rule() {
        let x = Vector3::new(1.0, 0.0, 0.0);
        let y = Vector3::new(0.0, 1.0, 0.0);
        assert_eq!(x.cross(&y), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(y.cross(&x), Vector3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn test_distance_and_magnitude() {
        let a = Vector3::new(1.0, 2.0, 2.0);
        assert_eq!(a.magnitude(), 3.0);
        assert_eq!(Vector3::ZERO.distance(&a), 3.0);
        assert_eq!(a.distance(&a), 0.0);
    }

    #[test]
    fn test_normalize_zero_vector_returns_zero() {
        let n = Vector3::ZERO.normalize();
        assert_eq!(n, Vector3::ZERO);
        assert!(n.is_finite());
    }

    #[test]
    fn test_normalize_unit_length() {
        let n = Vector3::new(3.0, 0.0, 4.0).normalize();
        assert!((n.magnitude() - 1.0).abs() < 1e-12);
        assert!((n.x - 0.6).abs() < 1e-12);
        assert!((n.z - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_operators_are_pure() {
        let a = Vector3::new(1.0, 2.0, 3.0);
        let b = Vector3::new(0.5, 0.5, 0.5);
        assert_eq!(a + b, Vector3::new(1.5, 2.5, 3.5));
        assert_eq!(a - b, Vector3::new(0.5, 1.5, 2.5));
        assert_eq!(a * 2.0, Vector3::new(2.0, 4.0, 6.0));
        assert_eq!(-a, Vector3::new(-1.0, -2.0, -3.0));
        assert_eq!(a, Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_gravity_points_down_altitude_axis() {
        let g = gravity_vector(GRAVITY_MPS2);
        assert_eq!(g, Vector3::new(0.0, -9.81, 0.0));
    }
}
