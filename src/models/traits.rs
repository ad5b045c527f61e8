use crate::models::{common::Vector3, entity::Entity};

/// 移動可能なエンティティのインターフェース
pub trait IMovable {
    /// 現在位置の取得
    fn get_position(&self) -> Vector3;

    /// 現在速度の取得
    fn get_velocity(&self) -> Vector3;

    /// 適用中の加速度の取得
    fn get_acceleration(&self) -> Vector3;

    /// 位置の設定
    fn set_position(&mut self, position: Vector3);

    /// 速度の設定
    fn set_velocity(&mut self, velocity: Vector3);
}

/// 誘導則のインターフェース
///
/// 誘導則は状態を持たない純粋関数として実装します。各呼び出しは現在の
/// ミサイル・ターゲットの運動状態のみから指令加速度を計算するため、
/// 実行中に誘導則を切り替えても履歴は引き継がれません。
pub trait IGuidanceLaw: Send + Sync {
    /// 誘導則の正式名称
    fn name(&self) -> &'static str;

    /// 指令加速度の計算
    ///
    /// 戻り値は重力を含まない「誘導座標系」での正味加速度です。
    /// 重力の合成はエンジン側が担当します。非有限値は返しません。
    fn calculate_acceleration(&self, missile: &Entity, target: &Entity, dt: f64) -> Vector3;
}
