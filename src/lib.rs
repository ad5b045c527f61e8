//! # interceptsim
//!
//! 回避するターゲットと誘導ミサイルの2体を固定周期の物理ループで計算する
//! 迎撃シミュレーションエンジンです。
//!
//! - [`models`]: ベクトル・エンティティ・インターフェース
//! - [`physics`]: 運動学積分と加速度制限
//! - [`guidance`]: 誘導則（比例航法・純追尾・先行追尾）とレジストリ
//! - [`simulation`]: スレッドセーフな制御・観測面を持つエンジン
//! - [`scenario`]: YAMLシナリオ設定
//! - [`logging`]: tracing によるログ初期化

pub mod guidance;
pub mod logging;
pub mod models;
pub mod physics;
pub mod scenario;
pub mod simulation;
