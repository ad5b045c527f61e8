// 基本的なデータ型と定数
pub mod common;

// エンティティ・誘導則のインターフェース（trait）定義
pub mod traits;

// 飛翔体モデル
pub mod entity;

// 便利な re-export
pub use common::*;
pub use entity::Entity;
pub use traits::*;
