//! # Guidance モジュール
//!
//! ミサイルの誘導則と、名前から誘導則を引き当てるレジストリを提供します。
//!
//! 誘導則は [`IGuidanceLaw`] を実装する状態を持たない型で、実行中でも安全に
//! 切り替えられます。レジストリは閉じた列挙ではなく「名前 → 生成関数」の
//! 開いた対応表で、呼び出し側の契約を変えずに新しい誘導則を追加できます。
//!
//! ## 組み込みの誘導則
//!
//! - `ProNav` (別名: `pn`, `pronav`, `proportional-navigation`)
//! - `PurePursuit` (別名: `pursuit`, `pure`)
//! - `LeadPursuit` (別名: `lead`)
//!
//! 名前の照合は大文字小文字を区別せず、`-` `_` 空白を無視します。
//! 未知の名前はデフォルト（`ProNav`）にフォールバックします。

mod pronav;
mod pursuit;

pub use pronav::ProNav;
pub use pursuit::{LeadPursuit, PurePursuit, MAX_TIME_TO_GO_S, MIN_CLOSING_SPEED_MPS};

use crate::models::{IGuidanceLaw, DEFAULT_NAVIGATION_GAIN};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// デフォルトの誘導則名
pub const DEFAULT_GUIDANCE: &str = "ProNav";

/// 誘導則の生成に使うパラメータ
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuidanceParams {
    /// 比例航法定数 N
    pub navigation_gain: f64,
}

impl Default for GuidanceParams {
    fn default() -> Self {
        Self {
            navigation_gain: DEFAULT_NAVIGATION_GAIN,
        }
    }
}

/// 誘導則の生成関数
pub type GuidanceFactory = Arc<dyn Fn(&GuidanceParams) -> Box<dyn IGuidanceLaw> + Send + Sync>;

struct GuidanceEntry {
    canonical: String,
    factory: GuidanceFactory,
}

/// 名前 → 誘導則 のレジストリ
pub struct GuidanceRegistry {
    entries: HashMap<String, Arc<GuidanceEntry>>,
    canonical_names: Vec<String>,
    default_name: String,
}

impl GuidanceRegistry {
    /// 組み込みの誘導則を持たない空のレジストリ
    ///
    /// `default_name` は後から登録されることを前提とします。
    pub fn empty(default_name: impl Into<String>) -> Self {
        Self {
            entries: HashMap::new(),
            canonical_names: Vec::new(),
            default_name: default_name.into(),
        }
    }

    /// 誘導則を登録
    ///
    /// 既に同じ名前・別名が登録されている場合は上書きします。
    pub fn register<F>(&mut self, canonical: &str, aliases: &[&str], factory: F)
    where
        F: Fn(&GuidanceParams) -> Box<dyn IGuidanceLaw> + Send + Sync + 'static,
    {
        let entry = Arc::new(GuidanceEntry {
            canonical: canonical.to_string(),
            factory: Arc::new(factory),
        });

        for name in std::iter::once(canonical).chain(aliases.iter().copied()) {
            self.entries.insert(normalize_name(name), Arc::clone(&entry));
        }
        if !self.canonical_names.iter().any(|n| n == canonical) {
            self.canonical_names.push(canonical.to_string());
        }
    }

    /// 名前が登録済みかどうか
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&normalize_name(name))
    }

    /// 正式名称の一覧（登録順）
    pub fn names(&self) -> &[String] {
        &self.canonical_names
    }

    /// デフォルトの誘導則名
    pub fn default_name(&self) -> &str {
        &self.default_name
    }

    /// 名前から誘導則を生成
    ///
    /// 未知の名前の場合は警告を出力し、デフォルトの誘導則を返します。
    /// デフォルトも未登録の場合は `ProNav` を返します（誘導則が未設定になることはありません）。
    pub fn resolve(&self, name: &str, params: &GuidanceParams) -> Box<dyn IGuidanceLaw> {
        if let Some(entry) = self.entries.get(&normalize_name(name)) {
            return (entry.factory)(params);
        }

        warn!(
            requested = name,
            fallback = %self.default_name,
            "GUIDANCE_UNKNOWN: 未知の誘導則名のためデフォルトを使用します"
        );

        match self.entries.get(&normalize_name(&self.default_name)) {
            Some(entry) => (entry.factory)(params),
            None => Box::new(ProNav::new(params.navigation_gain)),
        }
    }

    /// 名前を正式名称に解決（未知の場合は `None`）
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&normalize_name(name))
            .map(|entry| entry.canonical.as_str())
    }
}

impl Default for GuidanceRegistry {
    fn default() -> Self {
        let mut registry = Self::empty(DEFAULT_GUIDANCE);
        registry.register(
            "ProNav",
            &["pn", "pronav", "proportional-navigation"],
            |p: &GuidanceParams| Box::new(ProNav::new(p.navigation_gain)) as Box<dyn IGuidanceLaw>,
        );
        registry.register("PurePursuit", &["pursuit", "pure"], |_: &GuidanceParams| {
            Box::new(PurePursuit) as Box<dyn IGuidanceLaw>
        });
        registry.register("LeadPursuit", &["lead"], |_: &GuidanceParams| {
            Box::new(LeadPursuit) as Box<dyn IGuidanceLaw>
        });
        registry
    }
}

impl fmt::Debug for GuidanceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuidanceRegistry")
            .field("names", &self.canonical_names)
            .field("default_name", &self.default_name)
            .finish()
    }
}

fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}
