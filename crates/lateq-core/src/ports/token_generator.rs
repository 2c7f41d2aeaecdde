//! LeaseTokenGenerator port - lease トークン生成の抽象化
//!
//! トークンはプロセスの寿命の間で衝突してはいけない。テスト容易性のために
//! trait として抽象化しています。
//!
//! # 実装
//! - **UlidTokenGenerator**: ULID ベース（本番用）

use crate::domain::LeaseToken;
use crate::ports::Clock;
use ulid::Ulid;

/// LeaseTokenGenerator は推測困難な lease トークンを生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数のキューから共有される）
pub trait LeaseTokenGenerator: Send + Sync {
    fn generate(&self) -> LeaseToken;
}

/// UlidTokenGenerator は ULID ベースのトークン生成器
///
/// 48 bit のミリ秒タイムスタンプ + 80 bit の乱数。
/// Clock を差し替えても乱数部分があるのでトークンは一意。
pub struct UlidTokenGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidTokenGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> LeaseTokenGenerator for UlidTokenGenerator<C> {
    fn generate(&self) -> LeaseToken {
        let timestamp_ms = u64::try_from(self.clock.now().timestamp_millis()).unwrap_or_default();
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        LeaseToken::from(ulid)
    }
}
