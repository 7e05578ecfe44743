use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// UUIDをラップするID型を定義する
///
/// 会員・書籍・職員・予約・延滞金はいずれも外部で採番されるため、
/// 同じ形（new / from_uuid / value / Display）を持たせる。
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn value(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_id!(
    /// 会員ID
    MemberId
);
uuid_id!(
    /// 書籍（タイトル）ID
    BookId
);
uuid_id!(
    /// 職員ID
    StaffId
);
uuid_id!(
    /// 予約ID
    ReservationId
);
uuid_id!(
    /// 延滞金台帳ID
    FineId
);

/// 貸出IDの接頭辞
const BORROWING_ID_PREFIX: &str = "BR";

/// 貸出IDの連番部分の桁数
const BORROWING_ID_DIGITS: usize = 6;

/// 貸出IDのパースエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid borrowing id: {0}")]
pub struct InvalidBorrowingId(pub String);

/// 貸出ID - 連番で採番される（BR000001, BR000002, ...）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BorrowingId(u32);

impl BorrowingId {
    /// 最初の貸出ID
    pub fn first() -> Self {
        Self(1)
    }

    /// 直前のIDから次の連番IDを生成する
    ///
    /// 既存の貸出がない場合は`BR000001`から始まる。
    pub fn next_after(last: Option<&BorrowingId>) -> Self {
        match last {
            Some(last) => Self(last.0 + 1),
            None => Self::first(),
        }
    }

    pub fn sequence(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for BorrowingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:0width$}",
            BORROWING_ID_PREFIX,
            self.0,
            width = BORROWING_ID_DIGITS
        )
    }
}

impl std::str::FromStr for BorrowingId {
    type Err = InvalidBorrowingId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix(BORROWING_ID_PREFIX)
            .filter(|d| !d.is_empty() && d.chars().all(|c| c.is_ascii_digit()))
            .ok_or_else(|| InvalidBorrowingId(s.to_string()))?;

        match digits.parse::<u32>() {
            Ok(n) if n > 0 => Ok(Self(n)),
            _ => Err(InvalidBorrowingId(s.to_string())),
        }
    }
}

impl TryFrom<String> for BorrowingId {
    type Error = InvalidBorrowingId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BorrowingId> for String {
    fn from(id: BorrowingId) -> Self {
        id.to_string()
    }
}

/// 蔵書（コピー）ID - 書籍ごとに振られる物理資料の番号
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CopyId(String);

impl CopyId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CopyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 金額（最小通貨単位）
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn new(amount: u64) -> Self {
        Self(amount)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// 日数 × 日額
    pub fn times(self, days: u64) -> Self {
        Self(self.0.saturating_mul(days))
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 更新回数の上限
pub const MAX_RENEWALS: u8 = 2;

/// 更新回数エラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenewalLimitError {
    /// 更新回数の上限を超えた
    LimitExceeded,
}

/// 貸出の更新回数
///
/// 不変条件：更新は2回まで。
/// 上限を超える値は型として作れない。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RenewalCount(u8);

impl RenewalCount {
    pub fn new() -> Self {
        Self(0)
    }

    /// 更新回数を増やす
    ///
    /// # エラー
    /// 既に上限まで更新済みの場合は`RenewalLimitError::LimitExceeded`を返す
    pub fn increment(self) -> Result<Self, RenewalLimitError> {
        if !self.can_renew() {
            return Err(RenewalLimitError::LimitExceeded);
        }
        Ok(Self(self.0 + 1))
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn can_renew(&self) -> bool {
        self.0 < MAX_RENEWALS
    }
}

impl TryFrom<u8> for RenewalCount {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value > MAX_RENEWALS {
            return Err(format!(
                "renewal count {} exceeds limit {}",
                value, MAX_RENEWALS
            ));
        }
        Ok(Self(value))
    }
}

impl From<RenewalCount> for u8 {
    fn from(count: RenewalCount) -> Self {
        count.0
    }
}
