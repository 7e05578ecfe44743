use crate::ports::*;
use std::sync::Arc;

/// サービスの依存関係
///
/// 関数型DDDの原則に従い、データ構造として定義。
/// 振る舞い（メソッド）は持たず、各サービス関数に明示的に渡す。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub members: Arc<dyn MemberRepository>,
    pub books: Arc<dyn BookRepository>,
    pub staff: Arc<dyn StaffDirectory>,
    pub borrowings: Arc<dyn BorrowingRepository>,
    pub reservations: Arc<dyn ReservationRepository>,
    pub fines: Arc<dyn FineLedger>,
    pub unit_of_work: Arc<dyn UnitOfWork>,
    pub notifications: Arc<dyn NotificationService>,
}
