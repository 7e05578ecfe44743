use crate::domain::{Book, BookId};
use async_trait::async_trait;

use super::Result;

/// 書籍リポジトリポート
///
/// 書籍はコピー一覧を含むドキュメントとして扱う。
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// IDで書籍（全コピーを含む）を取得する
    async fn find_by_id(&self, book_id: BookId) -> Result<Option<Book>>;
}
