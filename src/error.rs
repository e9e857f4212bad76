use thiserror::Error;

/// 求解器對外的失敗型別。注意「不連通」不算失敗，以空的路徑結果表示。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    /// 查無此名稱的節點、連線或 AS
    #[error("找不到物件: {0}")]
    NotFound(String),
    /// Bellman-Ford 在查詢相關的子圖上偵測到負成本迴圈
    #[error("查詢範圍內存在負成本迴圈")]
    NegativeCycle,
    /// 線性規劃或流量問題無可行解
    #[error("問題無可行解: {0}")]
    Infeasible(String),
    /// 線性規劃問題無界
    #[error("線性規劃問題無界")]
    Unbounded,
    /// 限制條件在搜尋開始前就被判定為不合法
    #[error("限制條件不合法: {0}")]
    InvalidConstraint(String),
}
