//! Role - パイプライン要素の役割
//!
//! 合成時に各要素へ付与されるタグです。
//! - **Plain**: 値だけを受け取り、結果を次の要素へ渡す
//! - **Interceptor**: 「残りのパイプライン」（continuation）と値を受け取り、
//!   continuation を何回・どの値で呼ぶかを自分で決める

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Plain,
    Interceptor,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Plain => f.write_str("plain"),
            Role::Interceptor => f.write_str("interceptor"),
        }
    }
}

/// 平坦化されたパイプラインの 1 要素（`Pipeline::describe` が返す）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageInfo {
    pub role: Role,
    pub name: &'static str,
}
