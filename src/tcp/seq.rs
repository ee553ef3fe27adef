//! TCP 序列号算术（32 位回绕）
//!
//! 比较采用 serial-number 算术：`a - b` 先做 32 位回绕减法，再按有符号
//! 解释符号位。只要两个操作数相距小于 2^31，这个比较在整个序列空间上
//! （包括跨回绕点）都与真实整数次序一致；恰好相距 2^31 时没有定义，
//! debug 构建下直接断言失败。

use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// 32 位 TCP 序列号。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SeqNum(pub u32);

impl SeqNum {
    pub const ZERO: SeqNum = SeqNum(0);

    /// 回绕安全的有向距离 `self - other`。
    ///
    /// 正值表示 `self` 在 `other` 之后。两个操作数恰好相距 2^31 时
    /// 次序没有定义（调用方违反使用契约）。
    pub fn diff(self, other: SeqNum) -> i32 {
        let d = self.0.wrapping_sub(other.0) as i32;
        debug_assert!(
            d != i32::MIN,
            "sequence numbers {self} and {other} are exactly 2^31 apart; ordering undefined"
        );
        d
    }
}

impl Add<u32> for SeqNum {
    type Output = SeqNum;
    fn add(self, rhs: u32) -> SeqNum {
        SeqNum(self.0.wrapping_add(rhs))
    }
}

impl AddAssign<u32> for SeqNum {
    fn add_assign(&mut self, rhs: u32) {
        self.0 = self.0.wrapping_add(rhs);
    }
}

impl Sub<u32> for SeqNum {
    type Output = SeqNum;
    fn sub(self, rhs: u32) -> SeqNum {
        SeqNum(self.0.wrapping_sub(rhs))
    }
}

/// `a - b` 给出回绕安全的有向距离（见 [`SeqNum::diff`]）。
impl Sub<SeqNum> for SeqNum {
    type Output = i32;
    fn sub(self, rhs: SeqNum) -> i32 {
        self.diff(rhs)
    }
}

impl PartialOrd for SeqNum {
    fn partial_cmp(&self, other: &SeqNum) -> Option<std::cmp::Ordering> {
        Some(self.diff(*other).cmp(&0))
    }
}

impl From<u32> for SeqNum {
    fn from(v: u32) -> SeqNum {
        SeqNum(v)
    }
}

impl fmt::Display for SeqNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
