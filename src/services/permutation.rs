//! 选项乱序 - 纯函数
//!
//! 同一个 `(seed, ordinal, answers)` 永远得到同一个顺序。提交的答案以标签
//! （A、B、C…）保存，评分和之后的每次展示都要靠重新计算这个顺序把标签解析回
//! 选项 id，所以这里不能有任何状态，也不能换随机数算法。
//!
//! 随机数发生器与 `java.util.Random` 逐位一致，洗牌过程与
//! `Collections.shuffle` 一致：已经存在的考试（种子早已持久化）在这里得到与
//! 原系统完全相同的顺序。

use std::collections::{HashMap, HashSet};

use crate::error::{AppError, AppResult, ExamError};
use crate::models::{Answer, AnswerId};

const MULTIPLIER: i64 = 0x5DEECE66D;
const ADDEND: i64 = 0xB;
const MASK: i64 = (1 << 48) - 1;

/// 48 位线性同余发生器
#[derive(Debug, Clone)]
pub struct JavaRandom {
    state: i64,
}

impl JavaRandom {
    pub fn new(seed: i64) -> Self {
        Self {
            state: (seed ^ MULTIPLIER) & MASK,
        }
    }

    fn next(&mut self, bits: u32) -> i32 {
        self.state = self
            .state
            .wrapping_mul(MULTIPLIER)
            .wrapping_add(ADDEND)
            & MASK;
        (self.state >> (48 - bits)) as i32
    }

    /// `[0, bound)` 内的均匀整数，`bound` 必须为正
    pub fn next_int(&mut self, bound: i32) -> i32 {
        debug_assert!(bound > 0, "bound must be positive");
        let mut r = self.next(31);
        let m = bound - 1;
        if bound & m == 0 {
            return ((bound as i64 * r as i64) >> 31) as i32;
        }
        let mut u = r;
        loop {
            r = u % bound;
            if u.wrapping_sub(r).wrapping_add(m) >= 0 {
                return r;
            }
            u = self.next(31);
        }
    }

    /// 原地洗牌（从尾部向前交换）
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (2..=items.len()).rev() {
            let j = self.next_int(i as i32) as usize;
            items.swap(i - 1, j);
        }
    }
}

/// 把题目选项排成展示顺序
///
/// 先按 id 升序固定输入顺序（与存储迭代顺序无关），再用 `seed + ordinal`
/// 作为种子洗牌。种子是普通加法：`(9, 2)` 与 `(10, 1)` 会得到相同的顺序，
/// 这是已知且保留的行为。
pub fn shuffle(seed: i64, ordinal: u64, answers: &[Answer]) -> Vec<Answer> {
    let mut ordered = answers.to_vec();
    ordered.sort_by_key(|a| a.id);

    let mut random = JavaRandom::new(seed.wrapping_add(ordinal as i64));
    random.shuffle(&mut ordered);
    ordered
}

/// 第 `index` 个位置的标签：0 → "A"，1 → "B" …
pub fn label_for(index: usize) -> String {
    char::from_u32('A' as u32 + index as u32)
        .map(String::from)
        .unwrap_or_else(|| format!("#{}", index))
}

/// 正确选项在当前顺序下的标签
pub fn correct_labels(order: &[Answer]) -> Vec<String> {
    order
        .iter()
        .enumerate()
        .filter(|(_, a)| a.correct)
        .map(|(i, _)| label_for(i))
        .collect()
}

/// 把标签解析回选项 id
///
/// 未知标签返回 `InvalidLabel`；重复标签只算一次。
pub fn resolve_labels(order: &[Answer], labels: &[String]) -> AppResult<HashSet<AnswerId>> {
    let by_label: HashMap<String, AnswerId> = order
        .iter()
        .enumerate()
        .map(|(i, a)| (label_for(i), a.id))
        .collect();

    labels
        .iter()
        .map(|label| {
            by_label
                .get(label.trim())
                .copied()
                .ok_or_else(|| {
                    AppError::from(ExamError::InvalidLabel {
                        label: label.clone(),
                    })
                })
        })
        .collect()
}
