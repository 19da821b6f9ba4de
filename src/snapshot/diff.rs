//! 数据集结构化比较
//!
//! 不看顺序（每一层都是），但会区分重复次数的变化

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde_json::{Map, Value};

/// 一条差异
#[derive(Debug, Clone, PartialEq)]
pub enum DiffEntry {
    /// 新出现的元素（出现 `count` 次）
    Added { item: Value, count: usize },
    /// 消失的元素（原本出现 `count` 次）
    Removed { item: Value, count: usize },
    /// 两边都有，但出现次数不同
    RepetitionChanged {
        item: Value,
        old_count: usize,
        new_count: usize,
    },
}

/// 两个数据集之间的差异
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetDiff {
    pub entries: Vec<DiffEntry>,
}

impl DatasetDiff {
    /// 比较基准与候选数据集
    ///
    /// # 参数
    /// - `baseline`: 上一个版本的全部记录
    /// - `candidate`: 本次抓取的全部记录
    pub fn compute(baseline: &[Value], candidate: &[Value]) -> Self {
        // 规范化文本 → (规范化值, 基准次数, 候选次数)
        let mut counts: BTreeMap<String, (Value, usize, usize)> = BTreeMap::new();

        for item in baseline {
            let canonical = canonicalize(item);
            counts
                .entry(canonical.to_string())
                .or_insert_with(|| (canonical, 0, 0))
                .1 += 1;
        }
        for item in candidate {
            let canonical = canonicalize(item);
            counts
                .entry(canonical.to_string())
                .or_insert_with(|| (canonical, 0, 0))
                .2 += 1;
        }

        let entries = counts
            .into_values()
            .filter_map(|(item, old_count, new_count)| match (old_count, new_count) {
                (old, new) if old == new => None,
                (0, count) => Some(DiffEntry::Added { item, count }),
                (count, 0) => Some(DiffEntry::Removed { item, count }),
                (old_count, new_count) => Some(DiffEntry::RepetitionChanged {
                    item,
                    old_count,
                    new_count,
                }),
            })
            .collect();

        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 渲染成 diff.txt 的内容
    pub fn render(&self) -> String {
        let (mut added, mut removed, mut changed) = (0, 0, 0);
        let mut body = String::new();

        for entry in &self.entries {
            let _ = match entry {
                DiffEntry::Added { item, count } => {
                    added += 1;
                    writeln!(body, "+ {} (x{})", item, count)
                }
                DiffEntry::Removed { item, count } => {
                    removed += 1;
                    writeln!(body, "- {} (x{})", item, count)
                }
                DiffEntry::RepetitionChanged {
                    item,
                    old_count,
                    new_count,
                } => {
                    changed += 1;
                    writeln!(body, "~ {} (x{} -> x{})", item, old_count, new_count)
                }
            };
        }

        format!(
            "added: {}, removed: {}, repetition changed: {}\n{}",
            added, removed, changed, body
        )
    }
}

/// 规范化：对象键排序，数组元素按规范化文本排序
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, canonicalize(v))).collect();
            let mut out = Map::new();
            for (k, v) in sorted {
                out.insert(k.clone(), v);
            }
            Value::Object(out)
        }
        Value::Array(items) => {
            let mut items: Vec<Value> = items.iter().map(canonicalize).collect();
            items.sort_by_cached_key(|item| item.to_string());
            Value::Array(items)
        }
        other => other.clone(),
    }
}
