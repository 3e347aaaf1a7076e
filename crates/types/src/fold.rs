//! # リクエストボディのデコード規則
//!
//! - フィールド名は大文字小文字を区別せずに照合する（`UserJwt` / `userjwt` / `USERJWT`）
//! - 同じフィールドが複数回現れた場合は後の値を採用する
//! - 未知のフィールドは無視する
//! - リストの `null` は空リスト、文字列の `null` は直前の値のまま
//! - 本文全体が `null` の場合は全フィールドを空値とする

use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, Deserializer, IgnoredAny, MapAccess, Visitor};

/// フィールド名を大文字小文字を区別せずに照合してデコードする構造体。
pub(crate) trait FoldedFields: Default {
    /// エラーメッセージ用の型名
    const NAME: &'static str;
    /// 正規のフィールド名（宣言順）
    const FIELDS: &'static [&'static str];

    /// `FIELDS[index]` に一致したキーの値を読み込む。
    fn read_field<'de, A: MapAccess<'de>>(
        &mut self,
        index: usize,
        map: &mut A,
    ) -> Result<(), A::Error>;
}

struct FoldedVisitor<T>(PhantomData<T>);

impl<'de, T: FoldedFields> Visitor<'de> for FoldedVisitor<T> {
    type Value = T;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "struct {}", T::NAME)
    }

    fn visit_unit<E: de::Error>(self) -> Result<T, E> {
        Ok(T::default())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<T, A::Error> {
        let mut value = T::default();
        while let Some(key) = map.next_key::<String>()? {
            match T::FIELDS.iter().position(|f| f.eq_ignore_ascii_case(&key)) {
                Some(index) => value.read_field(index, &mut map)?,
                None => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(value)
    }
}

/// `Deserialize` 実装から呼ぶ入口。
pub(crate) fn deserialize_folded<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FoldedFields,
{
    deserializer.deserialize_any(FoldedVisitor(PhantomData))
}

/// 文字列値を読む。`null` なら `current` を変更しない。
pub(crate) fn read_string<'de, A: MapAccess<'de>>(
    map: &mut A,
    current: &mut String,
) -> Result<(), A::Error> {
    if let Some(s) = map.next_value::<Option<String>>()? {
        *current = s;
    }
    Ok(())
}

/// 文字列リストを読む。`null` は空リスト。
pub(crate) fn read_list<'de, A: MapAccess<'de>>(
    map: &mut A,
    current: &mut Vec<String>,
) -> Result<(), A::Error> {
    *current = map.next_value::<Option<Vec<String>>>()?.unwrap_or_default();
    Ok(())
}
