//! The 256-bit word every opcode consumes and produces.
//!
//! Booleans are encoded as `0` (false) and non-zero (true); opcodes that
//! produce a boolean always emit `1` for true.

use anyhow::{Result, anyhow, bail};
use primitive_types::U256;

pub type Word = U256;

#[inline]
pub fn word(value: u64) -> Word {
    Word::from(value)
}

#[inline]
pub fn from_bool(value: bool) -> Word {
    if value { Word::one() } else { Word::zero() }
}

#[inline]
pub fn truthy(value: &Word) -> bool {
    !value.is_zero()
}

/// Parse a decimal or `0x`-prefixed hexadecimal literal.
pub fn parse_word(raw: &str) -> Result<Word> {
    let text = raw.trim().replace('_', "");
    if text.is_empty() {
        bail!("empty word literal");
    }
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        if hex.is_empty() || hex.len() > 64 {
            bail!("hex word literal '{}' must have 1..=64 digits", raw);
        }
        return Word::from_str_radix(hex, 16).map_err(|_| anyhow!("invalid hex word literal '{}'", raw));
    }
    Word::from_dec_str(&text).map_err(|e| anyhow!("invalid word literal '{}': {:?}", raw, e))
}

pub mod serde_word {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    use super::{Word, parse_word};

    pub fn serialize<S: Serializer>(value: &Word, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Word, D::Error> {
        deserializer.deserialize_any(WordVisitor)
    }

    pub(crate) struct WordVisitor;

    impl<'de> Visitor<'de> for WordVisitor {
        type Value = Word;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an unsigned integer, decimal string or 0x-prefixed hex string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Word, E> {
            Ok(Word::from(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Word, E> {
            u64::try_from(v)
                .map(Word::from)
                .map_err(|_| E::custom(format!("negative word literal {}", v)))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Word, E> {
            parse_word(v).map_err(|e| E::custom(e.to_string()))
        }
    }
}

/// Serde helpers for `Vec<Word>` fields.
pub mod serde_words {
    use serde::de::{SeqAccess, Visitor};
    use serde::ser::SerializeSeq;
    use serde::{Deserializer, Serializer};
    use std::fmt;

    use super::Word;
    use super::serde_word::WordVisitor;

    struct Wrapped(Word);

    impl<'de> serde::Deserialize<'de> for Wrapped {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_any(WordVisitor).map(Wrapped)
        }
    }

    pub fn serialize<S: Serializer>(values: &[Word], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&value.to_string())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Word>, D::Error> {
        struct SeqVisitor;

        impl<'de> Visitor<'de> for SeqVisitor {
            type Value = Vec<Word>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a list of words")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<Word>, A::Error> {
                let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(Wrapped(value)) = seq.next_element()? {
                    out.push(value);
                }
                Ok(out)
            }
        }

        deserializer.deserialize_seq(SeqVisitor)
    }
}
