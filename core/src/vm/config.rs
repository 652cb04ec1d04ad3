//! Expression configuration files.
//!
//! A configuration names the constant pool and the sources of one
//! expression. Sources are either `0x` hex bytecode or assembly text, so
//! the same file can be hand-written or emitted by tooling.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail, ensure};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::word::{Word, serde_words};

use super::asm::assemble_source;
use super::bytecode::encode_source;
use super::expression::Expression;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Toml,
    Yaml,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "json" => Ok(DocumentFormat::Json),
            "toml" => Ok(DocumentFormat::Toml),
            "yaml" | "yml" => Ok(DocumentFormat::Yaml),
            other => bail!(
                "unsupported config extension '{}' for '{}' (expected json, toml, yaml)",
                other,
                path.display()
            ),
        }
    }
}

pub fn parse_document<T: DeserializeOwned>(text: &str, format: DocumentFormat) -> Result<T> {
    let value = match format {
        DocumentFormat::Json => serde_json::from_str(text)?,
        DocumentFormat::Toml => toml::from_str(text)?,
        DocumentFormat::Yaml => serde_yaml::from_str(text)?,
    };
    Ok(value)
}

pub(crate) fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let format = DocumentFormat::from_path(path)?;
    let text = fs::read_to_string(path).with_context(|| format!("failed to read '{}'", path.display()))?;
    parse_document(&text, format).with_context(|| format!("failed to parse '{}'", path.display()))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressionConfig {
    #[serde(default, with = "serde_words")]
    pub constants: Vec<Word>,
    #[serde(default)]
    pub sources: Vec<String>,
}

impl ExpressionConfig {
    pub fn load(path: &Path) -> Result<Self> {
        load_document(path)
    }

    /// Raw bytes for every source, assembling text sources on the way.
    pub fn source_bytes(&self) -> Result<Vec<Vec<u8>>> {
        self.sources
            .iter()
            .enumerate()
            .map(|(idx, text)| {
                let trimmed = text.trim();
                if let Some(hex) = trimmed.strip_prefix("0x") {
                    decode_hex(hex).with_context(|| format!("source {}: invalid hex bytecode", idx))
                } else {
                    assemble_source(trimmed)
                        .map(|source| encode_source(&source))
                        .with_context(|| format!("source {}: assembly failed", idx))
                }
            })
            .collect()
    }

    pub fn build(&self) -> Result<Expression> {
        let bytes = self.source_bytes()?;
        let expr = Expression::new(bytes, self.constants.clone())?;
        Ok(expr)
    }

    /// Configuration with every source as hex bytecode.
    pub fn from_expression(expr: &Expression) -> Self {
        Self {
            constants: expr.constants().to_vec(),
            sources: expr
                .sources()
                .iter()
                .map(|source| format!("0x{}", encode_hex(&encode_source(source))))
                .collect(),
        }
    }
}

pub fn encode_hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{:02x}", b);
    }
    out
}

pub fn decode_hex(text: &str) -> Result<Vec<u8>> {
    let digits: Vec<u8> = text
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b'_')
        .collect();
    ensure!(digits.len() % 2 == 0, "odd number of hex digits");
    digits
        .chunks_exact(2)
        .map(|pair| {
            let hi = hex_value(pair[0])?;
            let lo = hex_value(pair[1])?;
            Ok((hi << 4) | lo)
        })
        .collect()
}

fn hex_value(digit: u8) -> Result<u8> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        _ => bail!("invalid hex digit '{}'", digit as char),
    }
}
