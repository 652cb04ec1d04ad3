//! Host capability boundary.
//!
//! Host-state opcodes never inline host logic; they call through [`Host`],
//! which the evaluator treats as an opaque, read-only capability.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::word::{Word, serde_word, serde_words};

use super::config::load_document;
use super::error::HostError;

/// Read-only view of host state. Every method defaults to `Unsupported`.
pub trait Host {
    fn block_number(&self) -> Result<Word, HostError> {
        Err(HostError::Unsupported("block-number"))
    }

    fn timestamp(&self) -> Result<Word, HostError> {
        Err(HostError::Unsupported("timestamp"))
    }

    fn caller(&self) -> Result<Word, HostError> {
        Err(HostError::Unsupported("caller"))
    }

    fn this_address(&self) -> Result<Word, HostError> {
        Err(HostError::Unsupported("this-address"))
    }

    /// Cell of the host-supplied context grid.
    fn context(&self, column: u8, row: u8) -> Result<Word, HostError> {
        Err(HostError::MissingContext { column, row })
    }

    fn erc20_balance_of(&self, _token: Word, _account: Word) -> Result<Word, HostError> {
        Err(HostError::Unsupported("erc20-balance-of"))
    }

    fn erc20_total_supply(&self, _token: Word) -> Result<Word, HostError> {
        Err(HostError::Unsupported("erc20-total-supply"))
    }
}

/// Host without any state.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl Host for NullHost {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenState {
    #[serde(with = "serde_word", default)]
    pub total_supply: Word,
    #[serde(default)]
    pub balances: Vec<Balance>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    #[serde(with = "serde_word")]
    pub account: Word,
    #[serde(with = "serde_word")]
    pub amount: Word,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenEntry {
    #[serde(with = "serde_word")]
    address: Word,
    #[serde(flatten)]
    state: TokenState,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ContextColumn(#[serde(with = "serde_words")] Vec<Word>);

/// Fixed host state, loadable from JSON/TOML/YAML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "StaticHostFile", into = "StaticHostFile")]
pub struct StaticHost {
    pub block_number: Option<Word>,
    pub timestamp: Option<Word>,
    pub caller: Option<Word>,
    pub this_address: Option<Word>,
    pub context: Vec<Vec<Word>>,
    pub tokens: BTreeMap<Word, TokenState>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StaticHostFile {
    #[serde(default, with = "opt_word", skip_serializing_if = "Option::is_none")]
    block_number: Option<Word>,
    #[serde(default, with = "opt_word", skip_serializing_if = "Option::is_none")]
    timestamp: Option<Word>,
    #[serde(default, with = "opt_word", skip_serializing_if = "Option::is_none")]
    caller: Option<Word>,
    #[serde(default, with = "opt_word", skip_serializing_if = "Option::is_none")]
    this_address: Option<Word>,
    #[serde(default)]
    context: Vec<ContextColumn>,
    #[serde(default)]
    tokens: Vec<TokenEntry>,
}

mod opt_word {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::word::{Word, serde_word};

    #[derive(Deserialize)]
    struct Wrapped(#[serde(with = "serde_word")] Word);

    pub fn serialize<S: Serializer>(value: &Option<Word>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serde_word::serialize(v, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Word>, D::Error> {
        Option::<Wrapped>::deserialize(deserializer).map(|v| v.map(|Wrapped(w)| w))
    }
}

impl From<StaticHostFile> for StaticHost {
    fn from(file: StaticHostFile) -> Self {
        Self {
            block_number: file.block_number,
            timestamp: file.timestamp,
            caller: file.caller,
            this_address: file.this_address,
            context: file.context.into_iter().map(|c| c.0).collect(),
            tokens: file.tokens.into_iter().map(|t| (t.address, t.state)).collect(),
        }
    }
}

impl From<StaticHost> for StaticHostFile {
    fn from(host: StaticHost) -> Self {
        Self {
            block_number: host.block_number,
            timestamp: host.timestamp,
            caller: host.caller,
            this_address: host.this_address,
            context: host.context.into_iter().map(ContextColumn).collect(),
            tokens: host
                .tokens
                .into_iter()
                .map(|(address, state)| TokenEntry { address, state })
                .collect(),
        }
    }
}

impl StaticHost {
    pub fn load(path: &Path) -> Result<Self> {
        load_document(path)
    }

    pub fn with_token(mut self, address: Word, total_supply: Word) -> Self {
        self.tokens.entry(address).or_default().total_supply = total_supply;
        self
    }

    pub fn with_balance(mut self, token: Word, account: Word, amount: Word) -> Self {
        let state = self.tokens.entry(token).or_default();
        match state.balances.iter_mut().find(|b| b.account == account) {
            Some(existing) => existing.amount = amount,
            None => state.balances.push(Balance { account, amount }),
        }
        self
    }
}

impl Host for StaticHost {
    fn block_number(&self) -> Result<Word, HostError> {
        self.block_number.ok_or(HostError::Unsupported("block-number"))
    }

    fn timestamp(&self) -> Result<Word, HostError> {
        self.timestamp.ok_or(HostError::Unsupported("timestamp"))
    }

    fn caller(&self) -> Result<Word, HostError> {
        self.caller.ok_or(HostError::Unsupported("caller"))
    }

    fn this_address(&self) -> Result<Word, HostError> {
        self.this_address.ok_or(HostError::Unsupported("this-address"))
    }

    fn context(&self, column: u8, row: u8) -> Result<Word, HostError> {
        self.context
            .get(column as usize)
            .and_then(|col| col.get(row as usize))
            .copied()
            .ok_or(HostError::MissingContext { column, row })
    }

    fn erc20_balance_of(&self, token: Word, account: Word) -> Result<Word, HostError> {
        let state = self.tokens.get(&token).ok_or(HostError::UnknownToken(token))?;
        Ok(state
            .balances
            .iter()
            .find(|b| b.account == account)
            .map(|b| b.amount)
            .unwrap_or_default())
    }

    fn erc20_total_supply(&self, token: Word) -> Result<Word, HostError> {
        self.tokens
            .get(&token)
            .map(|state| state.total_supply)
            .ok_or(HostError::UnknownToken(token))
    }
}
