//! Chain configuration of the intent signing and feasibility components.

use {
    alloy::primitives::Address,
    anyhow::{Context, anyhow, ensure},
    serde::{Deserialize, Serialize},
    std::{collections::HashSet, path::Path, time::Duration},
    url::Url,
};

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Configuration {
    pub chains: Vec<Chain>,
}

/// A network orders and fills can be signed for.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Chain {
    /// Human readable name used in logs.
    pub name: String,

    pub chain_id: u64,

    /// The contract that spends the Permit2 authorizations, i.e. the spender
    /// of the signed witness transfer.
    pub order_contract: Address,

    /// The Permit2 deployment that verifies the signatures.
    #[serde(default = "default_permit2")]
    pub permit2: Address,

    /// Block time. Fills without an explicit deadline expire one slot after
    /// they are signed.
    #[serde(with = "humantime_serde")]
    pub slot_time: Duration,

    /// Node used for chain state reads. Chains without one can sign but not
    /// check feasibility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<Url>,

    /// Maximum duration of a single chain state read.
    #[serde(with = "humantime_serde", default = "default_rpc_timeout")]
    pub rpc_timeout: Duration,
}

fn default_permit2() -> Address {
    model::PERMIT2_ADDRESS
}

fn default_rpc_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Configuration {
    pub async fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read config at {}", path.as_ref().display()))?;
        match toml::from_str(&content) {
            Ok(self_) => Ok(self_),
            Err(err) if std::env::var("TOML_TRACE_ERROR").is_ok_and(|v| v == "1") => Err(anyhow!(
                "failed to parse TOML config at {}: {err:#?}",
                path.as_ref().display()
            )),
            Err(_) => Err(anyhow!(
                "failed to parse TOML config at: {}. Set TOML_TRACE_ERROR=1 to print parsing \
                 error but this may leak secrets.",
                path.as_ref().display()
            )),
        }
    }

    pub async fn to_path<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        Ok(tokio::fs::write(path, toml::to_string_pretty(self)?).await?)
    }

    pub fn validate(self) -> anyhow::Result<Self> {
        ensure!(!self.chains.is_empty(), "no chains are configured");
        let mut chain_ids = HashSet::new();
        for chain in &self.chains {
            ensure!(
                chain_ids.insert(chain.chain_id),
                "chain id {} is configured more than once",
                chain.chain_id
            );
            ensure!(
                u32::try_from(chain.chain_id).is_ok(),
                "chain id {} of {} does not fit the uint32 output chain id",
                chain.chain_id,
                chain.name
            );
            ensure!(
                !chain.slot_time.is_zero(),
                "slot time of {} must not be zero",
                chain.name
            );
            ensure!(
                !chain.rpc_timeout.is_zero(),
                "rpc timeout of {} must not be zero",
                chain.name
            );
        }
        tracing::debug!(chains = ?chain_ids, "validated configuration");
        Ok(self)
    }

    pub fn chain(&self, chain_id: u64) -> Option<&Chain> {
        self.chains.iter().find(|chain| chain.chain_id == chain_id)
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Chain {
    pub fn test(chain_id: u64) -> Self {
        Self {
            name: format!("chain-{chain_id}"),
            chain_id,
            order_contract: Address::repeat_byte(0x42),
            permit2: model::PERMIT2_ADDRESS,
            slot_time: Duration::from_secs(12),
            rpc_url: None,
            rpc_timeout: default_rpc_timeout(),
        }
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Configuration {
    pub fn test(chain_ids: &[u64]) -> Self {
        Self {
            chains: chain_ids.iter().copied().map(Chain::test).collect(),
        }
    }

    pub fn to_temp_path(&self) -> tempfile::NamedTempFile {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().expect("temp file creation should not fail");
        file.write_all(
            toml::to_string_pretty(self)
                .expect("serialization should not fail")
                .as_bytes(),
        )
        .expect("writing to temp file should not fail");
        file
    }
}
