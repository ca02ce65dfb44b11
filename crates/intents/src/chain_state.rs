//! Reads of the on-chain state that decides whether a Permit2 transfer can
//! currently execute.

use {
    alloy::{
        primitives::{Address, U256},
        providers::{DynProvider, Provider, ProviderBuilder},
    },
    anyhow::Context,
    contracts::{IERC20, IPermit2},
    observe::future::Measure,
    std::time::Duration,
};

#[derive(Debug, thiserror::Error, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ChainReadError {
    #[error("{method} did not complete within {timeout:?}")]
    Timeout {
        method: &'static str,
        timeout: Duration,
    },
    #[error("{method} failed: {source}")]
    Call {
        method: &'static str,
        #[source]
        source: alloy::contract::Error,
    },
}

impl ChainReadError {
    /// Stable snake_case code of the error kind.
    pub fn code(&self) -> &'static str {
        self.into()
    }
}

#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait::async_trait]
pub trait ChainReader: Send + Sync {
    /// The Permit2 nonce bitmap word `word` of `owner`.
    async fn nonce_bitmap(&self, owner: Address, word: U256) -> Result<U256, ChainReadError>;

    /// ERC20 balance of `owner`.
    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ChainReadError>;

    /// ERC20 allowance `owner` granted to `spender`.
    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainReadError>;
}

/// [`ChainReader`] backed by `eth_call`s against a node.
pub struct OnchainReader {
    provider: DynProvider,
    permit2: Address,
    timeout: Duration,
}

impl OnchainReader {
    pub fn new(provider: DynProvider, permit2: Address, timeout: Duration) -> Self {
        Self {
            provider,
            permit2,
            timeout,
        }
    }

    /// Connects to the node configured for `chain`.
    pub fn from_config(chain: &configs::Chain) -> anyhow::Result<Self> {
        let url = chain
            .rpc_url
            .clone()
            .with_context(|| format!("no rpc url configured for {}", chain.name))?;
        let provider = ProviderBuilder::new().connect_http(url).erased();
        Ok(Self::new(provider, chain.permit2, chain.rpc_timeout))
    }

    async fn timed<T>(
        &self,
        method: &'static str,
        call: impl Future<Output = Result<T, alloy::contract::Error>>,
    ) -> Result<T, ChainReadError> {
        match tokio::time::timeout(self.timeout, call.measure(method)).await {
            Ok(result) => result.map_err(|source| ChainReadError::Call { method, source }),
            Err(_) => {
                tracing::warn!(method, timeout = ?self.timeout, "chain read timed out");
                Err(ChainReadError::Timeout {
                    method,
                    timeout: self.timeout,
                })
            }
        }
    }
}

#[async_trait::async_trait]
impl ChainReader for OnchainReader {
    async fn nonce_bitmap(&self, owner: Address, word: U256) -> Result<U256, ChainReadError> {
        let permit2 = IPermit2::Instance::new(self.permit2, self.provider.clone());
        self.timed("nonce_bitmap", async {
            permit2.nonceBitmap(owner, word).call().await
        })
        .await
    }

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ChainReadError> {
        let token = IERC20::Instance::new(token, self.provider.clone());
        self.timed("balance_of", async { token.balanceOf(owner).call().await })
            .await
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainReadError> {
        let token = IERC20::Instance::new(token, self.provider.clone());
        self.timed("allowance", async {
            token.allowance(owner, spender).call().await
        })
        .await
    }
}
