use {
    crate::chain_state::{ChainReadError, ChainReader},
    alloy::primitives::{Address, U256},
    model::nonce::BitmapPosition,
};

/// Whether `owner` already consumed `nonce` in Permit2's unordered nonce
/// bitmap.
pub async fn is_nonce_used(
    reader: &dyn ChainReader,
    owner: Address,
    nonce: U256,
) -> Result<bool, ChainReadError> {
    let position = BitmapPosition::of(nonce);
    let bitmap = reader.nonce_bitmap(owner, position.word).await?;
    Ok(position.is_set(bitmap))
}
