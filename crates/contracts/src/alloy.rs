crate::bindings!(
    IPermit2,
    interface IPermit2 {
        /// Bitmap of consumed unordered nonces. Bit `nonce & 0xff` of word
        /// `nonce >> 8` is set once the nonce is used.
        function nonceBitmap(address owner, uint256 wordPosition) external view returns (uint256);
    }
);

crate::bindings!(
    IERC20,
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);

        function allowance(address owner, address spender) external view returns (uint256);
    }
);

#[macro_export]
macro_rules! bindings {
    ($contract:ident, $($interface:tt)*) => {
        paste::paste! {
            // Generate the main bindings in a private module. That allows
            // us to re-export all items in our own module while also adding
            // some items ourselves.
            #[allow(non_snake_case)]
            mod [<$contract Private>] {
                alloy::sol!(
                    #[allow(missing_docs)]
                    #[sol(rpc)]
                    $($interface)*
                );
            }

            #[allow(non_snake_case)]
            pub mod $contract {
                use alloy::providers::DynProvider;

                pub use super::[<$contract Private>]::*;
                pub type Instance = $contract::[<$contract Instance>]<DynProvider>;
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        alloy::{
            primitives::{Address, U256},
            sol_types::SolCall,
        },
        hex_literal::hex,
    };

    #[test]
    fn selectors() {
        assert_eq!(IPermit2::IPermit2::nonceBitmapCall::SELECTOR, hex!("4fe02b44"));
        assert_eq!(IERC20::IERC20::balanceOfCall::SELECTOR, hex!("70a08231"));
        assert_eq!(IERC20::IERC20::allowanceCall::SELECTOR, hex!("dd62ed3e"));
    }

    #[test]
    fn bindings_only_read_state() {
        assert_eq!(
            IPermit2::IPermit2::IPermit2Calls::SELECTORS,
            [hex!("4fe02b44")]
        );
        let mut erc20 = IERC20::IERC20::IERC20Calls::SELECTORS.to_vec();
        erc20.sort();
        assert_eq!(erc20, [hex!("70a08231"), hex!("dd62ed3e")]);
    }

    #[test]
    fn encodes_nonce_bitmap_call() {
        let call = IPermit2::IPermit2::nonceBitmapCall {
            owner: Address::repeat_byte(0x11),
            wordPosition: U256::from(2),
        };
        let data = call.abi_encode();
        assert_eq!(data.len(), 4 + 2 * 32);
        assert_eq!(data[..4], hex!("4fe02b44"));
        assert_eq!(data[16..36], [0x11; 20]);
        assert_eq!(data[67], 2);
    }
}
