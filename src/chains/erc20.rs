//! Minimal ERC-20 ABI: `balanceOf` and `transfer`

use ethers_core::abi::{self, Token};
use ethers_core::types::{Address, Bytes, U256};

use crate::error::{EngineError, EngineResult};
use crate::rpc::evm::EvmRpc;

/// `balanceOf(address)`
pub const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];
/// `transfer(address,uint256)`
pub const TRANSFER_SELECTOR: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb];

fn call_data(selector: [u8; 4], args: &[Token]) -> Bytes {
    let mut data = selector.to_vec();
    data.extend(abi::encode(args));
    data.into()
}

pub fn balance_of_call(owner: Address) -> Bytes {
    call_data(BALANCE_OF_SELECTOR, &[Token::Address(owner)])
}

pub fn transfer_call(to: Address, amount: U256) -> Bytes {
    call_data(TRANSFER_SELECTOR, &[Token::Address(to), Token::Uint(amount)])
}

/// First 32-byte word of an `eth_call` result as uint256
pub fn decode_uint256(data: &[u8]) -> EngineResult<U256> {
    if data.len() < 32 {
        return Err(EngineError::parse_error(format!(
            "Expected a 32-byte uint256, got {} bytes",
            data.len()
        )));
    }
    Ok(U256::from_big_endian(&data[..32]))
}

/// Token contract bound to an RPC connection
pub struct Erc20<'a> {
    rpc: &'a EvmRpc,
    contract: Address,
}

impl<'a> Erc20<'a> {
    pub fn new(rpc: &'a EvmRpc, contract: Address) -> Self {
        Self { rpc, contract }
    }

    pub async fn balance_of(&self, owner: Address) -> EngineResult<U256> {
        let raw = self.rpc.call(self.contract, &balance_of_call(owner)).await?;
        decode_uint256(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers_core::utils::id;
    use std::str::FromStr;

    const OWNER: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";

    #[test]
    fn test_selectors_match_signatures() {
        assert_eq!(id("balanceOf(address)"), BALANCE_OF_SELECTOR);
        assert_eq!(id("transfer(address,uint256)"), TRANSFER_SELECTOR);
    }

    #[test]
    fn test_balance_of_call_layout() {
        let data = balance_of_call(Address::from_str(OWNER).unwrap());
        assert_eq!(
            hex::encode(&data),
            "70a08231000000000000000000000000d8da6bf26964af9d7eed9e03e53415d37aa96045"
        );
    }

    #[test]
    fn test_transfer_call_layout() {
        // 25.5 USDC at 6 decimals
        let data = transfer_call(Address::from_str(OWNER).unwrap(), U256::from(25_500_000u64));
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(&data[..4], &TRANSFER_SELECTOR);
        assert_eq!(
            hex::encode(&data[36..]),
            "0000000000000000000000000000000000000000000000000000000001851960"
        );
    }

    #[test]
    fn test_decode_uint256() {
        let mut word = [0u8; 32];
        word[31] = 0x2a;
        assert_eq!(decode_uint256(&word).unwrap(), U256::from(42));
        assert!(decode_uint256(&[0u8; 4]).is_err());
    }
}
