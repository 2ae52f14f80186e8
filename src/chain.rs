use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, Serialize)]
pub struct NativeCurrency {
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
}

/// Chain the projected earnings and redeployments refer to.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TargetChain {
    pub id: u64,
    pub name: &'static str,
    pub native_currency: NativeCurrency,
    pub rpc_url: &'static str,
    pub explorer_url: &'static str,
}

pub const BAHAMUT_HORIZON: TargetChain = TargetChain {
    id: 2552,
    name: "Bahamut Horizon",
    native_currency: NativeCurrency {
        name: "FTN",
        symbol: "FTN",
        decimals: 18,
    },
    rpc_url: "https://rpc1-horizon.bahamut.io",
    explorer_url: "https://horizon.ftnscan.com",
};

impl TargetChain {
    pub fn chain_id_hex(&self) -> String {
        format!("0x{:x}", self.id)
    }

    /// Parameter object for a wallet's `wallet_addEthereumChain` request.
    pub fn add_chain_params(&self) -> Value {
        json!({
            "chainId": self.chain_id_hex(),
            "chainName": self.name,
            "nativeCurrency": self.native_currency,
            "rpcUrls": [self.rpc_url],
            "blockExplorerUrls": [self.explorer_url],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_id_is_hex_encoded() {
        assert_eq!(BAHAMUT_HORIZON.chain_id_hex(), "0x9f8");
    }

    #[test]
    fn add_chain_params_match_wallet_shape() {
        let params = BAHAMUT_HORIZON.add_chain_params();
        assert_eq!(params["chainId"], "0x9f8");
        assert_eq!(params["nativeCurrency"]["symbol"], "FTN");
        assert_eq!(params["nativeCurrency"]["decimals"], 18);
        assert_eq!(params["rpcUrls"][0], "https://rpc1-horizon.bahamut.io");
    }
}
