// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ERC-20 token contract interactions.

use alloy::{
    primitives::{Address, U256},
    providers::Provider,
    sol,
};

use super::client::ChainClientError;

// Define the ERC-20 interface using alloy's sol! macro
sol! {
    #[sol(rpc)]
    interface IERC20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

/// ERC-20 contract wrapper.
pub struct Erc20Contract<P> {
    contract: IERC20::IERC20Instance<P>,
}

impl<P: Provider + Clone> Erc20Contract<P> {
    /// Create a new ERC-20 contract instance.
    pub fn new(provider: &P, contract_address: Address) -> Self {
        let contract = IERC20::new(contract_address, provider.clone());
        Self { contract }
    }

    /// Amount `spender` may currently move on behalf of `owner`.
    pub async fn allowance(&self, owner: Address, spender: Address) -> Result<U256, ChainClientError> {
        self.contract
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| ChainClientError::Contract(e.to_string()))
    }
}
