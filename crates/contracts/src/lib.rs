//! Smoothing-pool contract bindings.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg))]

use alloy::sol;

sol! {
    /// The on-chain smoothing pool.
    ///
    /// Validators register by sending their collateral along with a
    /// subscription; block rewards land on the contract balance; the oracle
    /// periodically commits the Merkle root withdrawers claim against.
    #[derive(Debug, PartialEq, Eq)]
    #[sol(rpc)]
    interface ISmoothingPool {
        /// A validator posted collateral to join the pool.
        event SubscribeValidator(uint64 validatorId, uint256 subscriptionCollateral, address sender);

        /// A validator asked to leave the pool.
        event UnsubscribeValidator(uint64 validatorId, address sender);

        /// Plain transfer received by the contract, treated as a donation.
        event EtherReceived(address sender, uint256 donationAmount);

        /// The oracle committed a new rewards root.
        event UpdateRewardsRoot(bytes32 newRewardsRoot);

        /// Commit the Merkle root of claimable balances for a checkpoint.
        function updateRewardsRoot(bytes32 newRewardsRoot) external;

        /// The currently committed rewards root.
        function rewardsRoot() external view returns (bytes32);

        /// Wei already claimed by a withdrawal address.
        function claimedBalance(address withdrawalAddress) external view returns (uint256);

        /// Claim accumulated rewards against the committed root.
        function claimRewards(address withdrawalAddress, uint256 accumulatedBalance, bytes32[] calldata merkleProof) external;
    }
}
