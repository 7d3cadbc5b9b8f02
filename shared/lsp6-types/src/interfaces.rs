//! Solidity ABI surface of the account and its key manager.
//!
//! Payloads handed to the key manager are ABI-encoded calls against these interfaces; the engine
//! decodes them with the generated `*Call` types.

use alloy_primitives::{fixed_bytes, FixedBytes};
use alloy_sol_types::sol;

sol! {
    interface IERC165 {
        function supportsInterface(bytes4 interfaceId) external view returns (bool);
    }

    interface IERC725Y {
        function getData(bytes32 dataKey) external view returns (bytes memory dataValue);
        function getDataBatch(bytes32[] memory dataKeys) external view returns (bytes[] memory dataValues);
        function setData(bytes32 dataKey, bytes memory dataValue) external payable;
        function setDataBatch(bytes32[] memory dataKeys, bytes[] memory dataValues) external payable;
    }

    interface IERC725X {
        function execute(uint256 operationType, address target, uint256 value, bytes memory data)
            external
            payable
            returns (bytes memory);
        function executeBatch(
            uint256[] memory operationsType,
            address[] memory targets,
            uint256[] memory values,
            bytes[] memory datas
        ) external payable returns (bytes[] memory);
    }

    /// LSP14 two-step ownership.
    interface ILSP14Ownable2Step {
        function owner() external view returns (address);
        function pendingOwner() external view returns (address);
        function transferOwnership(address newOwner) external;
        function acceptOwnership() external;
        function renounceOwnership() external;
    }

    interface ILSP6KeyManager {
        function target() external view returns (address);
        function getNonce(address from, uint128 channelId) external view returns (uint256);
        function isValidSignature(bytes32 dataHash, bytes memory signature) external view returns (bytes4);
        function execute(bytes calldata payload) external payable returns (bytes memory);
        function executeBatch(uint256[] calldata values, bytes[] calldata payloads)
            external
            payable
            returns (bytes[] memory);
        function executeRelayCall(
            bytes calldata signature,
            uint256 nonce,
            uint256 validityTimestamps,
            bytes calldata payload
        ) external payable returns (bytes memory);
        function executeRelayCallBatch(
            bytes[] calldata signatures,
            uint256[] calldata nonces,
            uint256[] calldata validityTimestamps,
            uint256[] calldata values,
            bytes[] calldata payloads
        ) external payable returns (bytes[] memory);
    }
}

pub const INTERFACE_ID_ERC165: FixedBytes<4> = fixed_bytes!("01ffc9a7");
pub const INTERFACE_ID_ERC1271: FixedBytes<4> = fixed_bytes!("1626ba7e");
pub const INTERFACE_ID_ERC725X: FixedBytes<4> = fixed_bytes!("7545acac");
pub const INTERFACE_ID_ERC725Y: FixedBytes<4> = fixed_bytes!("629aa694");
pub const INTERFACE_ID_LSP6: FixedBytes<4> = fixed_bytes!("23f34c62");
pub const INTERFACE_ID_LSP25: FixedBytes<4> = fixed_bytes!("5ac79908");

/// `isValidSignature` result for a signer holding SIGN.
pub const ERC1271_MAGIC_VALUE: FixedBytes<4> = INTERFACE_ID_ERC1271;
pub const ERC1271_FAILURE_VALUE: FixedBytes<4> = fixed_bytes!("ffffffff");

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_sol_types::SolCall;

    #[test]
    fn selectors_match_deployed_contracts() {
        assert_eq!(IERC725Y::setDataCall::SELECTOR, [0x7f, 0x23, 0x69, 0x0c]);
        assert_eq!(IERC725Y::setDataBatchCall::SELECTOR, [0x97, 0x90, 0x24, 0x21]);
        assert_eq!(IERC725X::executeCall::SELECTOR, [0x44, 0xc0, 0x28, 0xfe]);
        assert_eq!(IERC725X::executeBatchCall::SELECTOR, [0x31, 0x85, 0x84, 0x52]);
        assert_eq!(ILSP14Ownable2Step::transferOwnershipCall::SELECTOR, [0xf2, 0xfd, 0xe3, 0x8b]);
        assert_eq!(ILSP14Ownable2Step::acceptOwnershipCall::SELECTOR, [0x79, 0xba, 0x50, 0x97]);
        assert_eq!(ILSP14Ownable2Step::renounceOwnershipCall::SELECTOR, [0x71, 0x50, 0x18, 0xa6]);
    }
}
