//! Contract bindings for the ENS contracts used by registration and resolution

use ethers::prelude::abigen;

// ETH Registrar Controller (commit/reveal registration of .eth names)
abigen!(
    ETHRegistrarController,
    r#"[
        function available(string name) external view returns (bool)
        function rentPrice(string name, uint256 duration) external view returns (uint256 base, uint256 premium)
        function makeCommitment(string name, address owner, uint256 duration, bytes32 secret, address resolver, bytes[] data, bool reverseRecord, uint16 ownerControlledFuses) external pure returns (bytes32)
        function commit(bytes32 commitment) external
        function register(string name, address owner, uint256 duration, bytes32 secret, address resolver, bytes[] data, bool reverseRecord, uint16 ownerControlledFuses) external payable
        function minCommitmentAge() external view returns (uint256)
        function maxCommitmentAge() external view returns (uint256)
    ]"#
);

// Reverse Registrar (primary name of the sender)
abigen!(
    ReverseRegistrar,
    r#"[
        function setName(string name) external returns (bytes32)
    ]"#
);

// ENS Registry
abigen!(
    ENSRegistry,
    r#"[
        function owner(bytes32 node) external view returns (address)
        function resolver(bytes32 node) external view returns (address)
    ]"#
);

// Public Resolver
abigen!(
    PublicResolver,
    r#"[
        function addr(bytes32 node) external view returns (address)
        function name(bytes32 node) external view returns (string)
        function text(bytes32 node, string key) external view returns (string)
    ]"#
);
