//! Solidity interfaces of the proxy factory and the proxy.
//!
//! The bindings define the wire format of every call, event and revert produced by this crate.

#![allow(missing_docs)]

use alloy_sol_types::sol;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IProxyFactory {
        event DeployProxy(
            address indexed origin,
            address indexed deployer,
            address indexed owner,
            bytes32 seed,
            bytes32 salt,
            address proxy
        );

        error DeploymentFailed(bytes32 salt);
        error ProxyAddressMismatch(address expected, address actual);
        error OwnerInitFailed(address proxy, bytes output);
        error SeedExhausted(address origin);

        function deploy() external returns (address proxy);
        function deployFor(address owner) external returns (address proxy);
        function getNextSeed(address eoa) external view returns (bytes32 nextSeed);
        function isProxy(address proxy) external view returns (bool result);
        function version() external view returns (uint256);
    }
}

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IProxy {
        event Execute(
            address indexed target,
            address indexed envoy,
            bytes4 selector,
            bytes data,
            bytes response
        );
        event TransferOwnership(address indexed oldOwner, address indexed newOwner);

        error AlreadyInitialized(address owner);
        error ProxyNotDeployed(address proxy);
        error NotOwner(address owner, address caller);
        error ExecutionNotAuthorized(address owner, address caller, address target, bytes4 selector);
        error TargetInvalid(address target);
        error InsufficientGasForCall(uint64 gasAvailable, uint64 gasReserve, uint64 gasUsed);
        error ExecutionReverted();
        error OwnerChanged(address oldOwner, address newOwner);

        function initialize(address owner) external;
        function execute(address target, bytes calldata data) external payable returns (bytes memory response);
        function setPermission(address envoy, address target, bytes4 selector, bool permission) external;
        function getPermission(address envoy, address target, bytes4 selector) external view returns (bool permission);
        function transferOwnership(address newOwner) external;
        function owner() external view returns (address);
        function minGasReserve() external view returns (uint256);
    }
}
