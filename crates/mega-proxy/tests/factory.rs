//! Tests for proxy deployment through the factory.

use std::sync::Arc;

use alloy_primitives::{address, bytes, Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolEvent};
use mega_proxy::{
    constants, deployment_key, derive_proxy_address, predict_proxy_address,
    proxy_init_code_hash, revert_result, transact,
    test_utils::{tx, Echo, Reverter, TestWorld, FACTORY, TX_GAS_LIMIT},
    CallInputs, FactoryError, Host, IProxyFactory, InMemoryHost, Program, Proxy, ProxyFactory,
};
use rstest::rstest;

const CALLER_A: Address = address!("0000000000000000000000000000000000000aaa");
const OWNER_B: Address = address!("0000000000000000000000000000000000000bbb");
const ROUTER: Address = address!("0000000000000000000000000000000000c0ffee");

fn seed(value: u64) -> B256 {
    B256::from(U256::from(value))
}

#[test]
fn test_deploy_for_scenario() {
    let mut world = TestWorld::new();
    let ctx = tx(CALLER_A, FACTORY);

    assert_eq!(world.factory.get_next_seed(&world.host, CALLER_A), seed(1));
    let first = world.factory.deploy_proxy(&mut world.host, &ctx, OWNER_B).unwrap();
    assert_eq!(first.seed, seed(1));
    assert_eq!(first.owner, OWNER_B);
    assert!(world.factory.is_proxy(&world.host, first.proxy));
    assert_eq!(Proxy::at(first.proxy).owner(&world.host), Some(OWNER_B));

    let log = world
        .host
        .logs()
        .iter()
        .rev()
        .find(|log| log.address == FACTORY)
        .expect("no DeployProxy event");
    let event = IProxyFactory::DeployProxy::decode_log_data(&log.data, true).unwrap();
    assert_eq!(event.origin, CALLER_A);
    assert_eq!(event.deployer, CALLER_A);
    assert_eq!(event.owner, OWNER_B);
    assert_eq!(event.seed, seed(1));
    assert_eq!(event.salt, deployment_key(CALLER_A, seed(1)));
    assert_eq!(event.proxy, first.proxy);

    let second = world.factory.deploy_proxy(&mut world.host, &ctx, OWNER_B).unwrap();
    assert_eq!(second.seed, seed(2));
    assert_ne!(second.proxy, first.proxy);
    assert_eq!(world.factory.get_next_seed(&world.host, CALLER_A), seed(3));
}

#[rstest]
#[case::one(1)]
#[case::several(5)]
fn test_seeds_increase_and_addresses_are_distinct(#[case] deployments: u64) {
    let mut world = TestWorld::new();
    let ctx = tx(CALLER_A, FACTORY);

    let mut salts = Vec::new();
    let mut proxies = Vec::new();
    for expected in 1..=deployments {
        let next = world.factory.get_next_seed(&world.host, CALLER_A);
        let deployment = world.factory.deploy_proxy(&mut world.host, &ctx, OWNER_B).unwrap();
        assert_eq!(deployment.seed, next);
        assert_eq!(deployment.seed, seed(expected));
        assert!(!salts.contains(&deployment.salt));
        assert!(!proxies.contains(&deployment.proxy));
        salts.push(deployment.salt);
        proxies.push(deployment.proxy);
    }
    assert_eq!(world.factory.deployed(&world.host), deployments);
}

#[test]
fn test_deployed_address_matches_prediction() {
    let mut world = TestWorld::new();
    let next_seed = world.factory.get_next_seed(&world.host, CALLER_A);
    let predicted = predict_proxy_address(FACTORY, CALLER_A, next_seed);
    assert_eq!(predicted, world.factory.next_proxy_address(&world.host, CALLER_A));

    let proxy =
        world.factory.deploy_for(&mut world.host, &tx(CALLER_A, FACTORY), OWNER_B).unwrap();
    assert_eq!(proxy, predicted);
    assert_eq!(
        proxy,
        derive_proxy_address(FACTORY, deployment_key(CALLER_A, seed(1)), proxy_init_code_hash())
    );
    assert_eq!(world.host.code_size(proxy), constants::v1::PROXY_RUNTIME_CODE.len());
}

#[test]
fn test_origins_have_independent_seeds() {
    let mut world = TestWorld::new();
    world.deploy(CALLER_A);
    world.deploy(CALLER_A);
    assert_eq!(world.factory.get_next_seed(&world.host, CALLER_A), seed(3));
    assert_eq!(world.factory.get_next_seed(&world.host, OWNER_B), seed(1));

    let proxy = world.deploy(OWNER_B);
    assert_eq!(proxy.owner(&world.host), Some(OWNER_B));
    assert_eq!(world.factory.get_next_seed(&world.host, OWNER_B), seed(2));
    assert_eq!(world.factory.deployed(&world.host), 3);
}

#[test]
fn test_seed_is_keyed_by_origin() {
    let mut world = TestWorld::new();
    // The router calls the factory on behalf of the external account
    let ctx = tx(CALLER_A, ROUTER).with_caller(ROUTER);

    let deployment = world.factory.deploy_proxy(&mut world.host, &ctx, OWNER_B).unwrap();
    assert_eq!(deployment.origin, CALLER_A);
    assert_eq!(deployment.deployer, ROUTER);
    assert_eq!(deployment.salt, deployment_key(CALLER_A, seed(1)));
    assert_eq!(world.factory.get_next_seed(&world.host, CALLER_A), seed(2));
    assert_eq!(world.factory.get_next_seed(&world.host, ROUTER), seed(1));
}

#[test]
fn test_deploy_is_owned_by_immediate_caller() {
    let mut world = TestWorld::new();
    let ctx = tx(CALLER_A, ROUTER).with_caller(ROUTER);
    let proxy = world.factory.deploy(&mut world.host, &ctx).unwrap();
    assert_eq!(Proxy::at(proxy).owner(&world.host), Some(ROUTER));
}

#[test]
fn test_failed_owner_initialization_rolls_back() {
    let mut host = InMemoryHost::new();
    // Proxies created from this factory's init code revert on every call
    let reverter: Arc<dyn Program> = Arc::new(Reverter { payload: bytes!("baad") });
    host.register_template(
        &constants::v1::PROXY_INIT_CODE,
        constants::v1::PROXY_RUNTIME_CODE,
        reverter,
    );
    let factory = ProxyFactory::new(FACTORY);
    let proxy = factory.next_proxy_address(&host, CALLER_A);

    let error = factory.deploy_for(&mut host, &tx(CALLER_A, FACTORY), OWNER_B).unwrap_err();
    assert_eq!(error, FactoryError::OwnerInitFailed { proxy, output: bytes!("baad") });
    assert_eq!(host.code_size(proxy), 0);
    assert!(host.logs().is_empty());
    assert!(!factory.is_proxy(&host, proxy));
    assert_eq!(factory.get_next_seed(&host, CALLER_A), seed(1));
    assert_eq!(host.open_checkpoints(), 0);
}

#[test]
fn test_occupied_address_fails_deployment() {
    let mut world = TestWorld::new();
    let occupied = world.factory.next_proxy_address(&world.host, CALLER_A);
    world.host.insert_program_arc(occupied, Arc::new(Echo));

    let error =
        world.factory.deploy_for(&mut world.host, &tx(CALLER_A, FACTORY), OWNER_B).unwrap_err();
    assert_eq!(error, FactoryError::DeploymentFailed { salt: deployment_key(CALLER_A, seed(1)) });
    assert_eq!(world.factory.get_next_seed(&world.host, CALLER_A), seed(1));
    assert!(!world.factory.is_proxy(&world.host, occupied));
}

#[test]
fn test_enclosing_revert_undoes_deployment() {
    let mut world = TestWorld::new();
    let factory = world.factory;
    let ctx = tx(CALLER_A, FACTORY);
    let proxy = factory.next_proxy_address(&world.host, CALLER_A);

    let result: Result<(), FactoryError> = transact(&mut world.host, |host| {
        let deployed = factory.deploy_for(host, &ctx, OWNER_B)?;
        assert_eq!(deployed, proxy);
        assert!(factory.is_proxy(&*host, proxy));
        Err(FactoryError::DeploymentFailed { salt: B256::ZERO })
    });
    assert!(result.is_err());

    assert_eq!(world.host.code_size(proxy), 0);
    assert!(!factory.is_proxy(&world.host, proxy));
    assert_eq!(factory.get_next_seed(&world.host, CALLER_A), seed(1));
    assert_eq!(factory.deployed(&world.host), 0);
    assert_eq!(Proxy::at(proxy).owner(&world.host), None);
    assert!(world.host.logs().is_empty());

    // The seed is handed out again and lands on the same address
    assert_eq!(factory.deploy_for(&mut world.host, &ctx, OWNER_B).unwrap(), proxy);
    assert!(factory.is_proxy(&world.host, proxy));
}

#[test]
fn test_reverted_caller_frame_undoes_deployment() {
    const ROUTER_GAS: u64 = 7;
    // Deploys through the factory, then reverts its own frame
    let router = |host: &mut dyn Host, inputs: &CallInputs| {
        let input = IProxyFactory::deployForCall { owner: OWNER_B }.abi_encode();
        let inner = host.call(CallInputs::call(
            inputs.origin,
            inputs.target_address,
            FACTORY,
            input.into(),
            inputs.gas_limit,
        ));
        assert!(inner.is_ok());
        revert_result(Bytes::new(), inputs.gas_limit, ROUTER_GAS)
    };
    let mut world = TestWorld::new();
    world.host.insert_program(ROUTER, router);
    let proxy = world.factory.next_proxy_address(&world.host, CALLER_A);

    let result =
        world.host.call(CallInputs::call(CALLER_A, CALLER_A, ROUTER, Bytes::new(), TX_GAS_LIMIT));
    assert!(result.is_revert());
    assert_eq!(world.host.code_size(proxy), 0);
    assert!(!world.factory.is_proxy(&world.host, proxy));
    assert_eq!(world.factory.get_next_seed(&world.host, CALLER_A), seed(1));
    assert_eq!(world.host.proxy_count(), 0);
    assert_eq!(world.host.open_checkpoints(), 0);
}

#[test]
fn test_deployments_through_host_calls() {
    let mut world = TestWorld::new();
    let predicted = world.factory.next_proxy_address(&world.host, CALLER_A);

    let input = IProxyFactory::deployCall {}.abi_encode();
    let result = world.host.call(CallInputs::call(
        CALLER_A,
        CALLER_A,
        FACTORY,
        input.into(),
        TX_GAS_LIMIT,
    ));
    assert!(result.is_ok());
    let proxy = IProxyFactory::deployCall::abi_decode_returns(&result.output, true).unwrap().proxy;
    assert_eq!(proxy, predicted);
    assert_eq!(Proxy::at(proxy).owner(&world.host), Some(CALLER_A));

    let input = IProxyFactory::isProxyCall { proxy }.abi_encode();
    let result = world.host.call(CallInputs::call(
        CALLER_A,
        CALLER_A,
        FACTORY,
        input.into(),
        TX_GAS_LIMIT,
    ));
    assert!(IProxyFactory::isProxyCall::abi_decode_returns(&result.output, true).unwrap().result);
}

#[test]
fn test_journal_grows_with_deployments_only() {
    let mut world = TestWorld::new();
    let factory = world.factory;
    let ctx = tx(CALLER_A, FACTORY);

    let checkpoint = world.host.checkpoint();
    factory.deploy_for(&mut world.host, &ctx, OWNER_B).unwrap();
    let per_deployment = world.host.journal_len();
    assert!(per_deployment > 0);
    for _ in 1..100 {
        factory.deploy_for(&mut world.host, &ctx, OWNER_B).unwrap();
    }
    assert_eq!(world.host.journal_len(), 100 * per_deployment);

    world.host.checkpoint_revert(checkpoint);
    assert_eq!(factory.deployed(&world.host), 0);
    assert_eq!(world.host.proxy_count(), 0);
    assert_eq!(world.host.journal_len(), 0);

    for _ in 0..100 {
        factory.deploy_for(&mut world.host, &ctx, OWNER_B).unwrap();
    }
    assert_eq!(world.host.journal_len(), 0);
    assert_eq!(factory.deployed(&world.host), 100);
    assert_eq!(factory.get_next_seed(&world.host, CALLER_A), seed(101));
}

#[test]
fn test_version() {
    let world = TestWorld::new();
    assert_eq!(world.factory.version(), constants::v1::FACTORY_VERSION);
    assert_eq!(world.factory.ledger().factory(), FACTORY);
}
