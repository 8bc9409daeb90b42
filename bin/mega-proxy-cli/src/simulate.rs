use alloy_primitives::{address, Address, Bytes};
use clap::Parser;
use mega_proxy::{
    success_result, CallContext, CallInputs, Deployment, Host, InMemoryHost, Proxy, ProxyFactory,
};
use serde::Serialize;
use tracing::info;

use crate::{print_output, Error};

/// Address of the echo target in simulated worlds.
pub const ECHO_TARGET: Address = address!("00000000000000000000000000000000000ec401");

/// Deploy proxies and run forwarded calls against an in-memory world
#[derive(Parser, Debug)]
pub struct Cmd {
    /// Address of the factory
    #[arg(long, env = "MEGA_PROXY_FACTORY")]
    pub factory: Address,

    /// Transaction origin requesting the deployments
    #[arg(long)]
    pub origin: Address,

    /// Owner of the deployed proxies. Defaults to the origin.
    #[arg(long)]
    pub owner: Option<Address>,

    /// Number of proxies to deploy
    #[arg(long, default_value_t = 1)]
    pub count: u64,

    /// Call data each proxy forwards to an echo target on behalf of its owner
    #[arg(long)]
    pub calldata: Option<Bytes>,

    /// Gas limit of every simulated transaction
    #[arg(long, default_value_t = 1_000_000, env = "MEGA_PROXY_GAS_LIMIT")]
    pub gas_limit: u64,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Outcome of a forwarded call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    /// The proxy that forwarded the call
    pub proxy: Address,
    /// The returned bytes
    pub output: Bytes,
    /// Gas used by the forwarded call
    pub gas_used: u64,
}

/// Outcome of a simulation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Simulation {
    /// Deployments in order
    pub deployments: Vec<Deployment>,
    /// Forwarded calls in order
    pub executions: Vec<Execution>,
    /// Number of event logs emitted
    pub logs: usize,
}

impl Cmd {
    /// Execute the simulate command
    pub fn run(&self) -> Result<(), Error> {
        let simulation = self.simulate()?;
        print_output(self.json, &simulation, || {
            let mut lines = Vec::new();
            for deployment in &simulation.deployments {
                lines.push(format!(
                    "deployed {} for {} (seed {})",
                    deployment.proxy, deployment.owner, deployment.seed
                ));
            }
            for execution in &simulation.executions {
                lines.push(format!(
                    "executed through {}: {:?} ({} gas)",
                    execution.proxy, execution.output, execution.gas_used
                ));
            }
            lines.push(format!("{} logs", simulation.logs));
            lines.join("\n")
        })
    }

    /// Runs the simulation without printing it.
    pub fn simulate(&self) -> Result<Simulation, Error> {
        let owner = self.owner.unwrap_or(self.origin);
        let mut host = InMemoryHost::new();
        host.insert_program(ECHO_TARGET, |_: &mut dyn Host, inputs: &CallInputs| {
            success_result(inputs.input.clone(), inputs.gas_limit, 0)
        });
        let factory = ProxyFactory::new(self.factory);
        host.insert_factory(factory);
        let ctx = CallContext::transaction(self.origin, self.factory, self.gas_limit);

        let mut simulation = Simulation::default();
        for _ in 0..self.count {
            let deployment = factory.deploy_proxy(&mut host, &ctx, owner)?;
            info!(proxy = %deployment.proxy, seed = %deployment.seed, "Simulated deployment");
            simulation.deployments.push(deployment);
        }

        if let Some(calldata) = &self.calldata {
            for deployment in &simulation.deployments {
                let proxy = Proxy::at(deployment.proxy);
                let ctx = CallContext::transaction(owner, proxy.address(), self.gas_limit);
                let executed =
                    proxy.execute_metered(&mut host, &ctx, ECHO_TARGET, calldata.clone())?;
                simulation.executions.push(Execution {
                    proxy: proxy.address(),
                    output: executed.output,
                    gas_used: executed.gas_used,
                });
            }
        }

        simulation.logs = host.logs().len();
        Ok(simulation)
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::bytes;

    use super::*;

    const FACTORY: Address = address!("00000000000000000000000000000000000fac70");
    const ORIGIN: Address = address!("0000000000000000000000000000000000000aaa");

    #[test]
    fn test_simulation() {
        let cmd = Cmd {
            factory: FACTORY,
            origin: ORIGIN,
            owner: None,
            count: 2,
            calldata: Some(bytes!("a9059cbb")),
            gas_limit: 1_000_000,
            json: true,
        };
        let simulation = cmd.simulate().unwrap();
        assert_eq!(simulation.deployments.len(), 2);
        assert_eq!(simulation.executions.len(), 2);
        assert!(simulation.executions.iter().all(|e| e.output == bytes!("a9059cbb")));
        // One initialization and one deployment event per proxy, one execution event per call
        assert_eq!(simulation.logs, 6);

        let json = serde_json::to_value(&simulation).unwrap();
        assert_eq!(json["deployments"][0]["owner"], serde_json::json!(ORIGIN));
    }

    #[test]
    fn test_starved_simulation_fails() {
        let cmd = Cmd {
            factory: FACTORY,
            origin: ORIGIN,
            owner: None,
            count: 1,
            calldata: Some(bytes!("a9059cbb")),
            gas_limit: 5_000,
            json: false,
        };
        assert!(matches!(cmd.simulate(), Err(Error::Proxy(_))));
    }
}
