use alloy_primitives::{Address, B256, U256};
use clap::Parser;
use mega_proxy::{constants, deployment_key, derive_proxy_address, proxy_init_code_hash};
use serde::Serialize;
use tracing::debug;

use crate::{print_output, Error};

/// Predict proxy addresses for an origin
#[derive(Parser, Debug)]
pub struct Cmd {
    /// Address of the factory
    #[arg(long, env = "MEGA_PROXY_FACTORY")]
    pub factory: Address,

    /// Transaction origin requesting the deployments
    #[arg(long)]
    pub origin: Address,

    /// Seed of the first prediction. Defaults to the seed of an origin that never deployed.
    #[arg(long)]
    pub seed: Option<U256>,

    /// Number of consecutive seeds to predict for
    #[arg(long, default_value_t = 1)]
    pub count: u64,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// A predicted deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    /// The seed consumed by the deployment
    pub seed: B256,
    /// The deployment key
    pub salt: B256,
    /// The address of the proxy
    pub proxy: Address,
}

impl Cmd {
    /// Execute the predict command
    pub fn run(&self) -> Result<(), Error> {
        let predictions = self.predictions()?;
        print_output(self.json, &predictions, || {
            predictions
                .iter()
                .map(|p| format!("{} {} {}", <U256 as From<B256>>::from(p.seed), p.salt, p.proxy))
                .collect::<Vec<_>>()
                .join("\n")
        })
    }

    /// Computes the predictions without printing them.
    pub fn predictions(&self) -> Result<Vec<Prediction>, Error> {
        if self.count == 0 {
            return Err(Error::InvalidInput("count must be positive".to_string()));
        }
        let first = self.seed.unwrap_or_else(|| constants::v1::INITIAL_SEED.into());
        let init_code_hash = proxy_init_code_hash();
        debug!(
            factory = %self.factory,
            origin = %self.origin,
            %first,
            count = self.count,
            "Predicting proxy addresses"
        );

        (0..self.count)
            .map(|offset| {
                let seed = first
                    .checked_add(U256::from(offset))
                    .map(B256::from)
                    .ok_or_else(|| Error::InvalidInput("seed range overflows".to_string()))?;
                let salt = deployment_key(self.origin, seed);
                let proxy = derive_proxy_address(self.factory, salt, init_code_hash);
                Ok(Prediction { seed, salt, proxy })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::address;
    use mega_proxy::{CallContext, InMemoryHost, ProxyFactory};

    use super::*;

    const FACTORY: Address = address!("00000000000000000000000000000000000fac70");
    const ORIGIN: Address = address!("0000000000000000000000000000000000000aaa");

    fn cmd(seed: Option<U256>, count: u64) -> Cmd {
        Cmd { factory: FACTORY, origin: ORIGIN, seed, count, json: false }
    }

    #[test]
    fn test_predictions_match_deployments() {
        let predictions = cmd(None, 3).predictions().unwrap();
        let mut host = InMemoryHost::new();
        let factory = ProxyFactory::new(FACTORY);
        let ctx = CallContext::transaction(ORIGIN, FACTORY, 1_000_000);
        for prediction in predictions {
            let deployment = factory.deploy_proxy(&mut host, &ctx, ORIGIN).unwrap();
            assert_eq!(deployment.seed, prediction.seed);
            assert_eq!(deployment.proxy, prediction.proxy);
        }
    }

    #[test]
    fn test_explicit_seed() {
        let predictions = cmd(Some(U256::from(7)), 1).predictions().unwrap();
        assert_eq!(predictions[0].seed, B256::from(U256::from(7)));
    }

    #[test]
    fn test_overflowing_seed_range_is_rejected() {
        assert_eq!(cmd(Some(U256::MAX), 1).predictions().unwrap().len(), 1);
        assert!(matches!(cmd(Some(U256::MAX), 2).predictions(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_zero_count_is_rejected() {
        assert!(matches!(cmd(None, 0).predictions(), Err(Error::InvalidInput(_))));
    }
}
