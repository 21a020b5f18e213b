//! Explicit mapping from exchange name to pool simulator constructor.
//!
//! The registry is built once at startup and passed to whoever turns
//! persisted [`PoolRecord`]s into simulators.

use crate::FastMap;
use crate::config::Config;
use crate::error::{Error, PoolError};
use crate::pool::simulator::{CalcAmountOutResult, PoolSimulator};
use crate::pool::types::{PoolMeta, PoolRecord, SwapInfo};
use alloy_primitives::{Address, U256};

/// Operations a router needs from any quotable pool.
pub trait PoolSimulatorCapability {
    fn calc_amount_out(
        &self,
        token_in: Address,
        amount_in: U256,
        token_out: Address,
    ) -> Result<CalcAmountOutResult, Error>;

    fn update_balance(&mut self, swap_info: &SwapInfo);

    fn clone_state(&self) -> Self
    where
        Self: Sized;

    fn get_meta_info(&self, token_in: Address) -> Result<PoolMeta, Error>;
}

impl PoolSimulatorCapability for PoolSimulator {
    fn calc_amount_out(
        &self,
        token_in: Address,
        amount_in: U256,
        token_out: Address,
    ) -> Result<CalcAmountOutResult, Error> {
        PoolSimulator::calc_amount_out(self, token_in, amount_in, token_out)
    }

    fn update_balance(&mut self, swap_info: &SwapInfo) {
        PoolSimulator::update_balance(self, swap_info)
    }

    fn clone_state(&self) -> Self {
        PoolSimulator::clone_state(self)
    }

    fn get_meta_info(&self, token_in: Address) -> Result<PoolMeta, Error> {
        PoolSimulator::get_meta_info(self, token_in)
    }
}

/// Closed set of supported pool families.
#[derive(Debug, Clone)]
pub enum AnyPoolSimulator {
    FluidDexV2(PoolSimulator),
}

impl AnyPoolSimulator {
    pub fn address(&self) -> &str {
        match self {
            AnyPoolSimulator::FluidDexV2(pool) => pool.address(),
        }
    }

    pub fn tokens(&self) -> &[Address] {
        match self {
            AnyPoolSimulator::FluidDexV2(pool) => pool.tokens(),
        }
    }
}

impl PoolSimulatorCapability for AnyPoolSimulator {
    fn calc_amount_out(
        &self,
        token_in: Address,
        amount_in: U256,
        token_out: Address,
    ) -> Result<CalcAmountOutResult, Error> {
        match self {
            AnyPoolSimulator::FluidDexV2(pool) => pool.calc_amount_out(token_in, amount_in, token_out),
        }
    }

    fn update_balance(&mut self, swap_info: &SwapInfo) {
        match self {
            AnyPoolSimulator::FluidDexV2(pool) => pool.update_balance(swap_info),
        }
    }

    fn clone_state(&self) -> Self {
        match self {
            AnyPoolSimulator::FluidDexV2(pool) => AnyPoolSimulator::FluidDexV2(pool.clone_state()),
        }
    }

    fn get_meta_info(&self, token_in: Address) -> Result<PoolMeta, Error> {
        match self {
            AnyPoolSimulator::FluidDexV2(pool) => pool.get_meta_info(token_in),
        }
    }
}

pub type SimulatorFactory = fn(&PoolRecord, &Config) -> Result<AnyPoolSimulator, Error>;

fn build_fluid_dex_v2(record: &PoolRecord, config: &Config) -> Result<AnyPoolSimulator, Error> {
    PoolSimulator::with_config(record, config).map(AnyPoolSimulator::FluidDexV2)
}

pub struct SimulatorRegistry {
    config: Config,
    factories: FastMap<String, SimulatorFactory>,
}

impl SimulatorRegistry {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            factories: FastMap::default(),
        }
    }

    /// Registry with the Fluid DEX v2 family under `config.dex_id`.
    pub fn with_defaults(config: Config) -> Self {
        let exchange = config.dex_id.clone();
        let mut registry = Self::new(config);
        registry.register(exchange, build_fluid_dex_v2);
        registry
    }

    /// Registers `factory` for `exchange`, replacing any previous entry.
    pub fn register(&mut self, exchange: impl Into<String>, factory: SimulatorFactory) {
        self.factories.insert(exchange.into(), factory);
    }

    pub fn contains(&self, exchange: &str) -> bool {
        self.factories.contains_key(exchange)
    }

    pub fn build(&self, record: &PoolRecord) -> Result<AnyPoolSimulator, Error> {
        let factory = self
            .factories
            .get(record.exchange.as_str())
            .ok_or_else(|| PoolError::UnknownExchange(record.exchange.clone()))?;
        factory(record, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEX_TYPE_FLUID_DEX_V2;
    use crate::pool::fixtures::{USDC, WETH, fixture_record};

    #[test]
    fn defaults_register_the_configured_exchange() {
        let registry = SimulatorRegistry::with_defaults(Config::default());
        assert!(registry.contains(DEX_TYPE_FLUID_DEX_V2));
        assert!(!registry.contains("uniswap-v3"));

        let renamed = SimulatorRegistry::with_defaults(Config {
            dex_id: "fluid-dex-v2-base".to_string(),
            ..Default::default()
        });
        assert!(renamed.contains("fluid-dex-v2-base"));
        assert!(!renamed.contains(DEX_TYPE_FLUID_DEX_V2));
    }

    #[test]
    fn unknown_exchange_is_rejected() {
        let registry = SimulatorRegistry::with_defaults(Config::default());
        let record = PoolRecord {
            exchange: "uniswap-v3".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            registry.build(&record),
            Err(Error::PoolError(PoolError::UnknownExchange(name))) if name == "uniswap-v3"
        ));
    }

    #[test]
    fn registered_factory_errors_are_passed_through() {
        let registry = SimulatorRegistry::with_defaults(Config::default());
        let record = PoolRecord {
            exchange: DEX_TYPE_FLUID_DEX_V2.to_string(),
            extra: "not json".to_string(),
            static_extra: "{}".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            registry.build(&record),
            Err(Error::PoolError(PoolError::Serde(_)))
        ));
    }

    #[test]
    fn built_simulator_quotes_through_the_enum() {
        let registry = SimulatorRegistry::with_defaults(Config::default());
        let record = fixture_record();
        let pool = registry.build(&record).unwrap();
        assert_eq!(pool.address(), record.address);
        assert_eq!(pool.tokens(), &[USDC, WETH]);

        let amount = U256::from(1_000_000_000u64);
        let direct = PoolSimulator::new(&record)
            .unwrap()
            .calc_amount_out(USDC, amount, WETH)
            .unwrap();
        let quote = pool.calc_amount_out(USDC, amount, WETH).unwrap();
        assert_eq!(quote, direct);

        let mut moved = pool.clone_state();
        moved.update_balance(&quote.swap_info);
        assert!(moved.calc_amount_out(USDC, amount, WETH).unwrap().amount_out < quote.amount_out);
        assert_eq!(moved.get_meta_info(USDC).unwrap().swap_fee, 3_000);
    }
}
