//! The v1 lending-protocol module graph.
//!
//! Five leaf modules, five proxied core modules registered with the directory,
//! per-currency listing, one cash market for the market currency, and an
//! initial deposit with liquidity at every active maturity.

use crate::{Arg, CallSpec, ModuleDescriptor, Phase, Pipeline, PipelineBuildError, Wiring};

/// Literal call arguments, named by the call and position they fill.
pub mod params {
    use alloy_primitives::U256;

    /// 10^18.
    pub const ONE: u128 = 1_000_000_000_000_000_000;

    /// `Escrow.setDiscounts` arguments.
    pub const SET_DISCOUNTS_ARGS: [u128; 3] =
        [1_060_000_000_000_000_000, 1_020_000_000_000_000_000, 800_000_000_000_000_000];

    /// `Portfolios.setHaircuts` arguments.
    pub const SET_HAIRCUTS_ARGS: [u128; 3] =
        [1_010_000_000_000_000_000, 500_000_000_000_000_000, 950_000_000_000_000_000];

    /// `Portfolios.initialize` arguments 3 and 4.
    pub const PORTFOLIOS_INITIALIZE_TAIL: (u16, u32) = (1, 8);

    /// `Escrow.listCurrency` second argument.
    pub const LIST_CURRENCY_OPTIONS: (bool, bool) = (false, false);

    /// `Escrow.addExchangeRate` arguments 1 and 2.
    pub const ADD_EXCHANGE_RATE_HEAD: (u16, u16) = (1, 0);

    /// `Escrow.addExchangeRate` arguments 4 to 6.
    pub const ADD_EXCHANGE_RATE_TAIL: (u128, u128, bool) = (1_400_000_000_000_000_000, ONE, false);

    /// `Portfolios.createCashGroup` arguments 1 to 3.
    pub const CREATE_CASH_GROUP_HEAD: (u32, u32, u32) = (2, 2_592_000 * 3, 1_000_000_000);

    /// `CashMarket.setMaxTradeSize` argument, 2^127.
    pub fn set_max_trade_size_arg() -> U256 {
        U256::from(1) << 127
    }

    /// `CashMarket.setFee` arguments.
    pub const SET_FEE_ARGS: (u32, u128) = (750_000, 0);

    /// `CashMarket.setRateFactors` arguments.
    pub const SET_RATE_FACTORS_ARGS: (u32, u16) = (1_100_000_000, 85);

    /// Token `approve` amount, 2^255.
    pub fn approve_amount() -> U256 {
        U256::from(1) << 255
    }

    /// `Escrow.deposit` amount.
    pub const DEPOSIT_AMOUNT: u128 = 6_100_000 * ONE;

    /// `CashMarket.addLiquidity` arguments 2 to 6, following the maturity.
    pub const ADD_LIQUIDITY_TAIL: (u128, u128, u32, u32, u32) =
        (3_000_000 * ONE, 3_000_000 * ONE, 0, 1_000_000_000, 1 << 31);
}

/// Leaf modules, deployed with no constructor arguments.
pub const LEAF_MODULES: [&str; 5] =
    ["ERC1820Registry", "WETH", "Liquidation", "RiskFramework", "CashMarket"];

/// Directory module name.
pub const DIRECTORY: &str = "Directory";
/// Escrow module name.
pub const ESCROW: &str = "Escrow";
/// Portfolios module name.
pub const PORTFOLIOS: &str = "Portfolios";
/// Multi-token module name.
pub const ERC1155_TOKEN: &str = "ERC1155Token";
/// Multi-token trade module name.
pub const ERC1155_TRADE: &str = "ERC1155Trade";
/// Artifact backing every per-currency cash market.
pub const CASH_MARKET: &str = "CashMarket";

/// Which currencies the v1 graph lists and which one gets a market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct V1Config {
    /// Currencies listed with the escrow, in listing order.
    pub listed_currencies: Vec<String>,
    /// Currency that gets a cash market, a deposit, and liquidity.
    pub market_currency: String,
}

impl Default for V1Config {
    fn default() -> Self {
        Self {
            listed_currencies: ["DAI", "USDC", "WBTC"].map(String::from).to_vec(),
            market_currency: "DAI".into(),
        }
    }
}

impl V1Config {
    /// Registry name of the market currency's cash market, e.g. `DaiCashMarket`.
    pub fn market_name(&self) -> String {
        let mut chars = self.market_currency.chars();
        let prefix: String = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
            None => String::new(),
        };
        format!("{prefix}{CASH_MARKET}")
    }

    /// Currency id the escrow assigns to the market currency. Ids start at 1 in
    /// listing order; id 0 is the escrow's native currency.
    pub fn market_currency_id(&self) -> Option<u16> {
        self.listed_currencies
            .iter()
            .position(|currency| *currency == self.market_currency)
            .and_then(|index| u16::try_from(index + 1).ok())
    }
}

/// Builds the v1 pipeline. Fails if the market currency is not listed.
pub fn pipeline(config: &V1Config) -> Result<Pipeline, PipelineBuildError> {
    use params::*;

    let currency_id = config
        .market_currency_id()
        .ok_or_else(|| PipelineBuildError::UnlistedMarketCurrency(config.market_currency.clone()))?;
    let market = config.market_name();
    let market_currency = config.market_currency.as_str();

    let mut builder = Pipeline::builder().phase(Phase::LeafDeploys);
    for module in LEAF_MODULES {
        builder = builder.deploy(ModuleDescriptor::plain(module));
    }

    builder = builder
        .phase(Phase::ProxiedCore)
        .deploy(ModuleDescriptor::proxied(DIRECTORY, [Arg::Deployer]))
        .deploy(ModuleDescriptor::proxied(
            ESCROW,
            [
                Arg::module(DIRECTORY),
                Arg::Deployer,
                Arg::module("ERC1820Registry"),
                Arg::module("WETH"),
            ],
        ))
        .deploy(ModuleDescriptor::proxied(
            PORTFOLIOS,
            [
                Arg::module(DIRECTORY),
                Arg::Deployer,
                Arg::uint(PORTFOLIOS_INITIALIZE_TAIL.0),
                Arg::uint(PORTFOLIOS_INITIALIZE_TAIL.1),
            ],
        ))
        .deploy(ModuleDescriptor::proxied(ERC1155_TOKEN, [Arg::module(DIRECTORY), Arg::Deployer]))
        .deploy(ModuleDescriptor::proxied(ERC1155_TRADE, [Arg::module(DIRECTORY), Arg::Deployer]))
        .phase(Phase::Wiring)
        .wiring(
            Wiring::new(DIRECTORY)
                .register(0, ESCROW)
                .register(1, PORTFOLIOS)
                .register(2, ERC1155_TOKEN)
                .register(3, ERC1155_TRADE)
                .depends(0, [1, 3])
                .depends(1, [0, 2, 3])
                .depends(2, [1])
                .depends(3, [0, 1]),
        )
        .phase(Phase::DomainConfiguration)
        .call(CallSpec::module(ESCROW, "setDiscounts", SET_DISCOUNTS_ARGS.map(Arg::uint)))
        .call(CallSpec::module(PORTFOLIOS, "setHaircuts", SET_HAIRCUTS_ARGS.map(Arg::uint)));

    for currency in &config.listed_currencies {
        builder = builder
            .call(CallSpec::module(
                ESCROW,
                "listCurrency",
                [
                    Arg::token(currency),
                    Arg::list([
                        Arg::Bool(LIST_CURRENCY_OPTIONS.0),
                        Arg::Bool(LIST_CURRENCY_OPTIONS.1),
                    ]),
                ],
            ))
            .call(CallSpec::module(
                ESCROW,
                "addExchangeRate",
                [
                    Arg::uint(ADD_EXCHANGE_RATE_HEAD.0),
                    Arg::uint(ADD_EXCHANGE_RATE_HEAD.1),
                    Arg::oracle(currency),
                    Arg::uint(ADD_EXCHANGE_RATE_TAIL.0),
                    Arg::uint(ADD_EXCHANGE_RATE_TAIL.1),
                    Arg::Bool(ADD_EXCHANGE_RATE_TAIL.2),
                ],
            ));
    }

    builder
        .deploy(
            ModuleDescriptor::proxied(&market, [Arg::module(DIRECTORY), Arg::Deployer])
                .from_artifact(CASH_MARKET),
        )
        .call(CallSpec::module(&market, "initializeDependencies", []))
        .call(CallSpec::module(
            PORTFOLIOS,
            "createCashGroup",
            [
                Arg::uint(CREATE_CASH_GROUP_HEAD.0),
                Arg::uint(CREATE_CASH_GROUP_HEAD.1),
                Arg::uint(CREATE_CASH_GROUP_HEAD.2),
                Arg::uint(currency_id),
                Arg::module(&market),
            ],
        ))
        .call(CallSpec::module(&market, "setMaxTradeSize", [Arg::Uint(set_max_trade_size_arg())]))
        .call(CallSpec::module(
            &market,
            "setFee",
            [Arg::uint(SET_FEE_ARGS.0), Arg::uint(SET_FEE_ARGS.1)],
        ))
        .call(CallSpec::module(
            &market,
            "setRateFactors",
            [Arg::uint(SET_RATE_FACTORS_ARGS.0), Arg::uint(SET_RATE_FACTORS_ARGS.1)],
        ))
        .phase(Phase::Bootstrap)
        .call(CallSpec::token(
            market_currency,
            "approve",
            [Arg::module(ESCROW), Arg::Uint(approve_amount())],
        ))
        .call(CallSpec::module(
            ESCROW,
            "deposit",
            [Arg::token(market_currency), Arg::uint(DEPOSIT_AMOUNT)],
        ))
        .call_for_each(
            CallSpec::module(&market, "getActiveMaturities", []),
            CallSpec::module(
                &market,
                "addLiquidity",
                [
                    Arg::Item,
                    Arg::uint(ADD_LIQUIDITY_TAIL.0),
                    Arg::uint(ADD_LIQUIDITY_TAIL.1),
                    Arg::uint(ADD_LIQUIDITY_TAIL.2),
                    Arg::uint(ADD_LIQUIDITY_TAIL.3),
                    Arg::uint(ADD_LIQUIDITY_TAIL.4),
                ],
            ),
        )
        .build()
}
