//! Contract bindings for the calls and events the indexer touches.

use alloy::sol;

sol! {
    /// Emitted once when a pool's starting price is set
    event Initialize(uint160 sqrtPriceX96, int24 tick);

    /// Metadata getters of a pool's tokens
    #[sol(rpc)]
    interface IERC20 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
    }

    /// Immutable pool parameters
    #[sol(rpc)]
    interface IUniswapV3Pool {
        function token0() external view returns (address);
        function token1() external view returns (address);
        function fee() external view returns (uint24);
        function factory() external view returns (address);
    }
}

pub use self::Initialize as V3Initialize;
