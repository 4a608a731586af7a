mod checkpoint;
mod interval;
mod pool;
mod token;

pub use checkpoint::SyncCheckpoint;
pub use interval::{Interval, Ohlc, ParentKind, PoolIntervalData, TokenIntervalData};
pub use pool::Pool;
pub use token::Token;
