pub mod amm;
pub mod envelope;
pub mod payload;

pub use amm::{quote_add_liquidity, quote_swap, quote_swap_x_to_y, quote_swap_y_to_x, LiquidityPool};
pub use envelope::{Initiator, TransactionEnvelope, UnsignedEnvelope};
pub use payload::{Fungible, OpcodeTable, PayloadKind};
