pub mod commands;
pub mod crypto;
pub mod epoch_handler;
pub mod hash;
pub mod public_key_address;
pub mod transaction;
pub mod transaction_validator;
pub mod utxo_pool;

pub use self::{
    crypto::*, epoch_handler::*, hash::*, public_key_address::*, transaction::*,
    transaction_validator::*, utxo_pool::*,
};
