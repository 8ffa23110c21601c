use crate::{OutputIndex, Transaction, TransactionValidator, Utxo, UtxoPool};

/// How an epoch orders its candidate transactions before the greedy acceptance pass.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum EpochPolicy {
    /// Considers candidates in the order the caller submitted them.
    InputOrder,
    /// Considers candidates in ascending order of the fee each one would pay against
    /// the pool as it stood at the start of the epoch. A candidate claiming a utxo
    /// unknown to that pool counts as paying no fee at all. The sort is stable, so
    /// candidates with equal fees keep their submitted order.
    ///
    /// This biases acceptance by fee but remains a greedy heuristic, not an optimal
    /// selection: candidates competing for the same utxo resolve in consideration
    /// order, and a candidate spending another candidate's output is rejected because
    /// its claim is unknown to the starting pool. Maximizing the collected fee would
    /// require searching the conflict graph of the whole batch instead.
    FeeBiased,
}

/// Settles epochs. Each epoch takes a batch of candidate transactions, accepts a
/// mutually consistent subset of them, and applies it to the pool of unspent outputs.
///
/// The handler owns its pool: the pool it is constructed from is copied, never
/// aliased, so settlement is invisible to the caller's copy. Outputs accepted in one
/// epoch are spendable by later candidates of the same epoch and by later epochs.
pub struct EpochHandler {
    utxo_pool: UtxoPool,
    policy: EpochPolicy,
}

impl EpochHandler {
    /// Creates a handler whose starting pool is an independent copy of `utxo_pool`.
    pub fn new(utxo_pool: &UtxoPool, policy: EpochPolicy) -> Self {
        Self {
            utxo_pool: utxo_pool.clone(),
            policy,
        }
    }

    /// Processes one epoch and returns the accepted transactions in acceptance order.
    ///
    /// Candidates are ordered per the policy and then accepted greedily: each one is
    /// validated against the pool as it stands at that moment, and a valid candidate
    /// is applied immediately, so its claimed utxos are gone and its outputs are
    /// spendable for every candidate after it. A candidate that is invalid when it is
    /// considered is rejected for the whole epoch, even if a later acceptance would
    /// have made it valid.
    pub fn handle_epoch(&mut self, candidates: Vec<Transaction>) -> Vec<Transaction> {
        let candidates = match self.policy {
            EpochPolicy::InputOrder => candidates,
            EpochPolicy::FeeBiased => Self::order_by_ascending_fee(&self.utxo_pool, candidates),
        };

        let mut accepted = Vec::new();
        for candidate in candidates {
            if TransactionValidator::is_valid(&self.utxo_pool, &candidate) {
                self.apply(&candidate);
                accepted.push(candidate);
            }
        }
        accepted
    }

    /// The pool of unspent outputs as of the last settled epoch.
    pub fn utxo_pool(&self) -> &UtxoPool {
        &self.utxo_pool
    }

    /// Removes every utxo the transaction claims and records its outputs as spendable.
    fn apply(&mut self, transaction: &Transaction) {
        for input in transaction.inputs() {
            self.utxo_pool.remove(input.utxo());
        }
        for (output_index, output) in transaction.outputs().iter().enumerate() {
            let utxo = Utxo::new(*transaction.id(), OutputIndex::new(output_index as u32));
            self.utxo_pool.insert(utxo, output.clone());
        }
    }

    fn order_by_ascending_fee(
        utxo_pool: &UtxoPool,
        candidates: Vec<Transaction>,
    ) -> Vec<Transaction> {
        let mut by_fee = candidates
            .into_iter()
            .map(|candidate| (Self::potential_fee(utxo_pool, &candidate), candidate))
            .collect::<Vec<(f64, Transaction)>>();
        by_fee.sort_by(|(lhs, _), (rhs, _)| lhs.total_cmp(rhs));
        by_fee.into_iter().map(|(_, candidate)| candidate).collect()
    }

    /// The fee the transaction would pay against the given pool: the claimed input
    /// values minus the declared output values. A claim on a utxo that the pool does
    /// not hold makes the whole fee zero.
    fn potential_fee(utxo_pool: &UtxoPool, transaction: &Transaction) -> f64 {
        let mut input_value = 0.0;
        for input in transaction.inputs() {
            match utxo_pool.output(input.utxo()) {
                Some(output) => input_value += output.value(),
                None => return 0.0,
            }
        }
        input_value - transaction.total_output_value()
    }
}
