use crate::{Crypto, Transaction, Utxo, UtxoPool};
use std::collections::HashSet;
use thiserror::Error;

/// The rule a transaction violated. Epoch settlement only cares whether a transaction
/// is valid; the specific rule is reported for callers and tests that want to know why.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransactionError {
    #[error("input {input_index} claims utxo {utxo} which is not in the pool")]
    UnknownUtxo { input_index: usize, utxo: Utxo },
    #[error("the signature for input {input_index} does not verify against the owner of the claimed output")]
    InvalidSignature { input_index: usize },
    #[error("utxo {utxo} is claimed by more than one input")]
    DuplicateClaim { utxo: Utxo },
    #[error("output {output_index} has a negative value: {value}")]
    NegativeOutputValue { output_index: usize, value: f64 },
    #[error("claimed input value {input_value} does not cover output value {output_value}")]
    InsufficientInputValue { input_value: f64, output_value: f64 },
    #[error("failed to compute the signable payload for input {input_index}: {reason}")]
    UnsignablePayload { input_index: usize, reason: String },
}

/// Checks a single transaction against a pool of unspent outputs.
///
/// A transaction is valid if:
///   (1) every utxo it claims is in the pool,
///   (2) the signature on each input verifies against the claimed output's recipient,
///   (3) no utxo is claimed by more than one of its inputs,
///   (4) none of its output values is negative, and
///   (5) the claimed input values sum to at least the declared output values.
///
/// The checks run in that order and report the first violation. Checks (1) to (3)
/// visit the inputs in their sequence order. Validation never mutates the pool.
pub struct TransactionValidator {}

impl TransactionValidator {
    /// Returns Ok(()) for a valid transaction, or the first rule it violates.
    pub fn validate(
        utxo_pool: &UtxoPool,
        transaction: &Transaction,
    ) -> Result<(), TransactionError> {
        let mut claimed = HashSet::<Utxo>::new();
        let mut input_value = 0.0;
        for (input_index, input) in transaction.inputs().iter().enumerate() {
            let utxo = *input.utxo();
            // (1)
            let output = match utxo_pool.output(&utxo) {
                Some(output) => output,
                None => return Err(TransactionError::UnknownUtxo { input_index, utxo }),
            };
            // (2)
            let payload = transaction
                .signable_payload(input_index)
                .map_err(|reason| TransactionError::UnsignablePayload {
                    input_index,
                    reason,
                })?;
            if !Crypto::verify_signature(output.recipient(), &payload, input.signature()) {
                return Err(TransactionError::InvalidSignature { input_index });
            }
            // (3)
            if !claimed.insert(utxo) {
                return Err(TransactionError::DuplicateClaim { utxo });
            }
            input_value += output.value();
        }

        let mut output_value = 0.0;
        for (output_index, output) in transaction.outputs().iter().enumerate() {
            // (4)
            if output.value() < 0.0 {
                return Err(TransactionError::NegativeOutputValue {
                    output_index,
                    value: output.value(),
                });
            }
            output_value += output.value();
        }

        // (5)
        if input_value < output_value {
            return Err(TransactionError::InsufficientInputValue {
                input_value,
                output_value,
            });
        }
        Ok(())
    }

    /// Returns whether the transaction is valid against the given pool.
    pub fn is_valid(utxo_pool: &UtxoPool, transaction: &Transaction) -> bool {
        Self::validate(utxo_pool, transaction).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{KeyPair, OutputIndex, Sha256, TransactionId, TransactionInput, TransactionOutput};

    #[test]
    fn accepts_spend_with_fee() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let utxo = test_utxo(1, 0);
        let utxo_pool = pool_with(vec![(utxo, 10.0, &alice)]);

        let transaction =
            Transaction::signed(&[(&alice, utxo)], vec![output(7.0, &bob)]).unwrap();
        assert_eq!(TransactionValidator::validate(&utxo_pool, &transaction), Ok(()));
        assert!(TransactionValidator::is_valid(&utxo_pool, &transaction));
    }

    #[test]
    fn accepts_exact_balance_spend() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let utxo = test_utxo(1, 0);
        let utxo_pool = pool_with(vec![(utxo, 10.0, &alice)]);

        let transaction =
            Transaction::signed(&[(&alice, utxo)], vec![output(10.0, &bob)]).unwrap();
        assert_eq!(TransactionValidator::validate(&utxo_pool, &transaction), Ok(()));
    }

    #[test]
    fn accepts_spend_claiming_outputs_of_multiple_owners() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let carol = KeyPair::generate();
        let alice_utxo = test_utxo(1, 0);
        let bob_utxo = test_utxo(2, 0);
        let utxo_pool = pool_with(vec![(alice_utxo, 10.0, &alice), (bob_utxo, 5.0, &bob)]);

        let transaction = Transaction::signed(
            &[(&alice, alice_utxo), (&bob, bob_utxo)],
            vec![output(14.0, &carol)],
        )
        .unwrap();
        assert_eq!(TransactionValidator::validate(&utxo_pool, &transaction), Ok(()));
    }

    #[test]
    fn rejects_claim_of_unknown_utxo() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let utxo_pool = pool_with(vec![(test_utxo(1, 0), 10.0, &alice)]);

        let unknown = test_utxo(1, 1);
        let transaction =
            Transaction::signed(&[(&alice, unknown)], vec![output(7.0, &bob)]).unwrap();
        assert_eq!(
            TransactionValidator::validate(&utxo_pool, &transaction),
            Err(TransactionError::UnknownUtxo {
                input_index: 0,
                utxo: unknown
            })
        );
    }

    #[test]
    fn rejects_signature_from_wrong_key() {
        let alice = KeyPair::generate();
        let mallory = KeyPair::generate();
        let utxo = test_utxo(1, 0);
        let utxo_pool = pool_with(vec![(utxo, 10.0, &alice)]);

        // Mallory claims Alice's output but signs with the wrong key.
        let transaction =
            Transaction::signed(&[(&mallory, utxo)], vec![output(7.0, &mallory)]).unwrap();
        assert_eq!(
            TransactionValidator::validate(&utxo_pool, &transaction),
            Err(TransactionError::InvalidSignature { input_index: 0 })
        );
    }

    #[test]
    fn rejects_unsigned_input() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let utxo = test_utxo(1, 0);
        let utxo_pool = pool_with(vec![(utxo, 10.0, &alice)]);

        let transaction = Transaction::new(
            vec![TransactionInput::unsigned(utxo)],
            vec![output(7.0, &bob)],
        )
        .unwrap();
        assert_eq!(
            TransactionValidator::validate(&utxo_pool, &transaction),
            Err(TransactionError::InvalidSignature { input_index: 0 })
        );
    }

    #[test]
    fn rejects_signature_replayed_from_another_input() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let first_utxo = test_utxo(1, 0);
        let second_utxo = test_utxo(2, 0);
        let utxo_pool = pool_with(vec![(first_utxo, 10.0, &alice), (second_utxo, 5.0, &alice)]);

        let outputs = vec![output(12.0, &bob)];
        let draft = Transaction::new(
            vec![
                TransactionInput::unsigned(first_utxo),
                TransactionInput::unsigned(second_utxo),
            ],
            outputs.clone(),
        )
        .unwrap();
        let first_signature = alice.sign(&draft.signable_payload(0).unwrap());
        let second_signature = alice.sign(&draft.signable_payload(1).unwrap());

        let transaction = Transaction::new(
            vec![
                TransactionInput::new(first_utxo, second_signature),
                TransactionInput::new(second_utxo, first_signature),
            ],
            outputs,
        )
        .unwrap();
        assert_eq!(
            TransactionValidator::validate(&utxo_pool, &transaction),
            Err(TransactionError::InvalidSignature { input_index: 0 })
        );
    }

    #[test]
    fn rejects_duplicate_claim_of_the_same_utxo() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let utxo = test_utxo(1, 0);
        let utxo_pool = pool_with(vec![(utxo, 10.0, &alice)]);

        // Both inputs are correctly signed and the combined claim would cover the
        // outputs, so only the duplicate-claim rule rejects this.
        let transaction = Transaction::signed(
            &[(&alice, utxo), (&alice, utxo)],
            vec![output(15.0, &bob)],
        )
        .unwrap();
        assert_eq!(
            TransactionValidator::validate(&utxo_pool, &transaction),
            Err(TransactionError::DuplicateClaim { utxo })
        );
    }

    #[test]
    fn rejects_negative_output_value() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let utxo = test_utxo(1, 0);
        let utxo_pool = pool_with(vec![(utxo, 10.0, &alice)]);

        // A negative output lowers the output sum, so the balance rule would pass;
        // the negative-value rule has to catch it on its own.
        let transaction = Transaction::signed(
            &[(&alice, utxo)],
            vec![output(4.0, &bob), output(-1.0, &bob), output(3.0, &bob)],
        )
        .unwrap();
        assert_eq!(
            TransactionValidator::validate(&utxo_pool, &transaction),
            Err(TransactionError::NegativeOutputValue {
                output_index: 1,
                value: -1.0
            })
        );
    }

    #[test]
    fn rejects_outputs_exceeding_inputs() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let utxo = test_utxo(1, 0);
        let utxo_pool = pool_with(vec![(utxo, 10.0, &alice)]);

        let transaction = Transaction::signed(
            &[(&alice, utxo)],
            vec![output(7.0, &bob), output(4.0, &bob)],
        )
        .unwrap();
        assert_eq!(
            TransactionValidator::validate(&utxo_pool, &transaction),
            Err(TransactionError::InsufficientInputValue {
                input_value: 10.0,
                output_value: 11.0
            })
        );
    }

    #[test]
    fn checks_inputs_before_outputs() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let utxo_pool = UtxoPool::new();

        // The claim is unknown and an output is negative; the unknown claim wins.
        let transaction = Transaction::signed(
            &[(&alice, test_utxo(1, 0))],
            vec![output(-1.0, &bob)],
        )
        .unwrap();
        assert_eq!(
            TransactionValidator::validate(&utxo_pool, &transaction),
            Err(TransactionError::UnknownUtxo {
                input_index: 0,
                utxo: test_utxo(1, 0)
            })
        );
    }

    #[test]
    fn validation_never_mutates_the_pool() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let utxo = test_utxo(1, 0);
        let utxo_pool = pool_with(vec![(utxo, 10.0, &alice)]);

        let transaction =
            Transaction::signed(&[(&alice, utxo)], vec![output(7.0, &bob)]).unwrap();
        assert!(TransactionValidator::is_valid(&utxo_pool, &transaction));
        assert!(utxo_pool.contains(&utxo));
        assert_eq!(utxo_pool.len(), 1);
    }

    #[test]
    fn revalidation_yields_the_same_result() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let utxo = test_utxo(1, 0);
        let utxo_pool = pool_with(vec![(utxo, 10.0, &alice)]);

        let valid = Transaction::signed(&[(&alice, utxo)], vec![output(7.0, &bob)]).unwrap();
        let overdraw =
            Transaction::signed(&[(&alice, utxo)], vec![output(11.0, &bob)]).unwrap();
        for _ in 0..3 {
            assert!(TransactionValidator::is_valid(&utxo_pool, &valid));
            assert!(!TransactionValidator::is_valid(&utxo_pool, &overdraw));
        }
    }

    fn test_utxo(id_fill: u8, output_index: u32) -> Utxo {
        Utxo::new(
            TransactionId::new(Sha256::from_raw([id_fill; 32])),
            OutputIndex::new(output_index),
        )
    }

    fn output(value: f64, recipient: &KeyPair) -> TransactionOutput {
        TransactionOutput::new(value, recipient.public_key_address())
    }

    fn pool_with(entries: Vec<(Utxo, f64, &KeyPair)>) -> UtxoPool {
        let mut utxo_pool = UtxoPool::new();
        for (utxo, value, owner) in entries {
            utxo_pool.insert(utxo, TransactionOutput::new(value, owner.public_key_address()));
        }
        utxo_pool
    }
}
