use crate::{KeyPair, PublicKeyAddress, Sha256, Signature, Utxo};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A double SHA-256 hash of the transaction data, including the input signatures.
#[derive(Debug, Hash, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct TransactionId(Sha256);

impl Display for TransactionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TransactionId {
    pub fn new(hash: Sha256) -> Self {
        Self(hash)
    }
}

/// The index of the transaction output, the first one is 0.
#[derive(Debug, Hash, Ord, PartialOrd, Eq, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct OutputIndex(u32);

impl Display for OutputIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OutputIndex {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }
}

/// A payment of the given value to the given recipient.
/// Values are allowed to be constructed negative so that validation can reject them
/// explicitly rather than the constructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionOutput {
    value: f64,
    recipient: PublicKeyAddress,
}

impl TransactionOutput {
    pub fn new(value: f64, recipient: PublicKeyAddress) -> Self {
        Self { value, recipient }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn recipient(&self) -> &PublicKeyAddress {
        &self.recipient
    }
}

/// A claim on an unspent output of a previous transaction, together with the signature
/// that authorizes the claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionInput {
    // A pointer to the unspent output being claimed.
    utxo: Utxo,
    // A signature over the transaction's signable payload for this input's position.
    signature: Signature,
}

impl TransactionInput {
    pub fn new(utxo: Utxo, signature: Signature) -> Self {
        Self { utxo, signature }
    }

    /// An input that has not been signed yet, used while assembling a transaction.
    pub fn unsigned(utxo: Utxo) -> Self {
        Self::new(utxo, Signature::empty())
    }

    pub fn utxo(&self) -> &Utxo {
        &self.utxo
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

/// The byte content that an input signature commits to: every claim (without its
/// signature), every output, and the position of the input being signed.
#[derive(Serialize)]
struct SignablePayload<'a> {
    inputs: Vec<&'a Utxo>,
    outputs: &'a [TransactionOutput],
    input_index: u32,
}

/// A transfer of value: a set of claims on unspent outputs, and the new outputs those
/// claims fund.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    inputs: Vec<TransactionInput>,
    outputs: Vec<TransactionOutput>,
}

impl Transaction {
    pub fn new(
        inputs: Vec<TransactionInput>,
        outputs: Vec<TransactionOutput>,
    ) -> Result<Self, String> {
        let id = Self::hash_transaction_data(&inputs, &outputs)?;
        Ok(Self {
            id,
            inputs,
            outputs,
        })
    }

    /// Builds a transaction whose every input carries a valid signature.
    /// Each entry in `spends` pairs the claimed utxo with the key pair that owns it.
    /// The signatures commit to the final payload, so the returned transaction
    /// verifies against a pool in which those utxos pay to the given keys.
    pub fn signed(
        spends: &[(&KeyPair, Utxo)],
        outputs: Vec<TransactionOutput>,
    ) -> Result<Self, String> {
        let unsigned_inputs = spends
            .iter()
            .map(|(_, utxo)| TransactionInput::unsigned(*utxo))
            .collect::<Vec<TransactionInput>>();
        let draft = Transaction::new(unsigned_inputs, outputs.clone())?;

        let mut inputs = Vec::with_capacity(spends.len());
        for (input_index, (key_pair, utxo)) in spends.iter().enumerate() {
            let payload = draft.signable_payload(input_index)?;
            inputs.push(TransactionInput::new(*utxo, key_pair.sign(&payload)));
        }
        Transaction::new(inputs, outputs)
    }

    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    pub fn inputs(&self) -> &Vec<TransactionInput> {
        &self.inputs
    }

    pub fn outputs(&self) -> &Vec<TransactionOutput> {
        &self.outputs
    }

    /// The sum of the declared output values.
    pub fn total_output_value(&self) -> f64 {
        self.outputs.iter().map(TransactionOutput::value).sum()
    }

    /// Returns the bytes that the signature for the input at `input_index` must sign:
    /// the whole transaction without its signatures, plus the index itself.
    /// Binding the payload to the index means a signature cannot be replayed against
    /// a different input of the same transaction.
    pub fn signable_payload(&self, input_index: usize) -> Result<Vec<u8>, String> {
        if input_index >= self.inputs.len() {
            return Err(format!(
                "Input index: {} is out of range for a transaction with {} inputs.",
                input_index,
                self.inputs.len()
            ));
        }
        let payload = SignablePayload {
            inputs: self
                .inputs
                .iter()
                .map(TransactionInput::utxo)
                .collect::<Vec<&Utxo>>(),
            outputs: &self.outputs[..],
            input_index: input_index as u32,
        };
        bincode::serialize(&payload).map_err(|e| e.to_string())
    }

    fn hash_transaction_data(
        inputs: &Vec<TransactionInput>,
        outputs: &Vec<TransactionOutput>,
    ) -> Result<TransactionId, String> {
        let data = bincode::serialize(&(inputs, outputs)).map_err(|e| e.to_string())?;
        Ok(TransactionId::new(Sha256::double_digest(&data)))
    }
}
