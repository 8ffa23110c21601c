use crate::{
    EpochHandler, EpochPolicy, KeyPair, OutputIndex, PublicKeyAddress, Sha256, Transaction,
    TransactionId, TransactionOutput, Utxo, UtxoPool,
};
use chrono::Utc;
use clap::{App, Arg, ArgMatches};
use std::collections::HashMap;
use std::error::Error;

const GENESIS_COIN_VALUE: f64 = 10.0;
const FEE_RATE: f64 = 0.05;

struct SimulateCliOptions {
    participants: usize,
    coins: usize,
    epochs: usize,
    policy: EpochPolicy,
}

impl SimulateCliOptions {
    pub fn parse(matches: &ArgMatches) -> Result<Self, Box<dyn Error>> {
        let policy = match matches.value_of("policy").unwrap() {
            "input-order" => EpochPolicy::InputOrder,
            "fee-biased" => EpochPolicy::FeeBiased,
            other => return Err(format!("Unknown policy: {}", other).into()),
        };
        Ok(Self {
            participants: matches.value_of_t::<usize>("participants")?,
            coins: matches.value_of_t::<usize>("coins")?,
            epochs: matches.value_of_t::<usize>("epochs")?,
            policy,
        })
    }
}

pub fn simulate_command() -> App<'static> {
    App::new("simulate")
        .version("0.1")
        .about("Runs epochs of randomly keyed participants paying each other.")
        .arg(
            Arg::new("participants")
                .long("participants")
                .value_name("COUNT")
                .help("Number of participants holding and transferring coins.")
                .takes_value(true)
                .required(false)
                .default_value("4"),
        )
        .arg(
            Arg::new("coins")
                .long("coins")
                .value_name("COUNT")
                .help("Number of coins minted to the issuer at genesis.")
                .takes_value(true)
                .required(false)
                .default_value("8"),
        )
        .arg(
            Arg::new("epochs")
                .long("epochs")
                .value_name("COUNT")
                .help("Number of settlement epochs to run.")
                .takes_value(true)
                .required(false)
                .default_value("3"),
        )
        .arg(
            Arg::new("policy")
                .long("policy")
                .value_name("POLICY")
                .help("Candidate ordering policy: input-order or fee-biased.")
                .takes_value(true)
                .required(false)
                .default_value("input-order"),
        )
}

pub fn run_simulate_command(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let options = SimulateCliOptions::parse(matches)?;
    if options.participants == 0 {
        return Err("The simulation requires at least one participant.".into());
    }

    let participants = (0..options.participants)
        .map(|_| KeyPair::generate())
        .collect::<Vec<KeyPair>>();
    let owners = participants
        .iter()
        .enumerate()
        .map(|(index, key_pair)| (key_pair.public_key_address(), index))
        .collect::<HashMap<PublicKeyAddress, usize>>();

    let genesis_pool = mint_genesis_pool(&participants[0], options.coins);
    println!(
        "Minted {} coins worth {:.2} to the issuer.",
        options.coins,
        total_pool_value(&genesis_pool)
    );

    let mut handler = EpochHandler::new(&genesis_pool, options.policy);
    for epoch in 1..=options.epochs {
        let candidates = epoch_candidates(handler.utxo_pool(), &participants, &owners)?;
        let candidate_count = candidates.len();
        let value_before = total_pool_value(handler.utxo_pool());
        let accepted = handler.handle_epoch(candidates);
        let value_after = total_pool_value(handler.utxo_pool());
        println!(
            "Epoch {}: accepted {}/{} candidates, collected {:.2} in fees, \
             pool holds {} outputs worth {:.2}, settled at {} UTC.",
            epoch,
            accepted.len(),
            candidate_count,
            value_before - value_after,
            handler.utxo_pool().len(),
            value_after,
            Utc::now().format("%Y-%m-%d %H:%M:%S")
        );
    }

    print_holdings(handler.utxo_pool(), &owners);
    Ok(())
}

fn mint_genesis_pool(issuer: &KeyPair, coins: usize) -> UtxoPool {
    let genesis_id = TransactionId::new(Sha256::digest("scroogecoin genesis".as_bytes()));
    let mut utxo_pool = UtxoPool::new();
    for index in 0..coins {
        let utxo = Utxo::new(genesis_id, OutputIndex::new(index as u32));
        utxo_pool.insert(
            utxo,
            TransactionOutput::new(GENESIS_COIN_VALUE, issuer.public_key_address()),
        );
    }
    utxo_pool
}

/// Builds the epoch's candidates: every participant pays each of their outputs to the
/// next participant, minus a fee. The first output additionally attracts a rival
/// double-spend with a larger fee and an overdraw, so every epoch exercises rejection.
fn epoch_candidates(
    utxo_pool: &UtxoPool,
    participants: &Vec<KeyPair>,
    owners: &HashMap<PublicKeyAddress, usize>,
) -> Result<Vec<Transaction>, String> {
    let mut holdings = utxo_pool
        .utxos()
        .map(|(utxo, output)| (*utxo, output.clone()))
        .collect::<Vec<(Utxo, TransactionOutput)>>();
    holdings.sort_by_key(|(utxo, _)| *utxo);

    let mut candidates = Vec::new();
    for (position, (utxo, output)) in holdings.iter().enumerate() {
        let owner_index = match owners.get(output.recipient()) {
            Some(owner_index) => *owner_index,
            None => continue,
        };
        let owner = &participants[owner_index];
        let recipient = participants[(owner_index + 1) % participants.len()].public_key_address();

        let fee = output.value() * FEE_RATE;
        candidates.push(Transaction::signed(
            &[(owner, *utxo)],
            vec![TransactionOutput::new(output.value() - fee, recipient)],
        )?);

        if position == 0 {
            // A rival claim on the same utxo, so at most one of the two settles.
            candidates.push(Transaction::signed(
                &[(owner, *utxo)],
                vec![TransactionOutput::new(output.value() / 2.0, recipient)],
            )?);
            // Correctly signed, but it declares more value than it claims.
            candidates.push(Transaction::signed(
                &[(owner, *utxo)],
                vec![TransactionOutput::new(output.value() + 1.0, recipient)],
            )?);
        }
    }
    Ok(candidates)
}

fn total_pool_value(utxo_pool: &UtxoPool) -> f64 {
    utxo_pool.utxos().map(|(_, output)| output.value()).sum()
}

fn print_holdings(utxo_pool: &UtxoPool, owners: &HashMap<PublicKeyAddress, usize>) {
    let mut held_values = vec![0.0; owners.len()];
    for (_, output) in utxo_pool.utxos() {
        if let Some(owner_index) = owners.get(output.recipient()) {
            held_values[*owner_index] += output.value();
        }
    }
    for (owner_index, held_value) in held_values.iter().enumerate() {
        println!("Participant {} holds {:.2}.", owner_index, held_value);
    }
}
