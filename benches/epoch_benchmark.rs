use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use scroogecoin_lib::{
    EpochHandler, EpochPolicy, KeyPair, OutputIndex, Sha256, Transaction, TransactionId,
    TransactionOutput, Utxo, UtxoPool,
};

const BATCH_SIZE: usize = 256;

// One utxo per candidate, so every candidate is independently acceptable and the
// whole batch settles.
fn prepare_epoch() -> (UtxoPool, Vec<Transaction>) {
    let issuer = KeyPair::generate();
    let recipient = KeyPair::generate();
    let genesis_id = TransactionId::new(Sha256::digest("benchmark genesis".as_bytes()));

    let mut utxo_pool = UtxoPool::new();
    let mut candidates = Vec::with_capacity(BATCH_SIZE);
    for index in 0..BATCH_SIZE {
        let utxo = Utxo::new(genesis_id, OutputIndex::new(index as u32));
        utxo_pool.insert(
            utxo,
            TransactionOutput::new(10.0, issuer.public_key_address()),
        );
        let outputs = vec![TransactionOutput::new(9.0, recipient.public_key_address())];
        candidates.push(Transaction::signed(&[(&issuer, utxo)], outputs).unwrap());
    }
    (utxo_pool, candidates)
}

fn handle_epoch_benchmark(c: &mut Criterion) {
    // Signature verification dominates, so throughput is roughly the number of
    // candidates the handler can settle per second.
    let (utxo_pool, candidates) = prepare_epoch();

    let mut group = c.benchmark_group("Epoch settlement");
    group.throughput(Throughput::Elements(BATCH_SIZE as u64));
    group.bench_function("handle_epoch for 256 independent spends", |b| {
        b.iter_batched(
            || {
                (
                    EpochHandler::new(&utxo_pool, EpochPolicy::FeeBiased),
                    candidates.clone(),
                )
            },
            |(mut handler, candidates)| black_box(handler.handle_epoch(candidates)),
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

criterion_group!(benches, handle_epoch_benchmark);

criterion_main!(benches);
