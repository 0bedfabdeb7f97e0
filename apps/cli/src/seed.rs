use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reelcore_store::{Category, Rating, Record, RecordId, RecordStore, MAX_RATING};

/// Builds `count` synthetic records: `Movie {n}`, a one-decimal rating and a random category.
pub(crate) fn generate_store(count: usize, seed: Option<u64>) -> Result<RecordStore> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut records = Vec::with_capacity(count);
    for index in 0..count {
        let id = RecordId::try_from(index).context("record count exceeds id space")?;
        let rating = (rng.random::<f32>() * MAX_RATING * 10.0).round() / 10.0;
        let category = Category::ALL[rng.random_range(0..Category::ALL.len())];
        records.push(Record::new(
            id,
            format!("Movie {}", index + 1),
            Rating::new(rating)?,
            category,
        ));
    }

    Ok(RecordStore::new(records)?)
}
