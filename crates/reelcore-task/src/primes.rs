use std::time::Instant;

use crate::{PrimeLimit, PrimeReport, NO_MATCH};

/// Trial division up to `sqrt(n)`, odd divisors only.
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n == 2 {
        return true;
    }
    if n % 2 == 0 {
        return false;
    }

    let mut divisor = 3u64;
    while divisor <= n / divisor {
        if n % divisor == 0 {
            return false;
        }
        divisor += 2;
    }
    true
}

/// Counts primes in `[2, limit]`, polling `interrupted` every `check_interval`
/// candidates. Returns `None` once `interrupted` reports true.
pub(crate) fn count_primes_interruptible(
    limit: PrimeLimit,
    check_interval: u64,
    interrupted: impl Fn() -> bool,
) -> Option<PrimeReport> {
    let limit = limit.get();
    let check_interval = check_interval.max(1);
    let start = Instant::now();

    let mut match_count = 0u64;
    let mut last_match = NO_MATCH;

    for (step, candidate) in (2..=limit).enumerate() {
        if step as u64 % check_interval == 0 && interrupted() {
            return None;
        }
        if is_prime(candidate) {
            match_count += 1;
            last_match = candidate as i64;
        }
    }

    let elapsed_millis = start.elapsed().as_secs_f64() * 1000.0;
    Some(PrimeReport {
        match_count,
        last_match,
        elapsed_millis,
    })
}
