// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Primes by recursive filtering.
//!
//! Each worker takes the first value off its input channel (a prime),
//! reports it, then forks the next worker downstream and forwards only the
//! values its prime does not divide. Closing the head of the pipeline tears
//! the whole chain down through `Closed` propagation.

use csplib::prelude::*;

const NUM_PRIMES: usize = 30;

fn sieve_worker(port_in: OneOne<u64>, port_out: N2N<u64>) -> Result<()> {
    let prime = port_in.read()?;
    port_out.write(prime)?;

    let downstream = OneOne::new();
    {
        let input = downstream.clone();
        let output = port_out.clone();
        simple(move || sieve_worker(input, output)).fork();
    }

    let outcome = repeat(|| {
        let val = port_in.read()?;
        if val % prime != 0 {
            downstream.write(val)?;
        }
        Ok(())
    });
    downstream.close();
    outcome
}

fn run_sieve() -> Vec<u64> {
    let input = OneOne::new();
    let output: N2N<u64> = many_many();

    {
        let input = input.clone();
        proc("source", move || {
            let mut n = 2u64;
            repeat(|| {
                input.write(n)?;
                n += 1;
                Ok(())
            })
        })
        .fork();
    }
    {
        let input = input.clone();
        let output = output.clone();
        simple(move || sieve_worker(input, output)).fork();
    }

    let mut primes = Vec::with_capacity(NUM_PRIMES);
    for _ in 0..NUM_PRIMES {
        match output.read() {
            Ok(p) => primes.push(p),
            Err(_) => break,
        }
    }

    input.close();
    output.close();
    primes
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".parse().unwrap()),
        )
        .init();

    println!("We have found the following primes: {:?}", run_sieve());
}
