// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fixed reward table and uniform draws over it.

use rand::Rng;

/// One possible spin outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reward {
    pub label: &'static str,
    pub value: f64,
}

/// Every outcome a spin can produce. Draws are uniform over this list.
pub const REWARD_TABLE: [Reward; 4] = [
    Reward {
        label: "5 TON",
        value: 5.0,
    },
    Reward {
        label: "0.1 TON",
        value: 0.1,
    },
    Reward {
        label: "0.001 TON",
        value: 0.001,
    },
    Reward {
        label: "No win",
        value: 0.0,
    },
];

/// Draw one reward uniformly at random.
pub fn draw_reward<R: Rng + ?Sized>(rng: &mut R) -> &'static Reward {
    &REWARD_TABLE[rng.gen_range(0..REWARD_TABLE.len())]
}
