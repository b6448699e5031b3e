//! Identifier generation
//!
//! The ledger treats id generation as an opaque capability injected at
//! construction time. The default implementation is a Snowflake-style
//! generator; tests may plug in anything that yields unique values.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Produces unique 64-bit identifiers on demand.
///
/// No ordering guarantee is required by callers, only global uniqueness.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> i64;
}

/// Custom epoch: 2024-01-01T00:00:00Z in Unix milliseconds
const EPOCH_MS: u64 = 1_704_067_200_000;

const TIMESTAMP_BITS: u32 = 40;
const MACHINE_BITS: u32 = 8;
const SEQUENCE_BITS: u32 = 15;
const TIMESTAMP_MASK: u64 = (1 << TIMESTAMP_BITS) - 1;
const SEQUENCE_MASK: u32 = (1 << SEQUENCE_BITS) - 1;

#[derive(Debug, Default)]
struct SnowflakeState {
    sequence: u32,
    last_timestamp: u64,
}

/// Snowflake ID generator
///
/// Format: 0 | timestamp (40 bits) | machine_id (8 bits) | sequence (15 bits).
///
/// The timestamp counts milliseconds since [`EPOCH_MS`], which lasts about
/// 34 years. The sign bit is never set, so every id is a positive `i64`.
#[derive(Debug)]
pub struct SnowflakeGenerator {
    machine_id: u8,
    state: Mutex<SnowflakeState>,
}

impl SnowflakeGenerator {
    pub fn new(machine_id: u8) -> Self {
        Self {
            machine_id,
            state: Mutex::new(SnowflakeState::default()),
        }
    }

    /// Milliseconds since the custom epoch
    fn now_millis() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
            .saturating_sub(EPOCH_MS)
    }

    fn compose(timestamp: u64, machine_id: u8, sequence: u32) -> i64 {
        let id = ((timestamp & TIMESTAMP_MASK) << (MACHINE_BITS + SEQUENCE_BITS))
            | ((machine_id as u64) << SEQUENCE_BITS)
            | (sequence & SEQUENCE_MASK) as u64;
        id as i64
    }
}

impl IdGenerator for SnowflakeGenerator {
    fn generate(&self) -> i64 {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            // Counter state is still usable after a panic elsewhere
            Err(poisoned) => poisoned.into_inner(),
        };

        // Never go backwards, even if the wall clock does
        let mut now = Self::now_millis().max(state.last_timestamp);

        if now == state.last_timestamp {
            state.sequence += 1;
            if state.sequence > SEQUENCE_MASK {
                // Sequence exhausted for this millisecond: borrow the next one
                now += 1;
                state.sequence = 0;
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = now;

        Self::compose(now, self.machine_id, state.sequence)
    }
}
