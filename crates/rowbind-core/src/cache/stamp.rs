use std::sync::atomic::{AtomicU64, Ordering};

///
/// UsageStamp
///
/// Packed `(age << 32) | use_count`. Reads and writes are single atomic
/// loads and stores; concurrent touches may lose an increment, which only
/// makes the eviction estimate slightly less precise.
///

#[derive(Debug, Default)]
pub(crate) struct UsageStamp(AtomicU64);

impl UsageStamp {
    pub(crate) const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub(crate) fn load(&self) -> (u32, u32) {
        unpack(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, age: u32, use_count: u32) {
        self.0.store(pack(age, use_count), Ordering::Release);
    }

    /// Record one use at `current_age`, decaying first if the stamp is stale.
    pub(crate) fn touch(&self, current_age: u32) {
        let (mut age, mut use_count) = self.load();
        if age != current_age {
            decay(&mut age, &mut use_count, current_age);
        }
        use_count = use_count.saturating_add(1);
        self.store(age, use_count);
    }

    /// Decayed use count at `current_age`; writes the decay back.
    pub(crate) fn use_count(&self, current_age: u32) -> u32 {
        let (mut age, mut use_count) = self.load();
        if age != current_age {
            decay(&mut age, &mut use_count, current_age);
            self.store(age, use_count);
        }

        use_count
    }
}

/// Halve the count once per age step; 32 or more steps clear it.
fn decay(age: &mut u32, use_count: &mut u32, current_age: u32) {
    let delta = current_age.wrapping_sub(*age);
    *use_count = if delta < 32 { *use_count >> delta } else { 0 };
    *age = current_age;
}

const fn pack(age: u32, use_count: u32) -> u64 {
    ((age as u64) << 32) | use_count as u64
}

#[expect(clippy::cast_possible_truncation)]
const fn unpack(stamp: u64) -> (u32, u32) {
    ((stamp >> 32) as u32, stamp as u32)
}
