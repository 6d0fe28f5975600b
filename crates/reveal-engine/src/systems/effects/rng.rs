//! Seedable xorshift64 generator for filler glyphs. Same seed, same frames.

#[derive(Debug, Clone)]
pub struct Rng {
    state: u64,
}

impl Rng {
    /// A zero seed would stick at zero forever, so it is bumped to 1.
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    fn advance(&mut self) -> u64 {
        let mut s = self.state;
        s ^= s << 13;
        s ^= s >> 7;
        s ^= s << 17;
        self.state = s;
        s
    }

    /// Value in `[0, bound)`. A zero bound yields 0.
    pub fn next_int(&mut self, bound: u32) -> u32 {
        match u64::from(bound) {
            0 => 0,
            b => (self.advance() % b) as u32,
        }
    }

    pub fn pick<T: Copy>(&mut self, items: &[T]) -> Option<T> {
        let len = u32::try_from(items.len()).ok().filter(|&n| n > 0)?;
        items.get(self.next_int(len) as usize).copied()
    }

    /// Seed for an independent generator owned by a new effect.
    pub fn fork(&mut self) -> u64 {
        self.advance()
    }
}
