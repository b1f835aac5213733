//! Version counters and last-seen stamps.
//!
//! Every layer of the engine uses the same staleness rule: a producer owns a
//! monotonic [`Version`], a consumer records the version it last consumed in a
//! [`Seen`] stamp, and recomputes only when the two differ.
//!
//! - [`Cached`] bundles a derived value with the stamps of its inputs.
//! - [`GpuSlot`] applies the rule to GPU objects keyed by context generation.

/// Monotonic version counter.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(u64);

impl Version {
    /// Constant reported in place of a parent version for root nodes.
    pub const ROOT: Version = Version(0);

    #[inline]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn bump(&mut self) {
        self.0 += 1;
    }
}

/// Anything that exposes a version counter.
pub trait Versioned {
    fn version(&self) -> Version;
}

/// Consumer-side record of the last version observed from a producer.
///
/// A fresh (or reset) stamp is stale against every version.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Seen(Option<Version>);

impl Seen {
    #[inline]
    pub const fn never() -> Self {
        Self(None)
    }

    #[inline]
    pub fn is_stale(&self, current: Version) -> bool {
        self.0 != Some(current)
    }

    #[inline]
    pub fn mark(&mut self, current: Version) {
        self.0 = Some(current);
    }

    #[inline]
    pub fn reset(&mut self) {
        self.0 = None;
    }

    #[inline]
    pub fn get(&self) -> Option<Version> {
        self.0
    }
}

/// Derived value recomputed only when one of its `N` inputs advanced.
///
/// Each recompute bumps the cache's own output version, so caches chain: a
/// child node's world matrix consumes its parent's output version.
#[derive(Debug, Clone)]
pub struct Cached<T, const N: usize> {
    value: T,
    version: Version,
    seen: [Seen; N],
}

impl<T, const N: usize> Cached<T, N> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            version: Version::default(),
            seen: [Seen::never(); N],
        }
    }

    #[inline]
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Output version; advances once per recompute.
    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    #[inline]
    pub fn is_stale(&self, inputs: [Version; N]) -> bool {
        self.seen.iter().zip(inputs).any(|(s, v)| s.is_stale(v))
    }

    /// Recomputes the value if any input advanced. Returns `true` if it did.
    pub fn refresh(&mut self, inputs: [Version; N], compute: impl FnOnce(&mut T)) -> bool {
        if !self.is_stale(inputs) {
            return false;
        }
        compute(&mut self.value);
        self.version.bump();
        for (s, v) in self.seen.iter_mut().zip(inputs) {
            s.mark(v);
        }
        true
    }

    /// Forgets every input stamp so the next refresh recomputes.
    pub fn invalidate(&mut self) {
        for s in &mut self.seen {
            s.reset();
        }
    }
}

/// GPU object tagged with the context generation that created it.
///
/// A context loss bumps the generation; the slot then reports itself stale and
/// the owner recreates the object lazily on next use.
#[derive(Debug)]
pub struct GpuSlot<T> {
    value: Option<T>,
    generation: u64,
}

impl<T> Default for GpuSlot<T> {
    fn default() -> Self {
        Self { value: None, generation: 0 }
    }
}

impl<T> GpuSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_stale(&self, generation: u64) -> bool {
        self.value.is_none() || self.generation != generation
    }

    /// Returns the object only if it belongs to `generation`.
    #[inline]
    pub fn get(&self, generation: u64) -> Option<&T> {
        if self.generation == generation { self.value.as_ref() } else { None }
    }

    #[inline]
    pub fn created_at(&self) -> Option<u64> {
        self.value.as_ref().map(|_| self.generation)
    }

    pub fn set(&mut self, value: T, generation: u64) -> Option<T> {
        self.generation = generation;
        self.value.replace(value)
    }

    pub fn take(&mut self) -> Option<T> {
        self.value.take()
    }

    /// Returns the current object, creating it first if stale.
    pub fn get_or_try_create<E>(
        &mut self,
        generation: u64,
        create: impl FnOnce() -> Result<T, E>,
    ) -> Result<&T, E> {
        let stale = self.is_stale(generation);
        let value = match self.value.take() {
            Some(value) if !stale => value,
            _ => {
                let value = create()?;
                self.generation = generation;
                value
            }
        };
        Ok(self.value.insert(value))
    }
}
