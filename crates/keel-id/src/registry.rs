//! Group-keyed registry of Snowflake generators.
//!
//! A [`SerialNumberRegistry`] multiplexes many independent ID spaces (one per
//! group, e.g. per entity type) over [`SnowflakeGenerator`]. Each group owns
//! its own generator and lock, so generation in one group never contends with
//! another. Requests for an empty or unknown group fall back to a default
//! generator that always exists.

use crate::{GeneratorOptions, Result, SnowflakeGenerator, SystemClock, TimeSource};
use parking_lot::RwLock;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

/// Data center ID of the fallback generator.
pub const DEFAULT_DATA_CENTER_ID: u64 = 1;

/// Worker ID of the fallback generator.
pub const DEFAULT_WORKER_ID: u64 = 1;

/// A registry mapping group names to their own [`SnowflakeGenerator`].
///
/// Registration is idempotent: the first registration of a group wins and
/// later ones are silently ignored. Entries are never removed.
///
/// # Example
///
/// ```
/// use keel_id::{GeneratorOptions, SerialNumberRegistry};
///
/// struct Order;
///
/// let registry = SerialNumberRegistry::new().unwrap();
/// registry.register_generator(["invoices"], GeneratorOptions::new(2, 3)).unwrap();
/// registry.register_generator_for::<Order>(GeneratorOptions::new(2, 4)).unwrap();
///
/// let invoice = registry.generate_serial_number(Some("invoices")).unwrap();
/// let order = registry.generate_serial_number_for::<Order>().unwrap();
/// let fallback = registry.generate_serial_number(None).unwrap();
/// assert!(invoice > 0 && order > 0 && fallback > 0);
/// ```
pub struct SerialNumberRegistry<T = SystemClock>
where
    T: TimeSource + Clone,
{
    clock: T,
    generators: RwLock<HashMap<String, Arc<SnowflakeGenerator<T>>>>,
    default_generator: Arc<SnowflakeGenerator<T>>,
}

impl SerialNumberRegistry<SystemClock> {
    /// Creates an empty registry backed by the system wall clock.
    ///
    /// # Errors
    ///
    /// Fails only if the system clock reads earlier than the default epoch.
    pub fn new() -> Result<Self> {
        Self::with_clock(SystemClock)
    }
}

impl<T> SerialNumberRegistry<T>
where
    T: TimeSource + Clone,
{
    /// Creates an empty registry whose generators all share `clock`.
    ///
    /// # Errors
    ///
    /// Fails if `clock` reads earlier than the default epoch.
    pub fn with_clock(clock: T) -> Result<Self> {
        let default_generator = SnowflakeGenerator::new(
            GeneratorOptions::new(DEFAULT_DATA_CENTER_ID, DEFAULT_WORKER_ID),
            clock.clone(),
        )?;
        Ok(Self {
            clock,
            generators: RwLock::new(HashMap::new()),
            default_generator: Arc::new(default_generator),
        })
    }

    /// Registers a generator for every group in `groups` that is not already
    /// present. Duplicate and empty names are ignored.
    ///
    /// Returns the number of groups that were newly registered.
    ///
    /// # Errors
    ///
    /// Returns the validation error of `options`; in that case nothing is
    /// inserted.
    pub fn register_generator<I, S>(&self, groups: I, options: GeneratorOptions) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        options.validate(self.clock.current_millis())?;

        let mut unique = HashSet::new();
        let pending: Vec<String> = {
            let generators = self.generators.read();
            groups
                .into_iter()
                .map(|group| group.as_ref().to_owned())
                .filter(|group| !group.is_empty() && !generators.contains_key(group))
                .filter(|group| unique.insert(group.clone()))
                .collect()
        };

        // Build everything before touching the map so a failure inserts nothing.
        let built = pending
            .into_iter()
            .map(|group| {
                SnowflakeGenerator::new(options, self.clock.clone())
                    .map(|generator| (group, Arc::new(generator)))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut generators = self.generators.write();
        let mut registered = 0;
        for (group, generator) in built {
            // Another caller may have won the race since the read above.
            if let std::collections::hash_map::Entry::Vacant(entry) = generators.entry(group) {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    group = entry.key().as_str(),
                    data_center_id = options.data_center_id,
                    worker_id = options.worker_id,
                    "registered serial number generator"
                );
                entry.insert(generator);
                registered += 1;
            }
        }
        Ok(registered)
    }

    /// Registers a generator keyed by the fully-qualified type name of `E`.
    ///
    /// Returns `true` if the group was newly registered.
    ///
    /// # Errors
    ///
    /// Returns the validation error of `options`.
    pub fn register_generator_for<E: ?Sized>(&self, options: GeneratorOptions) -> Result<bool> {
        self.register_generator([group_key::<E>()], options)
            .map(|registered| registered == 1)
    }

    /// Generates the next serial number for `group`.
    ///
    /// `None`, an empty name or an unregistered name all use the default
    /// generator; there is no "group not found" error.
    ///
    /// # Errors
    ///
    /// Only the clock errors of [`SnowflakeGenerator::generate_id`].
    pub fn generate_serial_number(&self, group: Option<&str>) -> Result<i64> {
        self.generator(group.unwrap_or_default())
            .generate_id()
            .map(i64::from)
    }

    /// Generates the next serial number in the group named after type `E`.
    ///
    /// # Errors
    ///
    /// Only the clock errors of [`SnowflakeGenerator::generate_id`].
    pub fn generate_serial_number_for<E: ?Sized>(&self) -> Result<i64> {
        self.generate_serial_number(Some(group_key::<E>()))
    }

    /// Returns the generator serving `group`, or the default generator.
    pub fn generator(&self, group: &str) -> Arc<SnowflakeGenerator<T>> {
        if group.is_empty() {
            return Arc::clone(&self.default_generator);
        }
        self.generators
            .read()
            .get(group)
            .map_or_else(|| Arc::clone(&self.default_generator), Arc::clone)
    }

    /// The generator used for empty and unregistered groups.
    pub fn default_generator(&self) -> &Arc<SnowflakeGenerator<T>> {
        &self.default_generator
    }

    pub fn contains(&self, group: &str) -> bool {
        self.generators.read().contains_key(group)
    }

    /// Names of all registered groups, in no particular order.
    pub fn groups(&self) -> Vec<String> {
        self.generators.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.generators.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.read().is_empty()
    }
}

/// Group key used for per-type ID spaces.
pub fn group_key<E: ?Sized>() -> &'static str {
    core::any::type_name::<E>()
}
